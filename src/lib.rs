//! # tenet-core
//!
//! Belief consolidation and analysis: turns a table of classified belief records into a
//! deduplicated, hierarchically linked belief graph with centrality and community metrics.
//!
//! ## Overview
//!
//! Upstream, a classifier reads transcripts chunk by chunk and emits belief records with
//! conviction, stability and importance scores, plus a free-text hint naming each belief's parent.
//! The same belief is usually surfaced several times at different chunk granularities, and the
//! parent hints are prose rather than references. tenet-core reconciles that output:
//!
//! 1. **Duplicate clustering** ([`dedup`]): near-duplicate statements are grouped with TF-IDF
//!    cosine similarity ([`similarity`]) and consolidated under one of three policies.
//! 2. **Hierarchy linking** ([`linker`]): each parent hint is matched against strictly more
//!    foundational beliefs. Cycles in the result are reported, not repaired.
//! 3. **Graph analysis** ([`beliefgraph`]): the parent→child graph is rebuilt and measured
//!    (degree, betweenness, PageRank, components, clustering, modularity communities, keystones).
//!
//! Each stage is a pure, synchronous transformation of an in-memory collection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tenet_core::{codec, config::PipelineConfig, pipeline::BeliefPipeline};
//!
//! fn main() -> Result<(), tenet_core::TenetError> {
//!     let (beliefs, rejected) = codec::read_beliefs("beliefs.json")?;
//!     let pipeline = BeliefPipeline::new(PipelineConfig::default())?;
//!     let output = pipeline.run(beliefs);
//!
//!     println!("{} rejected records", rejected.len());
//!     for keystone in &output.analysis.keystone_beliefs {
//!         println!("{:.4} {}", keystone.pagerank, keystone.statement);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Guide
//!
//! Start with [`properties::Belief`] for the record shape and [`pipeline::BeliefPipeline`] for the
//! end-to-end run. Configuration lives in [`config`]; JSON input and output in [`codec`].

pub mod analysis;
pub mod beliefgraph;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod error;
pub mod linker;
pub mod pipeline;
pub mod properties;
pub mod similarity;
#[cfg(test)]
mod tests;

pub use error::*;
