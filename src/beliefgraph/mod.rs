//! The Graph Analyzer: a directed belief graph rebuilt from a linked collection, with centrality,
//! structural statistics, communities and keystone selection.
//!
//! - [`BeliefGraph`]: petgraph-backed parent→child graph with root/leaf/ancestor/path queries
//! - [`centrality`]: degree, betweenness and PageRank, plus the centrality table and summary
//! - [`structure`]: density, DAG check, component counts, path length, clustering
//! - [`community`]: greedy modularity communities
//! - [`GraphAnalyzer`]: runs all of the above with a [`crate::config::GraphConfig`]

pub mod centrality;
pub mod community;
pub mod graph;
pub mod metrics;
pub mod structure;

pub use graph::{BeliefGraph, BeliefNodeData, NodeLink, NodeLinkGraph};
pub use metrics::{GraphAnalysis, GraphAnalyzer};
