//! tenet CLI tool
//!
//! Command-line interface for consolidating a classified belief table.
//!
//! ## Commands
//!
//! - `run <beliefs.json>`: deduplicate, link and analyze, writing JSON artifacts
//! - `stats <beliefs.json>`: print hierarchy statistics and the belief summary of a linked table

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tenet_core::{
    analysis, codec,
    config::{provider_for_path, PipelineConfig},
    dedup::ConsolidationPolicy,
    linker::hierarchy_stats,
    pipeline::BeliefPipeline,
};

#[derive(Parser)]
#[command(name = "tenet")]
#[command(author, version, about = "Consolidate and analyze classified belief records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate, link and analyze a belief table
    Run {
        /// JSON belief table
        beliefs: PathBuf,

        /// Configuration file (.toml, .yaml or .yml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the output artifacts
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,

        /// Consolidation policy: keep_all, keep_best or merge
        #[arg(short, long)]
        policy: Option<ConsolidationPolicy>,

        /// Skip duplicate clustering
        #[arg(long)]
        no_dedup: bool,

        /// Skip hierarchy linking
        #[arg(long)]
        no_linking: bool,

        /// Length of keystone and top-centrality lists
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Print hierarchy statistics and the belief summary of a linked table
    Stats {
        /// JSON belief table
        beliefs: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            beliefs,
            config,
            out_dir,
            policy,
            no_dedup,
            no_linking,
            top_n,
        } => {
            let mut pipeline_config = match config {
                Some(path) => provider_for_path(path).get_config()?,
                None => PipelineConfig::default(),
            };
            if let Some(policy) = policy {
                pipeline_config.dedup.policy = policy;
            }
            if no_dedup {
                pipeline_config.dedup.enabled = false;
            }
            if no_linking {
                pipeline_config.linking.enabled = false;
            }
            if let Some(top_n) = top_n {
                pipeline_config.graph.top_n = top_n;
            }

            let (records, rejected) = codec::read_beliefs(&beliefs)?;
            for rejection in rejected.iter() {
                eprintln!("Rejected record {}: {}", rejection.index, rejection.reason);
            }
            let pipeline = BeliefPipeline::new(pipeline_config)?;
            let output = pipeline.run(records);

            codec::write_json(out_dir.join("beliefs_deduplicated.json"), &output.deduplicated)?;
            codec::write_json(out_dir.join("duplicate_mapping.json"), &output.mapping)?;
            codec::write_json(out_dir.join("beliefs_linked.json"), &output.linked)?;
            codec::write_json(out_dir.join("graph_analysis.json"), &output.analysis)?;
            codec::write_json(out_dir.join("graph.json"), &output.graph)?;

            println!("\n=== Consolidation Results ===");
            println!(
                "Beliefs: {} in, {} after deduplication ({} groups)",
                output.dedup.input_beliefs,
                output.dedup.output_beliefs,
                output.dedup.duplicate_groups
            );
            println!(
                "Links: {} matched, {} orphaned",
                output.link_report.matched, output.link_report.orphaned
            );
            for diagnostic in output.link_report.diagnostics.iter() {
                println!("Warning: {diagnostic:?}");
            }
            println!(
                "Graph: {} nodes, {} edges, {} communities",
                output.analysis.graph_stats.nodes,
                output.analysis.graph_stats.edges,
                output.analysis.community_summary.total_communities
            );
            println!("Keystone beliefs:");
            for row in output.analysis.keystone_beliefs.iter() {
                println!("  {:.4}  {}  {}", row.pagerank, row.belief_id, row.statement);
            }
            println!("Artifacts written to {:?}", out_dir);
            Ok(())
        }

        Commands::Stats { beliefs } => {
            let (records, rejected) = codec::read_beliefs(&beliefs)?;
            if !rejected.is_empty() {
                eprintln!("Rejected {} records", rejected.len());
            }
            println!("{}", codec::to_json(&hierarchy_stats(&records))?);
            println!("{}", codec::to_json(&analysis::analyze(&records, 5))?);
            Ok(())
        }
    }
}
