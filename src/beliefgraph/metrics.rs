use serde::{Deserialize, Serialize};

use super::{
    centrality::{centrality_table, summarize_centrality, top_by, CentralityRow, CentralitySummary},
    community::{
        greedy_modularity_partition, modularity, partition_ids, summarize_communities,
        CommunitySummary,
    },
    graph::BeliefGraph,
    structure::{graph_stats, GraphStats},
};
use crate::{
    config::GraphConfig,
    error::Result,
    properties::{Belief, BeliefId},
};

/// Everything the analyzer reports about one belief collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub graph_stats: GraphStats,
    pub centrality: Vec<CentralityRow>,
    pub centrality_summary: CentralitySummary,
    pub communities: Vec<Vec<BeliefId>>,
    pub community_summary: CommunitySummary,
    pub modularity: f64,
    pub keystone_beliefs: Vec<CentralityRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphAnalyzer {
    config: GraphConfig,
}

impl GraphAnalyzer {
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(GraphAnalyzer { config })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn centrality(&self, graph: &BeliefGraph) -> Vec<CentralityRow> {
        centrality_table(
            graph,
            self.config.damping,
            self.config.max_iterations,
            self.config.tolerance,
        )
    }

    pub fn analyze_graph(&self, graph: &BeliefGraph) -> GraphAnalysis {
        if graph.is_empty() {
            return GraphAnalysis::default();
        }
        let centrality = self.centrality(graph);
        let partition = greedy_modularity_partition(graph);
        let communities = partition_ids(graph, &partition);
        let analysis = GraphAnalysis {
            graph_stats: graph_stats(graph),
            centrality_summary: summarize_centrality(&centrality, self.config.top_n),
            keystone_beliefs: top_by(&centrality, self.config.top_n, |r| r.pagerank),
            community_summary: summarize_communities(&communities),
            modularity: modularity(graph, &partition),
            communities,
            centrality,
        };
        tracing::info!(
            "Analyzed belief graph: {} nodes, {} edges, {} communities",
            analysis.graph_stats.nodes,
            analysis.graph_stats.edges,
            analysis.community_summary.total_communities
        );
        analysis
    }

    pub fn analyze(&self, beliefs: &[Belief]) -> (BeliefGraph, GraphAnalysis) {
        let graph = BeliefGraph::from_beliefs(beliefs);
        let analysis = self.analyze_graph(&graph);
        (graph, analysis)
    }
}
