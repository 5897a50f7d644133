//! [`BeliefPipeline`] chains the stages: validation, duplicate clustering, hierarchy linking and
//! graph analysis. Each stage consumes the previous stage's output; nothing is shared between them.
use serde::{Deserialize, Serialize};

use crate::{
    beliefgraph::{GraphAnalysis, GraphAnalyzer, NodeLinkGraph},
    config::PipelineConfig,
    dedup::{ConsolidationPolicy, DuplicateClusterer, MappingRecord},
    error::Result,
    linker::{hierarchy_stats, HierarchyLinker, HierarchyStats, LinkReport},
    properties::{validate_beliefs, Belief, Rejection},
    similarity::{ScoreSource, SimilarityEngine},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupSummary {
    pub input_beliefs: usize,
    pub output_beliefs: usize,
    pub duplicate_groups: usize,
    pub policy: ConsolidationPolicy,
    pub source: Option<ScoreSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub rejected: Vec<Rejection>,
    pub deduplicated: Vec<Belief>,
    pub mapping: Vec<MappingRecord>,
    pub dedup: DedupSummary,
    pub linked: Vec<Belief>,
    pub link_report: LinkReport,
    pub hierarchy: HierarchyStats,
    pub graph: NodeLinkGraph,
    pub analysis: GraphAnalysis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeliefPipeline {
    config: PipelineConfig,
    clusterer: DuplicateClusterer,
    linker: HierarchyLinker,
    analyzer: GraphAnalyzer,
}

impl BeliefPipeline {
    /// Validates the whole configuration up front; a bad threshold never surfaces mid-run.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let fold = config.similarity.fold_inflections;
        let clusterer = DuplicateClusterer::new(
            SimilarityEngine::new(config.dedup.max_features, fold)?,
            config.dedup.threshold,
        )?;
        let linker = HierarchyLinker::new(
            SimilarityEngine::new(config.linking.max_features, fold)?,
            config.linking.threshold,
        )?;
        let analyzer = GraphAnalyzer::new(config.graph.clone())?;
        Ok(BeliefPipeline {
            config,
            clusterer,
            linker,
            analyzer,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, beliefs: Vec<Belief>) -> PipelineOutput {
        let (beliefs, rejected) = validate_beliefs(beliefs);
        let input_beliefs = beliefs.len();
        let policy = self.config.dedup.policy;

        let (deduplicated, mapping, dedup) = if self.config.dedup.enabled {
            let result = self.clusterer.run(beliefs, policy);
            let summary = DedupSummary {
                input_beliefs,
                output_beliefs: result.beliefs.len(),
                duplicate_groups: result.groups.len(),
                policy,
                source: Some(result.source),
            };
            (result.beliefs, result.mapping, summary)
        } else {
            tracing::info!("Deduplication disabled, passing {input_beliefs} beliefs through");
            let summary = DedupSummary {
                input_beliefs,
                output_beliefs: input_beliefs,
                policy,
                ..DedupSummary::default()
            };
            (beliefs, Vec::new(), summary)
        };

        let (linked, link_report) = if self.config.linking.enabled {
            let linked = self.linker.link(deduplicated.clone());
            (linked.beliefs, linked.report)
        } else {
            tracing::info!("Linking disabled");
            (deduplicated.clone(), LinkReport::default())
        };

        let hierarchy = hierarchy_stats(&linked);
        let (graph, analysis) = self.analyzer.analyze(&linked);
        PipelineOutput {
            rejected,
            deduplicated,
            mapping,
            dedup,
            linked,
            link_report,
            hierarchy,
            graph: graph.to_node_link(),
            analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{belief, init_logging};

    #[test]
    fn stages_can_be_switched_off() {
        init_logging();
        let mut config = PipelineConfig::default();
        config.dedup.enabled = false;
        config.linking.enabled = false;
        let pipeline = BeliefPipeline::new(config).unwrap();
        let mut child = belief(2, "tariffs protect freedom", 8);
        child.parent_hint = Some("freedom is the highest value".to_string());
        let beliefs = vec![belief(1, "freedom is the highest value", 2), child];
        let out = pipeline.run(beliefs.clone());
        assert_eq!(out.deduplicated, beliefs);
        assert!(out.mapping.is_empty());
        assert!(out.linked.iter().all(|b| b.parent_belief_id.is_none()));
        assert_eq!(out.analysis.graph_stats.edges, 0);
    }

    #[test]
    fn invalid_records_are_dropped_before_any_stage() {
        let pipeline = BeliefPipeline::new(PipelineConfig::default()).unwrap();
        let mut bad = belief(2, "the sky is blue", 9);
        bad.stability_score = -0.1;
        let out = pipeline.run(vec![belief(1, "taxes are theft", 3), bad]);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.linked.len(), 1);
        assert_eq!(out.dedup.input_beliefs, 1);
    }

    #[test]
    fn bad_configuration_fails_at_construction() {
        let mut config = PipelineConfig::default();
        config.linking.threshold = 0.0;
        assert!(BeliefPipeline::new(config).is_err());
    }
}
