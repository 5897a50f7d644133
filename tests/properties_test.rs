mod common;

use common::{belief, corpus};
use tenet_core::{
    beliefgraph::{BeliefGraph, GraphAnalyzer},
    config::{GraphConfig, PipelineConfig},
    dedup::{consolidate, ConsolidationPolicy, DuplicateClusterer},
    linker::{hierarchy_stats, validate_hierarchy, HierarchyDiagnostic, HierarchyLinker},
    pipeline::BeliefPipeline,
    properties::{Belief, BeliefId},
    similarity::SimilarityEngine,
};
use test_log::test;

fn clusterer(threshold: f64) -> DuplicateClusterer {
    DuplicateClusterer::new(SimilarityEngine::new(1000, true).unwrap(), threshold).unwrap()
}

/// Restatements of one claim with shrinking overlap, plus an exact pair and a loner.
fn graded() -> Vec<Belief> {
    [
        "free markets reward honest work",
        "free markets reward honest work and thrift",
        "free markets reward work",
        "markets reward thrift",
        "central planning always fails",
        "central planning fails",
        "sunny weather lifts spirits",
    ]
    .iter()
    .enumerate()
    .map(|(i, s)| belief(i + 1, s, 5))
    .collect()
}

fn group_sizes(beliefs: &[Belief], threshold: f64) -> Vec<usize> {
    let mut sizes = vec![0; beliefs.len()];
    for group in clusterer(threshold).find_duplicate_groups(beliefs) {
        for &m in group.members.iter() {
            sizes[m] = group.members.len();
        }
    }
    sizes
}

#[test]
fn grouping_is_repeatable() {
    for beliefs in [corpus(), graded()] {
        let c = clusterer(0.5);
        assert_eq!(
            c.find_duplicate_groups(&beliefs),
            c.find_duplicate_groups(&beliefs)
        );
    }
}

#[test]
fn raising_the_threshold_only_shrinks_groups() {
    let beliefs = graded();
    let thresholds = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
    let mut previous = group_sizes(&beliefs, thresholds[0]);
    assert_eq!(previous, vec![4, 4, 4, 4, 2, 2, 0]);
    for &t in thresholds.iter().skip(1) {
        let sizes = group_sizes(&beliefs, t);
        for (k, (&now, &before)) in sizes.iter().zip(previous.iter()).enumerate() {
            assert!(now <= before, "belief {k} grew from {before} to {now} at {t}");
        }
        previous = sizes;
    }
    assert_eq!(previous, vec![0, 0, 0, 0, 2, 2, 0]);
}

#[test]
fn keep_all_reinforcement_accounts_for_every_grouped_record() {
    let beliefs = graded();
    let c = clusterer(0.5);
    let groups = c.find_duplicate_groups(&beliefs);
    let grouped: usize = groups.iter().map(|g| g.members.len()).sum();
    let result = consolidate(beliefs, groups.clone(), ConsolidationPolicy::KeepAll);

    let per_group: u32 = groups
        .iter()
        .map(|g| result.beliefs[g.members[0]].reinforcement_count)
        .sum();
    assert_eq!(per_group as usize, grouped);
    assert_eq!(result.beliefs.len(), 7);
    assert_eq!(result.mapping.len(), 7);
}

#[test]
fn merge_yields_one_record_per_group_plus_the_ungrouped() {
    for threshold in [0.3, 0.5, 0.9] {
        let beliefs = graded();
        let c = clusterer(threshold);
        let groups = c.find_duplicate_groups(&beliefs);
        let grouped: usize = groups.iter().map(|g| g.members.len()).sum();
        let ungrouped = beliefs.len() - grouped;
        let result = consolidate(beliefs, groups.clone(), ConsolidationPolicy::Merge);
        assert_eq!(result.beliefs.len(), ungrouped + groups.len());
        assert_eq!(result.mapping.len(), 7);
    }
}

#[test]
fn importance_ordering_keeps_linked_hierarchies_acyclic() {
    // Each hint names the other, but equal importance leaves no candidate parent.
    let mut a = belief(1, "borders must be secured", 5);
    a.parent_hint = Some("immigration enriches the nation".to_string());
    let mut b = belief(2, "immigration enriches the nation", 5);
    b.parent_hint = Some("borders must be secured".to_string());

    let linker = HierarchyLinker::new(SimilarityEngine::new(500, true).unwrap(), 0.6).unwrap();
    let linked = linker.link(vec![a, b]);
    assert!(linked.beliefs.iter().all(|b| b.parent_belief_id.is_none()));
    assert!(!linked.report.has_cycles());

    let linked = linker.link(corpus());
    assert!(!linked.report.has_cycles());
    let graph = BeliefGraph::from_beliefs(&linked.beliefs);
    let analyzer = GraphAnalyzer::new(GraphConfig::default()).unwrap();
    assert!(analyzer.analyze_graph(&graph).graph_stats.is_dag);
}

#[test]
fn cycles_forced_against_importance_order_are_detected() {
    let mut a = belief(1, "borders must be secured", 2);
    let mut b = belief(2, "immigration enriches the nation", 5);
    a.parent_belief_id = Some(BeliefId::sequential(2));
    b.parent_belief_id = Some(BeliefId::sequential(1));
    let beliefs = vec![a, b, belief(3, "the sky is blue", 9)];

    let diagnostics = validate_hierarchy(&beliefs);
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        &diagnostics[0],
        HierarchyDiagnostic::Cycle { detected_from, .. } if *detected_from == BeliefId::sequential(1)
    ));

    let (_, analysis) = GraphAnalyzer::new(GraphConfig::default())
        .unwrap()
        .analyze(&beliefs);
    assert!(!analysis.graph_stats.is_dag);
}

#[test]
fn no_belief_is_its_own_parent() {
    let mut config = PipelineConfig::default();
    config.dedup.threshold = 0.3;
    config.linking.threshold = 0.1;
    let out = BeliefPipeline::new(config).unwrap().run(corpus());
    for b in out.linked.iter() {
        assert_ne!(b.parent_belief_id.as_ref(), Some(&b.belief_id));
    }
}

#[test]
fn roots_and_parented_beliefs_partition_the_collection() {
    let out = BeliefPipeline::new(PipelineConfig::default())
        .unwrap()
        .run(corpus());
    let stats = hierarchy_stats(&out.linked);
    assert_eq!(stats.root_beliefs + stats.has_parent, stats.total_beliefs);

    let graph = BeliefGraph::from_beliefs(&out.linked);
    let leaves = graph.leaves();
    assert!(!leaves.is_empty());
    for leaf in leaves.iter() {
        let node = graph.node_index(leaf).unwrap();
        assert_eq!(graph.out_degree(node), 0);
    }
}

#[test]
fn pagerank_sums_to_one() {
    for policy in [
        ConsolidationPolicy::KeepAll,
        ConsolidationPolicy::KeepBest,
        ConsolidationPolicy::Merge,
    ] {
        let mut config = PipelineConfig::default();
        config.dedup.policy = policy;
        let out = BeliefPipeline::new(config).unwrap().run(corpus());
        let total: f64 = out.analysis.centrality.iter().map(|r| r.pagerank).sum();
        assert!((total - 1.0).abs() < 1e-6, "{policy}: {total}");
    }
}
