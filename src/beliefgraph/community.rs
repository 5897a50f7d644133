//! Greedy modularity communities on the undirected projection of a [`BeliefGraph`].
//!
//! Every node starts in its own community; the pair of connected communities whose merge raises
//! modularity the most is merged, repeatedly, until no merge raises it. Ties go to the pair with
//! the smallest community indices.
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::graph::BeliefGraph;
use crate::properties::BeliefId;

/// Node indices per community, largest community first.
pub fn greedy_modularity_partition(graph: &BeliefGraph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let edges = graph.undirected_edges();
    if edges.is_empty() {
        return Vec::new();
    }
    let m = edges.len() as f64;
    let mut degree = vec![0usize; n];
    for &(a, b) in edges.iter() {
        degree[a] += 1;
        degree[b] += 1;
    }

    // community label per node; labels are the smallest node index in the community
    let mut label: Vec<usize> = (0..n).collect();
    loop {
        let mut between: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        for &(a, b) in edges.iter() {
            let (ca, cb) = (label[a], label[b]);
            if ca != cb {
                *between.entry((ca.min(cb), ca.max(cb))).or_default() += 1;
            }
        }
        let mut degree_sum: BTreeMap<usize, usize> = BTreeMap::new();
        for (node, &c) in label.iter().enumerate() {
            *degree_sum.entry(c).or_default() += degree[node];
        }

        let mut best: Option<((usize, usize), f64)> = None;
        for (&(ci, cj), &count) in between.iter() {
            let ai = degree_sum[&ci] as f64 / (2.0 * m);
            let aj = degree_sum[&cj] as f64 / (2.0 * m);
            let gain = 2.0 * (count as f64 / (2.0 * m) - ai * aj);
            match best {
                Some((_, top)) if gain <= top => {}
                _ => best = Some(((ci, cj), gain)),
            }
        }
        match best {
            Some(((keep, absorb), gain)) if gain > 0.0 => {
                label.iter_mut().filter(|c| **c == absorb).for_each(|c| *c = keep);
            }
            _ => break,
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &c) in label.iter().enumerate() {
        groups.entry(c).or_default().push(node);
    }
    let mut partition: Vec<Vec<usize>> = groups.into_values().collect();
    partition.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
    partition
}

/// Newman modularity of a partition of the undirected projection; 0 without edges.
pub fn modularity(graph: &BeliefGraph, partition: &[Vec<usize>]) -> f64 {
    let edges = graph.undirected_edges();
    if edges.is_empty() {
        return 0.0;
    }
    let m = edges.len() as f64;
    let mut community = vec![usize::MAX; graph.node_count()];
    for (c, members) in partition.iter().enumerate() {
        for &node in members {
            community[node] = c;
        }
    }
    let mut internal = vec![0usize; partition.len()];
    let mut degree_sum = vec![0usize; partition.len()];
    for &(a, b) in edges.iter() {
        let (ca, cb) = (community[a], community[b]);
        if ca == usize::MAX || cb == usize::MAX {
            continue;
        }
        degree_sum[ca] += 1;
        degree_sum[cb] += 1;
        if ca == cb {
            internal[ca] += 1;
        }
    }
    (0..partition.len())
        .map(|c| internal[c] as f64 / m - (degree_sum[c] as f64 / (2.0 * m)).powi(2))
        .sum()
}

pub fn partition_ids(graph: &BeliefGraph, partition: &[Vec<usize>]) -> Vec<Vec<BeliefId>> {
    partition
        .iter()
        .map(|members| {
            members
                .iter()
                .map(|&i| graph.id(NodeIndex::new(i)).clone())
                .collect()
        })
        .collect()
}

/// Belief ids per community, largest community first.
pub fn detect_communities(graph: &BeliefGraph) -> Vec<Vec<BeliefId>> {
    partition_ids(graph, &greedy_modularity_partition(graph))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub total_communities: usize,
    /// Community sizes, largest first.
    pub community_sizes: Vec<usize>,
    pub largest_community_size: usize,
}

pub fn summarize_communities(communities: &[Vec<BeliefId>]) -> CommunitySummary {
    let mut sizes: Vec<usize> = communities.iter().map(Vec::len).collect();
    sizes.sort_by(|a, b| b.cmp(a));
    CommunitySummary {
        total_communities: sizes.len(),
        largest_community_size: sizes.first().copied().unwrap_or(0),
        community_sizes: sizes,
    }
}
