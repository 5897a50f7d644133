//! Centrality measures over a [`BeliefGraph`]. Every function returns one score per node, indexed
//! by node order (which is input order).
//!
//! Pinned definitions:
//! - degree centrality is `degree / (n - 1)`, and 1 for every node of a one-node graph;
//! - betweenness is directed, unweighted, normalised by `1 / ((n - 1)(n - 2))` when `n > 2`;
//! - PageRank is the damped power iteration weighted by edge weight, with dangling mass spread
//!   uniformly, stopping once the L1 change drops below `n * tolerance`.
use petgraph::{graph::NodeIndex, visit::EdgeRef, Direction};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::graph::BeliefGraph;
use crate::properties::{BeliefId, Tier};

fn degree_scale(n: usize) -> Option<f64> {
    (n > 1).then(|| 1.0 / (n - 1) as f64)
}

fn scaled(graph: &BeliefGraph, degree: impl Fn(NodeIndex) -> usize) -> Vec<f64> {
    let n = graph.node_count();
    match degree_scale(n) {
        None => vec![1.0; n],
        Some(scale) => graph
            .as_graph()
            .node_indices()
            .map(|node| degree(node) as f64 * scale)
            .collect(),
    }
}

pub fn degree_centrality(graph: &BeliefGraph) -> Vec<f64> {
    scaled(graph, |n| graph.in_degree(n) + graph.out_degree(n))
}

pub fn in_degree_centrality(graph: &BeliefGraph) -> Vec<f64> {
    scaled(graph, |n| graph.in_degree(n))
}

pub fn out_degree_centrality(graph: &BeliefGraph) -> Vec<f64> {
    scaled(graph, |n| graph.out_degree(n))
}

/// Brandes' algorithm over unweighted directed shortest paths.
pub fn betweenness_centrality(graph: &BeliefGraph) -> Vec<f64> {
    let g = graph.as_graph();
    let n = g.node_count();
    let mut betweenness = vec![0.0; n];
    for s in g.node_indices() {
        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut distance: Vec<Option<usize>> = vec![None; n];
        sigma[s.index()] = 1.0;
        distance[s.index()] = Some(0);

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            order.push(v.index());
            let dv = distance[v.index()].unwrap_or(0);
            for w in g.neighbors_directed(v, Direction::Outgoing) {
                let wi = w.index();
                if distance[wi].is_none() {
                    distance[wi] = Some(dv + 1);
                    queue.push_back(w);
                }
                if distance[wi] == Some(dv + 1) {
                    sigma[wi] += sigma[v.index()];
                    predecessors[wi].push(v.index());
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = order.pop() {
            for &v in predecessors[w].iter() {
                let share = sigma[v] / sigma[w] * (1.0 + delta[w]);
                delta[v] += share;
            }
            if w != s.index() {
                betweenness[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        betweenness.iter_mut().for_each(|b| *b *= scale);
    }
    if betweenness.iter().any(|b| !b.is_finite()) {
        tracing::warn!("Betweenness produced non-finite scores; defaulting to 0");
        return vec![0.0; n];
    }
    betweenness
}

/// Weighted PageRank. `None` when the iteration does not converge within `max_iterations`.
pub fn pagerank(
    graph: &BeliefGraph,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Option<Vec<f64>> {
    let g = graph.as_graph();
    let n = g.node_count();
    if n == 0 {
        return Some(Vec::new());
    }
    let uniform = 1.0 / n as f64;
    let out_weight: Vec<f64> = g
        .node_indices()
        .map(|v| {
            g.edges_directed(v, Direction::Outgoing)
                .map(|e| *e.weight())
                .sum()
        })
        .collect();

    let mut rank = vec![uniform; n];
    for _ in 0..max_iterations {
        let previous = rank.clone();
        let dangling: f64 = (0..n)
            .filter(|&i| out_weight[i] <= 0.0)
            .map(|i| previous[i])
            .sum();
        let base = damping * dangling * uniform + (1.0 - damping) * uniform;
        rank = vec![base; n];
        for e in g.edge_references() {
            let source = e.source().index();
            if out_weight[source] > 0.0 {
                rank[e.target().index()] +=
                    damping * previous[source] * *e.weight() / out_weight[source];
            }
        }
        let error: f64 = rank
            .iter()
            .zip(previous.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        if error < n as f64 * tolerance {
            return Some(rank);
        }
    }
    None
}

/// PageRank, or uniform `1/n` when it fails to converge.
pub fn pagerank_or_uniform(
    graph: &BeliefGraph,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Vec<f64> {
    pagerank(graph, damping, max_iterations, tolerance).unwrap_or_else(|| {
        let n = graph.node_count();
        tracing::warn!(
            "PageRank did not converge in {max_iterations} iterations; using uniform scores"
        );
        vec![1.0 / n as f64; n]
    })
}

/// One row of the centrality table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityRow {
    pub belief_id: BeliefId,
    pub statement: String,
    pub tier: Tier,
    pub degree_centrality: f64,
    pub in_degree_centrality: f64,
    pub out_degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub pagerank: f64,
    pub in_degree: usize,
    pub out_degree: usize,
}

pub fn centrality_table(
    graph: &BeliefGraph,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Vec<CentralityRow> {
    let degree = degree_centrality(graph);
    let in_degree = in_degree_centrality(graph);
    let out_degree = out_degree_centrality(graph);
    let betweenness = betweenness_centrality(graph);
    let rank = pagerank_or_uniform(graph, damping, max_iterations, tolerance);
    graph
        .as_graph()
        .node_indices()
        .map(|node| {
            let i = node.index();
            let data = graph.node(node);
            CentralityRow {
                belief_id: data.belief_id.clone(),
                statement: data.statement.clone(),
                tier: data.tier,
                degree_centrality: degree[i],
                in_degree_centrality: in_degree[i],
                out_degree_centrality: out_degree[i],
                betweenness_centrality: betweenness[i],
                pagerank: rank[i],
                in_degree: graph.in_degree(node),
                out_degree: graph.out_degree(node),
            }
        })
        .collect()
}

/// The `n` rows with the largest `key`, descending; ties keep table order.
pub fn top_by<F: Fn(&CentralityRow) -> f64>(
    rows: &[CentralityRow],
    n: usize,
    key: F,
) -> Vec<CentralityRow> {
    let mut sorted: Vec<&CentralityRow> = rows.iter().collect();
    sorted.sort_by(|a, b| key(b).total_cmp(&key(a)));
    sorted.into_iter().take(n).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBelief {
    pub belief_id: BeliefId,
    pub statement: String,
    pub tier: Tier,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralitySummary {
    pub top_pagerank: Vec<RankedBelief>,
    pub top_betweenness: Vec<RankedBelief>,
    pub top_degree: Vec<RankedBelief>,
    pub average_degree: f64,
    pub average_betweenness: f64,
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

pub fn summarize_centrality(rows: &[CentralityRow], top_n: usize) -> CentralitySummary {
    if rows.is_empty() {
        return CentralitySummary::default();
    }
    let ranked = |key: fn(&CentralityRow) -> f64| -> Vec<RankedBelief> {
        top_by(rows, top_n, key)
            .into_iter()
            .map(|row| RankedBelief {
                score: key(&row),
                belief_id: row.belief_id,
                statement: row.statement,
                tier: row.tier,
            })
            .collect()
    };
    let mean = |key: fn(&CentralityRow) -> f64| -> f64 {
        rows.iter().map(key).sum::<f64>() / rows.len() as f64
    };
    CentralitySummary {
        top_pagerank: ranked(|r| r.pagerank),
        top_betweenness: ranked(|r| r.betweenness_centrality),
        top_degree: ranked(|r| r.degree_centrality),
        average_degree: round4(mean(|r| r.degree_centrality)),
        average_betweenness: round4(mean(|r| r.betweenness_centrality)),
    }
}
