//! Structural statistics of a [`BeliefGraph`].
use petgraph::{
    algo::{connected_components, is_cyclic_directed, tarjan_scc},
    Direction,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::graph::BeliefGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub is_dag: bool,
    pub root_nodes: usize,
    pub leaf_nodes: usize,
    pub weakly_connected_components: usize,
    pub strongly_connected_components: usize,
    /// Summed directed shortest-path lengths over `n (n - 1)` ordered pairs; only for a weakly
    /// connected graph.
    pub avg_path_length: Option<f64>,
    /// Mean local clustering of the undirected projection; absent for an empty graph.
    pub avg_clustering: Option<f64>,
}

impl Default for GraphStats {
    fn default() -> Self {
        GraphStats {
            nodes: 0,
            edges: 0,
            density: 0.0,
            is_dag: true,
            root_nodes: 0,
            leaf_nodes: 0,
            weakly_connected_components: 0,
            strongly_connected_components: 0,
            avg_path_length: None,
            avg_clustering: None,
        }
    }
}

/// `m / (n (n - 1))`, 0 for fewer than two nodes.
pub fn density(graph: &BeliefGraph) -> f64 {
    let n = graph.node_count();
    if n < 2 {
        return 0.0;
    }
    graph.edge_count() as f64 / (n * (n - 1)) as f64
}

pub fn weakly_connected_components(graph: &BeliefGraph) -> usize {
    connected_components(graph.as_graph())
}

pub fn strongly_connected_components(graph: &BeliefGraph) -> usize {
    tarjan_scc(graph.as_graph()).len()
}

/// BFS from every node. Distances are summed over reachable ordered pairs and divided by
/// `n (n - 1)`, so unreachable pairs pull the mean down. `None` unless the graph is weakly
/// connected; 0 for a single node.
pub fn average_shortest_path_length(graph: &BeliefGraph) -> Option<f64> {
    let g = graph.as_graph();
    let n = g.node_count();
    if n == 0 || weakly_connected_components(graph) != 1 {
        return None;
    }
    if n == 1 {
        return Some(0.0);
    }
    let mut total = 0usize;
    for s in g.node_indices() {
        let mut distance: Vec<Option<usize>> = vec![None; n];
        distance[s.index()] = Some(0);
        let mut queue = VecDeque::from([(s, 0usize)]);
        while let Some((v, d)) = queue.pop_front() {
            for w in g.neighbors_directed(v, Direction::Outgoing) {
                if distance[w.index()].is_none() {
                    distance[w.index()] = Some(d + 1);
                    total += d + 1;
                    queue.push_back((w, d + 1));
                }
            }
        }
    }
    Some(total as f64 / (n * (n - 1)) as f64)
}

/// Local clustering on the undirected projection: closed triangles over `deg (deg - 1) / 2`.
pub fn clustering(graph: &BeliefGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (a, b) in graph.undirected_edges() {
        neighbors[a].push(b);
        neighbors[b].push(a);
    }
    (0..n)
        .map(|v| {
            let adj = &neighbors[v];
            let k = adj.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (i, &a) in adj.iter().enumerate() {
                for &b in adj[i + 1..].iter() {
                    if neighbors[a].contains(&b) {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k * (k - 1)) as f64
        })
        .collect()
}

pub fn average_clustering(graph: &BeliefGraph) -> Option<f64> {
    let scores = clustering(graph);
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

pub fn graph_stats(graph: &BeliefGraph) -> GraphStats {
    if graph.is_empty() {
        return GraphStats::default();
    }
    let g = graph.as_graph();
    GraphStats {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        density: density(graph),
        is_dag: !is_cyclic_directed(g),
        root_nodes: g
            .node_indices()
            .filter(|&n| graph.in_degree(n) == 0)
            .count(),
        leaf_nodes: g
            .node_indices()
            .filter(|&n| graph.out_degree(n) == 0)
            .count(),
        weakly_connected_components: weakly_connected_components(graph),
        strongly_connected_components: strongly_connected_components(graph),
        avg_path_length: average_shortest_path_length(graph),
        avg_clustering: average_clustering(graph),
    }
}
