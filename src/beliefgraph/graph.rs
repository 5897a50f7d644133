//! The directed parent→child graph built fresh from a belief collection.
use petgraph::{
    algo::all_simple_paths,
    graph::NodeIndex,
    visit::{Bfs, EdgeRef, Reversed},
    Direction,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::properties::{Belief, BeliefId, Tier};

/// Read-only snapshot of the belief attributes the analytics need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefNodeData {
    pub belief_id: BeliefId,
    pub statement: String,
    pub tier: Tier,
    pub importance: u8,
    pub conviction: f64,
    pub stability: f64,
    pub category: String,
}

impl From<&Belief> for BeliefNodeData {
    fn from(belief: &Belief) -> Self {
        BeliefNodeData {
            belief_id: belief.belief_id.clone(),
            statement: belief.statement_text.clone(),
            tier: belief.tier_name,
            importance: belief.importance,
            conviction: belief.conviction_score,
            stability: belief.stability_score,
            category: belief.category.clone(),
        }
    }
}

/// Nodes are beliefs in input order; edges run parent→child, weighted by the child's conviction.
#[derive(Debug, Clone, Default)]
pub struct BeliefGraph {
    graph: petgraph::Graph<BeliefNodeData, f64>,
    index: BTreeMap<BeliefId, NodeIndex>,
}

impl BeliefGraph {
    pub fn from_beliefs(beliefs: &[Belief]) -> Self {
        let mut graph = petgraph::Graph::new();
        let mut index = BTreeMap::new();
        for belief in beliefs {
            if index.contains_key(&belief.belief_id) {
                tracing::warn!("Skipping repeated belief id {}", belief.belief_id);
                continue;
            }
            let node = graph.add_node(BeliefNodeData::from(belief));
            index.insert(belief.belief_id.clone(), node);
        }
        for belief in beliefs {
            let Some(parent) = belief.parent_belief_id.as_ref() else {
                continue;
            };
            match (index.get(parent), index.get(&belief.belief_id)) {
                (Some(&source), Some(&sink)) if source != sink => {
                    if graph.find_edge(source, sink).is_none() {
                        graph.add_edge(source, sink, belief.conviction_score);
                    }
                }
                (Some(_), Some(_)) => {
                    tracing::warn!("Skipping self-loop on belief {}", belief.belief_id);
                }
                _ => {
                    tracing::warn!(
                        "Skipping edge to {}: parent {} is not in the collection",
                        belief.belief_id,
                        parent
                    );
                }
            }
        }
        tracing::debug!(
            "Built belief graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        BeliefGraph { graph, index }
    }

    pub fn as_graph(&self) -> &petgraph::Graph<BeliefNodeData, f64> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_index(&self, id: &BeliefId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, node: NodeIndex) -> &BeliefNodeData {
        &self.graph[node]
    }

    pub fn id(&self, node: NodeIndex) -> &BeliefId {
        &self.graph[node].belief_id
    }

    pub fn in_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Incoming).count()
    }

    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Outgoing).count()
    }

    /// Beliefs with no incoming edge, in input order.
    pub fn roots(&self) -> Vec<BeliefId> {
        self.graph
            .node_indices()
            .filter(|&n| self.in_degree(n) == 0)
            .map(|n| self.id(n).clone())
            .collect()
    }

    /// Beliefs with no outgoing edge, in input order.
    pub fn leaves(&self) -> Vec<BeliefId> {
        self.graph
            .node_indices()
            .filter(|&n| self.out_degree(n) == 0)
            .map(|n| self.id(n).clone())
            .collect()
    }

    /// Every belief reachable by following child edges. Empty for an unknown id.
    pub fn descendants(&self, id: &BeliefId) -> BTreeSet<BeliefId> {
        let Some(start) = self.node_index(id) else {
            return BTreeSet::new();
        };
        let mut found = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(n) = bfs.next(&self.graph) {
            if n != start {
                found.insert(self.id(n).clone());
            }
        }
        found
    }

    /// Every belief from which `id` is reachable. Empty for an unknown id.
    pub fn ancestors(&self, id: &BeliefId) -> BTreeSet<BeliefId> {
        let Some(start) = self.node_index(id) else {
            return BTreeSet::new();
        };
        let reversed = Reversed(&self.graph);
        let mut found = BTreeSet::new();
        let mut bfs = Bfs::new(reversed, start);
        while let Some(n) = bfs.next(reversed) {
            if n != start {
                found.insert(self.id(n).clone());
            }
        }
        found
    }

    /// All simple paths from `start` to `end`. Empty when either is absent, when they coincide, or
    /// when no path exists.
    pub fn paths(&self, start: &BeliefId, end: &BeliefId) -> Vec<Vec<BeliefId>> {
        let (Some(from), Some(to)) = (self.node_index(start), self.node_index(end)) else {
            return Vec::new();
        };
        if from == to {
            return Vec::new();
        }
        let mut paths: Vec<Vec<BeliefId>> =
            all_simple_paths::<Vec<NodeIndex>, _>(&self.graph, from, to, 0, None)
                .map(|path| path.into_iter().map(|n| self.id(n).clone()).collect())
                .collect();
        paths.sort();
        paths
    }

    /// Undirected projection as deduplicated `(low, high)` node-index pairs.
    pub fn undirected_edges(&self) -> BTreeSet<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b))
            })
            .filter(|(a, b)| a != b)
            .collect()
    }

    /// Node-link document for external viewers.
    pub fn to_node_link(&self) -> NodeLinkGraph {
        NodeLinkGraph {
            directed: true,
            multigraph: false,
            nodes: self.graph.node_weights().cloned().collect(),
            links: self
                .graph
                .edge_references()
                .map(|e| NodeLink {
                    source: self.id(e.source()).clone(),
                    target: self.id(e.target()).clone(),
                    weight: *e.weight(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLink {
    pub source: BeliefId,
    pub target: BeliefId,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub multigraph: bool,
    pub nodes: Vec<BeliefNodeData>,
    pub links: Vec<NodeLink>,
}
