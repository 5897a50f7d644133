//! [crate::linker] resolves each belief's free-text parent hint to a concrete, more foundational
//! belief and reports on the resulting hierarchy.
//!
//! Cycles in the parent relation are reported, never repaired. Every traversal here carries a
//! visited guard so that it terminates on cyclic input too.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    config::check_threshold,
    error::Result,
    properties::{Belief, BeliefId, Tier},
    similarity::{ScoreSource, SimilarityEngine},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyDiagnostic {
    /// `belief_id` is its own ancestor. `detected_from` is where the traversal started.
    Cycle {
        belief_id: BeliefId,
        detected_from: BeliefId,
    },
    /// A parent reference names a belief that is not in the collection.
    MissingParent {
        belief_id: BeliefId,
        parent_id: BeliefId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub matched: usize,
    /// Beliefs that carry a hint but ended up without a parent.
    pub orphaned: usize,
    /// Hints resolved by substring containment because vectorization failed.
    pub fallback_queries: usize,
    pub diagnostics: Vec<HierarchyDiagnostic>,
}

impl LinkReport {
    pub fn has_cycles(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, HierarchyDiagnostic::Cycle { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Linked {
    pub beliefs: Vec<Belief>,
    pub report: LinkReport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyLinker {
    engine: SimilarityEngine,
    threshold: f64,
}

impl HierarchyLinker {
    pub fn new(engine: SimilarityEngine, threshold: f64) -> Result<Self> {
        Ok(HierarchyLinker {
            engine,
            threshold: check_threshold("linking.threshold", threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best parent for `beliefs[index]`, if its hint matches a more foundational belief well enough.
    ///
    /// Returns the parent's index and where its score came from.
    pub fn find_parent(&self, beliefs: &[Belief], index: usize) -> Option<(usize, ScoreSource)> {
        let current = &beliefs[index];
        let hint = current.parent_hint()?;
        let candidates: Vec<usize> = beliefs
            .iter()
            .enumerate()
            .filter(|(i, b)| *i != index && b.importance < current.importance)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let texts: Vec<&str> = candidates
            .iter()
            .map(|&i| beliefs[i].statement_text.as_str())
            .collect();
        let scores = self.engine.query_or_containment(hint, &texts);
        let (best, score) = scores.best()?;
        if score >= self.threshold {
            Some((candidates[best], scores.source))
        } else {
            None
        }
    }

    pub fn link(&self, beliefs: Vec<Belief>) -> Linked {
        let mut beliefs = beliefs;
        let mut report = LinkReport::default();
        tracing::debug!("Linking parent hints across {} beliefs", beliefs.len());

        let resolved: Vec<Option<(usize, ScoreSource)>> = (0..beliefs.len())
            .map(|i| self.find_parent(&beliefs, i))
            .collect();
        for (i, found) in resolved.into_iter().enumerate() {
            if let Some((parent, source)) = found {
                let parent_id = beliefs[parent].belief_id.clone();
                beliefs[i].parent_belief_id = Some(parent_id);
                report.matched += 1;
                if source == ScoreSource::ContainmentFallback {
                    report.fallback_queries += 1;
                }
            }
        }
        report.orphaned = beliefs
            .iter()
            .filter(|b| b.parent_hint().is_some() && b.parent_belief_id.is_none())
            .count();
        report.diagnostics = validate_hierarchy(&beliefs);

        tracing::info!(
            "Matched {} parent-child relationships, {} orphaned",
            report.matched,
            report.orphaned
        );
        Linked { beliefs, report }
    }
}

fn children_map(beliefs: &[Belief]) -> BTreeMap<&BeliefId, Vec<&BeliefId>> {
    let mut children: BTreeMap<&BeliefId, Vec<&BeliefId>> = BTreeMap::new();
    for belief in beliefs {
        if let Some(parent) = belief.parent_belief_id.as_ref() {
            children.entry(parent).or_default().push(&belief.belief_id);
        }
    }
    children
}

fn find_cycle_from<'a>(
    start: &'a BeliefId,
    children: &BTreeMap<&'a BeliefId, Vec<&'a BeliefId>>,
    visited: &mut BTreeSet<&'a BeliefId>,
) -> Option<BeliefId> {
    let mut on_stack: BTreeSet<&BeliefId> = BTreeSet::new();
    let mut stack: Vec<(&BeliefId, usize)> = vec![(start, 0)];
    visited.insert(start);
    on_stack.insert(start);
    while let Some(&(node, next)) = stack.last() {
        let kids = children.get(node).map(Vec::as_slice).unwrap_or(&[]);
        if next < kids.len() {
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let child = kids[next];
            if on_stack.contains(child) {
                return Some(child.clone());
            }
            if visited.insert(child) {
                on_stack.insert(child);
                stack.push((child, 0));
            }
        } else {
            on_stack.remove(node);
            stack.pop();
        }
    }
    None
}

/// Depth-first search over parent→child edges from every belief, reporting each cycle found and
/// every parent reference that names an absent belief.
pub fn validate_hierarchy(beliefs: &[Belief]) -> Vec<HierarchyDiagnostic> {
    let mut diagnostics = Vec::new();
    let ids: BTreeSet<&BeliefId> = beliefs.iter().map(|b| &b.belief_id).collect();
    for belief in beliefs {
        if let Some(parent) = belief.parent_belief_id.as_ref() {
            if !ids.contains(parent) {
                tracing::warn!(
                    "Belief {} names missing parent {}",
                    belief.belief_id,
                    parent
                );
                diagnostics.push(HierarchyDiagnostic::MissingParent {
                    belief_id: belief.belief_id.clone(),
                    parent_id: parent.clone(),
                });
            }
        }
    }

    let children = children_map(beliefs);
    let mut visited = BTreeSet::new();
    for belief in beliefs {
        if visited.contains(&belief.belief_id) {
            continue;
        }
        if let Some(member) = find_cycle_from(&belief.belief_id, &children, &mut visited) {
            tracing::warn!(
                "Circular dependency detected involving {member} (reached from {})",
                belief.belief_id
            );
            diagnostics.push(HierarchyDiagnostic::Cycle {
                belief_id: member,
                detected_from: belief.belief_id.clone(),
            });
        }
    }
    diagnostics
}

/// Distance from each belief to its root, in input order. A parent missing from the collection
/// counts as a root one level up. On a cycle, the walk stops where it first revisits a belief.
pub fn hierarchy_depths(beliefs: &[Belief]) -> Vec<usize> {
    let mut index: BTreeMap<&BeliefId, usize> = BTreeMap::new();
    for (i, b) in beliefs.iter().enumerate() {
        index.entry(&b.belief_id).or_insert(i);
    }
    let mut memo: BTreeMap<&BeliefId, usize> = BTreeMap::new();

    for belief in beliefs {
        let mut chain: Vec<&BeliefId> = Vec::new();
        let mut in_chain: BTreeSet<&BeliefId> = BTreeSet::new();
        let mut cur = &belief.belief_id;
        // depth of whatever sits just above the top of `chain`, plus one
        let offset = loop {
            if let Some(&d) = memo.get(cur) {
                break d + 1;
            }
            if !in_chain.insert(cur) {
                break 0;
            }
            chain.push(cur);
            match index
                .get(cur)
                .and_then(|&i| beliefs[i].parent_belief_id.as_ref())
            {
                None => break 0,
                Some(parent) if !index.contains_key(parent) => break 1,
                Some(parent) => cur = parent,
            }
        };
        let len = chain.len();
        for (k, id) in chain.into_iter().enumerate() {
            memo.insert(id, offset + (len - 1 - k));
        }
    }
    beliefs
        .iter()
        .map(|b| memo.get(&b.belief_id).copied().unwrap_or(0))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub total_beliefs: usize,
    pub has_parent: usize,
    pub is_parent: usize,
    pub root_beliefs: usize,
    pub leaf_beliefs: usize,
    pub max_depth: usize,
    pub avg_depth: f64,
    /// `has_parent / total_beliefs`, 0 for an empty collection.
    pub connectivity: f64,
}

pub fn hierarchy_stats(beliefs: &[Belief]) -> HierarchyStats {
    let total = beliefs.len();
    if total == 0 {
        return HierarchyStats::default();
    }
    let parents: BTreeSet<&BeliefId> = beliefs
        .iter()
        .filter_map(|b| b.parent_belief_id.as_ref())
        .collect();
    let has_parent = beliefs.iter().filter(|b| b.has_parent()).count();
    let is_parent = beliefs
        .iter()
        .filter(|b| parents.contains(&b.belief_id))
        .count();
    let depths = hierarchy_depths(beliefs);
    HierarchyStats {
        total_beliefs: total,
        has_parent,
        is_parent,
        root_beliefs: total - has_parent,
        leaf_beliefs: total - is_parent,
        max_depth: depths.iter().copied().max().unwrap_or(0),
        avg_depth: depths.iter().sum::<usize>() as f64 / total as f64,
        connectivity: has_parent as f64 / total as f64,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub belief_id: BeliefId,
    pub statement: String,
    pub importance: u8,
    pub tier: Tier,
    pub conviction: f64,
    pub stability: f64,
    pub children: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyTree {
    pub roots: Vec<HierarchyNode>,
    pub total_beliefs: usize,
    pub root_count: usize,
}

/// Nest beliefs under their parents. Beliefs without a parent in the collection are roots; a
/// belief reachable twice (only possible on cyclic input) appears once.
pub fn build_hierarchy_tree(beliefs: &[Belief]) -> HierarchyTree {
    let ids: BTreeSet<&BeliefId> = beliefs.iter().map(|b| &b.belief_id).collect();
    let mut index: BTreeMap<&BeliefId, usize> = BTreeMap::new();
    for (i, b) in beliefs.iter().enumerate() {
        index.entry(&b.belief_id).or_insert(i);
    }
    let children = children_map(beliefs);
    let mut visited: BTreeSet<&BeliefId> = BTreeSet::new();

    fn subtree<'a>(
        id: &'a BeliefId,
        beliefs: &'a [Belief],
        index: &BTreeMap<&'a BeliefId, usize>,
        children: &BTreeMap<&'a BeliefId, Vec<&'a BeliefId>>,
        visited: &mut BTreeSet<&'a BeliefId>,
    ) -> Option<HierarchyNode> {
        if !visited.insert(id) {
            return None;
        }
        let belief = &beliefs[*index.get(id)?];
        let kids = children
            .get(id)
            .map(|kids| {
                kids.iter()
                    .filter_map(|&kid| subtree(kid, beliefs, index, children, visited))
                    .collect()
            })
            .unwrap_or_default();
        Some(HierarchyNode {
            belief_id: id.clone(),
            statement: belief.statement_text.clone(),
            importance: belief.importance,
            tier: belief.tier_name,
            conviction: belief.conviction_score,
            stability: belief.stability_score,
            children: kids,
        })
    }

    let roots: Vec<HierarchyNode> = beliefs
        .iter()
        .filter(|b| match b.parent_belief_id.as_ref() {
            None => true,
            Some(parent) => !ids.contains(parent),
        })
        .filter_map(|b| subtree(&b.belief_id, beliefs, &index, &children, &mut visited))
        .collect();
    HierarchyTree {
        total_beliefs: beliefs.len(),
        root_count: roots.len(),
        roots,
    }
}
