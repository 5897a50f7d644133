//! [crate::dedup] finds beliefs that restate one another across discovery levels and folds them
//! into consolidated records.
//!
//! Grouping is a single greedy pass in input order: each not-yet-grouped belief anchors a group of
//! every other not-yet-grouped belief whose similarity *to the anchor* meets the threshold. Two
//! members of one group need not be similar to each other. This is not a connected-components
//! clustering, and the output depends only on the input order.
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{
    config::check_threshold,
    error::{Result, TenetError},
    properties::{Belief, BeliefId, GroupId},
    similarity::{ScoreSource, SimilarityEngine, SimilarityMatrix},
};

/// How a duplicate group is collapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationPolicy {
    /// Every record survives, tagged with its group and reinforcement evidence.
    #[default]
    KeepAll,
    /// One record per group survives, chosen by [`Belief::level_fit_score`].
    KeepBest,
    /// Each group becomes one synthetic record.
    Merge,
}

impl Display for ConsolidationPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConsolidationPolicy::KeepAll => "keep_all",
            ConsolidationPolicy::KeepBest => "keep_best",
            ConsolidationPolicy::Merge => "merge",
        };
        write!(f, "{label}")
    }
}

impl FromStr for ConsolidationPolicy {
    type Err = TenetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_all" | "all" => Ok(ConsolidationPolicy::KeepAll),
            "keep_best" | "best" => Ok(ConsolidationPolicy::KeepBest),
            "merge" => Ok(ConsolidationPolicy::Merge),
            other => Err(TenetError::Config(format!(
                "unknown consolidation policy '{other}'"
            ))),
        }
    }
}

/// Indices (into the input collection, ascending) of beliefs judged to be restatements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: GroupId,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Not part of any group.
    Unique,
    Kept,
    Removed,
    Merged,
}

/// One row of the mapping artifact. Every input belief gets exactly one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub original_belief_id: BeliefId,
    pub duplicate_group_id: Option<GroupId>,
    /// The surviving record this one is represented by (the kept or merged-into id).
    pub merged_into: Option<BeliefId>,
    pub disposition: Disposition,
    pub is_primary: bool,
    /// Keep-best selection score; absent under the other policies.
    pub group_score: Option<f64>,
    pub reinforcement_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Consolidation {
    pub beliefs: Vec<Belief>,
    pub mapping: Vec<MappingRecord>,
    pub groups: Vec<DuplicateGroup>,
    pub policy: ConsolidationPolicy,
    pub source: ScoreSource,
}

/// Greedy anchor grouping over a precomputed similarity matrix.
pub fn find_duplicate_groups(similarity: &SimilarityMatrix, threshold: f64) -> Vec<DuplicateGroup> {
    let n = similarity.len();
    if n < 2 {
        return Vec::new();
    }
    let mut grouped = vec![false; n];
    let mut groups = Vec::new();
    for anchor in 0..n {
        if grouped[anchor] {
            continue;
        }
        let members: Vec<usize> = (0..n)
            .filter(|&k| !grouped[k] && similarity.get(anchor, k) >= threshold)
            .collect();
        if members.len() > 1 {
            for &k in members.iter() {
                grouped[k] = true;
            }
            groups.push(DuplicateGroup {
                id: GroupId::from_index(groups.len()),
                members,
            });
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateClusterer {
    engine: SimilarityEngine,
    threshold: f64,
}

impl DuplicateClusterer {
    pub fn new(engine: SimilarityEngine, threshold: f64) -> Result<Self> {
        Ok(DuplicateClusterer {
            engine,
            threshold: check_threshold("dedup.threshold", threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn similarity(&self, beliefs: &[Belief]) -> SimilarityMatrix {
        let texts: Vec<&str> = beliefs.iter().map(|b| b.statement_text.as_str()).collect();
        self.engine.pairwise_or_containment(&texts)
    }

    pub fn find_duplicate_groups(&self, beliefs: &[Belief]) -> Vec<DuplicateGroup> {
        if beliefs.len() < 2 {
            return Vec::new();
        }
        find_duplicate_groups(&self.similarity(beliefs), self.threshold)
    }

    /// Group and consolidate in one step.
    pub fn run(&self, beliefs: Vec<Belief>, policy: ConsolidationPolicy) -> Consolidation {
        tracing::debug!(
            "Deduplicating {} beliefs at threshold {}",
            beliefs.len(),
            self.threshold
        );
        let (groups, source) = if beliefs.len() < 2 {
            (Vec::new(), ScoreSource::Tfidf)
        } else {
            let matrix = self.similarity(&beliefs);
            (find_duplicate_groups(&matrix, self.threshold), matrix.source)
        };
        let mut result = consolidate(beliefs, groups, policy);
        result.source = source;
        result
    }
}

/// Apply a consolidation policy to precomputed groups.
pub fn consolidate(
    beliefs: Vec<Belief>,
    groups: Vec<DuplicateGroup>,
    policy: ConsolidationPolicy,
) -> Consolidation {
    let input_len = beliefs.len();
    let groups = usable_groups(groups, input_len);
    let mut membership: BTreeMap<usize, usize> = BTreeMap::new();
    for (g, group) in groups.iter().enumerate() {
        for &m in group.members.iter() {
            membership.insert(m, g);
        }
    }

    let mut beliefs = beliefs;
    for (i, belief) in beliefs.iter_mut().enumerate() {
        if !membership.contains_key(&i) {
            belief.duplicate_group_id = None;
            belief.reinforcement_count = 1;
            belief.reinforcement_levels = vec![belief.discovery_level];
        }
    }

    let (beliefs, mapping) = match policy {
        ConsolidationPolicy::KeepAll => keep_all(beliefs, &groups, &membership),
        ConsolidationPolicy::KeepBest => keep_best(beliefs, &groups, &membership),
        ConsolidationPolicy::Merge => merge(beliefs, &groups, &membership),
    };
    tracing::info!(
        "Consolidated {input_len} beliefs into {} ({} duplicate groups, policy {policy})",
        beliefs.len(),
        groups.len()
    );
    Consolidation {
        beliefs,
        mapping,
        groups,
        policy,
        source: ScoreSource::Tfidf,
    }
}

/// Drops groups that cannot be consolidated: fewer than two members, an index past the end of
/// the collection, or a member already claimed by an earlier group.
fn usable_groups(groups: Vec<DuplicateGroup>, len: usize) -> Vec<DuplicateGroup> {
    let mut claimed = vec![false; len];
    let mut usable = Vec::with_capacity(groups.len());
    for mut group in groups {
        if let Some(&m) = group.members.iter().find(|&&m| m >= len) {
            tracing::warn!(
                "Skipping duplicate group {}: member index {m} is out of range for {len} beliefs",
                group.id
            );
            continue;
        }
        group.members.sort_unstable();
        group.members.dedup();
        if group.members.len() < 2 {
            tracing::warn!(
                "Skipping duplicate group {}: it has fewer than two members",
                group.id
            );
            continue;
        }
        if let Some(&m) = group.members.iter().find(|&&m| claimed[m]) {
            tracing::warn!(
                "Skipping duplicate group {}: belief {m} already belongs to another group",
                group.id
            );
            continue;
        }
        for &m in group.members.iter() {
            claimed[m] = true;
        }
        usable.push(group);
    }
    usable
}

fn sorted_levels(beliefs: &[Belief], group: &DuplicateGroup) -> Vec<u32> {
    let mut levels: Vec<u32> = group
        .members
        .iter()
        .map(|&m| beliefs[m].discovery_level)
        .collect();
    levels.sort_unstable();
    levels
}

fn unique_row(belief: &Belief) -> MappingRecord {
    MappingRecord {
        original_belief_id: belief.belief_id.clone(),
        duplicate_group_id: None,
        merged_into: None,
        disposition: Disposition::Unique,
        is_primary: true,
        group_score: None,
        reinforcement_count: 1,
    }
}

fn keep_all(
    mut beliefs: Vec<Belief>,
    groups: &[DuplicateGroup],
    membership: &BTreeMap<usize, usize>,
) -> (Vec<Belief>, Vec<MappingRecord>) {
    for group in groups {
        let levels = sorted_levels(&beliefs, group);
        for &m in group.members.iter() {
            let belief = &mut beliefs[m];
            belief.duplicate_group_id = Some(group.id.clone());
            belief.reinforcement_count = group.members.len() as u32;
            belief.reinforcement_levels = levels.clone();
        }
    }
    let mapping = beliefs
        .iter()
        .enumerate()
        .map(|(i, belief)| match membership.get(&i) {
            None => unique_row(belief),
            Some(&g) => {
                let group = &groups[g];
                let primary = group.members[0];
                MappingRecord {
                    original_belief_id: belief.belief_id.clone(),
                    duplicate_group_id: Some(group.id.clone()),
                    merged_into: Some(beliefs[primary].belief_id.clone()),
                    disposition: Disposition::Kept,
                    is_primary: i == primary,
                    group_score: None,
                    reinforcement_count: group.members.len() as u32,
                }
            }
        })
        .collect();
    (beliefs, mapping)
}

fn keep_best(
    mut beliefs: Vec<Belief>,
    groups: &[DuplicateGroup],
    membership: &BTreeMap<usize, usize>,
) -> (Vec<Belief>, Vec<MappingRecord>) {
    // per group: index of the winner
    let mut winners = Vec::with_capacity(groups.len());
    for group in groups {
        let mut best = group.members[0];
        let mut best_score = beliefs[best].level_fit_score();
        for &m in group.members.iter().skip(1) {
            let score = beliefs[m].level_fit_score();
            if score > best_score {
                best = m;
                best_score = score;
            }
        }
        let levels = sorted_levels(&beliefs, group);
        let kept = &mut beliefs[best];
        kept.duplicate_group_id = Some(group.id.clone());
        kept.reinforcement_count = group.members.len() as u32;
        kept.reinforcement_levels = levels;
        winners.push(best);
    }

    let mapping = beliefs
        .iter()
        .enumerate()
        .map(|(i, belief)| match membership.get(&i) {
            None => unique_row(belief),
            Some(&g) => {
                let winner = winners[g];
                MappingRecord {
                    original_belief_id: belief.belief_id.clone(),
                    duplicate_group_id: Some(groups[g].id.clone()),
                    merged_into: Some(beliefs[winner].belief_id.clone()),
                    disposition: if i == winner {
                        Disposition::Kept
                    } else {
                        Disposition::Removed
                    },
                    is_primary: i == winner,
                    group_score: Some(belief.level_fit_score()),
                    reinforcement_count: groups[g].members.len() as u32,
                }
            }
        })
        .collect();

    let survivors = beliefs
        .into_iter()
        .enumerate()
        .filter(|(i, _)| match membership.get(i) {
            None => true,
            Some(&g) => winners[g] == *i,
        })
        .map(|(_, b)| b)
        .collect();
    (survivors, mapping)
}

/// Most frequent value; ties go to the smallest.
fn mode<T: Ord + Clone>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        match &best {
            Some((_, top)) if count <= *top => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn merge_group(members: &[&Belief], group: &DuplicateGroup) -> Belief {
    let first = members[0];
    let mut levels: Vec<u32> = members.iter().map(|b| b.discovery_level).collect();
    levels.sort_unstable();
    let chunk_ids: Vec<&str> = members.iter().filter_map(|b| b.chunk_id.as_deref()).collect();

    Belief {
        belief_id: first.belief_id.clone(),
        speaker_id: mode(members.iter().map(|b| b.speaker_id.clone())).unwrap_or_default(),
        episode_id: first.episode_id.clone(),
        timestamp: first.timestamp.clone(),
        discovery_level: mode(members.iter().map(|b| b.discovery_level))
            .unwrap_or(first.discovery_level),
        chunk_id: (!chunk_ids.is_empty()).then(|| chunk_ids.join(",")),
        chunk_size: mean(members.iter().filter_map(|b| b.chunk_size.map(f64::from)))
            .map(|m| m.trunc() as u32),
        statement_text: first.statement_text.clone(),
        atomic_belief: first.atomic_belief.clone(),
        certainty: mode(members.iter().filter_map(|b| b.certainty)),
        tier_name: mode(members.iter().map(|b| b.tier_name)).unwrap_or(first.tier_name),
        importance: mode(members.iter().map(|b| b.importance)).unwrap_or(first.importance),
        category: mode(members.iter().map(|b| b.category.clone())).unwrap_or_default(),
        sub_domain: mode(members.iter().filter_map(|b| b.sub_domain.clone())),
        conviction_score: mean(members.iter().map(|b| b.conviction_score)).unwrap_or_default(),
        stability_score: mean(members.iter().map(|b| b.stability_score)).unwrap_or_default(),
        defines_outgroup: mode(members.iter().map(|b| b.defines_outgroup)).unwrap_or_default(),
        filter_confidence: mean(members.iter().map(|b| b.filter_confidence)).unwrap_or_default(),
        parent_hint: first.parent_hint.clone(),
        parent_belief_id: None,
        duplicate_group_id: Some(group.id.clone()),
        reinforcement_count: members.len() as u32,
        reinforcement_levels: levels,
    }
}

fn merge(
    beliefs: Vec<Belief>,
    groups: &[DuplicateGroup],
    membership: &BTreeMap<usize, usize>,
) -> (Vec<Belief>, Vec<MappingRecord>) {
    let merged: Vec<Belief> = groups
        .iter()
        .map(|group| {
            let members: Vec<&Belief> = group.members.iter().map(|&m| &beliefs[m]).collect();
            merge_group(&members, group)
        })
        .collect();

    let mapping = beliefs
        .iter()
        .enumerate()
        .map(|(i, belief)| match membership.get(&i) {
            None => unique_row(belief),
            Some(&g) => MappingRecord {
                original_belief_id: belief.belief_id.clone(),
                duplicate_group_id: Some(groups[g].id.clone()),
                merged_into: Some(merged[g].belief_id.clone()),
                disposition: Disposition::Merged,
                is_primary: i == groups[g].members[0],
                group_score: None,
                reinforcement_count: groups[g].members.len() as u32,
            },
        })
        .collect();

    let mut output: Vec<Belief> = beliefs
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !membership.contains_key(i))
        .map(|(_, b)| b)
        .collect();
    output.extend(merged);
    (output, mapping)
}
