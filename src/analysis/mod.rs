//! Derived per-belief metrics, collection summaries and pattern counts.
//!
//! Every metric is a pure function of conviction, stability, importance and the link structure;
//! none comes from the classifier.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::properties::{Belief, BeliefId, Tier};

pub mod stats;

pub use stats::{statistics, BeliefStats};

/// Example lists in [`BeliefPatterns`] hold at most this many statements.
pub const MAX_EXAMPLES: usize = 5;

/// Only beliefs held above this conviction take part in dissonance detection.
pub const DISSONANCE_CONVICTION: f64 = 0.7;
/// Minimum sample deviation of those convictions for a category to be flagged.
pub const DISSONANCE_SPREAD: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefMetrics {
    pub belief_id: BeliefId,
    pub statement: String,
    pub tier: Tier,
    pub importance: u8,
    pub conviction: f64,
    pub stability: f64,
    pub belief_strength: f64,
    pub foundational_weight: f64,
    pub rigidity_score: f64,
    pub certainty_gap: f64,
    pub child_count: usize,
    pub influence_score: f64,
}

pub fn derived_metrics(beliefs: &[Belief]) -> Vec<BeliefMetrics> {
    let mut children: BTreeMap<&BeliefId, usize> = BTreeMap::new();
    for parent in beliefs.iter().filter_map(|b| b.parent_belief_id.as_ref()) {
        *children.entry(parent).or_default() += 1;
    }
    beliefs
        .iter()
        .map(|b| {
            let child_count = children.get(&b.belief_id).copied().unwrap_or(0);
            BeliefMetrics {
                belief_id: b.belief_id.clone(),
                statement: b.statement_text.clone(),
                tier: b.tier_name,
                importance: b.importance,
                conviction: b.conviction_score,
                stability: b.stability_score,
                belief_strength: b.belief_strength(),
                foundational_weight: b.foundational_weight(),
                rigidity_score: b.rigidity_score(),
                certainty_gap: b.certainty_gap(),
                child_count,
                influence_score: child_count as f64 * b.conviction_score,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAverages {
    pub count: usize,
    pub avg_conviction: f64,
    pub avg_stability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeliefSummary {
    pub total_beliefs: usize,
    pub avg_conviction: f64,
    pub avg_stability: f64,
    pub avg_belief_strength: f64,
    pub avg_rigidity: f64,
    pub per_tier: BTreeMap<Tier, GroupAverages>,
    pub per_category: BTreeMap<String, GroupAverages>,
    pub unique_speakers: usize,
    pub beliefs_per_speaker: BTreeMap<String, usize>,
    pub beliefs_per_level: BTreeMap<u32, usize>,
    pub root_beliefs: usize,
    pub leaf_beliefs: usize,
    pub avg_child_count: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeliefPatterns {
    pub core_worldview_count: usize,
    pub core_worldview_beliefs: Vec<String>,
    pub vulnerable_beliefs_count: usize,
    pub vulnerable_beliefs: Vec<String>,
    pub tribal_markers_count: usize,
    pub tribal_markers: Vec<String>,
    pub dogmatic_beliefs_count: usize,
    pub potential_dissonance_domains: usize,
    pub dominant_domain: Option<String>,
    pub dominant_domain_percentage: f64,
    pub high_rigidity_count: usize,
    pub large_certainty_gap_count: usize,
}

/// A category whose strongly held beliefs disagree on how strongly they are held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DissonancePattern {
    pub category: String,
    pub belief_count: usize,
    pub conviction_std: f64,
    pub beliefs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    pub speaker_id: String,
    pub total_beliefs: usize,
    pub avg_conviction: f64,
    pub avg_stability: f64,
    pub avg_rigidity: f64,
    /// Beliefs of importance 1 to 3.
    pub core_beliefs: usize,
    pub core_belief_ratio: f64,
    pub dominant_category: String,
    pub dominant_sub_domain: Option<String>,
    pub tribal_markers: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeliefReport {
    pub summary: BeliefSummary,
    pub patterns: BeliefPatterns,
    pub influence_keystones: Vec<BeliefMetrics>,
    pub dissonance: Vec<DissonancePattern>,
    pub speakers: Vec<SpeakerProfile>,
    pub statistics: BeliefStats,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Sample standard deviation; `None` below two values.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values.iter().copied());
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn averages<'a, K: Ord>(
    beliefs: &'a [Belief],
    key: impl Fn(&'a Belief) -> K,
) -> BTreeMap<K, GroupAverages> {
    let mut grouped: BTreeMap<K, Vec<&Belief>> = BTreeMap::new();
    for b in beliefs {
        grouped.entry(key(b)).or_default().push(b);
    }
    grouped
        .into_iter()
        .map(|(k, members)| {
            let avg = GroupAverages {
                count: members.len(),
                avg_conviction: mean(members.iter().map(|b| b.conviction_score)),
                avg_stability: mean(members.iter().map(|b| b.stability_score)),
            };
            (k, avg)
        })
        .collect()
}

pub fn summarize(beliefs: &[Belief], metrics: &[BeliefMetrics]) -> BeliefSummary {
    if beliefs.is_empty() {
        return BeliefSummary::default();
    }
    let parents: BTreeSet<&BeliefId> = beliefs
        .iter()
        .filter_map(|b| b.parent_belief_id.as_ref())
        .collect();
    let mut beliefs_per_speaker: BTreeMap<String, usize> = BTreeMap::new();
    let mut beliefs_per_level: BTreeMap<u32, usize> = BTreeMap::new();
    for b in beliefs {
        *beliefs_per_speaker.entry(b.speaker_id.clone()).or_default() += 1;
        *beliefs_per_level.entry(b.discovery_level).or_default() += 1;
    }
    BeliefSummary {
        total_beliefs: beliefs.len(),
        avg_conviction: mean(beliefs.iter().map(|b| b.conviction_score)),
        avg_stability: mean(beliefs.iter().map(|b| b.stability_score)),
        avg_belief_strength: mean(metrics.iter().map(|m| m.belief_strength)),
        avg_rigidity: mean(metrics.iter().map(|m| m.rigidity_score)),
        per_tier: averages(beliefs, |b| b.tier_name),
        per_category: averages(beliefs, |b| b.category.clone()),
        unique_speakers: beliefs_per_speaker.len(),
        beliefs_per_speaker,
        beliefs_per_level,
        root_beliefs: beliefs.iter().filter(|b| !b.has_parent()).count(),
        leaf_beliefs: beliefs
            .iter()
            .filter(|b| !parents.contains(&b.belief_id))
            .count(),
        avg_child_count: mean(metrics.iter().map(|m| m.child_count as f64)),
    }
}

/// Most frequent value with its count; ties go to the smallest.
fn most_common<'a>(values: impl Iterator<Item = &'a str>) -> Option<(&'a str, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((value, count)),
        }
    }
    best
}

fn examples<'a>(beliefs: impl Iterator<Item = &'a Belief>) -> (usize, Vec<String>) {
    let matched: Vec<&Belief> = beliefs.collect();
    let shown = matched
        .iter()
        .take(MAX_EXAMPLES)
        .map(|b| b.statement_text.clone())
        .collect();
    (matched.len(), shown)
}

pub fn identify_patterns(beliefs: &[Belief]) -> BeliefPatterns {
    if beliefs.is_empty() {
        return BeliefPatterns::default();
    }
    let (core_worldview_count, core_worldview_beliefs) = examples(
        beliefs
            .iter()
            .filter(|b| b.importance <= 3 && b.stability_score > 0.9),
    );
    let (vulnerable_beliefs_count, vulnerable_beliefs) = examples(
        beliefs
            .iter()
            .filter(|b| b.conviction_score > 0.8 && b.stability_score < 0.6),
    );
    let (tribal_markers_count, tribal_markers) =
        examples(beliefs.iter().filter(|b| b.defines_outgroup));

    let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for b in beliefs {
        by_category
            .entry(b.category.as_str())
            .or_default()
            .push(b.conviction_score);
    }
    let potential_dissonance_domains = by_category
        .values()
        .filter(|c| sample_std(c).is_some_and(|s| s > 0.3))
        .count();
    let dominant = most_common(beliefs.iter().map(|b| b.category.as_str()));

    BeliefPatterns {
        core_worldview_count,
        core_worldview_beliefs,
        vulnerable_beliefs_count,
        vulnerable_beliefs,
        tribal_markers_count,
        tribal_markers,
        dogmatic_beliefs_count: beliefs
            .iter()
            .filter(|b| b.conviction_score > 0.9 && b.importance > 5)
            .count(),
        potential_dissonance_domains,
        dominant_domain: dominant.map(|(c, _)| c.to_string()),
        dominant_domain_percentage: dominant
            .map(|(_, n)| n as f64 / beliefs.len() as f64 * 100.0)
            .unwrap_or(0.0),
        high_rigidity_count: beliefs.iter().filter(|b| b.rigidity_score() > 7.0).count(),
        large_certainty_gap_count: beliefs
            .iter()
            .filter(|b| b.certainty_gap().abs() > 0.3)
            .count(),
    }
}

/// Top `n` by influence, then foundational weight, descending; ties keep input order.
pub fn influence_keystones(metrics: &[BeliefMetrics], n: usize) -> Vec<BeliefMetrics> {
    let mut sorted: Vec<&BeliefMetrics> = metrics.iter().collect();
    sorted.sort_by(|a, b| {
        b.influence_score
            .total_cmp(&a.influence_score)
            .then_with(|| b.foundational_weight.total_cmp(&a.foundational_weight))
    });
    sorted.into_iter().take(n).cloned().collect()
}

/// Categories holding more than one belief above [`DISSONANCE_CONVICTION`] whose convictions
/// spread by more than [`DISSONANCE_SPREAD`] (sample deviation). Categories come out in name order.
pub fn detect_cognitive_dissonance(beliefs: &[Belief]) -> Vec<DissonancePattern> {
    let mut by_category: BTreeMap<&str, Vec<&Belief>> = BTreeMap::new();
    for b in beliefs
        .iter()
        .filter(|b| b.conviction_score > DISSONANCE_CONVICTION)
    {
        by_category.entry(b.category.as_str()).or_default().push(b);
    }
    by_category
        .into_iter()
        .filter_map(|(category, members)| {
            let convictions: Vec<f64> = members.iter().map(|b| b.conviction_score).collect();
            let spread = sample_std(&convictions)?;
            (spread > DISSONANCE_SPREAD).then(|| DissonancePattern {
                category: category.to_string(),
                belief_count: members.len(),
                conviction_std: spread,
                beliefs: members.iter().map(|b| b.statement_text.clone()).collect(),
            })
        })
        .collect()
}

/// One profile per speaker, in speaker order; empty unless at least two speakers are present.
pub fn compare_speakers(beliefs: &[Belief]) -> Vec<SpeakerProfile> {
    let mut by_speaker: BTreeMap<&str, Vec<&Belief>> = BTreeMap::new();
    for b in beliefs {
        by_speaker.entry(b.speaker_id.as_str()).or_default().push(b);
    }
    if by_speaker.len() < 2 {
        return Vec::new();
    }
    by_speaker
        .into_iter()
        .map(|(speaker, members)| {
            let core_beliefs = members.iter().filter(|b| b.importance <= 3).count();
            SpeakerProfile {
                speaker_id: speaker.to_string(),
                total_beliefs: members.len(),
                avg_conviction: mean(members.iter().map(|b| b.conviction_score)),
                avg_stability: mean(members.iter().map(|b| b.stability_score)),
                avg_rigidity: mean(members.iter().map(|b| b.rigidity_score())),
                core_beliefs,
                core_belief_ratio: core_beliefs as f64 / members.len() as f64,
                dominant_category: most_common(members.iter().map(|b| b.category.as_str()))
                    .map(|(c, _)| c.to_string())
                    .unwrap_or_default(),
                dominant_sub_domain: most_common(
                    members.iter().filter_map(|b| b.sub_domain.as_deref()),
                )
                .map(|(s, _)| s.to_string()),
                tribal_markers: members.iter().filter(|b| b.defines_outgroup).count(),
            }
        })
        .collect()
}

pub fn analyze(beliefs: &[Belief], top_n: usize) -> BeliefReport {
    let metrics = derived_metrics(beliefs);
    tracing::debug!("Computed derived metrics for {} beliefs", metrics.len());
    let dissonance = detect_cognitive_dissonance(beliefs);
    if !dissonance.is_empty() {
        tracing::info!("Found {} categories with conflicting convictions", dissonance.len());
    }
    BeliefReport {
        summary: summarize(beliefs, &metrics),
        patterns: identify_patterns(beliefs),
        influence_keystones: influence_keystones(&metrics, top_n),
        dissonance,
        speakers: compare_speakers(beliefs),
        statistics: statistics(beliefs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{belief, forest};

    #[test]
    fn child_count_drives_influence() {
        let metrics = derived_metrics(&forest());
        assert_eq!(metrics[0].child_count, 2);
        assert!((metrics[0].influence_score - 1.6).abs() < 1e-12);
        assert_eq!(metrics[1].child_count, 0);
        assert_eq!(metrics[3].child_count, 1);

        let top = influence_keystones(&metrics, 2);
        assert_eq!(top[0].belief_id.as_str(), "b_0001");
        assert_eq!(top[1].belief_id.as_str(), "b_0004");
    }

    #[test]
    fn summary_groups_by_tier_category_and_level() {
        let beliefs = forest();
        let report = analyze(&beliefs, 5);
        let summary = &report.summary;
        assert_eq!(summary.total_beliefs, 5);
        assert_eq!(summary.root_beliefs, 2);
        assert_eq!(summary.leaf_beliefs, 3);
        assert_eq!(summary.unique_speakers, 1);
        assert_eq!(summary.beliefs_per_level.get(&1), Some(&5));
        assert_eq!(summary.per_tier[&Tier::CoreAxioms].count, 1);
        assert_eq!(summary.per_category["politics"].count, 5);
        assert!((summary.avg_child_count - 0.6).abs() < 1e-12);
    }

    #[test]
    fn patterns_flag_vulnerable_dogmatic_and_tribal_beliefs() {
        let mut core = belief(1, "human dignity is inviolable", 1);
        core.stability_score = 0.95;
        let mut vulnerable = belief(2, "my team always wins", 7);
        vulnerable.conviction_score = 0.95;
        vulnerable.stability_score = 0.3;
        vulnerable.defines_outgroup = true;
        vulnerable.category = "sports".to_string();
        let mut doubtful = belief(3, "crypto will replace banks", 8);
        doubtful.conviction_score = 0.1;
        doubtful.category = "sports".to_string();

        let patterns = identify_patterns(&[core, vulnerable, doubtful]);
        assert_eq!(patterns.core_worldview_count, 1);
        assert_eq!(patterns.vulnerable_beliefs, vec!["my team always wins".to_string()]);
        assert_eq!(patterns.tribal_markers_count, 1);
        assert_eq!(patterns.dogmatic_beliefs_count, 1);
        assert_eq!(patterns.potential_dissonance_domains, 1);
        assert_eq!(patterns.dominant_domain.as_deref(), Some("sports"));
        assert!((patterns.dominant_domain_percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(patterns.large_certainty_gap_count, 2);
    }

    #[test]
    fn dissonance_needs_spread_among_strong_convictions() {
        let held = |n: usize, category: &str, conviction: f64| {
            let mut b = belief(n, "markets clear", 5);
            b.category = category.to_string();
            b.conviction_score = conviction;
            b
        };
        let beliefs = vec![
            held(1, "economics", 0.71),
            held(2, "economics", 1.0),
            held(3, "economics", 0.3),
            held(4, "politics", 0.75),
            held(5, "politics", 0.95),
            held(6, "sports", 0.9),
        ];
        let found = detect_cognitive_dissonance(&beliefs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, "economics");
        assert_eq!(found[0].belief_count, 2);
        assert!((found[0].conviction_std - 0.29 / 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(found[0].beliefs.len(), 2);

        assert_eq!(analyze(&beliefs, 5).dissonance, found);
        assert!(detect_cognitive_dissonance(&forest()).is_empty());
    }

    #[test]
    fn speakers_are_compared_only_when_several_are_present() {
        assert!(compare_speakers(&forest()).is_empty());

        let mut beliefs = vec![
            belief(1, "human dignity is inviolable", 1),
            belief(2, "markets clear", 5),
            belief(3, "rents rise", 8),
        ];
        beliefs[1].sub_domain = Some("housing".to_string());
        let mut guest = belief(4, "unions protect workers", 2);
        guest.speaker_id = "speaker_b".to_string();
        guest.category = "economics".to_string();
        guest.defines_outgroup = true;
        beliefs.push(guest);

        let profiles = compare_speakers(&beliefs);
        assert_eq!(profiles.len(), 2);
        let host = &profiles[0];
        assert_eq!(host.speaker_id, "speaker_a");
        assert_eq!(host.total_beliefs, 3);
        assert_eq!(host.core_beliefs, 1);
        assert!((host.core_belief_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert!((host.avg_rigidity - 0.8 * 0.7 * 19.0 / 3.0).abs() < 1e-9);
        assert_eq!(host.dominant_category, "politics");
        assert_eq!(host.dominant_sub_domain.as_deref(), Some("housing"));
        assert_eq!(host.tribal_markers, 0);

        let guest = &profiles[1];
        assert_eq!(guest.core_belief_ratio, 1.0);
        assert_eq!(guest.dominant_category, "economics");
        assert_eq!(guest.dominant_sub_domain, None);
        assert_eq!(guest.tribal_markers, 1);
    }

    #[test]
    fn empty_collection_has_empty_report() {
        assert_eq!(analyze(&[], 5), BeliefReport::default());
    }
}
