//! Distribution, score, correlation and outlier statistics over a belief table.
//!
//! Values are left unrounded; presentation layers round as they see fit.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::properties::{Belief, BeliefId, Certainty, Tier};

use super::MAX_EXAMPLES;

/// Statements at least this many characters long are reported as long.
pub const LONG_STATEMENT_CHARS: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub counts: BTreeMap<String, usize>,
    /// Share of the counted values, in percent.
    pub percentages: BTreeMap<String, f64>,
}

impl Distribution {
    pub fn of<K: ToString>(values: impl IntoIterator<Item = K>) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for v in values {
            *counts.entry(v.to_string()).or_default() += 1;
        }
        let total: usize = counts.values().sum();
        let percentages = counts
            .iter()
            .map(|(k, &n)| (k.clone(), n as f64 / total as f64 * 100.0))
            .collect();
        Distribution {
            counts,
            percentages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub tier: Distribution,
    pub category: Distribution,
    /// Beliefs without a sub-domain count as "general".
    pub sub_domain: Distribution,
    pub speaker: Distribution,
    /// Only beliefs that carry a certainty label.
    pub certainty: Distribution,
    pub discovery_level: Distribution,
    pub importance_band: Distribution,
}

/// Descriptive statistics of one numeric column. `std` is the population deviation and quartiles
/// interpolate linearly between order statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatistics {
    pub conviction: ScoreSummary,
    pub stability: ScoreSummary,
    pub belief_strength: ScoreSummary,
    pub rigidity: ScoreSummary,
    pub certainty_gap: ScoreSummary,
    pub statement_length: ScoreSummary,
}

/// Pearson correlations; `None` with fewer than two values or a constant column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correlations {
    pub conviction_vs_stability: Option<f64>,
    pub importance_vs_conviction: Option<f64>,
    pub importance_vs_stability: Option<f64>,
    pub statement_length_vs_conviction: Option<f64>,
    pub statement_length_vs_stability: Option<f64>,
    pub stability_vs_belief_strength: Option<f64>,
    pub discovery_level_vs_conviction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub belief_id: BeliefId,
    pub statement: String,
    pub value: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outliers {
    /// Conviction of at least 0.95, highest first.
    pub high_conviction: Vec<Outlier>,
    /// Stability of at most 0.3, lowest first.
    pub low_stability: Vec<Outlier>,
    /// `|conviction - stability|` above 0.4, widest first; the value is the absolute gap.
    pub large_certainty_gap: Vec<Outlier>,
    pub long_statements: Vec<Outlier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub avg_statement_length: f64,
    pub median_statement_length: f64,
    /// Distinct whitespace-separated words over total words.
    pub vocabulary_richness: f64,
    pub avg_words_per_statement: f64,
    pub certainty_distribution: Distribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementStats {
    pub avg_reinforcement: f64,
    pub max_reinforcement: u32,
    /// Beliefs confirmed by more than one record.
    pub multi_level_beliefs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiLevelStats {
    pub level_distribution: Distribution,
    pub reinforcement: ReinforcementStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeliefStats {
    pub distributions: Distributions,
    pub scores: ScoreStatistics,
    pub correlations: Correlations,
    pub outliers: Outliers,
    pub content: ContentMetrics,
    pub multi_level: MultiLevelStats,
}

fn statement_length(b: &Belief) -> f64 {
    b.statement_text.chars().count() as f64
}

fn certainty_label(c: Certainty) -> &'static str {
    match c {
        Certainty::Hedged => "hedged",
        Certainty::Binary => "binary",
    }
}

fn importance_band(importance: u8) -> &'static str {
    match importance {
        0..=3 => "core (1-3)",
        4..=7 => "mid (4-7)",
        _ => "surface (8-10)",
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// `None` for an empty column.
pub fn describe(values: &[f64]) -> Option<ScoreSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let median = quantile(&sorted, 0.5);
    Some(ScoreSummary {
        mean,
        median,
        std: var.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        q25: quantile(&sorted, 0.25),
        q50: median,
        q75: quantile(&sorted, 0.75),
    })
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(ys[..n].iter()) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then_some(r)
}

fn column(beliefs: &[Belief], f: impl Fn(&Belief) -> f64) -> Vec<f64> {
    beliefs.iter().map(f).collect()
}

fn distributions(beliefs: &[Belief]) -> Distributions {
    Distributions {
        tier: Distribution::of(beliefs.iter().map(|b| b.tier_name.label())),
        category: Distribution::of(beliefs.iter().map(|b| b.category.as_str())),
        sub_domain: Distribution::of(
            beliefs
                .iter()
                .map(|b| b.sub_domain.as_deref().unwrap_or("general")),
        ),
        speaker: Distribution::of(beliefs.iter().map(|b| b.speaker_id.as_str())),
        certainty: Distribution::of(
            beliefs
                .iter()
                .filter_map(|b| b.certainty.map(certainty_label)),
        ),
        discovery_level: Distribution::of(beliefs.iter().map(|b| b.discovery_level)),
        importance_band: Distribution::of(beliefs.iter().map(|b| importance_band(b.importance))),
    }
}

fn score_statistics(beliefs: &[Belief]) -> ScoreStatistics {
    let summary = |f: fn(&Belief) -> f64| describe(&column(beliefs, f)).unwrap_or_default();
    ScoreStatistics {
        conviction: summary(|b| b.conviction_score),
        stability: summary(|b| b.stability_score),
        belief_strength: summary(Belief::belief_strength),
        rigidity: summary(Belief::rigidity_score),
        certainty_gap: summary(Belief::certainty_gap),
        statement_length: summary(statement_length),
    }
}

fn correlations(beliefs: &[Belief]) -> Correlations {
    let conviction = column(beliefs, |b| b.conviction_score);
    let stability = column(beliefs, |b| b.stability_score);
    let importance = column(beliefs, |b| b.importance as f64);
    let length = column(beliefs, statement_length);
    Correlations {
        conviction_vs_stability: pearson(&conviction, &stability),
        importance_vs_conviction: pearson(&importance, &conviction),
        importance_vs_stability: pearson(&importance, &stability),
        statement_length_vs_conviction: pearson(&length, &conviction),
        statement_length_vs_stability: pearson(&length, &stability),
        stability_vs_belief_strength: pearson(
            &stability,
            &column(beliefs, Belief::belief_strength),
        ),
        discovery_level_vs_conviction: pearson(
            &column(beliefs, |b| b.discovery_level as f64),
            &conviction,
        ),
    }
}

/// Beliefs passing `keep`, ordered by `value` (descending unless `ascending`), ties in input order.
fn ranked(
    beliefs: &[Belief],
    keep: impl Fn(&Belief) -> bool,
    value: impl Fn(&Belief) -> f64,
    ascending: bool,
) -> Vec<Outlier> {
    let mut rows: Vec<Outlier> = beliefs
        .iter()
        .filter(|b| keep(b))
        .map(|b| Outlier {
            belief_id: b.belief_id.clone(),
            statement: b.statement_text.clone(),
            value: value(b),
            tier: b.tier_name,
        })
        .collect();
    if ascending {
        rows.sort_by(|a, b| a.value.total_cmp(&b.value));
    } else {
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    }
    rows.truncate(MAX_EXAMPLES);
    rows
}

pub fn detect_outliers(beliefs: &[Belief]) -> Outliers {
    Outliers {
        high_conviction: ranked(
            beliefs,
            |b| b.conviction_score >= 0.95,
            |b| b.conviction_score,
            false,
        ),
        low_stability: ranked(
            beliefs,
            |b| b.stability_score <= 0.3,
            |b| b.stability_score,
            true,
        ),
        large_certainty_gap: ranked(
            beliefs,
            |b| b.certainty_gap().abs() > 0.4,
            |b| b.certainty_gap().abs(),
            false,
        ),
        long_statements: ranked(
            beliefs,
            |b| b.statement_text.chars().count() >= LONG_STATEMENT_CHARS,
            statement_length,
            false,
        ),
    }
}

fn content_metrics(beliefs: &[Belief]) -> ContentMetrics {
    let lengths = describe(&column(beliefs, statement_length)).unwrap_or_default();
    let words: Vec<usize> = beliefs
        .iter()
        .map(|b| b.statement_text.split_whitespace().count())
        .collect();
    let total_words: usize = words.iter().sum();
    let distinct: BTreeSet<&str> = beliefs
        .iter()
        .flat_map(|b| b.statement_text.split_whitespace())
        .collect();
    ContentMetrics {
        avg_statement_length: lengths.mean,
        median_statement_length: lengths.median,
        vocabulary_richness: if total_words == 0 {
            0.0
        } else {
            distinct.len() as f64 / total_words as f64
        },
        avg_words_per_statement: total_words as f64 / beliefs.len().max(1) as f64,
        certainty_distribution: Distribution::of(
            beliefs.iter().filter_map(|b| b.certainty.map(certainty_label)),
        ),
    }
}

pub fn reinforcement_stats(beliefs: &[Belief]) -> ReinforcementStats {
    if beliefs.is_empty() {
        return ReinforcementStats::default();
    }
    let total: u64 = beliefs.iter().map(|b| b.reinforcement_count as u64).sum();
    ReinforcementStats {
        avg_reinforcement: total as f64 / beliefs.len() as f64,
        max_reinforcement: beliefs
            .iter()
            .map(|b| b.reinforcement_count)
            .max()
            .unwrap_or(0),
        multi_level_beliefs: beliefs.iter().filter(|b| b.reinforcement_count > 1).count(),
    }
}

pub fn statistics(beliefs: &[Belief]) -> BeliefStats {
    if beliefs.is_empty() {
        return BeliefStats::default();
    }
    BeliefStats {
        distributions: distributions(beliefs),
        scores: score_statistics(beliefs),
        correlations: correlations(beliefs),
        outliers: detect_outliers(beliefs),
        content: content_metrics(beliefs),
        multi_level: MultiLevelStats {
            level_distribution: Distribution::of(beliefs.iter().map(|b| b.discovery_level)),
            reinforcement: reinforcement_stats(beliefs),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::belief;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn describe_interpolates_quartiles() {
        let s = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((s.mean - 2.5).abs() < EPSILON);
        assert!((s.median - 2.5).abs() < EPSILON);
        assert!((s.std - 1.25f64.sqrt()).abs() < EPSILON);
        assert_eq!((s.min, s.max), (1.0, 4.0));
        assert!((s.q25 - 1.75).abs() < EPSILON);
        assert!((s.q75 - 3.25).abs() < EPSILON);

        assert_eq!(describe(&[]), None);
        assert_eq!(describe(&[0.4]).map(|s| s.std), Some(0.0));
    }

    #[test]
    fn correlation_needs_variance() {
        let beliefs: Vec<Belief> = (0..3)
            .map(|i| {
                let mut b = belief(i + 1, "markets clear", i as u8 + 1);
                b.conviction_score = 0.2 + 0.2 * i as f64;
                b.stability_score = 0.3 + 0.2 * i as f64;
                b
            })
            .collect();
        let c = correlations(&beliefs);
        assert!((c.conviction_vs_stability.unwrap() - 1.0).abs() < EPSILON);
        assert!((c.importance_vs_conviction.unwrap() - 1.0).abs() < EPSILON);
        // every statement has the same length and every level is 1
        assert_eq!(c.statement_length_vs_conviction, None);
        assert_eq!(c.discovery_level_vs_conviction, None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }

    #[test]
    fn outliers_are_ranked_and_capped() {
        let mut beliefs: Vec<Belief> = (1..=7)
            .map(|n| {
                let mut b = belief(n, "prices signal", 5);
                b.conviction_score = 0.95 + n as f64 * 0.005;
                b
            })
            .collect();
        let mut shaky = belief(8, "a recession is certainly coming next quarter", 9);
        shaky.conviction_score = 0.9;
        shaky.stability_score = 0.2;
        beliefs.push(shaky);

        let outliers = detect_outliers(&beliefs);
        assert_eq!(outliers.high_conviction.len(), MAX_EXAMPLES);
        assert_eq!(outliers.high_conviction[0].belief_id.as_str(), "b_0007");
        assert_eq!(outliers.low_stability.len(), 1);
        assert_eq!(outliers.low_stability[0].belief_id.as_str(), "b_0008");
        assert_eq!(outliers.large_certainty_gap.len(), 1);
        assert!((outliers.large_certainty_gap[0].value - 0.7).abs() < EPSILON);
        assert_eq!(outliers.long_statements.len(), 1);
        assert_eq!(outliers.long_statements[0].value, 44.0);
    }

    #[test]
    fn reinforcement_counts_multi_level_beliefs() {
        let beliefs: Vec<Belief> = [(1, 2), (3, 2), (2, 5), (1, 8)]
            .iter()
            .enumerate()
            .map(|(i, &(count, level))| {
                let mut b = belief(i + 1, "wages adjust", 5);
                b.reinforcement_count = count;
                b.discovery_level = level;
                b
            })
            .collect();
        let stats = statistics(&beliefs);
        let reinforcement = &stats.multi_level.reinforcement;
        assert!((reinforcement.avg_reinforcement - 1.75).abs() < EPSILON);
        assert_eq!(reinforcement.max_reinforcement, 3);
        assert_eq!(reinforcement.multi_level_beliefs, 2);

        let levels = &stats.multi_level.level_distribution;
        assert_eq!(levels.counts.get("2"), Some(&2));
        assert_eq!(levels.percentages.get("2"), Some(&50.0));
        assert_eq!(levels.percentages.get("8"), Some(&25.0));
    }

    #[test]
    fn distributions_and_content() {
        let mut a = belief(1, "a b c", 2);
        a.certainty = Some(Certainty::Hedged);
        a.sub_domain = Some("tax".to_string());
        let b = belief(2, "a b", 9);
        let stats = statistics(&[a, b]);

        let d = &stats.distributions;
        assert_eq!(d.importance_band.counts.get("core (1-3)"), Some(&1));
        assert_eq!(d.importance_band.counts.get("surface (8-10)"), Some(&1));
        assert_eq!(d.sub_domain.counts.get("general"), Some(&1));
        assert_eq!(d.certainty.counts.len(), 1);
        assert_eq!(d.certainty.percentages.get("hedged"), Some(&100.0));

        let c = &stats.content;
        assert!((c.vocabulary_richness - 0.6).abs() < EPSILON);
        assert!((c.avg_words_per_statement - 2.5).abs() < EPSILON);
        assert!((c.avg_statement_length - 4.0).abs() < EPSILON);
        assert!((stats.scores.statement_length.max - 5.0).abs() < EPSILON);
    }

    #[test]
    fn empty_table_has_default_stats() {
        assert_eq!(statistics(&[]), BeliefStats::default());
    }
}
