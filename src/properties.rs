//! [crate::properties] contains the belief record that flows through every pipeline stage, along
//! with its identifiers, the ordered tier vocabulary, and per-record validation.
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::{Result, TenetError};

/// Highest (least foundational) importance rank a classifier may assign.
pub const MAX_IMPORTANCE: u8 = 10;

/// Lowest (most foundational) importance rank.
pub const MIN_IMPORTANCE: u8 = 1;

/// Belief identifier. Stable for the lifetime of a record once assigned by the upstream
/// extraction stage (conventionally `b_0001`, `b_0002`, ...).
#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct BeliefId(String);

impl BeliefId {
    /// The conventional sequential id used by the extraction stage, 1-based.
    pub fn sequential(n: usize) -> Self {
        BeliefId(format!("b_{n:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for BeliefId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BeliefId {
    fn from(id: &str) -> Self {
        BeliefId(id.to_string())
    }
}

impl From<String> for BeliefId {
    fn from(id: String) -> Self {
        BeliefId(id)
    }
}

impl AsRef<str> for BeliefId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Duplicate group identifier assigned by the duplicate clusterer (`dup_0001`, ...).
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Group ids are numbered by discovery order of the group, starting at 1.
    pub fn from_index(group_index: usize) -> Self {
        GroupId(format!("dup_{:04}", group_index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        GroupId(id.to_string())
    }
}

/// The ordered tier vocabulary, from most foundational to most situational.
///
/// Tiers travel as their display labels (`"Core Axioms"`, ...). Any label outside the vocabulary
/// deserializes to [`Tier::Unknown`], which sorts after every known tier.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    CoreAxioms,
    WorldviewPillars,
    IdentityDefiningValues,
    MetaPrinciples,
    CrossDomainRules,
    StableDomainBeliefs,
    RepeatedStrategies,
    ConcreteClaims,
    SituationalOpinions,
    LooseTakes,
    #[default]
    Unknown,
}

impl Tier {
    pub const ALL: [Tier; 10] = [
        Tier::CoreAxioms,
        Tier::WorldviewPillars,
        Tier::IdentityDefiningValues,
        Tier::MetaPrinciples,
        Tier::CrossDomainRules,
        Tier::StableDomainBeliefs,
        Tier::RepeatedStrategies,
        Tier::ConcreteClaims,
        Tier::SituationalOpinions,
        Tier::LooseTakes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::CoreAxioms => "Core Axioms",
            Tier::WorldviewPillars => "Worldview Pillars",
            Tier::IdentityDefiningValues => "Identity-Defining Values",
            Tier::MetaPrinciples => "Meta-Principles",
            Tier::CrossDomainRules => "Cross-Domain Rules & Heuristics",
            Tier::StableDomainBeliefs => "Stable Domain Beliefs",
            Tier::RepeatedStrategies => "Repeated Strategies & Playbooks",
            Tier::ConcreteClaims => "Concrete Claims & Predictions",
            Tier::SituationalOpinions => "Situational Opinions",
            Tier::LooseTakes => "Loose Takes / Jokes / Vibes",
            Tier::Unknown => "Unknown",
        }
    }

    /// Case-insensitive label lookup; anything outside the vocabulary is [`Tier::Unknown`].
    pub fn from_label(label: &str) -> Tier {
        let trimmed = label.trim();
        Tier::ALL
            .iter()
            .copied()
            .find(|t| t.label().eq_ignore_ascii_case(trimmed))
            .unwrap_or(Tier::Unknown)
    }

    /// The tier conventionally paired with an importance rank (1 → Core Axioms, 10 → Loose Takes).
    pub fn for_importance(importance: u8) -> Tier {
        match importance {
            MIN_IMPORTANCE..=MAX_IMPORTANCE => Tier::ALL[(importance - 1) as usize],
            _ => Tier::Unknown,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Tier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Tier::from_label(s))
    }
}

impl From<String> for Tier {
    fn from(s: String) -> Self {
        Tier::from_label(&s)
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        tier.label().to_string()
    }
}

/// Whether a statement was voiced as a hedge ("I think maybe...") or as a flat assertion.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Certainty {
    Hedged,
    Binary,
}

fn default_discovery_level() -> u32 {
    1
}

fn default_reinforcement_count() -> u32 {
    1
}

/// A classified statement with its provenance, classification attributes, and the hierarchy and
/// consolidation fields filled in by the pipeline.
///
/// Hierarchy fields (`parent_belief_id`) are written only by [`crate::linker::HierarchyLinker`];
/// consolidation fields (`duplicate_group_id`, `reinforcement_count`, `reinforcement_levels`) only
/// by [`crate::dedup::DuplicateClusterer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub belief_id: BeliefId,

    #[serde(default)]
    pub speaker_id: String,
    #[serde(default)]
    pub episode_id: String,
    #[serde(default)]
    pub timestamp: String,
    /// Chunk granularity at which this belief surfaced; lower is finer-grained.
    #[serde(default = "default_discovery_level")]
    pub discovery_level: u32,
    #[serde(default)]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<u32>,

    pub statement_text: String,
    #[serde(default)]
    pub atomic_belief: Option<String>,
    #[serde(default)]
    pub certainty: Option<Certainty>,

    #[serde(default)]
    pub tier_name: Tier,
    /// 1 (most foundational) ..= 10 (most situational).
    pub importance: u8,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_domain: Option<String>,
    pub conviction_score: f64,
    pub stability_score: f64,
    #[serde(default)]
    pub defines_outgroup: bool,
    #[serde(default)]
    pub filter_confidence: f64,

    #[serde(default)]
    pub parent_hint: Option<String>,
    #[serde(default)]
    pub parent_belief_id: Option<BeliefId>,

    #[serde(default)]
    pub duplicate_group_id: Option<GroupId>,
    #[serde(default = "default_reinforcement_count")]
    pub reinforcement_count: u32,
    #[serde(default)]
    pub reinforcement_levels: Vec<u32>,
}

impl Default for Belief {
    fn default() -> Self {
        Belief {
            belief_id: BeliefId::default(),
            speaker_id: String::default(),
            episode_id: String::default(),
            timestamp: String::default(),
            discovery_level: default_discovery_level(),
            chunk_id: None,
            chunk_size: None,
            statement_text: String::default(),
            atomic_belief: None,
            certainty: None,
            tier_name: Tier::Unknown,
            importance: MAX_IMPORTANCE,
            category: String::default(),
            sub_domain: None,
            conviction_score: 0.0,
            stability_score: 0.0,
            defines_outgroup: false,
            filter_confidence: 0.0,
            parent_hint: None,
            parent_belief_id: None,
            duplicate_group_id: None,
            reinforcement_count: default_reinforcement_count(),
            reinforcement_levels: Vec::new(),
        }
    }
}

impl Belief {
    /// The parent hint, trimmed, if it carries any text.
    pub fn parent_hint(&self) -> Option<&str> {
        self.parent_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }

    pub fn has_parent(&self) -> bool {
        self.parent_belief_id.is_some()
    }

    /// Inverted importance: 10 for the most foundational rank, 1 for the least.
    pub fn foundational_rank(&self) -> f64 {
        (MAX_IMPORTANCE as f64 + 1.0) - self.importance as f64
    }

    pub fn belief_strength(&self) -> f64 {
        self.conviction_score * self.stability_score
    }

    pub fn foundational_weight(&self) -> f64 {
        self.foundational_rank() * self.conviction_score
    }

    pub fn rigidity_score(&self) -> f64 {
        self.conviction_score * self.stability_score * self.foundational_rank()
    }

    pub fn certainty_gap(&self) -> f64 {
        self.conviction_score - self.stability_score
    }

    /// The discovery level at which a belief of this importance is expected to be confirmed.
    ///
    /// Foundational beliefs are assumed to surface at coarse chunk levels and situational ones at
    /// fine levels, so the mapping is `11 - importance`. This is a tunable domain assumption.
    pub fn ideal_discovery_level(&self) -> f64 {
        self.foundational_rank()
    }

    /// `conviction / (1 + |discovery_level - ideal_level|)`, the keep-best selection score.
    pub fn level_fit_score(&self) -> f64 {
        let penalty = 1.0 / (1.0 + (self.discovery_level as f64 - self.ideal_discovery_level()).abs());
        self.conviction_score * penalty
    }

    /// Check the record against the schema contract. Scores must be finite probabilities and the
    /// importance rank must lie in `1..=10`.
    pub fn validate(&self) -> Result<()> {
        let id = self.belief_id.as_str();
        if self.belief_id.is_empty() {
            return Err(TenetError::invalid_belief(id, "belief_id is empty"));
        }
        if self.statement_text.trim().is_empty() {
            return Err(TenetError::invalid_belief(id, "statement_text is empty"));
        }
        if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&self.importance) {
            return Err(TenetError::invalid_belief(
                id,
                format!(
                    "importance {} outside {MIN_IMPORTANCE}..={MAX_IMPORTANCE}",
                    self.importance
                ),
            ));
        }
        for (name, value) in [
            ("conviction_score", self.conviction_score),
            ("stability_score", self.stability_score),
            ("filter_confidence", self.filter_confidence),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TenetError::invalid_belief(
                    id,
                    format!("{name} {value} outside [0, 1]"),
                ));
            }
        }
        if self.reinforcement_count == 0 {
            return Err(TenetError::invalid_belief(id, "reinforcement_count is 0"));
        }
        if self.parent_belief_id.as_ref() == Some(&self.belief_id) {
            return Err(TenetError::invalid_belief(id, "belief is its own parent"));
        }
        Ok(())
    }
}

/// A record dropped from a batch, with its position in the input and the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub index: usize,
    pub belief_id: Option<BeliefId>,
    pub reason: String,
}

/// Partition a batch into valid records and rejections. Invalid records never abort the batch; a
/// repeated `belief_id` keeps the first occurrence.
pub fn validate_beliefs(beliefs: Vec<Belief>) -> (Vec<Belief>, Vec<Rejection>) {
    let mut seen = BTreeSet::new();
    let mut accepted = Vec::with_capacity(beliefs.len());
    let mut rejected = Vec::new();
    for (index, belief) in beliefs.into_iter().enumerate() {
        let outcome = belief.validate().and_then(|_| {
            if seen.contains(&belief.belief_id) {
                Err(TenetError::invalid_belief(
                    belief.belief_id.as_str(),
                    "duplicate belief_id",
                ))
            } else {
                Ok(())
            }
        });
        match outcome {
            Ok(()) => {
                seen.insert(belief.belief_id.clone());
                accepted.push(belief);
            }
            Err(e) => {
                tracing::warn!("Rejecting belief at index {index}: {e}");
                rejected.push(Rejection {
                    index,
                    belief_id: Some(belief.belief_id),
                    reason: e.to_string(),
                });
            }
        }
    }
    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Belief {
        Belief {
            belief_id: BeliefId::sequential(1),
            statement_text: "freedom is the highest value".to_string(),
            importance: 2,
            tier_name: Tier::WorldviewPillars,
            conviction_score: 0.9,
            stability_score: 0.8,
            filter_confidence: 0.7,
            ..Default::default()
        }
    }

    #[test]
    fn tier_labels_round_trip_through_serde() {
        for tier in Tier::ALL {
            let json = serde_json::to_string(&tier).unwrap();
            let back: Tier = serde_json::from_str(&json).unwrap();
            assert_eq!(back, tier);
        }
        let unknown: Tier = serde_json::from_str("\"Hot Takes\"").unwrap();
        assert_eq!(unknown, Tier::Unknown);
        assert!(Tier::CoreAxioms < Tier::LooseTakes);
        assert!(Tier::LooseTakes < Tier::Unknown);
    }

    #[test]
    fn tier_for_importance_follows_vocabulary_order() {
        assert_eq!(Tier::for_importance(1), Tier::CoreAxioms);
        assert_eq!(Tier::for_importance(10), Tier::LooseTakes);
        assert_eq!(Tier::for_importance(0), Tier::Unknown);
        assert_eq!(Tier::for_importance(11), Tier::Unknown);
    }

    #[test]
    fn derived_scores_are_pure_functions() {
        let b = sample();
        assert!((b.belief_strength() - 0.72).abs() < 1e-12);
        assert!((b.foundational_weight() - 9.0 * 0.9).abs() < 1e-12);
        assert!((b.rigidity_score() - 0.72 * 9.0).abs() < 1e-12);
        assert!((b.certainty_gap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn level_fit_prefers_coarse_levels_for_foundational_beliefs() {
        let mut b = sample();
        // importance 2 => ideal level 9
        b.discovery_level = 9;
        assert!((b.level_fit_score() - 0.9).abs() < 1e-12);
        b.discovery_level = 1;
        assert!((b.level_fit_score() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        assert!(sample().validate().is_ok());

        let mut b = sample();
        b.conviction_score = 1.5;
        assert!(matches!(b.validate(), Err(TenetError::InvalidBelief { .. })));

        let mut b = sample();
        b.stability_score = f64::NAN;
        assert!(b.validate().is_err());

        let mut b = sample();
        b.importance = 0;
        assert!(b.validate().is_err());

        let mut b = sample();
        b.statement_text = "   ".to_string();
        assert!(b.validate().is_err());

        let mut b = sample();
        b.parent_belief_id = Some(b.belief_id.clone());
        assert!(b.validate().is_err());
    }

    #[test]
    fn validate_beliefs_rejects_single_records() {
        let good = sample();
        let mut bad = sample();
        bad.belief_id = BeliefId::sequential(2);
        bad.importance = 42;
        let dup = sample();
        let mut other = sample();
        other.belief_id = BeliefId::sequential(3);

        let (accepted, rejected) = validate_beliefs(vec![good, bad, dup, other]);
        assert_eq!(accepted.len(), 2);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].index, 1);
        assert_eq!(rejected[1].index, 2);
        assert!(rejected[1].reason.contains("duplicate"));
    }

    #[test]
    fn belief_deserializes_with_blank_pipeline_fields() {
        let json = r#"{
            "belief_id": "b_0007",
            "statement_text": "taxes are theft",
            "importance": 4,
            "tier_name": "Meta-Principles",
            "conviction_score": 0.8,
            "stability_score": 0.6,
            "certainty": "hedged"
        }"#;
        let b: Belief = serde_json::from_str(json).unwrap();
        assert_eq!(b.belief_id.as_str(), "b_0007");
        assert_eq!(b.tier_name, Tier::MetaPrinciples);
        assert_eq!(b.certainty, Some(Certainty::Hedged));
        assert_eq!(b.discovery_level, 1);
        assert_eq!(b.reinforcement_count, 1);
        assert!(b.parent_belief_id.is_none());
        assert!(b.duplicate_group_id.is_none());
    }
}
