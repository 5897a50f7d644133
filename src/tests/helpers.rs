//! Shared fixtures for unit tests.

use crate::properties::{Belief, BeliefId, Tier};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A valid belief `b_{n:04}` with the tier conventionally paired with `importance`.
pub fn belief(n: usize, statement: &str, importance: u8) -> Belief {
    Belief {
        belief_id: BeliefId::sequential(n),
        speaker_id: "speaker_a".to_string(),
        episode_id: "ep_001".to_string(),
        statement_text: statement.to_string(),
        tier_name: Tier::for_importance(importance),
        importance,
        category: "politics".to_string(),
        conviction_score: 0.8,
        stability_score: 0.7,
        filter_confidence: 0.9,
        ..Default::default()
    }
}

/// `n` beliefs of importance 1..=n, each parented by the one before it.
pub fn chain(n: usize) -> Vec<Belief> {
    const STATEMENTS: [&str; 6] = [
        "human dignity is inviolable",
        "liberty protects dignity",
        "markets express liberty",
        "prices carry information",
        "rent control distorts prices",
        "my landlord overcharges",
    ];
    (0..n)
        .map(|i| {
            let statement = STATEMENTS
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("derived claim number {i}"));
            let mut b = belief(i + 1, &statement, (i + 1).min(10) as u8);
            if i > 0 {
                b.parent_belief_id = Some(BeliefId::sequential(i));
            }
            b
        })
        .collect()
}

/// Two parent trees joined at nothing: `b_0001 -> {b_0002, b_0003}` and `b_0004 -> b_0005`.
pub fn forest() -> Vec<Belief> {
    let mut beliefs = vec![
        belief(1, "human dignity is inviolable", 1),
        belief(2, "torture is never justified", 3),
        belief(3, "speech deserves protection", 4),
        belief(4, "hard work pays off", 2),
        belief(5, "overtime should be paid", 6),
    ];
    beliefs[1].parent_belief_id = Some(BeliefId::sequential(1));
    beliefs[2].parent_belief_id = Some(BeliefId::sequential(1));
    beliefs[4].parent_belief_id = Some(BeliefId::sequential(4));
    beliefs[2].conviction_score = 0.5;
    beliefs
}
