//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use tenet_core::properties::{Belief, BeliefId, Tier};

/// Initialize tracing for tests, respecting RUST_LOG env var.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A valid belief `b_{n:04}` with the tier conventionally paired with `importance`.
#[allow(dead_code)]
pub fn belief(n: usize, statement: &str, importance: u8) -> Belief {
    Belief {
        belief_id: BeliefId::sequential(n),
        speaker_id: "host".to_string(),
        episode_id: "ep_042".to_string(),
        timestamp: "00:12:31".to_string(),
        statement_text: statement.to_string(),
        tier_name: Tier::for_importance(importance),
        importance,
        category: "economics".to_string(),
        conviction_score: 0.75,
        stability_score: 0.6,
        filter_confidence: 0.8,
        ..Default::default()
    }
}

/// A mixed corpus of restatements, hints and unrelated beliefs at several discovery levels.
#[allow(dead_code)]
pub fn corpus() -> Vec<Belief> {
    let rows: [(&str, u8, u32, Option<&str>); 10] = [
        ("individual liberty is the highest value", 1, 9, None),
        ("individual liberty is the highest value of all", 1, 5, None),
        (
            "markets allocate capital better than governments",
            3,
            7,
            Some("individual liberty is the highest value"),
        ),
        ("markets allocate capital better than governments do", 3, 3, None),
        (
            "minimum wage laws destroy jobs",
            6,
            2,
            Some("markets allocate capital better than governments"),
        ),
        (
            "rent control destroys housing supply",
            6,
            2,
            Some("markets allocate capital better than governments"),
        ),
        (
            "my city council is hopeless",
            9,
            1,
            Some("rent control destroys housing supply"),
        ),
        ("coffee tastes better in the morning", 10, 1, None),
        (
            "taxes are theft",
            4,
            4,
            Some("individual liberty is the highest value"),
        ),
        ("taxation is theft", 4, 6, None),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (statement, importance, level, hint))| {
            let mut b = belief(i + 1, statement, *importance);
            b.discovery_level = *level;
            b.parent_hint = hint.map(str::to_string);
            b
        })
        .collect()
}
