//! Performance benchmarks for belief consolidation
//!
//! Measures the quadratic stages on a synthetic transcript-sized table:
//! - Pairwise TF-IDF similarity
//! - Duplicate grouping and merge consolidation
//! - Parent-hint linking
//! - The full pipeline including graph analysis
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tenet_core::{
    config::PipelineConfig,
    dedup::{ConsolidationPolicy, DuplicateClusterer},
    linker::HierarchyLinker,
    pipeline::BeliefPipeline,
    properties::{Belief, BeliefId, Tier},
    similarity::SimilarityEngine,
};

const SUBJECTS: [&str; 8] = [
    "markets",
    "taxes",
    "borders",
    "schools",
    "unions",
    "courts",
    "churches",
    "families",
];
const CLAIMS: [&str; 6] = [
    "protect individual liberty",
    "erode personal responsibility",
    "serve ordinary working people",
    "need far less regulation",
    "reflect the will of voters",
    "shape moral character",
];

// Every subject/claim pair surfaces at three discovery levels, so roughly a third of the table
// restates something else.
fn synthetic_beliefs() -> Vec<Belief> {
    let mut beliefs = Vec::new();
    for (s, subject) in SUBJECTS.iter().enumerate() {
        for (c, claim) in CLAIMS.iter().enumerate() {
            for level in [2u32, 5, 8] {
                let n = beliefs.len() + 1;
                let importance = ((s + c) % 10 + 1) as u8;
                let statement = if level == 5 {
                    format!("{subject} really {claim}")
                } else {
                    format!("{subject} {claim}")
                };
                beliefs.push(Belief {
                    belief_id: BeliefId::sequential(n),
                    speaker_id: "host".to_string(),
                    episode_id: "ep_bench".to_string(),
                    discovery_level: level,
                    statement_text: statement,
                    tier_name: Tier::for_importance(importance),
                    importance,
                    category: "politics".to_string(),
                    conviction_score: 0.5 + (n % 5) as f64 / 10.0,
                    stability_score: 0.6,
                    filter_confidence: 0.9,
                    parent_hint: (importance > 1)
                        .then(|| format!("{} {}", SUBJECTS[(s + 1) % 8], CLAIMS[c])),
                    ..Default::default()
                });
            }
        }
    }
    beliefs
}

fn bench_pairwise_similarity(c: &mut Criterion) {
    let beliefs = synthetic_beliefs();
    let texts: Vec<&str> = beliefs.iter().map(|b| b.statement_text.as_str()).collect();
    let engine = SimilarityEngine::new(1000, true).unwrap();

    c.bench_function("pairwise_similarity", |b| {
        b.iter(|| engine.pairwise(black_box(&texts)).unwrap().len());
    });
}

fn bench_merge_consolidation(c: &mut Criterion) {
    let beliefs = synthetic_beliefs();
    let clusterer =
        DuplicateClusterer::new(SimilarityEngine::new(1000, true).unwrap(), 0.85).unwrap();

    c.bench_function("merge_consolidation", |b| {
        b.iter(|| {
            clusterer
                .run(black_box(beliefs.clone()), ConsolidationPolicy::Merge)
                .beliefs
                .len()
        });
    });
}

fn bench_hierarchy_linking(c: &mut Criterion) {
    let beliefs = synthetic_beliefs();
    let linker = HierarchyLinker::new(SimilarityEngine::new(500, true).unwrap(), 0.6).unwrap();

    c.bench_function("hierarchy_linking", |b| {
        b.iter(|| linker.link(black_box(beliefs.clone())).report.matched);
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let beliefs = synthetic_beliefs();
    let pipeline = BeliefPipeline::new(PipelineConfig::default()).unwrap();

    c.bench_function("full_pipeline", |b| {
        b.iter(|| pipeline.run(black_box(beliefs.clone())).analysis.graph_stats.edges);
    });
}

// Benchmark group configuration
criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets =
        bench_pairwise_similarity,
        bench_merge_consolidation,
        bench_hierarchy_linking,
        bench_full_pipeline
}

criterion_main!(benches);
