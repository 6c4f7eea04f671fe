use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use termchain_core::EdgeDifficulty::{Easy, Hard};
use termchain_core::{
    DifficultyTier, DistractorConfig, Edge, RouteConfig, Term, TermChainError,
};
use termchain_game::{generate_batch_in, BatchRequest, GameAssembler, RouteGenerator};
use termchain_graph::{GraphCache, GraphSnapshot, InMemoryTermRepository};

/// Ten tier-1 terms in an easy ring, plus a hard-only tier-3 tail off term 1.
fn ring_with_tail() -> (Vec<Term>, Vec<Edge>) {
    let mut terms: Vec<Term> = (1..=10)
        .map(|id| Term::new(id, format!("ring-{id}"), 1, "ring"))
        .collect();
    terms.push(Term::new(20, "tail-a", 3, "tail"));
    terms.push(Term::new(21, "tail-b", 3, "tail"));

    let mut edges: Vec<Edge> = (1..=10)
        .map(|id| Edge::new(id, id, id % 10 + 1, Easy).with_keyword(format!("k{id}")))
        .collect();
    edges.push(Edge::new(30, 1, 20, Hard));
    edges.push(Edge::new(31, 20, 21, Hard));
    (terms, edges)
}

/// A three-term path: no walk can reach more than three terms.
fn short_path() -> (Vec<Term>, Vec<Edge>) {
    let terms = (1..=3).map(|id| Term::new(id, format!("p{id}"), 1, "path")).collect();
    let edges = vec![Edge::new(1, 1, 2, Easy), Edge::new(2, 2, 3, Easy)];
    (terms, edges)
}

async fn cache(graph: (Vec<Term>, Vec<Edge>)) -> Arc<GraphCache> {
    let (terms, edges) = graph;
    let repo = Arc::new(InMemoryTermRepository::new(terms, edges));
    GraphCache::initialize(repo).await.unwrap()
}

fn bounds() -> RouteConfig {
    RouteConfig {
        default_length: 5,
        min_length: 2,
        max_length: 10,
        ..RouteConfig::default()
    }
}

#[tokio::test]
async fn batch_keeps_only_complete_routes() {
    let generator = RouteGenerator::new(cache(ring_with_tail()).await, bounds());
    let batch = generator
        .generate_batch(&BatchRequest::new(6, 8, DifficultyTier::Easy).with_seed(9))
        .unwrap();

    assert_eq!(batch.routes.len(), 6);
    assert_eq!(batch.stats.requested, 6);
    assert_eq!(batch.stats.generated, 6);
    assert!(batch.stats.attempts >= 6);
    assert!(!batch.stats.is_exhausted());
    assert!(batch.stats.success_rate > 0.0 && batch.stats.success_rate <= 1.0);

    for route in &batch.routes {
        assert!(route.is_complete());
        assert_eq!(route.len(), 8);
        assert!(route.as_slice().iter().all(|id| (1..=10).contains(id)));
    }
}

#[tokio::test]
async fn sparse_graph_exhausts_attempt_limit() {
    let generator = RouteGenerator::new(cache(short_path()).await, bounds());
    let batch = generator
        .generate_batch(
            &BatchRequest::new(4, 5, DifficultyTier::Easy)
                .with_seed(1)
                .with_max_attempts(25),
        )
        .unwrap();

    assert!(batch.routes.is_empty());
    assert_eq!(batch.stats.attempts, 25);
    assert_eq!(batch.stats.generated, 0);
    assert_eq!(batch.stats.success_rate, 0.0);
    assert!(batch.stats.is_exhausted());
}

#[tokio::test]
async fn zero_count_makes_no_attempts() {
    let generator = RouteGenerator::new(cache(ring_with_tail()).await, bounds());
    let batch = generator
        .generate_batch(&BatchRequest::new(0, 5, DifficultyTier::Hard))
        .unwrap();
    assert!(batch.routes.is_empty());
    assert_eq!(batch.stats.attempts, 0);
    assert_eq!(batch.stats.success_rate, 0.0);
}

#[test]
fn batch_errors_match_single_route_errors() {
    let (terms, edges) = ring_with_tail();
    let snapshot = GraphSnapshot::build(terms, edges, 1);
    let mut rng = StdRng::seed_from_u64(0);

    let err = generate_batch_in(
        &snapshot,
        &BatchRequest::new(3, 0, DifficultyTier::Easy),
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, TermChainError::InvalidArgument(_)));

    let empty = GraphSnapshot::build(Vec::new(), Vec::new(), 1);
    let err = generate_batch_in(&empty, &BatchRequest::new(3, 4, DifficultyTier::Easy), &mut rng)
        .unwrap_err();
    assert!(matches!(err, TermChainError::NoEligibleTerms { max_tier: 1 }));
}

#[tokio::test]
async fn seeded_game_batches_are_identical() {
    let assembler = GameAssembler::new(
        cache(ring_with_tail()).await,
        bounds(),
        DistractorConfig { count: 2 },
    );
    let request = BatchRequest::new(3, 6, DifficultyTier::Hard).with_seed(77);

    let first = assembler.generate_batch(&request).unwrap();
    let second = assembler.generate_batch(&request).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.snapshot_version, 1);
    assert_eq!(first.plans.len(), 3);

    for plan in &first.plans {
        assert!(plan.is_complete());
        assert_eq!(plan.question_count(), 5);
        for step in plan.steps.iter().filter(|s| !s.is_terminal()) {
            assert_eq!(step.choices.iter().filter(|c| c.correct).count(), 1);
        }
    }

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["stats"]["generated"], 3);
    assert_eq!(json["plans"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn game_batch_checks_length_bounds() {
    let assembler = GameAssembler::new(
        cache(ring_with_tail()).await,
        bounds(),
        DistractorConfig { count: 2 },
    );
    let err = assembler
        .generate_batch(&BatchRequest::new(2, 11, DifficultyTier::Easy))
        .unwrap_err();
    assert!(matches!(err, TermChainError::InvalidArgument(_)));
    assert!(err.is_client_error());
}
