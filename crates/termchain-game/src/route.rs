use rand::seq::IndexedRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;
use termchain_core::{
    DifficultyTier, Result, RouteConfig, TermChainError, TermId, TierFilter,
};
use termchain_graph::{GraphCache, GraphSnapshot};
use tracing::{debug, info, warn};

use crate::rng_from_seed;

/// A simple path through the term graph, used as the question sequence of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub term_ids: Vec<TermId>,
    pub target_length: usize,
    pub difficulty: DifficultyTier,
}

impl Route {
    pub fn len(&self) -> usize {
        self.term_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_ids.is_empty()
    }

    /// Whether the walk reached the requested length.
    pub fn is_complete(&self) -> bool {
        self.term_ids.len() >= self.target_length
    }

    pub fn start(&self) -> Option<TermId> {
        self.term_ids.first().copied()
    }

    pub fn as_slice(&self) -> &[TermId] {
        &self.term_ids
    }

    /// Consecutive `(from, to)` pairs, one per question.
    pub fn steps(&self) -> impl Iterator<Item = (TermId, TermId)> + '_ {
        self.term_ids.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Parameters of one route generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub target_length: usize,
    pub difficulty: DifficultyTier,
    pub seed: Option<u64>,
    /// Pin the first term. A pinned start is never replaced by the start-retry fallback.
    pub start: Option<TermId>,
    pub max_start_retries: Option<usize>,
    pub max_same_start_retries: Option<usize>,
}

impl RouteRequest {
    pub fn new(target_length: usize, difficulty: DifficultyTier) -> Self {
        Self {
            target_length,
            difficulty,
            seed: None,
            start: None,
            max_start_retries: None,
            max_same_start_retries: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_start(mut self, start: TermId) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_retries(mut self, max_start_retries: usize, max_same_start_retries: usize) -> Self {
        self.max_start_retries = Some(max_start_retries);
        self.max_same_start_retries = Some(max_same_start_retries);
        self
    }
}

/// Single-walk attempts allowed per requested route when a batch sets no explicit bound.
pub const DEFAULT_BATCH_ATTEMPTS_PER_ROUTE: usize = 500;

/// Parameters of a batch pre-generation run.
///
/// Each attempt is one walk from a uniformly chosen start; only walks reaching
/// `target_length` are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    pub count: usize,
    pub target_length: usize,
    pub difficulty: DifficultyTier,
    pub seed: Option<u64>,
    pub max_attempts: Option<usize>,
}

impl BatchRequest {
    pub fn new(count: usize, target_length: usize, difficulty: DifficultyTier) -> Self {
        Self {
            count,
            target_length,
            difficulty,
            seed: None,
            max_attempts: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn attempt_limit(&self) -> usize {
        self.max_attempts
            .unwrap_or_else(|| self.count.saturating_mul(DEFAULT_BATCH_ATTEMPTS_PER_ROUTE))
    }
}

/// Attempt accounting for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchStats {
    pub requested: usize,
    pub generated: usize,
    pub attempts: usize,
    pub success_rate: f64,
}

impl BatchStats {
    fn new(requested: usize, generated: usize, attempts: usize) -> Self {
        let success_rate = if attempts == 0 {
            0.0
        } else {
            generated as f64 / attempts as f64
        };
        Self {
            requested,
            generated,
            attempts,
            success_rate,
        }
    }

    /// Whether the attempt limit ran out before `requested` routes were found.
    pub fn is_exhausted(&self) -> bool {
        self.generated < self.requested
    }
}

/// Complete routes produced by [`RouteGenerator::generate_batch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteBatch {
    pub routes: Vec<Route>,
    pub stats: BatchStats,
}

/// Builds routes by randomized walks over the current cache snapshot.
pub struct RouteGenerator {
    cache: Arc<GraphCache>,
    config: RouteConfig,
}

impl RouteGenerator {
    pub fn new(cache: Arc<GraphCache>, config: RouteConfig) -> Self {
        Self { cache, config }
    }

    /// Generate a route against the currently published snapshot.
    ///
    /// Returns the longest route found across all attempts, which may be shorter
    /// than requested on sparse graphs.
    pub fn generate_route(&self, request: &RouteRequest) -> Result<Route> {
        let snapshot = self.cache.snapshot()?;
        let mut rng = rng_from_seed(request.seed);
        self.generate_in(&snapshot, request, &mut rng)
    }

    /// Generate a route on an explicit snapshot with a caller-supplied generator.
    /// `request.seed` is ignored here.
    pub fn generate_in<R: Rng + ?Sized>(
        &self,
        snapshot: &GraphSnapshot,
        request: &RouteRequest,
        rng: &mut R,
    ) -> Result<Route> {
        let target_length = request.target_length;
        if target_length == 0 {
            return Err(TermChainError::InvalidArgument(
                "route target length must be at least 1".to_string(),
            ));
        }

        let filter = request.difficulty.filter();
        let eligible = snapshot.terms_by_max_tier(filter.max_tier);
        if eligible.is_empty() {
            return Err(TermChainError::NoEligibleTerms {
                max_tier: filter.max_tier,
            });
        }

        let pinned = match request.start {
            Some(id) => match snapshot.term(id) {
                Some(term) if filter.allows_tier(term.tier) => Some(id),
                _ => return Err(TermChainError::InvalidStart(id)),
            },
            None => None,
        };

        let start_attempts = if pinned.is_some() {
            1
        } else {
            request
                .max_start_retries
                .unwrap_or(self.config.max_start_retries)
                .max(1)
        };
        let walks_per_start = request
            .max_same_start_retries
            .unwrap_or(self.config.max_same_start_retries)
            .max(1);

        let mut best: Vec<TermId> = Vec::new();
        let mut walks = 0usize;

        'starts: for attempt in 0..start_attempts {
            let start = match pinned {
                Some(id) => id,
                None => match eligible.choose(rng) {
                    Some(&id) => id,
                    None => break,
                },
            };

            if target_length == 1 {
                best = vec![start];
                break;
            }

            for _ in 0..walks_per_start {
                walks += 1;
                let walk = random_walk(snapshot, start, target_length, &filter, rng);
                if walk.len() > best.len() {
                    best = walk;
                }
                if best.len() >= target_length {
                    break 'starts;
                }
            }

            debug!(
                "Start attempt {} from term {} reached {} of {} terms",
                attempt + 1,
                start,
                best.len(),
                target_length
            );
        }

        if best.len() < target_length {
            info!(
                "Returning short {} route: {} of {} terms after {} walks",
                request.difficulty,
                best.len(),
                target_length,
                walks
            );
        }

        Ok(Route {
            term_ids: best,
            target_length,
            difficulty: request.difficulty,
        })
    }

    /// Pre-generate up to `request.count` complete routes on the current snapshot.
    pub fn generate_batch(&self, request: &BatchRequest) -> Result<RouteBatch> {
        let snapshot = self.cache.snapshot()?;
        let mut rng = rng_from_seed(request.seed);
        generate_batch_in(&snapshot, request, &mut rng)
    }
}

/// Batch generation on an explicit snapshot. Attempts stop once `request.count`
/// routes are found or the attempt limit is reached; short walks are discarded.
pub fn generate_batch_in<R: Rng + ?Sized>(
    snapshot: &GraphSnapshot,
    request: &BatchRequest,
    rng: &mut R,
) -> Result<RouteBatch> {
    let target_length = request.target_length;
    if target_length == 0 {
        return Err(TermChainError::InvalidArgument(
            "route target length must be at least 1".to_string(),
        ));
    }

    let filter = request.difficulty.filter();
    let eligible = snapshot.terms_by_max_tier(filter.max_tier);
    if eligible.is_empty() {
        return Err(TermChainError::NoEligibleTerms {
            max_tier: filter.max_tier,
        });
    }

    let limit = request.attempt_limit();
    let mut routes = Vec::with_capacity(request.count);
    let mut attempts = 0usize;

    while routes.len() < request.count && attempts < limit {
        attempts += 1;
        let Some(&start) = eligible.choose(rng) else {
            break;
        };
        let walk = random_walk(snapshot, start, target_length, &filter, rng);
        if walk.len() >= target_length {
            routes.push(Route {
                term_ids: walk,
                target_length,
                difficulty: request.difficulty,
            });
        }
    }

    let stats = BatchStats::new(request.count, routes.len(), attempts);
    if stats.is_exhausted() {
        warn!(
            "Batch stopped after {} attempts with {} of {} {} routes of length {}",
            attempts,
            routes.len(),
            request.count,
            request.difficulty,
            target_length
        );
    } else {
        info!(
            "Generated {} {} routes of length {} in {} attempts ({:.1}% success)",
            routes.len(),
            request.difficulty,
            target_length,
            attempts,
            stats.success_rate * 100.0
        );
    }

    Ok(RouteBatch { routes, stats })
}

/// One randomized walk from `start`, stopping at `target_length` terms or a dead end.
///
/// Among the unvisited filtered neighbors, candidates that leave at least one
/// onward step are preferred; if none do, any candidate may be taken.
pub fn random_walk<R: Rng + ?Sized>(
    snapshot: &GraphSnapshot,
    start: TermId,
    target_length: usize,
    filter: &TierFilter,
    rng: &mut R,
) -> Vec<TermId> {
    let mut route = Vec::with_capacity(target_length);
    let mut visited = FxHashSet::default();
    route.push(start);
    visited.insert(start);

    let mut current = start;
    while route.len() < target_length {
        let candidates: Vec<TermId> = unvisited_neighbors(snapshot, current, filter, &visited)
            .collect();
        if candidates.is_empty() {
            break;
        }

        let pool = if candidates.len() > 1 {
            let onward: Vec<TermId> = candidates
                .iter()
                .copied()
                .filter(|&candidate| has_onward_step(snapshot, candidate, filter, &visited))
                .collect();
            if onward.is_empty() {
                candidates
            } else {
                onward
            }
        } else {
            candidates
        };

        let Some(&next) = pool.choose(rng) else {
            break;
        };
        route.push(next);
        visited.insert(next);
        current = next;
    }

    route
}

fn unvisited_neighbors<'a>(
    snapshot: &'a GraphSnapshot,
    id: TermId,
    filter: &'a TierFilter,
    visited: &'a FxHashSet<TermId>,
) -> impl Iterator<Item = TermId> + 'a {
    snapshot
        .filtered_neighbors(id, filter.max_tier, &filter.allowed_difficulties)
        .filter(move |n| !visited.contains(n))
}

/// Whether `candidate` would still have an unvisited filtered neighbor once visited.
fn has_onward_step(
    snapshot: &GraphSnapshot,
    candidate: TermId,
    filter: &TierFilter,
    visited: &FxHashSet<TermId>,
) -> bool {
    unvisited_neighbors(snapshot, candidate, filter, visited).any(|n| n != candidate)
}
