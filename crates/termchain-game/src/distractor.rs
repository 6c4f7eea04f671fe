use rand::seq::IndexedRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use termchain_core::{DifficultyTier, Result, TermId};
use termchain_graph::{GraphCache, GraphSnapshot};
use tracing::debug;

use crate::rng_from_seed;

/// Samples wrong answers for a question.
///
/// A distractor is any term within the tier limit that is not the correct answer,
/// has not been visited, and is not a direct neighbor of the correct answer.
pub struct DistractorGenerator {
    cache: Arc<GraphCache>,
}

impl DistractorGenerator {
    pub fn new(cache: Arc<GraphCache>) -> Self {
        Self { cache }
    }

    pub fn generate_distractors(
        &self,
        correct_id: TermId,
        visited: &[TermId],
        difficulty: DifficultyTier,
        count: usize,
        seed: Option<u64>,
    ) -> Result<Vec<TermId>> {
        let snapshot = self.cache.snapshot()?;
        let visited: FxHashSet<TermId> = visited.iter().copied().collect();
        let mut rng = rng_from_seed(seed);
        Ok(select_distractors(
            &snapshot,
            correct_id,
            &visited,
            difficulty,
            count,
            &mut rng,
        ))
    }
}

/// Snapshot-level distractor selection. Unknown `correct_id` or an empty pool
/// yields an empty list.
pub fn select_distractors<R: Rng + ?Sized>(
    snapshot: &GraphSnapshot,
    correct_id: TermId,
    visited: &FxHashSet<TermId>,
    difficulty: DifficultyTier,
    count: usize,
    rng: &mut R,
) -> Vec<TermId> {
    if count == 0 || !snapshot.contains_term(correct_id) {
        return Vec::new();
    }

    let adjacent = snapshot.neighbors(correct_id);
    let pool: Vec<TermId> = snapshot
        .terms_by_max_tier(difficulty.max_tier())
        .iter()
        .copied()
        .filter(|&id| id != correct_id)
        .filter(|id| !visited.contains(id))
        .filter(|id| !adjacent.is_some_and(|set| set.contains(id)))
        .collect();

    if pool.len() <= count {
        debug!(
            "Distractor pool for term {} has {} candidates, wanted {}",
            correct_id,
            pool.len(),
            count
        );
        return pool;
    }

    pool.choose_multiple(rng, count).copied().collect()
}
