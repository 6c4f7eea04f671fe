use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use termchain_core::{
    DifficultyTier, DistractorConfig, Result, RouteConfig, Term, TermChainConfig, TermChainError,
    TermId,
};
use termchain_graph::{GraphCache, GraphSnapshot};
use tracing::{info, warn};

use crate::{
    generate_batch_in, rng_from_seed, select_distractors, BatchRequest, BatchStats, Route,
    RouteBatch, RouteGenerator, RouteRequest,
};

/// What a client sends to start a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRequest {
    #[serde(default)]
    pub difficulty: DifficultyTier,
    #[serde(default)]
    pub target_length: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub term_id: TermId,
    pub name: String,
    pub tier: u8,
    pub category: String,
    pub correct: bool,
}

impl Choice {
    fn from_term(term: &Term, correct: bool) -> Self {
        Self {
            term_id: term.id,
            name: term.name.clone(),
            tier: term.tier,
            category: term.category.clone(),
            correct,
        }
    }
}

/// A term on the route together with the question leading away from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStep {
    pub index: usize,
    pub term_id: TermId,
    pub name: String,
    pub tier: u8,
    pub category: String,
    pub description: String,
    /// Keyword of the edge to the next term, empty on the terminal step.
    pub keyword: String,
    pub edge_description: String,
    /// Shuffled choices for the next term, empty on the terminal step.
    pub choices: Vec<Choice>,
}

impl RouteStep {
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|c| c.correct)
    }
}

/// A complete, ready-to-play game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePlan {
    pub difficulty: DifficultyTier,
    pub target_length: usize,
    pub snapshot_version: u64,
    pub route: Vec<TermId>,
    pub steps: Vec<RouteStep>,
}

impl GamePlan {
    pub fn is_complete(&self) -> bool {
        self.route.len() >= self.target_length
    }

    pub fn question_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_terminal()).count()
    }
}

/// Complete games produced by [`GameAssembler::generate_batch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameBatch {
    pub snapshot_version: u64,
    pub plans: Vec<GamePlan>,
    pub stats: BatchStats,
}

/// Turns a route plus per-step distractors into a [`GamePlan`].
pub struct GameAssembler {
    cache: Arc<GraphCache>,
    routes: RouteGenerator,
    route_config: RouteConfig,
    distractor_config: DistractorConfig,
}

impl GameAssembler {
    pub fn new(
        cache: Arc<GraphCache>,
        route_config: RouteConfig,
        distractor_config: DistractorConfig,
    ) -> Self {
        Self {
            routes: RouteGenerator::new(Arc::clone(&cache), route_config),
            cache,
            route_config,
            distractor_config,
        }
    }

    pub fn from_config(cache: Arc<GraphCache>, config: &TermChainConfig) -> Self {
        Self::new(cache, config.route, config.distractor)
    }

    fn check_length(&self, target_length: usize) -> Result<()> {
        if target_length < self.route_config.min_length
            || target_length > self.route_config.max_length
        {
            return Err(TermChainError::InvalidArgument(format!(
                "route length {} outside {}..={}",
                target_length, self.route_config.min_length, self.route_config.max_length
            )));
        }
        Ok(())
    }

    /// Validate the request and build a game on the current snapshot.
    pub fn start_game(&self, request: &GameRequest) -> Result<GamePlan> {
        let target_length = request
            .target_length
            .unwrap_or(self.route_config.default_length);
        self.check_length(target_length)?;

        let snapshot = self.cache.snapshot()?;
        let mut rng = rng_from_seed(request.seed);
        let route_request = RouteRequest::new(target_length, request.difficulty);
        let route = self.routes.generate_in(&snapshot, &route_request, &mut rng)?;

        let plan = self.assemble(&snapshot, &route, &mut rng);
        info!(
            "Assembled {} game: {} of {} terms, {} questions",
            plan.difficulty,
            plan.route.len(),
            plan.target_length,
            plan.question_count()
        );
        Ok(plan)
    }

    /// Pre-generate complete games. Routes that fall short of the target are
    /// discarded, so every returned plan is complete.
    pub fn generate_batch(&self, request: &BatchRequest) -> Result<GameBatch> {
        self.check_length(request.target_length)?;

        let snapshot = self.cache.snapshot()?;
        let mut rng = rng_from_seed(request.seed);
        let RouteBatch { routes, stats } = generate_batch_in(&snapshot, request, &mut rng)?;

        let plans = routes
            .iter()
            .map(|route| self.assemble(&snapshot, route, &mut rng))
            .collect();
        Ok(GameBatch {
            snapshot_version: snapshot.version(),
            plans,
            stats,
        })
    }

    /// Build the step payloads for an existing route.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        snapshot: &GraphSnapshot,
        route: &Route,
        rng: &mut R,
    ) -> GamePlan {
        let ids = route.as_slice();
        let mut steps = Vec::with_capacity(ids.len());
        let mut visited = FxHashSet::default();

        for (index, &term_id) in ids.iter().enumerate() {
            visited.insert(term_id);

            let Some(term) = snapshot.term(term_id) else {
                warn!("Route term {} missing from snapshot, skipping", term_id);
                continue;
            };

            let mut step = RouteStep {
                index,
                term_id,
                name: term.name.clone(),
                tier: term.tier,
                category: term.category.clone(),
                description: term.description.clone(),
                keyword: String::new(),
                edge_description: String::new(),
                choices: Vec::new(),
            };

            if let Some(&next) = ids.get(index + 1) {
                match snapshot.edge(term_id, next) {
                    Some(edge) => {
                        step.keyword = edge.keyword.clone();
                        step.edge_description = edge.description.clone();
                    }
                    None => warn!("No edge between route terms {} and {}", term_id, next),
                }

                let distractors = select_distractors(
                    snapshot,
                    next,
                    &visited,
                    route.difficulty,
                    self.distractor_config.count,
                    rng,
                );
                step.choices = std::iter::once((next, true))
                    .chain(distractors.into_iter().map(|id| (id, false)))
                    .filter_map(|(id, correct)| {
                        snapshot.term(id).map(|t| Choice::from_term(t, correct))
                    })
                    .collect();
                step.choices.shuffle(rng);
            }

            steps.push(step);
        }

        GamePlan {
            difficulty: route.difficulty,
            target_length: route.target_length,
            snapshot_version: snapshot.version(),
            route: ids.to_vec(),
            steps,
        }
    }
}
