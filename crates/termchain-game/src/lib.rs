//! Game generation on top of the term graph cache.
//!
//! - `route`: randomized simple-path walk with dead-end avoidance and retries
//! - `distractor`: wrong-answer sampling at least two hops from the correct term
//! - `assembly`: question/choice payloads for a full game

pub mod assembly;
pub mod distractor;
pub mod route;

pub use assembly::*;
pub use distractor::*;
pub use route::*;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic generator for `Some(seed)`, OS-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
