//! In-memory term graph for the term-chain game.
//!
//! - `snapshot`: immutable, fully indexed view of terms and edges
//! - `cache`: process-scoped holder publishing snapshots via `ArcSwap`
//! - `repository`: in-memory and JSON seed-directory term repositories
//! - `quality`: structural health report over a snapshot

pub mod cache;
pub mod quality;
pub mod repository;
pub mod snapshot;

pub use cache::*;
pub use quality::*;
pub use repository::*;
pub use snapshot::*;

pub use rustc_hash::FxHashSet;
