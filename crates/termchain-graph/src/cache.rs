use arc_swap::ArcSwapOption;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use termchain_core::{
    Edge, EdgeDifficulty, Result, Term, TermChainError, TermId, TermRepository,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::GraphSnapshot;

/// Process-scoped term graph cache.
///
/// Holds the current [`GraphSnapshot`] behind an `ArcSwapOption`. Loads build a
/// complete snapshot off to the side and publish it with a single pointer swap,
/// so readers never observe a half-built index. A failed load keeps whatever
/// snapshot was published before.
pub struct GraphCache {
    repository: Arc<dyn TermRepository>,
    current: ArcSwapOption<GraphSnapshot>,
    versions: AtomicU64,
    load_lock: Mutex<()>,
}

impl GraphCache {
    pub fn new(repository: Arc<dyn TermRepository>) -> Self {
        Self {
            repository,
            current: ArcSwapOption::empty(),
            versions: AtomicU64::new(0),
            load_lock: Mutex::new(()),
        }
    }

    /// Construct and perform the initial load in one step.
    pub async fn initialize(repository: Arc<dyn TermRepository>) -> Result<Arc<Self>> {
        let cache = Arc::new(Self::new(repository));
        cache.load().await?;
        Ok(cache)
    }

    /// Read every term and edge from the repository and publish a new snapshot.
    ///
    /// Concurrent calls are serialized so snapshot versions increase in publish order.
    pub async fn load(&self) -> Result<Arc<GraphSnapshot>> {
        let _guard = self.load_lock.lock().await;
        let started = Instant::now();

        let (terms, edges) = match self.fetch().await {
            Ok(data) => data,
            Err(e) => {
                let current = self.current.load();
                match &*current {
                    Some(previous) => warn!(
                        "Graph cache load failed, keeping snapshot v{}: {}",
                        previous.version(),
                        e
                    ),
                    None => warn!("Initial graph cache load failed: {}", e),
                }
                return Err(e);
            }
        };

        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(GraphSnapshot::build(terms, edges, version));
        self.current.store(Some(Arc::clone(&snapshot)));

        info!(
            "Published graph snapshot v{} ({} terms, {} edges) in {:?}",
            version,
            snapshot.term_count(),
            snapshot.edge_count(),
            started.elapsed()
        );
        Ok(snapshot)
    }

    /// Alias of [`GraphCache::load`] for callers refreshing after a data mutation.
    pub async fn reload(&self) -> Result<Arc<GraphSnapshot>> {
        self.load().await
    }

    async fn fetch(&self) -> Result<(Vec<Term>, Vec<Edge>)> {
        let terms = self
            .repository
            .list_all_terms()
            .await
            .map_err(into_unavailable)?;
        let edges = self
            .repository
            .list_all_edges()
            .await
            .map_err(into_unavailable)?;
        Ok((terms, edges))
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Result<Arc<GraphSnapshot>> {
        self.current.load_full().ok_or(TermChainError::CacheNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Version of the published snapshot, or `None` before the first load.
    pub fn version(&self) -> Option<u64> {
        let current = self.current.load();
        (*current).as_ref().map(|s| s.version())
    }

    pub fn get_term(&self, id: TermId) -> Result<Option<Term>> {
        Ok(self.snapshot()?.term(id).cloned())
    }

    pub fn get_edge(&self, a: TermId, b: TermId) -> Result<Option<Edge>> {
        Ok(self.snapshot()?.edge(a, b).cloned())
    }

    pub fn get_edges_for_term(&self, id: TermId) -> Result<Vec<Edge>> {
        Ok(self.snapshot()?.edges_for_term(id).cloned().collect())
    }

    pub fn get_neighbors(&self, id: TermId) -> Result<FxHashSet<TermId>> {
        Ok(self
            .snapshot()?
            .neighbors(id)
            .cloned()
            .unwrap_or_default())
    }

    pub fn get_neighbors_filtered(
        &self,
        id: TermId,
        max_tier: u8,
        allowed_difficulties: &[EdgeDifficulty],
    ) -> Result<Vec<TermId>> {
        Ok(self
            .snapshot()?
            .neighbors_filtered(id, max_tier, allowed_difficulties))
    }

    pub fn get_terms_by_max_tier(&self, max_tier: u8) -> Result<Vec<TermId>> {
        Ok(self.snapshot()?.terms_by_max_tier(max_tier).to_vec())
    }
}

fn into_unavailable(err: TermChainError) -> TermChainError {
    match err {
        TermChainError::RepositoryUnavailable(_) => err,
        other => TermChainError::RepositoryUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTermRepository;
    use termchain_core::EdgeDifficulty::Easy;

    fn repository() -> Arc<InMemoryTermRepository> {
        Arc::new(InMemoryTermRepository::new(
            vec![
                Term::new(1, "a", 1, "x"),
                Term::new(2, "b", 1, "x"),
                Term::new(3, "c", 1, "x"),
            ],
            vec![Edge::new(1, 1, 2, Easy), Edge::new(2, 2, 3, Easy)],
        ))
    }

    #[test]
    fn lookups_before_load_fail_with_cache_not_ready() {
        let cache = GraphCache::new(repository());
        assert!(!cache.is_ready());
        assert!(cache.version().is_none());
        assert!(matches!(cache.get_term(1), Err(TermChainError::CacheNotReady)));
        assert!(matches!(
            cache.get_terms_by_max_tier(3),
            Err(TermChainError::CacheNotReady)
        ));
    }

    #[tokio::test]
    async fn load_publishes_snapshot() {
        let cache = GraphCache::new(repository());
        let snapshot = cache.load().await.unwrap();
        assert_eq!(snapshot.version(), 1);
        assert_eq!(cache.version(), Some(1));

        assert_eq!(cache.get_term(2).unwrap().unwrap().name, "b");
        assert!(cache.get_term(99).unwrap().is_none());
        assert_eq!(cache.get_edge(3, 2).unwrap().unwrap().id, 2);
        assert!(cache.get_edge(1, 3).unwrap().is_none());

        let neighbors = cache.get_neighbors(2).unwrap();
        assert_eq!(neighbors.len(), 2);
        assert!(cache.get_neighbors(99).unwrap().is_empty());
        assert_eq!(cache.get_neighbors_filtered(2, 1, &[Easy]).unwrap(), vec![1, 3]);
        assert_eq!(cache.get_terms_by_max_tier(1).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.get_edges_for_term(1).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_first_load_leaves_cache_empty() {
        let repo = repository();
        repo.set_unavailable(true);
        let cache = GraphCache::new(repo.clone());

        let err = cache.load().await.unwrap_err();
        assert!(matches!(err, TermChainError::RepositoryUnavailable(_)));
        assert!(!cache.is_ready());
        assert!(matches!(cache.get_neighbors(1), Err(TermChainError::CacheNotReady)));

        repo.set_unavailable(false);
        cache.load().await.unwrap();
        assert_eq!(cache.version(), Some(1));
    }
}
