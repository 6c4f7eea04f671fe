use crate::{Edge, Result, Term};
use async_trait::async_trait;

/// Backing store the graph cache is populated from.
///
/// Both methods are called once per cache load. Implementations should report
/// read failures as [`crate::TermChainError::RepositoryUnavailable`].
#[async_trait]
pub trait TermRepository: Send + Sync {
    async fn list_all_terms(&self) -> Result<Vec<Term>>;
    async fn list_all_edges(&self) -> Result<Vec<Edge>>;
}
