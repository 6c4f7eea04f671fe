use thiserror::Error;

use crate::TermId;

#[derive(Error, Debug)]
pub enum TermChainError {
    #[error("Term repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Graph cache not ready: no snapshot has been loaded")]
    CacheNotReady,

    #[error("No eligible terms with tier <= {max_tier}")]
    NoEligibleTerms { max_tier: u8 },

    #[error("Invalid start term: {0}")]
    InvalidStart(TermId),

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TermChainError {
    /// Whether the failure stems from caller input rather than the server side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TermChainError::NoEligibleTerms { .. }
                | TermChainError::InvalidStart(_)
                | TermChainError::InvalidDifficulty(_)
                | TermChainError::InvalidArgument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TermChainError>;
