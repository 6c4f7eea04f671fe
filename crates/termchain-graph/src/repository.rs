use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use termchain_core::{Edge, Result, Term, TermChainError, TermRepository};
use tracing::debug;

/// Repository backed by vectors in memory.
///
/// Contents can be swapped out to simulate admin edits, and the repository can be
/// flagged unavailable to exercise the cache's failure path.
#[derive(Debug, Default)]
pub struct InMemoryTermRepository {
    terms: RwLock<Vec<Term>>,
    edges: RwLock<Vec<Edge>>,
    unavailable: AtomicBool,
}

impl InMemoryTermRepository {
    pub fn new(terms: Vec<Term>, edges: Vec<Edge>) -> Self {
        Self {
            terms: RwLock::new(terms),
            edges: RwLock::new(edges),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn replace(&self, terms: Vec<Term>, edges: Vec<Edge>) {
        *self.terms.write() = terms;
        *self.edges.write() = edges;
    }

    pub fn upsert_term(&self, term: Term) {
        let mut terms = self.terms.write();
        match terms.iter_mut().find(|t| t.id == term.id) {
            Some(existing) => *existing = term,
            None => terms.push(term),
        }
    }

    pub fn add_edge(&self, edge: Edge) {
        self.edges.write().push(edge);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(TermChainError::RepositoryUnavailable(
                "in-memory repository marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TermRepository for InMemoryTermRepository {
    async fn list_all_terms(&self) -> Result<Vec<Term>> {
        self.check_available()?;
        Ok(self.terms.read().clone())
    }

    async fn list_all_edges(&self) -> Result<Vec<Edge>> {
        self.check_available()?;
        Ok(self.edges.read().clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TermsFile {
    terms: Vec<Term>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgesFile {
    edges: Vec<Edge>,
}

/// Repository reading seed data from `terms.json` and `edges.json` in a directory.
///
/// The files hold `{"terms": [...]}` and `{"edges": [...]}` respectively. Edge
/// endpoints are canonicalized on read.
#[derive(Debug, Clone)]
pub struct JsonTermRepository {
    data_dir: PathBuf,
}

impl JsonTermRepository {
    pub const TERMS_FILE: &'static str = "terms.json";
    pub const EDGES_FILE: &'static str = "edges.json";

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write a seed directory in the format this repository reads.
    pub async fn write_seed(data_dir: &Path, terms: &[Term], edges: &[Edge]) -> Result<()> {
        tokio::fs::create_dir_all(data_dir).await?;

        let terms = serde_json::to_string_pretty(&TermsFile {
            terms: terms.to_vec(),
        })?;
        let edges = serde_json::to_string_pretty(&EdgesFile {
            edges: edges.to_vec(),
        })?;

        tokio::fs::write(data_dir.join(Self::TERMS_FILE), terms).await?;
        tokio::fs::write(data_dir.join(Self::EDGES_FILE), edges).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<String> {
        let path = self.data_dir.join(name);
        debug!("Reading seed file {}", path.display());
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            TermChainError::RepositoryUnavailable(format!("{}: {}", path.display(), e))
        })
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, name: &str, content: &str) -> Result<T> {
        serde_json::from_str(content).map_err(|e| {
            TermChainError::RepositoryUnavailable(format!(
                "{}: {}",
                self.data_dir.join(name).display(),
                e
            ))
        })
    }
}

#[async_trait]
impl TermRepository for JsonTermRepository {
    async fn list_all_terms(&self) -> Result<Vec<Term>> {
        let content = self.read_file(Self::TERMS_FILE).await?;
        let file: TermsFile = self.parse(Self::TERMS_FILE, &content)?;
        Ok(file.terms)
    }

    async fn list_all_edges(&self) -> Result<Vec<Edge>> {
        let content = self.read_file(Self::EDGES_FILE).await?;
        let file: EdgesFile = self.parse(Self::EDGES_FILE, &content)?;
        Ok(file.edges.into_iter().map(Edge::canonicalized).collect())
    }
}
