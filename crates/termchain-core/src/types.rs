use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TermChainError;

pub type TermId = i64;
pub type EdgeId = i64;

/// Highest tier a term may carry. Tiers run from 1 (easiest) to this value.
pub const MAX_TIER: u8 = 3;

/// A vocabulary item in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub name: String,
    pub tier: u8,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl Term {
    pub fn new(id: TermId, name: impl Into<String>, tier: u8, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tier,
            category: category.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Difficulty tag carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EdgeDifficulty {
    Easy,
    Normal,
    Hard,
}

impl fmt::Display for EdgeDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeDifficulty::Easy => "easy",
            EdgeDifficulty::Normal => "normal",
            EdgeDifficulty::Hard => "hard",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EdgeDifficulty {
    type Err = TermChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(EdgeDifficulty::Easy),
            "normal" | "standard" => Ok(EdgeDifficulty::Normal),
            "hard" => Ok(EdgeDifficulty::Hard),
            other => Err(TermChainError::InvalidDifficulty(other.to_string())),
        }
    }
}

impl TryFrom<String> for EdgeDifficulty {
    type Error = TermChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Canonical `(min, max)` key of an unordered term pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(pub TermId, pub TermId);

impl EdgeKey {
    pub fn new(a: TermId, b: TermId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// Undirected relation between two terms. `term_a < term_b` once built through [`Edge::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub term_a: TermId,
    pub term_b: TermId,
    pub difficulty: EdgeDifficulty,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub description: String,
}

impl Edge {
    pub fn new(id: EdgeId, a: TermId, b: TermId, difficulty: EdgeDifficulty) -> Self {
        let key = EdgeKey::new(a, b);
        Self {
            id,
            term_a: key.0,
            term_b: key.1,
            difficulty,
            keyword: String::new(),
            description: String::new(),
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reorders the endpoints so that `term_a <= term_b`.
    pub fn canonicalized(mut self) -> Self {
        let key = self.key();
        self.term_a = key.0;
        self.term_b = key.1;
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.term_a, self.term_b)
    }

    pub fn is_self_loop(&self) -> bool {
        self.term_a == self.term_b
    }

    /// The endpoint opposite `id`, or `None` when the edge does not touch `id`.
    pub fn other_end(&self, id: TermId) -> Option<TermId> {
        if self.term_a == id {
            Some(self.term_b)
        } else if self.term_b == id {
            Some(self.term_a)
        } else {
            None
        }
    }
}

/// Game difficulty chosen by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DifficultyTier {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl DifficultyTier {
    pub fn all() -> [DifficultyTier; 3] {
        [DifficultyTier::Easy, DifficultyTier::Normal, DifficultyTier::Hard]
    }

    pub fn max_tier(self) -> u8 {
        match self {
            DifficultyTier::Easy => 1,
            DifficultyTier::Normal => 2,
            DifficultyTier::Hard => MAX_TIER,
        }
    }

    pub fn allowed_difficulties(self) -> &'static [EdgeDifficulty] {
        match self {
            DifficultyTier::Easy => &[EdgeDifficulty::Easy],
            DifficultyTier::Normal => &[EdgeDifficulty::Easy, EdgeDifficulty::Normal],
            DifficultyTier::Hard => &[
                EdgeDifficulty::Easy,
                EdgeDifficulty::Normal,
                EdgeDifficulty::Hard,
            ],
        }
    }

    pub fn filter(self) -> TierFilter {
        TierFilter {
            max_tier: self.max_tier(),
            allowed_difficulties: self.allowed_difficulties().to_vec(),
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Normal => "normal",
            DifficultyTier::Hard => "hard",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DifficultyTier {
    type Err = TermChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyTier::Easy),
            "normal" | "standard" => Ok(DifficultyTier::Normal),
            "hard" => Ok(DifficultyTier::Hard),
            other => Err(TermChainError::InvalidDifficulty(other.to_string())),
        }
    }
}

impl TryFrom<String> for DifficultyTier {
    type Error = TermChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Constraints a difficulty places on terms and edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFilter {
    pub max_tier: u8,
    pub allowed_difficulties: Vec<EdgeDifficulty>,
}

impl TierFilter {
    pub fn allows_tier(&self, tier: u8) -> bool {
        tier <= self.max_tier
    }

    pub fn allows_edge(&self, difficulty: EdgeDifficulty) -> bool {
        self.allowed_difficulties.contains(&difficulty)
    }
}

impl From<DifficultyTier> for TierFilter {
    fn from(difficulty: DifficultyTier) -> Self {
        difficulty.filter()
    }
}
