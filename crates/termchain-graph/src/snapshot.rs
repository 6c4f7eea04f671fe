use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use termchain_core::{Edge, EdgeDifficulty, EdgeId, EdgeKey, Term, TermId};
use tracing::{debug, warn};

/// Immutable, fully indexed view of the term graph.
///
/// A snapshot is built off to the side from a complete repository read and is
/// never mutated afterwards. Readers hold an `Arc<GraphSnapshot>` for the
/// duration of one operation, so a concurrent reload cannot tear their view.
#[derive(Debug)]
pub struct GraphSnapshot {
    pub(crate) version: u64,
    pub(crate) loaded_at: DateTime<Utc>,
    pub(crate) terms: FxHashMap<TermId, Term>,
    pub(crate) edges: Vec<Edge>,
    /// Term ids ordered by `(tier, id)`; `tier_keys[i]` is the tier of `tier_order[i]`.
    pub(crate) tier_order: Vec<TermId>,
    pub(crate) tier_keys: Vec<u8>,
    pub(crate) neighbors: FxHashMap<TermId, FxHashSet<TermId>>,
    /// Indices into `edges`, in repository order.
    pub(crate) edges_by_term: FxHashMap<TermId, Vec<usize>>,
    pub(crate) edge_index: FxHashMap<EdgeKey, usize>,
    pub(crate) anomalies: IndexAnomalies,
}

/// Edges skipped or partially indexed while building a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAnomalies {
    pub duplicate_term_ids: Vec<TermId>,
    pub self_loops: Vec<EdgeId>,
    pub duplicate_edges: Vec<EdgeId>,
    pub dangling_edges: Vec<EdgeId>,
}

impl IndexAnomalies {
    pub fn is_empty(&self) -> bool {
        self.duplicate_term_ids.is_empty()
            && self.self_loops.is_empty()
            && self.duplicate_edges.is_empty()
            && self.dangling_edges.is_empty()
    }
}

impl GraphSnapshot {
    /// Build every index from a full set of terms and edges.
    ///
    /// Data-quality problems are tolerated: the first edge for an unordered pair
    /// wins, self loops never create a neighbor relation, and edges that point at
    /// unknown terms stay retrievable through [`GraphSnapshot::edge`] but are left
    /// out of the adjacency indexes.
    pub fn build(terms: Vec<Term>, edges: Vec<Edge>, version: u64) -> Self {
        let mut anomalies = IndexAnomalies::default();

        let mut term_map = FxHashMap::with_capacity_and_hasher(terms.len(), Default::default());
        for term in terms {
            let id = term.id;
            if term_map.insert(id, term).is_some() {
                anomalies.duplicate_term_ids.push(id);
            }
        }

        let mut tiered: Vec<(u8, TermId)> = term_map.values().map(|t| (t.tier, t.id)).collect();
        tiered.sort_unstable();
        let (tier_keys, tier_order): (Vec<u8>, Vec<TermId>) = tiered.into_iter().unzip();

        let edges: Vec<Edge> = edges.into_iter().map(Edge::canonicalized).collect();
        let mut neighbors: FxHashMap<TermId, FxHashSet<TermId>> = FxHashMap::default();
        let mut edges_by_term: FxHashMap<TermId, Vec<usize>> = FxHashMap::default();
        let mut edge_index = FxHashMap::with_capacity_and_hasher(edges.len(), Default::default());

        for (idx, edge) in edges.iter().enumerate() {
            let key = edge.key();
            if edge_index.contains_key(&key) {
                anomalies.duplicate_edges.push(edge.id);
                continue;
            }
            edge_index.insert(key, idx);

            if edge.is_self_loop() {
                anomalies.self_loops.push(edge.id);
                continue;
            }
            if !term_map.contains_key(&edge.term_a) || !term_map.contains_key(&edge.term_b) {
                anomalies.dangling_edges.push(edge.id);
                continue;
            }

            neighbors.entry(edge.term_a).or_default().insert(edge.term_b);
            neighbors.entry(edge.term_b).or_default().insert(edge.term_a);
            edges_by_term.entry(edge.term_a).or_default().push(idx);
            edges_by_term.entry(edge.term_b).or_default().push(idx);
        }

        if !anomalies.is_empty() {
            warn!(
                duplicate_terms = anomalies.duplicate_term_ids.len(),
                self_loops = anomalies.self_loops.len(),
                duplicate_edges = anomalies.duplicate_edges.len(),
                dangling_edges = anomalies.dangling_edges.len(),
                "Graph snapshot v{} built with data-quality anomalies",
                version
            );
        }
        debug!(
            "Indexed {} terms and {} edges into snapshot v{}",
            term_map.len(),
            edges.len(),
            version
        );

        Self {
            version,
            loaded_at: Utc::now(),
            terms: term_map,
            edges,
            tier_order,
            tier_keys,
            neighbors,
            edges_by_term,
            edge_index,
            anomalies,
        }
    }

    /// An empty snapshot, useful as a placeholder in tests.
    pub fn empty() -> Self {
        Self::build(Vec::new(), Vec::new(), 0)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn anomalies(&self) -> &IndexAnomalies {
        &self.anomalies
    }

    pub fn term(&self, id: TermId) -> Option<&Term> {
        self.terms.get(&id)
    }

    pub fn contains_term(&self, id: TermId) -> bool {
        self.terms.contains_key(&id)
    }

    /// All terms ordered by `(tier, id)`.
    pub fn terms(&self) -> impl Iterator<Item = &Term> + '_ {
        self.tier_order.iter().filter_map(move |id| self.terms.get(id))
    }

    /// All edges in repository order, including ones skipped by the adjacency indexes.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, a: TermId, b: TermId) -> Option<&Edge> {
        self.edge_index
            .get(&EdgeKey::new(a, b))
            .map(|&idx| &self.edges[idx])
    }

    pub fn edges_for_term(&self, id: TermId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges_by_term
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn neighbors(&self, id: TermId) -> Option<&FxHashSet<TermId>> {
        self.neighbors.get(&id)
    }

    pub fn is_neighbor(&self, a: TermId, b: TermId) -> bool {
        self.neighbors.get(&a).is_some_and(|set| set.contains(&b))
    }

    pub fn degree(&self, id: TermId) -> usize {
        self.neighbors.get(&id).map_or(0, FxHashSet::len)
    }

    /// Neighbors reachable over an allowed edge whose far end has `tier <= max_tier`.
    pub fn neighbors_filtered(
        &self,
        id: TermId,
        max_tier: u8,
        allowed_difficulties: &[EdgeDifficulty],
    ) -> Vec<TermId> {
        self.filtered_neighbors(id, max_tier, allowed_difficulties)
            .collect()
    }

    /// Iterator form of [`GraphSnapshot::neighbors_filtered`], in repository edge order.
    pub fn filtered_neighbors<'a>(
        &'a self,
        id: TermId,
        max_tier: u8,
        allowed_difficulties: &'a [EdgeDifficulty],
    ) -> impl Iterator<Item = TermId> + 'a {
        self.edges_for_term(id).filter_map(move |edge| {
            if !allowed_difficulties.contains(&edge.difficulty) {
                return None;
            }
            let neighbor = edge.other_end(id)?;
            match self.terms.get(&neighbor) {
                Some(term) if term.tier <= max_tier => Some(neighbor),
                _ => None,
            }
        })
    }

    /// Ids of every term with `tier <= max_tier`, ordered by `(tier, id)`.
    pub fn terms_by_max_tier(&self, max_tier: u8) -> &[TermId] {
        let end = self.tier_keys.partition_point(|&tier| tier <= max_tier);
        &self.tier_order[..end]
    }
}
