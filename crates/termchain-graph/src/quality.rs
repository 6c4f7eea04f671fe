use serde::Serialize;
use std::collections::BTreeMap;
use termchain_core::{EdgeId, TermId};

use crate::GraphSnapshot;

/// Terms with fewer neighbors than this are dead points: a walk that enters
/// them cannot leave again.
pub const MIN_PLAYABLE_DEGREE: usize = 2;

/// Structural health of a loaded term graph.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataQualityReport {
    pub snapshot_version: u64,
    pub term_count: usize,
    pub edge_count: usize,
    pub terms_per_tier: BTreeMap<u8, usize>,
    pub isolated_terms: Vec<TermId>,
    pub dead_points: Vec<TermId>,
    pub self_loops: Vec<EdgeId>,
    pub duplicate_edges: Vec<EdgeId>,
    pub dangling_edges: Vec<EdgeId>,
    pub duplicate_term_ids: Vec<TermId>,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
}

impl DataQualityReport {
    /// At least one term, and no isolated terms, self loops, dangling edges or duplicate term ids.
    pub fn is_playable(&self) -> bool {
        self.term_count > 0
            && self.isolated_terms.is_empty()
            && self.self_loops.is_empty()
            && self.dangling_edges.is_empty()
            && self.duplicate_term_ids.is_empty()
    }

    /// Human readable list of problems, empty when the graph is clean.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.term_count == 0 {
            issues.push("no terms loaded".to_string());
        }
        if !self.isolated_terms.is_empty() {
            issues.push(format!("isolated terms: {:?}", self.isolated_terms));
        }
        if !self.dead_points.is_empty() {
            issues.push(format!(
                "terms with degree < {}: {:?}",
                MIN_PLAYABLE_DEGREE, self.dead_points
            ));
        }
        if !self.self_loops.is_empty() {
            issues.push(format!("self-loop edges: {:?}", self.self_loops));
        }
        if !self.duplicate_edges.is_empty() {
            issues.push(format!("duplicate edges: {:?}", self.duplicate_edges));
        }
        if !self.dangling_edges.is_empty() {
            issues.push(format!(
                "edges referencing unknown terms: {:?}",
                self.dangling_edges
            ));
        }
        if !self.duplicate_term_ids.is_empty() {
            issues.push(format!("duplicate term ids: {:?}", self.duplicate_term_ids));
        }
        issues
    }
}

impl GraphSnapshot {
    pub fn quality_report(&self) -> DataQualityReport {
        let mut terms_per_tier = BTreeMap::new();
        let mut isolated_terms = Vec::new();
        let mut dead_points = Vec::new();
        let mut min_degree = usize::MAX;
        let mut max_degree = 0;
        let mut degree_sum = 0usize;

        for term in self.terms() {
            *terms_per_tier.entry(term.tier).or_insert(0) += 1;

            let degree = self.degree(term.id);
            if degree == 0 {
                isolated_terms.push(term.id);
            }
            if degree < MIN_PLAYABLE_DEGREE {
                dead_points.push(term.id);
            }
            min_degree = min_degree.min(degree);
            max_degree = max_degree.max(degree);
            degree_sum += degree;
        }

        let term_count = self.term_count();
        let avg_degree = if term_count == 0 {
            0.0
        } else {
            degree_sum as f64 / term_count as f64
        };

        isolated_terms.sort_unstable();
        dead_points.sort_unstable();

        DataQualityReport {
            snapshot_version: self.version(),
            term_count,
            edge_count: self.edge_count(),
            terms_per_tier,
            isolated_terms,
            dead_points,
            self_loops: self.anomalies.self_loops.clone(),
            duplicate_edges: self.anomalies.duplicate_edges.clone(),
            dangling_edges: self.anomalies.dangling_edges.clone(),
            duplicate_term_ids: self.anomalies.duplicate_term_ids.clone(),
            min_degree: if term_count == 0 { 0 } else { min_degree },
            max_degree,
            avg_degree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termchain_core::{Edge, EdgeDifficulty, Term};

    #[test]
    fn report_on_triangle_with_tail() {
        let terms = vec![
            Term::new(1, "a", 1, "x"),
            Term::new(2, "b", 1, "x"),
            Term::new(3, "c", 2, "x"),
            Term::new(4, "d", 3, "x"),
            Term::new(5, "e", 3, "x"),
        ];
        let edges = vec![
            Edge::new(1, 1, 2, EdgeDifficulty::Easy),
            Edge::new(2, 2, 3, EdgeDifficulty::Easy),
            Edge::new(3, 3, 1, EdgeDifficulty::Normal),
            Edge::new(4, 3, 4, EdgeDifficulty::Hard),
        ];
        let report = GraphSnapshot::build(terms, edges, 3).quality_report();

        assert_eq!(report.snapshot_version, 3);
        assert_eq!(report.term_count, 5);
        assert_eq!(report.edge_count, 4);
        assert_eq!(report.isolated_terms, vec![5]);
        assert_eq!(report.dead_points, vec![4, 5]);
        assert_eq!(report.min_degree, 0);
        assert_eq!(report.max_degree, 3);
        assert!((report.avg_degree - 1.6).abs() < f64::EPSILON);
        assert_eq!(report.terms_per_tier.get(&3), Some(&2));
        assert!(!report.is_playable());
        assert_eq!(report.issues().len(), 2);
    }

    #[test]
    fn empty_graph_is_not_playable() {
        let report = GraphSnapshot::empty().quality_report();
        assert_eq!(report.min_degree, 0);
        assert_eq!(report.avg_degree, 0.0);
        assert!(!report.is_playable());
        assert_eq!(report.issues(), vec!["no terms loaded".to_string()]);
    }

    #[test]
    fn duplicate_term_ids_make_graph_unplayable() {
        let terms = vec![
            Term::new(1, "a", 1, "x"),
            Term::new(1, "a again", 1, "x"),
            Term::new(2, "b", 1, "x"),
        ];
        let edges = vec![Edge::new(1, 1, 2, EdgeDifficulty::Easy)];
        let report = GraphSnapshot::build(terms, edges, 1).quality_report();

        assert!(report.isolated_terms.is_empty());
        assert_eq!(report.duplicate_term_ids, vec![1]);
        assert!(!report.is_playable());
        assert!(report
            .issues()
            .iter()
            .any(|issue| issue.starts_with("duplicate term ids")));
    }
}
