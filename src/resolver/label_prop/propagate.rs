//! Label propagation over a [`LabelGraph`].
//!
//! [`LabelPropagator`] is the seam: anything that turns a seeded graph into
//! per-node label scores can drive the resolvers. [`IterativePropagator`] is
//! the in-crate implementation, a regularized Jacobi iteration. At each step a
//! node's new distribution is
//!
//! ```text
//! (mu_seed * seeds(v) + mu_smooth * sum_u w(u, v) * prev(u)) / (mu_seed * [seeded] + mu_smooth * sum_u w(u, v) + mu_prior)
//! ```
//!
//! The `mu_prior` mass goes to no label, so scores decay with distance from
//! the seeds and the update is a contraction with a unique fixed point.

use super::cells::CellId;
use super::graph::{CellLabel, LabelGraph};
use crate::error::{ResolveError, Result};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Propagation hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationParams {
    pub iterations: usize,
    pub mu_seed: f64,
    pub mu_smooth: f64,
    pub mu_prior: f64,
    /// Labels kept per node after each iteration; 0 keeps everything.
    pub max_labels_per_node: usize,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            iterations: 10,
            mu_seed: 1.0,
            mu_smooth: 0.01,
            mu_prior: 0.01,
            max_labels_per_node: 32,
        }
    }
}

impl PropagationParams {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("mu_seed", self.mu_seed), ("mu_smooth", self.mu_smooth), ("mu_prior", self.mu_prior)] {
            if !v.is_finite() || v < 0.0 {
                return Err(ResolveError::invalid_config(format!("{} must be non-negative, got {}", name, v)));
            }
        }
        if self.mu_prior <= 0.0 && self.mu_smooth <= 0.0 && self.mu_seed <= 0.0 {
            return Err(ResolveError::invalid_config("at least one propagation weight must be positive"));
        }
        Ok(())
    }
}

/// Label scores for every node, indexed by node.
#[derive(Debug, Clone, Default)]
pub struct NodeScores {
    scores: Vec<HashMap<CellLabel, f64>>,
}

impl NodeScores {
    pub fn get(&self, node: NodeIndex) -> Option<&HashMap<CellLabel, f64>> {
        self.scores.get(node.index()).filter(|s| !s.is_empty())
    }

    /// Score of the label for `cell` at `node`, zero when absent.
    pub fn score(&self, node: NodeIndex, cell: CellId) -> f64 {
        self.scores
            .get(node.index())
            .and_then(|s| s.get(&CellLabel(cell)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Highest-scoring label at `node`; ties go to the lower cell id.
    pub fn best(&self, node: NodeIndex) -> Option<(CellLabel, f64)> {
        self.get(node)?
            .iter()
            .map(|(&l, &s)| (l, s))
            .filter(|&(_, s)| s > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Turns a seeded graph into per-node label scores.
pub trait LabelPropagator {
    fn propagate(&self, graph: &LabelGraph, params: &PropagationParams) -> NodeScores;
}

/// Fixed-iteration regularized propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativePropagator;

impl IterativePropagator {
    fn step(graph: &LabelGraph, params: &PropagationParams, prev: &[HashMap<CellLabel, f64>]) -> Vec<HashMap<CellLabel, f64>> {
        let g = graph.inner();
        g.node_indices()
            .map(|v| {
                let mut acc: HashMap<CellLabel, f64> = HashMap::new();
                let mut norm = params.mu_prior;

                let seeds = graph.seeds_of(v);
                if !seeds.is_empty() {
                    norm += params.mu_seed;
                    for &(label, w) in seeds {
                        *acc.entry(label).or_insert(0.0) += params.mu_seed * w;
                    }
                }

                for edge in g.edges(v) {
                    let u = if edge.source() == v { edge.target() } else { edge.source() };
                    let w = params.mu_smooth * *edge.weight();
                    norm += w;
                    for (&label, &s) in &prev[u.index()] {
                        *acc.entry(label).or_insert(0.0) += w * s;
                    }
                }

                if norm > 0.0 {
                    for s in acc.values_mut() {
                        *s /= norm;
                    }
                }
                prune(acc, params.max_labels_per_node)
            })
            .collect()
    }
}

/// Keep the `keep` strongest labels; ties go to the lower cell id.
fn prune(scores: HashMap<CellLabel, f64>, keep: usize) -> HashMap<CellLabel, f64> {
    if keep == 0 || scores.len() <= keep {
        return scores;
    }
    let mut ranked: Vec<(CellLabel, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(keep);
    ranked.into_iter().collect()
}

impl LabelPropagator for IterativePropagator {
    fn propagate(&self, graph: &LabelGraph, params: &PropagationParams) -> NodeScores {
        let mut scores: Vec<HashMap<CellLabel, f64>> = graph
            .inner()
            .node_indices()
            .map(|v| graph.seeds_of(v).iter().copied().collect())
            .collect();

        for iteration in 1..=params.iterations {
            scores = Self::step(graph, params, &scores);
            let labelled = scores.iter().filter(|s| !s.is_empty()).count();
            debug!(iteration, labelled, nodes = scores.len(), "propagation iteration");
        }
        NodeScores { scores }
    }
}

#[cfg(test)]
mod tests {
    use super::super::cells::CellGrid;
    use super::super::graph::NodeKey;
    use super::*;
    use crate::geo::Coordinate;

    fn params(iterations: usize) -> PropagationParams {
        PropagationParams {
            iterations,
            mu_seed: 1.0,
            mu_smooth: 1.0,
            mu_prior: 0.01,
            max_labels_per_node: 0,
        }
    }

    fn chain() -> (LabelGraph, CellId) {
        let grid = CellGrid::new(10.0).unwrap();
        let cell = grid.cell_of(&Coordinate::new(0.0, 0.0));
        let mut g = LabelGraph::new();
        g.connect(NodeKey::Cell(cell), NodeKey::Location(1), 1.0);
        g.connect(NodeKey::Location(1), NodeKey::ToponymType("A".into()), 1.0);
        g.connect(NodeKey::ToponymType("A".into()), NodeKey::Word("x".into()), 1.0);
        g.seed(NodeKey::Cell(cell), CellLabel(cell), 1.0);
        (g, cell)
    }

    #[test]
    fn test_mass_reaches_distance_with_iterations() {
        let (g, cell) = chain();
        let ty = g.get(&NodeKey::ToponymType("A".into())).unwrap();
        let word = g.get(&NodeKey::Word("x".into())).unwrap();

        let one = IterativePropagator.propagate(&g, &params(1));
        assert!(one.score(ty, cell) == 0.0);

        let three = IterativePropagator.propagate(&g, &params(3));
        assert!(three.score(ty, cell) > 0.0);
        assert!(three.score(word, cell) > 0.0);
    }

    #[test]
    fn test_scores_bounded() {
        let (g, _) = chain();
        let scores = IterativePropagator.propagate(&g, &params(20));
        for v in g.inner().node_indices() {
            if let Some(s) = scores.get(v) {
                let total: f64 = s.values().sum();
                assert!(total <= 1.0 + 1e-9, "node {:?} has mass {}", v, total);
            }
        }
    }

    #[test]
    fn test_converges() {
        let (g, cell) = chain();
        let ty = g.get(&NodeKey::ToponymType("A".into())).unwrap();
        let mut p = params(200);
        p.mu_prior = 1.0;
        let a = IterativePropagator.propagate(&g, &p).score(ty, cell);
        p.iterations = 201;
        let b = IterativePropagator.propagate(&g, &p).score(ty, cell);
        assert!(a > 0.0);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_pruning_keeps_strongest() {
        let grid = CellGrid::new(10.0).unwrap();
        let cells: Vec<CellId> = grid.iter().take(3).collect();
        let mut g = LabelGraph::new();
        for (i, &c) in cells.iter().enumerate() {
            g.connect(NodeKey::Cell(c), NodeKey::Word("hub".into()), 1.0 + i as f64);
            g.seed(NodeKey::Cell(c), CellLabel(c), 1.0);
        }
        let mut p = params(2);
        p.max_labels_per_node = 1;
        let scores = IterativePropagator.propagate(&g, &p);
        let hub = g.get(&NodeKey::Word("hub".into())).unwrap();
        assert_eq!(scores.get(hub).unwrap().len(), 1);
        assert_eq!(scores.best(hub).unwrap().0, CellLabel(cells[2]));
    }

    #[test]
    fn test_unseeded_graph_stays_empty() {
        let mut g = LabelGraph::new();
        g.connect(NodeKey::Word("a".into()), NodeKey::Word("b".into()), 1.0);
        let scores = IterativePropagator.propagate(&g, &params(5));
        let a = g.get(&NodeKey::Word("a".into())).unwrap();
        assert!(scores.get(a).is_none());
        assert!(scores.best(a).is_none());
    }

    #[test]
    fn test_params_validation() {
        assert!(PropagationParams::default().validate().is_ok());
        let mut p = PropagationParams::default();
        p.mu_smooth = -1.0;
        assert!(p.validate().is_err());
        let zero = PropagationParams {
            mu_seed: 0.0,
            mu_smooth: 0.0,
            mu_prior: 0.0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
