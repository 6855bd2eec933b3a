//! The propagation graph and its construction from corpora.
//!
//! Node kinds and edges:
//!
//! | from       | to         | weight                    |
//! |------------|------------|---------------------------|
//! | occurrence | type       | 1.0                       |
//! | document   | type       | 1.0 (document variant)    |
//! | type       | location   | 1.0                       |
//! | location   | cell       | 1 / cells covered         |
//! | cell       | neighbour  | cell adjacency weight     |
//! | occurrence | word       | 1.0 (context variant)     |
//! | word       | cell       | PMI (context variant)     |
//!
//! Seeds attach a `cell_label_<id>` label to cell nodes, and in the document
//! variant to document nodes whose gold coordinate falls in that cell.

use super::cells::{CellGrid, CellId};
use crate::text::{Corpus, ToponymPos, Toponym};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;
use std::fmt;

/// Identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// One toponym mention in one document.
    Occurrence { doc: String, pos: ToponymPos },
    /// A toponym surface form.
    ToponymType(String),
    Location(u64),
    Cell(CellId),
    Word(String),
    Document(String),
}

impl NodeKey {
    pub fn occurrence(doc: &str, pos: ToponymPos) -> Self {
        Self::Occurrence {
            doc: doc.to_string(),
            pos,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Occurrence { doc, pos } => write!(f, "doc_{}_tok_{}_{}", doc, pos.sentence, pos.token),
            Self::ToponymType(form) => write!(f, "tpnm_type_{}", form),
            Self::Location(id) => write!(f, "loc_{}", id),
            Self::Cell(cell) => write!(f, "cell_{}", cell),
            Self::Word(w) => write!(f, "word_{}", w),
            Self::Document(id) => write!(f, "doc_{}", id),
        }
    }
}

/// A label is the cell it asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellLabel(pub CellId);

impl fmt::Display for CellLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell_label_{}", self.0)
    }
}

/// Undirected weighted graph with keyed nodes and seed labels.
#[derive(Debug, Clone, Default)]
pub struct LabelGraph {
    graph: UnGraph<NodeKey, f64>,
    index: HashMap<NodeKey, NodeIndex>,
    seeds: HashMap<NodeIndex, Vec<(CellLabel, f64)>>,
}

impl LabelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for `key`, created on first use.
    pub fn node(&mut self, key: NodeKey) -> NodeIndex {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.index.insert(key, idx);
        idx
    }

    pub fn get(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Add an edge, or replace the weight of an existing one.
    pub fn connect(&mut self, a: NodeKey, b: NodeKey, weight: f64) {
        let a = self.node(a);
        let b = self.node(b);
        self.graph.update_edge(a, b, weight);
    }

    /// Attach a seed label. Seeding the same label twice keeps the larger weight.
    pub fn seed(&mut self, key: NodeKey, label: CellLabel, weight: f64) {
        let idx = self.node(key);
        let labels = self.seeds.entry(idx).or_default();
        match labels.iter_mut().find(|(l, _)| *l == label) {
            Some((_, w)) => *w = w.max(weight),
            None => labels.push((label, weight)),
        }
    }

    pub fn seeds_of(&self, node: NodeIndex) -> &[(CellLabel, f64)] {
        self.seeds.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn inner(&self) -> &UnGraph<NodeKey, f64> {
        &self.graph
    }

    pub fn edge_weight(&self, a: &NodeKey, b: &NodeKey) -> Option<f64> {
        let edge = self.graph.find_edge(self.get(a)?, self.get(b)?)?;
        self.graph.edge_weight(edge).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn seed_count(&self) -> usize {
        self.seeds.len()
    }
}

/// Where seed labels come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seeding {
    /// Gold cells when the corpus has gold annotations, candidate cells otherwise.
    #[default]
    Auto,
    /// Cells of each toponym's gold location.
    Gold,
    /// Cells of every candidate location.
    Candidates,
}

/// Builds graph structure for a grid and the corpora resolved over it.
pub struct GraphBuilder<'a> {
    grid: &'a CellGrid,
    adjacency_weight: f64,
    per_document: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(grid: &'a CellGrid, adjacency_weight: f64) -> Self {
        Self {
            grid,
            adjacency_weight,
            per_document: false,
        }
    }

    /// Anchor mentions on one node per document instead of one per occurrence.
    pub fn per_document(mut self, per_document: bool) -> Self {
        self.per_document = per_document;
        self
    }

    /// The node a mention hangs off.
    pub fn anchor(&self, doc: &str, pos: ToponymPos) -> NodeKey {
        if self.per_document {
            NodeKey::Document(doc.to_string())
        } else {
            NodeKey::occurrence(doc, pos)
        }
    }

    /// Connect every cell to its grid neighbours.
    pub fn add_grid(&self, graph: &mut LabelGraph) {
        for cell in self.grid.iter() {
            for n in self.grid.neighbors(cell) {
                graph.connect(NodeKey::Cell(cell), NodeKey::Cell(n), self.adjacency_weight);
            }
        }
    }

    /// Add anchor, type and location nodes for every resolvable toponym.
    pub fn add_corpus(&self, graph: &mut LabelGraph, corpus: &Corpus) {
        for doc in corpus {
            for (pos, t) in doc.resolvable() {
                let anchor = self.anchor(doc.id(), pos);
                let ty = NodeKey::ToponymType(t.form().to_string());
                graph.connect(anchor, ty.clone(), 1.0);
                self.add_candidates(graph, &ty, t);
            }
        }
    }

    fn add_candidates(&self, graph: &mut LabelGraph, ty: &NodeKey, t: &Toponym) {
        for loc in t.candidates() {
            let node = NodeKey::Location(loc.id());
            graph.connect(ty.clone(), node.clone(), 1.0);
            let cells = self.grid.cells_of(loc.region());
            let w = 1.0 / cells.len() as f64;
            for cell in cells {
                graph.connect(node.clone(), NodeKey::Cell(cell), w);
            }
        }
    }

    /// Seed cells from `corpus`, plus document nodes from their gold
    /// coordinates when anchoring per document. Returns the number of newly
    /// seeded nodes.
    pub fn seed(&self, graph: &mut LabelGraph, corpus: &Corpus, seeding: Seeding) -> usize {
        let gold = match seeding {
            Seeding::Gold => true,
            Seeding::Candidates => false,
            Seeding::Auto => corpus.has_gold(),
        };
        let before = graph.seed_count();
        for t in corpus.toponyms().filter(|t| t.has_candidates()) {
            let locations: Vec<_> = if gold {
                t.gold_location().into_iter().collect()
            } else {
                t.candidates().iter().map(|l| &**l).collect()
            };
            for loc in locations {
                for cell in self.grid.cells_of(loc.region()) {
                    graph.seed(NodeKey::Cell(cell), CellLabel(cell), 1.0);
                }
            }
        }
        if self.per_document && seeding != Seeding::Candidates {
            for doc in corpus {
                if let Some(gold) = doc.gold_coord() {
                    let cell = self.grid.cell_of(&gold);
                    graph.seed(NodeKey::Document(doc.id().to_string()), CellLabel(cell), 1.0);
                }
            }
        }
        graph.seed_count() - before
    }

    /// Whether every resolvable toponym of `corpus` already has its
    /// anchor node wired to the right type node.
    pub fn contains(&self, graph: &LabelGraph, corpus: &Corpus) -> bool {
        corpus.iter().all(|doc| {
            doc.resolvable().into_iter().all(|(pos, t)| {
                graph
                    .edge_weight(
                        &self.anchor(doc.id(), pos),
                        &NodeKey::ToponymType(t.form().to_string()),
                    )
                    .is_some()
            })
        })
    }
}
