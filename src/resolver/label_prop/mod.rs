//! Graph label-propagation resolvers.
//!
//! Toponym mentions, toponym types, candidate locations and grid cells become
//! nodes of one graph. Seed labels sit on cells, propagation spreads them, and
//! each mention takes the candidate covering its best-scoring cell.
//!
//! The resolver moves through `Untrained -> GraphBuilt -> Propagated ->
//! Decoded`. Resolving a corpus the graph has not seen adds it to the graph
//! and propagates again.

pub mod cells;
pub mod context;
pub mod graph;
pub mod propagate;

pub use cells::{CellGrid, CellId};
pub use context::{ContextModel, ContextParams};
pub use graph::{CellLabel, GraphBuilder, LabelGraph, NodeKey, Seeding};
pub use propagate::{IterativePropagator, LabelPropagator, NodeScores, PropagationParams};

use super::{Resolution, Resolver};
use crate::error::{ResolveError, Result};
use crate::text::{Corpus, Toponym};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Which node a mention is decoded from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelPropVariant {
    /// The toponym type node: one decision per surface form.
    #[default]
    DefaultRule,
    /// The mention's own occurrence node.
    Occurrence,
    /// Occurrence nodes linked to PMI-weighted context words.
    ContextSensitive,
    /// One node per document; every mention in it shares the distribution.
    Document,
}

impl FromStr for LabelPropVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default-rule" | "default" => Ok(Self::DefaultRule),
            "occurrence" => Ok(Self::Occurrence),
            "context-sensitive" | "context" => Ok(Self::ContextSensitive),
            "document" => Ok(Self::Document),
            _ => Err(format!(
                "Invalid label-prop variant: '{}'. Use: default-rule, occurrence, context-sensitive, document",
                s
            )),
        }
    }
}

impl fmt::Display for LabelPropVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DefaultRule => "default-rule",
            Self::Occurrence => "occurrence",
            Self::ContextSensitive => "context-sensitive",
            Self::Document => "document",
        };
        f.write_str(s)
    }
}

/// Label-propagation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPropConfig {
    pub variant: LabelPropVariant,
    pub degrees_per_cell: f64,
    /// Weight of cell-to-neighbour edges, below 1.
    pub cell_adjacency_weight: f64,
    pub seeding: Seeding,
    #[serde(flatten)]
    pub propagation: PropagationParams,
    #[serde(flatten)]
    pub context: ContextParams,
}

impl Default for LabelPropConfig {
    fn default() -> Self {
        Self {
            variant: LabelPropVariant::default(),
            degrees_per_cell: 1.0,
            cell_adjacency_weight: 0.9,
            seeding: Seeding::default(),
            propagation: PropagationParams::default(),
            context: ContextParams::default(),
        }
    }
}

impl LabelPropConfig {
    pub fn validate(&self) -> Result<()> {
        CellGrid::new(self.degrees_per_cell)?;
        if !(self.cell_adjacency_weight > 0.0 && self.cell_adjacency_weight < 1.0) {
            return Err(ResolveError::invalid_config(format!(
                "cell_adjacency_weight must be in (0, 1), got {}",
                self.cell_adjacency_weight
            )));
        }
        self.propagation.validate()
    }
}

/// Observable lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPropState {
    Untrained,
    GraphBuilt,
    Propagated,
    Decoded,
}

enum Stage {
    Untrained,
    GraphBuilt(LabelGraph),
    Propagated(LabelGraph, NodeScores),
    Decoded(LabelGraph, NodeScores),
}

/// Label-propagation resolver, generic over the propagation backend.
pub struct LabelPropResolver<P = IterativePropagator> {
    config: LabelPropConfig,
    grid: CellGrid,
    propagator: P,
    context: Option<ContextModel>,
    stage: Stage,
}

impl LabelPropResolver<IterativePropagator> {
    pub fn new(config: LabelPropConfig) -> Result<Self> {
        Self::with_propagator(config, IterativePropagator)
    }
}

impl<P: LabelPropagator> LabelPropResolver<P> {
    pub fn with_propagator(config: LabelPropConfig, propagator: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid: CellGrid::new(config.degrees_per_cell)?,
            config,
            propagator,
            context: None,
            stage: Stage::Untrained,
        })
    }

    pub fn config(&self) -> &LabelPropConfig {
        &self.config
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn state(&self) -> LabelPropState {
        match self.stage {
            Stage::Untrained => LabelPropState::Untrained,
            Stage::GraphBuilt(_) => LabelPropState::GraphBuilt,
            Stage::Propagated(..) => LabelPropState::Propagated,
            Stage::Decoded(..) => LabelPropState::Decoded,
        }
    }

    pub fn graph(&self) -> Option<&LabelGraph> {
        match &self.stage {
            Stage::Untrained => None,
            Stage::GraphBuilt(g) | Stage::Propagated(g, _) | Stage::Decoded(g, _) => Some(g),
        }
    }

    fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder::new(&self.grid, self.config.cell_adjacency_weight)
            .per_document(self.config.variant == LabelPropVariant::Document)
    }

    /// Wire a corpus's mentions into the graph.
    fn add_corpus(&self, graph: &mut LabelGraph, corpus: &Corpus) {
        let builder = self.builder();
        builder.add_corpus(graph, corpus);
        if let Some(model) = &self.context {
            model.add_mention_edges(graph, &builder, corpus, self.config.context.window);
        }
    }

    /// Build the grid, training mentions and seeds.
    fn build(&mut self, corpus: &Corpus) -> LabelGraph {
        let mut graph = LabelGraph::new();
        let builder = self.builder();
        builder.add_grid(&mut graph);
        let seeded = builder.seed(&mut graph, corpus, self.config.seeding);

        let context = if self.config.variant == LabelPropVariant::ContextSensitive {
            let model = ContextModel::learn(corpus, &self.grid, &self.config.context);
            model.add_word_edges(&mut graph);
            debug!(words = model.len(), "context model learned");
            Some(model)
        } else {
            None
        };
        self.context = context;

        self.add_corpus(&mut graph, corpus);
        if seeded == 0 {
            warn!("no seed labels; every toponym will abstain");
        }
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            seeds = seeded,
            variant = %self.config.variant,
            "label graph built"
        );
        graph
    }

    /// Build the graph from a training corpus without propagating.
    ///
    /// Replaces any earlier graph.
    pub fn build_graph(&mut self, corpus: &Corpus) -> Result<()> {
        corpus.validate()?;
        let graph = self.build(corpus);
        self.stage = Stage::GraphBuilt(graph);
        Ok(())
    }

    fn propagate(&self, graph: &LabelGraph) -> NodeScores {
        self.propagator.propagate(graph, &self.config.propagation)
    }

    /// Candidate with the most mass on one of its own cells at `node`.
    fn decode(&self, t: &Toponym, scores: &NodeScores, node: NodeIndex) -> Option<usize> {
        scores.get(node)?;
        let mut best: Option<(usize, f64)> = None;
        for (i, loc) in t.candidates().iter().enumerate() {
            for cell in self.grid.cells_of(loc.region()) {
                let mass = scores.score(node, cell);
                if mass > 0.0 && best.map_or(true, |(_, b)| mass > b) {
                    best = Some((i, mass));
                }
            }
        }
        best.map(|(i, _)| i)
    }

    fn decode_corpus(&self, graph: &LabelGraph, scores: &NodeScores, corpus: &mut Corpus) -> Result<()> {
        let builder = self.builder();
        for doc in corpus.documents_mut() {
            let mut decisions = Vec::new();
            for (pos, t) in doc.resolvable() {
                let key = match self.config.variant {
                    LabelPropVariant::DefaultRule => NodeKey::ToponymType(t.form().to_string()),
                    _ => builder.anchor(doc.id(), pos),
                };
                let Some(node) = graph.get(&key) else { continue };
                if let Some(idx) = self.decode(t, scores, node) {
                    decisions.push((pos, idx));
                }
            }

            if self.config.variant == LabelPropVariant::Document {
                let best = graph
                    .get(&NodeKey::Document(doc.id().to_string()))
                    .and_then(|node| scores.best(node));
                if let Some((CellLabel(cell), _)) = best {
                    doc.set_system_coord(self.grid.center(cell));
                }
            }
            doc.apply(&decisions)?;
        }
        Ok(())
    }
}

impl<P: LabelPropagator> Resolver for LabelPropResolver<P> {
    fn name(&self) -> &'static str {
        "label-prop"
    }

    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        self.build_graph(corpus)?;
        if let Stage::GraphBuilt(graph) = std::mem::replace(&mut self.stage, Stage::Untrained) {
            let scores = self.propagate(&graph);
            self.stage = Stage::Propagated(graph, scores);
        }
        Ok(())
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        corpus.validate()?;
        if matches!(self.stage, Stage::Untrained) {
            info!("label propagation untrained, training on target corpus");
            self.train(corpus)?;
        }

        let (graph, scores) = match std::mem::replace(&mut self.stage, Stage::Untrained) {
            Stage::Untrained => return Err(ResolveError::invalid_corpus("label graph missing after training")),
            Stage::GraphBuilt(graph) => {
                let scores = self.propagate(&graph);
                (graph, scores)
            }
            Stage::Propagated(g, s) | Stage::Decoded(g, s) => (g, s),
        };

        let (graph, scores) = if self.builder().contains(&graph, corpus) {
            (graph, scores)
        } else {
            let mut graph = graph;
            self.add_corpus(&mut graph, corpus);
            debug!(nodes = graph.node_count(), "target corpus added, propagating again");
            let scores = self.propagate(&graph);
            (graph, scores)
        };

        if let Err(e) = self.decode_corpus(&graph, &scores, corpus) {
            self.stage = Stage::Propagated(graph, scores);
            return Err(e);
        }
        self.stage = Stage::Decoded(graph, scores);

        let result = Resolution::tally(corpus);
        info!(resolver = self.name(), %result, "disambiguation complete");
        Ok(result)
    }
}
