//! Context words for the context-sensitive variant.
//!
//! Words seen near a toponym are tied to the cells that toponym refers to.
//! Counts are over (mention, context word) events: each event spreads one unit
//! of mass over the mention's cells (its gold location's cells when annotated,
//! otherwise every candidate's cells). A word keeps an edge to a cell when the
//! pointwise mutual information clears the threshold and the joint count is
//! large enough.

use super::cells::{CellGrid, CellId};
use super::graph::{GraphBuilder, LabelGraph, NodeKey};
use crate::text::{Corpus, Document, Token, ToponymPos};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextParams {
    /// Tokens taken on each side of a mention, within its sentence.
    #[serde(rename = "context_window")]
    pub window: usize,
    pub pmi_threshold: f64,
    pub min_cooccurrence: f64,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            window: 5,
            pmi_threshold: 0.0,
            min_cooccurrence: 2.0,
        }
    }
}

/// Normalized context word, or `None` for punctuation and numbers.
fn normalize(token: &Token) -> Option<String> {
    let form = token.form();
    if !form.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(form.to_lowercase())
}

/// Context words around the mention at `pos`.
pub fn context_words(doc: &Document, pos: ToponymPos, window: usize) -> Vec<String> {
    let Some(sentence) = doc.sentences().get(pos.sentence) else {
        return Vec::new();
    };
    let tokens = sentence.tokens();
    let lo = pos.token.saturating_sub(window);
    let hi = (pos.token + window + 1).min(tokens.len());
    (lo..hi)
        .filter(|&i| i != pos.token)
        .filter_map(|i| normalize(&tokens[i]))
        .collect()
}

/// Word-to-cell association strengths learned from a corpus.
#[derive(Debug, Clone, Default)]
pub struct ContextModel {
    edges: BTreeMap<String, Vec<(CellId, f64)>>,
}

impl ContextModel {
    pub fn learn(corpus: &Corpus, grid: &CellGrid, params: &ContextParams) -> Self {
        let mut joint: HashMap<(String, CellId), f64> = HashMap::new();
        let mut word_count: HashMap<String, f64> = HashMap::new();
        let mut cell_count: HashMap<CellId, f64> = HashMap::new();
        let mut total = 0.0;

        for doc in corpus {
            for (pos, t) in doc.resolvable() {
                let cells: Vec<CellId> = match t.gold_location() {
                    Some(gold) => grid.cells_of(gold.region()).into_iter().collect(),
                    None => {
                        let set: BTreeSet<CellId> =
                            t.candidates().iter().flat_map(|l| grid.cells_of(l.region())).collect();
                        set.into_iter().collect()
                    }
                };
                let share = 1.0 / cells.len() as f64;

                for word in context_words(doc, pos, params.window) {
                    total += 1.0;
                    *word_count.entry(word.clone()).or_insert(0.0) += 1.0;
                    for &cell in &cells {
                        *joint.entry((word.clone(), cell)).or_insert(0.0) += share;
                        *cell_count.entry(cell).or_insert(0.0) += share;
                    }
                }
            }
        }

        let mut edges: BTreeMap<String, Vec<(CellId, f64)>> = BTreeMap::new();
        for ((word, cell), n) in joint {
            if n < params.min_cooccurrence {
                continue;
            }
            let pmi = (n * total / (word_count[&word] * cell_count[&cell])).ln();
            if pmi > params.pmi_threshold {
                edges.entry(word).or_default().push((cell, pmi));
            }
        }
        for cells in edges.values_mut() {
            cells.sort_by_key(|&(c, _)| c);
        }
        Self { edges }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.edges.contains_key(word)
    }

    /// Cells associated with `word`, with their PMI.
    pub fn cells(&self, word: &str) -> &[(CellId, f64)] {
        self.edges.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Add word-to-cell edges for every retained word.
    pub fn add_word_edges(&self, graph: &mut LabelGraph) {
        for (word, cells) in &self.edges {
            for &(cell, pmi) in cells {
                graph.connect(NodeKey::Word(word.clone()), NodeKey::Cell(cell), pmi);
            }
        }
    }

    /// Connect each mention's anchor to its retained context words.
    pub fn add_mention_edges(&self, graph: &mut LabelGraph, builder: &GraphBuilder<'_>, corpus: &Corpus, window: usize) {
        for doc in corpus {
            for (pos, _) in doc.resolvable() {
                let words: HashSet<String> = context_words(doc, pos, window)
                    .into_iter()
                    .filter(|w| self.contains(w))
                    .collect();
                for word in words {
                    graph.connect(builder.anchor(doc.id(), pos), NodeKey::Word(word), 1.0);
                }
            }
        }
    }
}
