//! Documents and corpora.

use super::lexicon::Lexicon;
use super::sentence::{Sentence, Toponym};
use crate::error::{ResolveError, Result};
use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Position of a toponym inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToponymPos {
    pub sentence: usize,
    pub token: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    #[serde(default)]
    sentences: Vec<Sentence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gold_coord: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_coord: Option<Coordinate>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sentences: Vec::new(),
            gold_coord: None,
            system_coord: None,
        }
    }

    pub fn with_sentence(mut self, sentence: Sentence) -> Self {
        self.sentences.push(sentence);
        self
    }

    pub fn with_gold_coord(mut self, coord: Coordinate) -> Self {
        self.gold_coord = Some(coord);
        self
    }

    pub fn push(&mut self, sentence: Sentence) {
        self.sentences.push(sentence);
    }

    /// Stable identifier, used as a join key by evaluators.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentences_mut(&mut self) -> &mut [Sentence] {
        &mut self.sentences
    }

    pub fn gold_coord(&self) -> Option<Coordinate> {
        self.gold_coord
    }

    pub fn system_coord(&self) -> Option<Coordinate> {
        self.system_coord
    }

    pub fn set_system_coord(&mut self, coord: Coordinate) {
        self.system_coord = Some(coord);
    }

    /// Every toponym in document order, with its position.
    pub fn toponyms(&self) -> impl Iterator<Item = (ToponymPos, &Toponym)> {
        self.sentences.iter().enumerate().flat_map(|(si, s)| {
            s.toponyms().map(move |(ti, t)| (ToponymPos { sentence: si, token: ti }, t))
        })
    }

    pub fn toponyms_mut(&mut self) -> impl Iterator<Item = &mut Toponym> {
        self.sentences.iter_mut().flat_map(|s| s.toponyms_mut())
    }

    /// Toponyms that have at least one candidate, with positions.
    pub fn resolvable(&self) -> Vec<(ToponymPos, &Toponym)> {
        self.toponyms().filter(|(_, t)| t.has_candidates()).collect()
    }

    pub fn toponym_mut(&mut self, pos: ToponymPos) -> Option<&mut Toponym> {
        self.sentences
            .get_mut(pos.sentence)?
            .tokens_mut()
            .get_mut(pos.token)?
            .as_toponym_mut()
    }

    /// Write a batch of decisions computed against an immutable borrow.
    pub(crate) fn apply(&mut self, decisions: &[(ToponymPos, usize)]) -> Result<()> {
        for &(pos, idx) in decisions {
            let Some(toponym) = self.toponym_mut(pos) else {
                return Err(ResolveError::invalid_corpus(format!("no toponym at {:?} in '{}'", pos, self.id)));
            };
            toponym.select(idx)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, doc: Document) {
        self.documents.push(doc);
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut [Document] {
        &mut self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn toponyms(&self) -> impl Iterator<Item = &Toponym> {
        self.documents.iter().flat_map(|d| d.toponyms().map(|(_, t)| t))
    }

    pub fn toponyms_mut(&mut self) -> impl Iterator<Item = &mut Toponym> {
        self.documents.iter_mut().flat_map(|d| d.toponyms_mut())
    }

    pub fn has_gold(&self) -> bool {
        self.toponyms().any(|t| t.gold().is_some())
    }

    /// Lexicon of the forms of every toponym that has candidates.
    pub fn toponym_lexicon(&self) -> Lexicon {
        let mut lexicon = Lexicon::new();
        for t in self.toponyms().filter(|t| t.has_candidates()) {
            lexicon.get_or_add(t.form());
        }
        lexicon
    }

    /// Check document ids are unique and every index is in range.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for doc in &self.documents {
            if !ids.insert(doc.id()) {
                return Err(ResolveError::invalid_corpus(format!("duplicate document id '{}'", doc.id())));
            }
            for (_, t) in doc.toponyms() {
                t.validate()?;
            }
        }
        Ok(())
    }

    /// Current selections in corpus order.
    pub fn selections(&self) -> Vec<Option<usize>> {
        self.toponyms().map(Toponym::selected).collect()
    }

    /// Put back selections captured by [`Corpus::selections`].
    pub fn restore_selections(&mut self, saved: &[Option<usize>]) -> Result<()> {
        let count = self.toponyms().count();
        if count != saved.len() {
            return Err(ResolveError::invalid_corpus(format!(
                "selection snapshot has {} entries, corpus has {} toponyms",
                saved.len(),
                count
            )));
        }
        for (t, &s) in self.toponyms_mut().zip(saved) {
            t.restore_selection(s);
        }
        Ok(())
    }

    pub fn clear_selections(&mut self) {
        for t in self.toponyms_mut() {
            t.clear_selection();
        }
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

impl FromIterator<Document> for Corpus {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}
