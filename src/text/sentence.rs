//! Sentences, tokens and toponyms.

use crate::error::{ResolveError, Result};
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A place-name mention with its gazetteer candidates.
///
/// `selected` is the only field resolvers write. `None` means unresolved,
/// which is distinct from candidate 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toponym {
    form: String,
    #[serde(default)]
    candidates: Vec<Arc<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gold: Option<usize>,
    #[serde(default)]
    selected: Option<usize>,
}

impl Toponym {
    pub fn new(form: impl Into<String>, candidates: Vec<Arc<Location>>) -> Self {
        Self {
            form: form.into(),
            candidates,
            gold: None,
            selected: None,
        }
    }

    /// Attach a gold (ground-truth) candidate index.
    pub fn with_gold(mut self, idx: usize) -> Result<Self> {
        self.check_index(idx)?;
        self.gold = Some(idx);
        Ok(self)
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn candidates(&self) -> &[Arc<Location>] {
        &self.candidates
    }

    pub fn candidate(&self, idx: usize) -> Option<&Location> {
        self.candidates.get(idx).map(Arc::as_ref)
    }

    /// Number of candidates.
    pub fn ambiguity(&self) -> usize {
        self.candidates.len()
    }

    /// Whether there is anything to select from.
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn gold(&self) -> Option<usize> {
        self.gold
    }

    pub fn gold_location(&self) -> Option<&Location> {
        self.gold.and_then(|i| self.candidate(i))
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn has_selection(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected_location(&self) -> Option<&Location> {
        self.selected.and_then(|i| self.candidate(i))
    }

    /// Record the resolver's choice.
    pub fn select(&mut self, idx: usize) -> Result<()> {
        self.check_index(idx)?;
        self.selected = Some(idx);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub(crate) fn restore_selection(&mut self, selected: Option<usize>) {
        self.selected = selected;
    }

    /// Check the gold and selected indices against the candidate list.
    pub fn validate(&self) -> Result<()> {
        if let Some(g) = self.gold {
            self.check_index(g)?;
        }
        if let Some(s) = self.selected {
            self.check_index(s)?;
        }
        Ok(())
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.candidates.len() {
            return Err(ResolveError::SelectionOutOfRange {
                form: self.form.clone(),
                index: idx,
                ambiguity: self.candidates.len(),
            });
        }
        Ok(())
    }
}

/// A sentence element. Toponyms replace the raw tokens they span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Token {
    Word { form: String },
    Toponym(Toponym),
}

impl Token {
    pub fn word(form: impl Into<String>) -> Self {
        Self::Word { form: form.into() }
    }

    pub fn form(&self) -> &str {
        match self {
            Self::Word { form } => form,
            Self::Toponym(t) => t.form(),
        }
    }

    pub fn as_toponym(&self) -> Option<&Toponym> {
        match self {
            Self::Toponym(t) => Some(t),
            Self::Word { .. } => None,
        }
    }

    pub fn as_toponym_mut(&mut self) -> Option<&mut Toponym> {
        match self {
            Self::Toponym(t) => Some(t),
            Self::Word { .. } => None,
        }
    }
}

impl From<Toponym> for Token {
    fn from(t: Toponym) -> Self {
        Self::Toponym(t)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn push(&mut self, token: impl Into<Token>) {
        self.tokens.push(token.into());
    }

    /// All tokens in order, words and toponyms alike.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    /// Toponyms with their token index.
    pub fn toponyms(&self) -> impl Iterator<Item = (usize, &Toponym)> {
        self.tokens
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_toponym().map(|tp| (i, tp)))
    }

    pub fn toponyms_mut(&mut self) -> impl Iterator<Item = &mut Toponym> {
        self.tokens.iter_mut().filter_map(Token::as_toponym_mut)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> Toponym {
        Toponym::new(
            "Paris",
            vec![
                Arc::new(Location::point(1, "Paris", 48.85, 2.35)),
                Arc::new(Location::point(2, "Paris", 33.66, -95.56)),
            ],
        )
    }

    #[test]
    fn test_select_in_range() {
        let mut t = paris();
        assert!(t.selected().is_none());
        t.select(1).unwrap();
        assert_eq!(t.selected(), Some(1));
        assert_eq!(t.selected_location().unwrap().id(), 2);
    }

    #[test]
    fn test_select_out_of_range_rejected() {
        let mut t = paris();
        let err = t.select(2).unwrap_err();
        assert!(matches!(err, ResolveError::SelectionOutOfRange { index: 2, ambiguity: 2, .. }));
        assert!(t.selected().is_none());
    }

    #[test]
    fn test_no_candidates_never_selectable() {
        let mut t = Toponym::new("Atlantis", vec![]);
        assert_eq!(t.ambiguity(), 0);
        assert!(t.select(0).is_err());
        assert!(t.clone().with_gold(0).is_err());
    }

    #[test]
    fn test_abstention_distinct_from_zero() {
        let mut t = paris();
        t.select(0).unwrap();
        assert_eq!(t.selected(), Some(0));
        t.clear_selection();
        assert_eq!(t.selected(), None);
    }

    #[test]
    fn test_sentence_iterates_uniformly() {
        let mut s = Sentence::default();
        s.push(Token::word("From"));
        s.push(paris());
        s.push(Token::word("to"));
        let forms: Vec<&str> = s.tokens().iter().map(Token::form).collect();
        assert_eq!(forms, vec!["From", "Paris", "to"]);
        let topo: Vec<usize> = s.toponyms().map(|(i, _)| i).collect();
        assert_eq!(topo, vec![1]);
    }

    #[test]
    fn test_token_serde_tagged() {
        let json = serde_json::to_string(&Token::word("the")).unwrap();
        assert_eq!(json, r#"{"type":"word","form":"the"}"#);
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back.form(), "the");
    }
}
