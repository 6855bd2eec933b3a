//! Interning of surface forms to dense indices.

use std::collections::HashMap;

/// Maps strings to dense `usize` indices in first-seen order.
///
/// Owned by the component that needs it; there is no shared global lexicon.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    index: HashMap<String, usize>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `form`, adding it if absent.
    pub fn get_or_add(&mut self, form: &str) -> usize {
        if let Some(&idx) = self.index.get(form) {
            return idx;
        }
        let idx = self.index.len();
        self.index.insert(form.to_string(), idx);
        idx
    }

    pub fn get(&self, form: &str) -> Option<usize> {
        self.index.get(form).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense_and_stable() {
        let mut lex = Lexicon::new();
        assert_eq!(lex.get_or_add("Paris"), 0);
        assert_eq!(lex.get_or_add("London"), 1);
        assert_eq!(lex.get_or_add("Paris"), 0);
        assert_eq!(lex.len(), 2);
        assert_eq!(lex.get("Berlin"), None);
    }

    #[test]
    fn test_case_sensitive() {
        let mut lex = Lexicon::new();
        lex.get_or_add("paris");
        assert_eq!(lex.get("Paris"), None);
    }
}
