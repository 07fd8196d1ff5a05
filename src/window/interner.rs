//! Term Interner - bidirectional term <-> identifier mapping
//!
//! Identifiers are handed out in first-seen order starting at 1 and are
//! never given to a different term, even after `retain` drops entries.
//! The interner is not synchronized; the owning aggregator holds its
//! write lock around every mutation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::window::types::{TermId, UNKNOWN_TERM};

/// Interning tables for term text
#[derive(Debug)]
pub struct TermInterner {
    /// Term text to identifier
    term_to_id: HashMap<Arc<str>, TermId>,
    /// Identifier to term text
    id_to_term: HashMap<TermId, Arc<str>>,
    /// Next identifier to assign
    next_id: TermId,
}

impl Default for TermInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TermInterner {
    pub fn new() -> Self {
        Self {
            term_to_id: HashMap::new(),
            id_to_term: HashMap::new(),
            next_id: UNKNOWN_TERM + 1,
        }
    }

    /// Return the identifier for `term`, assigning the next one if unseen
    pub fn get_or_create(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.term_to_id.get(term) {
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;

        let text: Arc<str> = Arc::from(term);
        self.term_to_id.insert(Arc::clone(&text), id);
        self.id_to_term.insert(id, text);
        id
    }

    /// Look up an identifier without assigning one
    pub fn get(&self, term: &str) -> Option<TermId> {
        self.term_to_id.get(term).copied()
    }

    /// Resolve an identifier to its text, or `""` if unknown
    pub fn resolve(&self, id: TermId) -> &str {
        self.id_to_term.get(&id).map(|t| t.as_ref()).unwrap_or("")
    }

    /// Number of interned terms
    pub fn len(&self) -> usize {
        self.id_to_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_term.is_empty()
    }

    /// Drop every entry whose identifier fails `keep`
    ///
    /// Returns the number of entries removed. The identifier counter is not
    /// rewound, so a dropped term seen again gets a fresh identifier.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(TermId) -> bool,
    {
        let before = self.id_to_term.len();
        self.id_to_term.retain(|id, _| keep(*id));
        let id_to_term = &self.id_to_term;
        self.term_to_id.retain(|_, id| id_to_term.contains_key(id));
        self.term_to_id.shrink_to_fit();
        self.id_to_term.shrink_to_fit();
        before - self.id_to_term.len()
    }
}
