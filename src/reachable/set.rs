//! The append-only reachable set.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashSet;

use crate::model::{MemberKind, Token};

/// Tokens of every definition found reachable.
///
/// Inserts are idempotent and there is no removal, so the set only grows. Counts per kind are
/// kept alongside for statistics.
#[derive(Debug, Default)]
pub struct ReachableSet {
    tokens: DashSet<Token>,
    types: AtomicUsize,
    methods: AtomicUsize,
    fields: AtomicUsize,
}

impl ReachableSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token. Returns true if it was not present before.
    pub fn insert(&self, token: Token) -> bool {
        if !self.tokens.insert(token) {
            return false;
        }

        let counter = match token.kind() {
            Some(MemberKind::Type) => &self.types,
            Some(MemberKind::Method) => &self.methods,
            Some(MemberKind::Field) => &self.fields,
            None => return true,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// True if the token was marked.
    #[must_use]
    pub fn contains(&self, token: Token) -> bool {
        self.tokens.contains(&token)
    }

    /// Total number of marked tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if nothing was marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of marked types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.load(Ordering::Relaxed)
    }

    /// Number of marked methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.load(Ordering::Relaxed)
    }

    /// Number of marked fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.load(Ordering::Relaxed)
    }

    /// All marked tokens in ascending order.
    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.tokens.iter().map(|entry| *entry).collect();
        tokens.sort_unstable();
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FIELD_TABLE, METHOD_TABLE, TYPE_TABLE};

    #[test]
    fn test_insert_is_idempotent() {
        let set = ReachableSet::new();
        let ty = Token::from_parts(TYPE_TABLE, 1);
        let method = Token::from_parts(METHOD_TABLE, 4);
        let field = Token::from_parts(FIELD_TABLE, 2);

        assert!(set.insert(ty));
        assert!(!set.insert(ty));
        assert!(set.insert(method));
        assert!(set.insert(field));

        assert_eq!(set.len(), 3);
        assert_eq!(set.type_count(), 1);
        assert_eq!(set.method_count(), 1);
        assert_eq!(set.field_count(), 1);
        assert!(set.contains(method));
        assert_eq!(set.tokens(), vec![ty, field, method]);
    }
}
