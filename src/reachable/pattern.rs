//! Glob matching for include rules.
//!
//! Supports `*` (any run of characters, including none) and `?` (exactly one character).
//! Everything else matches literally and case-sensitively.

use std::fmt;

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    pieces: Vec<Piece>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Piece {
    Literal(char),
    Any,
    Star,
}

impl Pattern {
    /// Compiles a pattern. Consecutive `*` collapse into one.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut pieces = Vec::with_capacity(source.len());
        for c in source.chars() {
            let piece = match c {
                '*' => Piece::Star,
                '?' => Piece::Any,
                other => Piece::Literal(other),
            };
            if piece == Piece::Star && pieces.last() == Some(&Piece::Star) {
                continue;
            }
            pieces.push(piece);
        }

        Pattern { source, pieces }
    }

    /// The pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern contains no wildcard.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.pieces.iter().all(|p| matches!(p, Piece::Literal(_)))
    }

    /// True if `text` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let (mut p, mut t) = (0, 0);
        // Backtrack point: position after the last star, and the text position it absorbed to
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.pieces.get(p) {
                Some(Piece::Literal(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                }
                Some(Piece::Any) => {
                    p += 1;
                    t += 1;
                }
                Some(Piece::Star) => {
                    star = Some((p + 1, t));
                    p += 1;
                }
                _ => match star {
                    Some((after, absorbed)) => {
                        p = after;
                        t = absorbed + 1;
                        star = Some((after, absorbed + 1));
                    }
                    None => return false,
                },
            }
        }

        self.pieces[p..].iter().all(|piece| *piece == Piece::Star)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Pattern::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        let pattern = Pattern::new("App.Program");
        assert!(pattern.is_literal());
        assert!(pattern.matches("App.Program"));
        assert!(!pattern.matches("App.program"));
        assert!(!pattern.matches("App.Programs"));
    }

    #[test]
    fn test_wildcards() {
        let star = Pattern::new("App.*");
        assert!(star.matches("App."));
        assert!(star.matches("App.Views.Main"));
        assert!(!star.matches("Lib.App.Main"));

        let inner = Pattern::new("*.View*Model");
        assert!(inner.matches("App.ViewModel"));
        assert!(inner.matches("App.Views.ViewMainModel"));
        assert!(!inner.matches("App.ViewModels"));

        let single = Pattern::new("T?");
        assert!(single.matches("T1"));
        assert!(!single.matches("T"));
        assert!(!single.matches("T12"));

        assert!(Pattern::new("**").matches(""));
        assert!(Pattern::new("*a*b").matches("xaxxab"));
    }
}
