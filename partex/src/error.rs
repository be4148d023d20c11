//! Error types for the pattern sorter
//!
//! This module provides error handling using the `thiserror` crate.
//! Errors are categorized by their source: lexing or parsing the pattern
//! notation, and the sort pass itself. Every sort error is fatal to the
//! whole pass; no partially annotated tree is ever returned.

use thiserror::Error;

use crate::ast::ChoiceId;
use crate::dfa::StateId;

/// The main error type for the crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartexError {
    /// Errors that occur while tokenizing the pattern notation
    #[error("lexer error at position {position}: {kind}")]
    Lexer {
        /// Position in the input where the error occurred
        position: usize,
        /// The specific kind of lexer error
        kind: LexerErrorKind,
    },

    /// Errors that occur while parsing the pattern notation
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Errors raised by the sort pass
    #[error("sort error: {0}")]
    Sort(#[from] SortError),
}

/// Specific kinds of lexer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// A backslash at the very end of the input
    #[error("dangling escape")]
    DanglingEscape,

    /// Invalid escape sequence
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
}

/// Errors that occur during parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unexpected token encountered
    #[error("expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        /// What was expected
        expected: String,
        /// What was actually found
        found: String,
        /// Where it was found
        position: usize,
    },

    /// Unexpected end of input
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid repetition quantifier
    #[error("invalid quantifier: {0}")]
    InvalidQuantifier(String),

    /// Invalid character class range such as `z-a`
    #[error("invalid class range '{0}-{1}'")]
    InvalidRange(char, char),
}

/// Errors raised while sorting a pattern tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    /// A structurally invalid node
    #[error("malformed pattern: {0}")]
    MalformedPattern(MalformedKind),

    /// The subset relation among a choice's branches contains a cycle
    #[error("ambiguous ordering in choice {choice}: branches {branches:?} cannot be linearized")]
    AmbiguousOrdering {
        /// The choice whose branches form a cycle
        choice: ChoiceId,
        /// Declaration indices of the branches left unplaced
        branches: Vec<usize>,
    },

    /// A post-match expansion entered a cycle that never reaches a match
    #[error(
        "unbounded lookahead in choice {choice}, branch {branch}: state {state} cycles without reaching a match"
    )]
    UnboundedLookahead {
        /// The choice being annotated
        choice: ChoiceId,
        /// Declaration index of the branch whose discriminator was being built
        branch: usize,
        /// The automaton state where the dead cycle was re-entered
        state: StateId,
    },
}

/// Why a node was rejected as malformed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// A sequence with no children
    #[error("empty sequence")]
    EmptySequence,

    /// A choice with no branches
    #[error("empty choice")]
    EmptyChoice,

    /// A repetition whose lower bound exceeds its upper bound
    #[error("invalid repetition bounds {{{min},{max}}}")]
    InvalidBounds {
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },
}

impl From<MalformedKind> for SortError {
    fn from(kind: MalformedKind) -> Self {
        SortError::MalformedPattern(kind)
    }
}

/// A span representing a location in the pattern notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (inclusive)
    pub start: usize,
    /// End position (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single character
    pub fn single(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, PartexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_error_display() {
        let err = PartexError::Lexer {
            position: 5,
            kind: LexerErrorKind::InvalidEscape('q'),
        };
        assert_eq!(
            err.to_string(),
            "lexer error at position 5: invalid escape sequence '\\q'"
        );
    }

    #[test]
    fn test_parse_error_unexpected_token() {
        let err = ParseError::UnexpectedToken {
            expected: "`)`".to_string(),
            found: "EOF".to_string(),
            position: 3,
        };
        assert_eq!(err.to_string(), "expected `)`, found EOF at position 3");
    }

    #[test]
    fn test_malformed_display() {
        let err: SortError = MalformedKind::InvalidBounds { min: 3, max: 1 }.into();
        assert_eq!(
            err.to_string(),
            "malformed pattern: invalid repetition bounds {3,1}"
        );
    }

    #[test]
    fn test_ambiguous_ordering_display() {
        let err = SortError::AmbiguousOrdering {
            choice: 2,
            branches: vec![0, 1],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous ordering in choice 2: branches [0, 1] cannot be linearized"
        );
    }

    #[test]
    fn test_error_from_sort_error() {
        let err: PartexError = SortError::MalformedPattern(MalformedKind::EmptyChoice).into();
        assert_eq!(err.to_string(), "sort error: malformed pattern: empty choice");
    }

    #[test]
    fn test_span_creation() {
        let span = Span::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert_eq!(Span::single(5), Span::new(5, 6));
    }
}
