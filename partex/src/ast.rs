//! Pattern tree for grammars
//!
//! This module defines the grammar representation the sort pass works on:
//! - Literals (a fixed symbol sequence) and character classes
//! - Sequences (concatenation)
//! - Choices (ordered alternation), whose branches may carry a discriminator
//! - Repetitions with lower and optional upper bounds
//!
//! The tree is finite and acyclic; every node is owned by its parent.

use std::fmt;

use crate::charset::{CharClass, CharRange};
use crate::discriminator::Discriminator;

/// Identifier of a choice node within one sort pass
pub type ChoiceId = usize;

/// A node in the pattern tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// A fixed sequence of characters (may be empty)
    Literal(String),

    /// Any one character from a class
    Class(CharClass),

    /// Concatenation of patterns
    Sequence(Vec<Pattern>),

    /// Ordered alternation
    Choice(Vec<Branch>),

    /// Bounded or unbounded repetition
    Repetition {
        /// The pattern being repeated
        pattern: Box<Pattern>,
        /// Minimum number of repetitions
        min: u32,
        /// Maximum number of repetitions, `None` for unbounded
        max: Option<u32>,
    },
}

/// One alternative of a choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// The alternative's pattern
    pub pattern: Pattern,
    /// Forbidden continuations, present only after sorting
    pub discriminator: Option<Discriminator>,
}

impl Branch {
    /// Create an unannotated branch
    pub fn new(pattern: Pattern) -> Self {
        Branch {
            pattern,
            discriminator: None,
        }
    }
}

impl From<Pattern> for Branch {
    fn from(pattern: Pattern) -> Self {
        Branch::new(pattern)
    }
}

impl Pattern {
    /// Create a literal
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// Create a class from ranges
    pub fn class(ranges: impl IntoIterator<Item = CharRange>) -> Self {
        Pattern::Class(CharClass::new(ranges))
    }

    /// Create a class matching one range, such as `a-z`
    pub fn range(start: char, end: char) -> Self {
        Pattern::Class(CharClass::new([CharRange::new(start, end)]))
    }

    /// Create a sequence
    pub fn sequence(items: Vec<Pattern>) -> Self {
        Pattern::Sequence(items)
    }

    /// Create a choice of unannotated branches
    pub fn choice(alternatives: Vec<Pattern>) -> Self {
        Pattern::Choice(alternatives.into_iter().map(Branch::new).collect())
    }

    /// Create a choice of literals, in declaration order
    pub fn literals<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Pattern::choice(words.into_iter().map(Pattern::literal).collect())
    }

    /// Create a repetition
    pub fn repeat(pattern: Pattern, min: u32, max: Option<u32>) -> Self {
        Pattern::Repetition {
            pattern: Box::new(pattern),
            min,
            max,
        }
    }

    /// Zero or more repetitions
    pub fn star(pattern: Pattern) -> Self {
        Pattern::repeat(pattern, 0, None)
    }

    /// One or more repetitions
    pub fn plus(pattern: Pattern) -> Self {
        Pattern::repeat(pattern, 1, None)
    }

    /// Zero or one occurrence
    pub fn optional(pattern: Pattern) -> Self {
        Pattern::repeat(pattern, 0, Some(1))
    }

    /// The branches of a choice node, if this is one
    pub fn branches(&self) -> Option<&[Branch]> {
        match self {
            Pattern::Choice(branches) => Some(branches),
            _ => None,
        }
    }

    /// Whether any repetition or choice occurs in this subtree
    pub fn can_backtrack(&self) -> bool {
        match self {
            Pattern::Literal(_) | Pattern::Class(_) => false,
            Pattern::Sequence(items) => items.iter().any(Pattern::can_backtrack),
            Pattern::Choice(_) | Pattern::Repetition { .. } => true,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::emit::emit(self))
    }
}
