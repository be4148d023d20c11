//! Partex
//!
//! Orders the alternatives of a grammar's choices so that the most specific
//! branch is tried first, and guards branches that could shadow a longer
//! alternative with a negative lookahead. The annotated tree can be emitted
//! as a backtracking regex whose ordered alternation then behaves like a
//! longest-match tokenizer.

pub mod ast;
pub mod charset;
pub mod classify;
pub mod dfa;
pub mod discriminator;
pub mod emit;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod nfa;
pub mod order;
pub mod parser;
pub mod sort;

pub use ast::{Branch, ChoiceId, Pattern};
pub use charset::{CharClass, CharRange};
pub use classify::Classification;
pub use dfa::{Dfa, DfaState, StateId, StateKind};
pub use discriminator::{Discriminator, synthesize};
pub use emit::emit;
pub use engine::{Match, Matcher};
pub use error::{LexerErrorKind, MalformedKind, ParseError, PartexError, Result, SortError, Span};
pub use lexer::{Lexer, Token};
pub use nfa::{BranchMarker, Nfa};
pub use order::plan_order;
pub use parser::{Parser, parse};
pub use sort::{ChoiceReport, Sorter, sort};

/// Parse a pattern in notation form, sort it, and emit the regex
///
/// This is the main entry point for turning a grammar into a regex.
pub fn compile(input: &str) -> Result<String> {
    let pattern = parse(input)?;
    let sorted = sort(&pattern)?;
    Ok(emit(&sorted))
}
