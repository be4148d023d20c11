//! Lexer for the pattern notation
//!
//! This module converts a pattern string into a stream of tokens, each
//! paired with its byte span in the input.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{LexerErrorKind, PartexError, Result, Span};

/// A token in the pattern notation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Left bracket `[` (start of character class)
    LeftBracket,
    /// Right bracket `]` (end of character class)
    RightBracket,
    /// Left brace `{` (start of bounded repetition)
    LeftBrace,
    /// Right brace `}`
    RightBrace,
    /// Comma `,` (used in bounds like {n,m})
    Comma,
    /// Pipe `|` (choice)
    Pipe,
    /// Caret `^` (negation in character class)
    Caret,
    /// Dash `-` (range in character class)
    Dash,
    /// Dot `.` (any character)
    Dot,
    /// Star `*` (zero or more)
    Star,
    /// Plus `+` (one or more)
    Plus,
    /// Question `?` (optional)
    Question,
    /// An escaped character, already resolved (`\n` yields a newline)
    Escape(char),
    /// A literal character
    Literal(char),
    /// End of input
    Eof,
}

impl Token {
    /// The character this token stands for inside a character class
    pub fn class_char(&self) -> Option<char> {
        match self {
            Token::LeftParen => Some('('),
            Token::RightParen => Some(')'),
            Token::LeftBracket => Some('['),
            Token::LeftBrace => Some('{'),
            Token::RightBrace => Some('}'),
            Token::Comma => Some(','),
            Token::Pipe => Some('|'),
            Token::Caret => Some('^'),
            Token::Dash => Some('-'),
            Token::Dot => Some('.'),
            Token::Star => Some('*'),
            Token::Plus => Some('+'),
            Token::Question => Some('?'),
            Token::Escape(c) | Token::Literal(c) => Some(*c),
            Token::RightBracket | Token::Eof => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LeftParen => write!(f, "`(`"),
            Token::RightParen => write!(f, "`)`"),
            Token::LeftBracket => write!(f, "`[`"),
            Token::RightBracket => write!(f, "`]`"),
            Token::LeftBrace => write!(f, "`{{`"),
            Token::RightBrace => write!(f, "`}}`"),
            Token::Comma => write!(f, "`,`"),
            Token::Pipe => write!(f, "`|`"),
            Token::Caret => write!(f, "`^`"),
            Token::Dash => write!(f, "`-`"),
            Token::Dot => write!(f, "`.`"),
            Token::Star => write!(f, "`*`"),
            Token::Plus => write!(f, "`+`"),
            Token::Question => write!(f, "`?`"),
            Token::Escape(c) if c.is_control() => write!(f, "escape `{}`", c.escape_default()),
            Token::Escape(c) => write!(f, "escape `\\{}`", c),
            Token::Literal(c) => write!(f, "literal `{}`", c),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer for the pattern notation
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input string
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Read an escape sequence; `start` is the position of the backslash
    fn read_escape(&mut self, start: usize) -> Result<(Token, Span)> {
        let Some((pos, c)) = self.chars.next() else {
            return Err(PartexError::Lexer {
                position: start,
                kind: LexerErrorKind::DanglingEscape,
            });
        };
        let resolved = match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            c if c.is_alphanumeric() => {
                return Err(PartexError::Lexer {
                    position: start,
                    kind: LexerErrorKind::InvalidEscape(c),
                });
            }
            c => c,
        };
        Ok((Token::Escape(resolved), Span::new(start, pos + c.len_utf8())))
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<(Token, Span)> {
        let Some((start, c)) = self.chars.next() else {
            let end = self.input.len();
            return Ok((Token::Eof, Span::new(end, end)));
        };
        let token = match c {
            '\\' => return self.read_escape(start),
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            ',' => Token::Comma,
            '|' => Token::Pipe,
            '^' => Token::Caret,
            '-' => Token::Dash,
            '.' => Token::Dot,
            '*' => Token::Star,
            '+' => Token::Plus,
            '?' => Token::Question,
            c => Token::Literal(c),
        };
        Ok((token, Span::new(start, start + c.len_utf8())))
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let (token, _) = self.next_token()?;
            tokens.push(token);
            if token == Token::Eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_of_literals() {
        let tokens = Lexer::new("ab|c").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal('a'),
                Token::Literal('b'),
                Token::Pipe,
                Token::Literal('c'),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_character_class() {
        let tokens = Lexer::new("[^a-z]").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LeftBracket,
                Token::Caret,
                Token::Literal('a'),
                Token::Dash,
                Token::Literal('z'),
                Token::RightBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_bounds() {
        let tokens = Lexer::new("a{2,3}").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal('a'),
                Token::LeftBrace,
                Token::Literal('2'),
                Token::Comma,
                Token::Literal('3'),
                Token::RightBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_escape_sequences() {
        let tokens = Lexer::new(r"\*\n\\").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Escape('*'),
                Token::Escape('\n'),
                Token::Escape('\\'),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let mut lexer = Lexer::new("é\\+");
        assert_eq!(lexer.next_token().unwrap(), (Token::Literal('é'), Span::new(0, 2)));
        assert_eq!(lexer.next_token().unwrap(), (Token::Escape('+'), Span::new(2, 4)));
        assert_eq!(lexer.next_token().unwrap(), (Token::Eof, Span::new(4, 4)));
    }

    #[test]
    fn test_dangling_escape() {
        let err = Lexer::new("ab\\").tokenize().unwrap_err();
        assert_eq!(
            err,
            PartexError::Lexer {
                position: 2,
                kind: LexerErrorKind::DanglingEscape
            }
        );
    }

    #[test]
    fn test_invalid_escape() {
        let err = Lexer::new("\\d").tokenize().unwrap_err();
        assert_eq!(
            err,
            PartexError::Lexer {
                position: 0,
                kind: LexerErrorKind::InvalidEscape('d')
            }
        );
    }

    #[test]
    fn test_class_char() {
        assert_eq!(Token::Star.class_char(), Some('*'));
        assert_eq!(Token::Escape(']').class_char(), Some(']'));
        assert_eq!(Token::RightBracket.class_char(), None);
    }
}
