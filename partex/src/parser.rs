//! Parser for the pattern notation
//!
//! This module provides a recursive descent parser that converts
//! tokens into a pattern tree.
//!
//! Grammar (in order of precedence, lowest to highest):
//!   choice     := sequence ( '|' sequence )*
//!   sequence   := repeat*
//!   repeat     := atom quantifier?
//!   quantifier := '*' | '+' | '?' | '{' number (',' number?)? '}'
//!   atom       := char | '\' char | '.' | class | '(' choice ')'
//!   class      := '[' '^'? class_item+ ']'
//!   class_item := char | char '-' char
//!
//! Adjacent characters fold into one literal, and an empty sequence is the
//! empty literal.

use crate::ast::Pattern;
use crate::charset::{CharClass, CharRange};
use crate::error::{ParseError, Result, Span};
use crate::lexer::{Lexer, Token};

/// Parser for the pattern notation
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    current_span: Span,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input string
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let (current_token, current_span) = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            current_span,
        })
    }

    /// Advance to the next token
    fn advance(&mut self) -> Result<()> {
        let (token, span) = self.lexer.next_token()?;
        self.current_token = token;
        self.current_span = span;
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.current_token == Token::Eof {
            return ParseError::UnexpectedEof;
        }
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current_token.to_string(),
            position: self.current_span.start,
        }
    }

    /// Expect a specific token, error if not found
    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current_token == expected {
            self.advance()
        } else {
            Err(self.unexpected(&expected.to_string()).into())
        }
    }

    /// Parse the entire input and return the pattern tree
    pub fn parse(&mut self) -> Result<Pattern> {
        let pattern = self.parse_choice()?;

        // Ensure we've consumed all tokens
        if self.current_token != Token::Eof {
            return Err(ParseError::UnexpectedToken {
                expected: "EOF".to_string(),
                found: self.current_token.to_string(),
                position: self.current_span.start,
            }
            .into());
        }

        Ok(pattern)
    }

    /// choice := sequence ( '|' sequence )*
    fn parse_choice(&mut self) -> Result<Pattern> {
        let mut alternatives = vec![self.parse_sequence()?];
        while self.current_token == Token::Pipe {
            self.advance()?;
            alternatives.push(self.parse_sequence()?);
        }

        if alternatives.len() == 1 {
            Ok(alternatives.swap_remove(0))
        } else {
            Ok(Pattern::choice(alternatives))
        }
    }

    /// sequence := repeat*
    fn parse_sequence(&mut self) -> Result<Pattern> {
        let mut items: Vec<Pattern> = Vec::new();

        while !matches!(self.current_token, Token::Eof | Token::RightParen | Token::Pipe) {
            let item = self.parse_repeat()?;
            if let (Some(Pattern::Literal(prefix)), Pattern::Literal(text)) = (items.last_mut(), &item) {
                prefix.push_str(text);
                continue;
            }
            items.push(item);
        }

        match items.len() {
            0 => Ok(Pattern::literal("")),
            1 => Ok(items.swap_remove(0)),
            _ => Ok(Pattern::Sequence(items)),
        }
    }

    /// repeat := atom quantifier?
    fn parse_repeat(&mut self) -> Result<Pattern> {
        let atom = self.parse_atom()?;
        match self.parse_quantifier()? {
            Some((min, max)) => Ok(Pattern::repeat(atom, min, max)),
            None => Ok(atom),
        }
    }

    /// Parse a quantifier if present, as `(min, max)` bounds
    fn parse_quantifier(&mut self) -> Result<Option<(u32, Option<u32>)>> {
        let bounds = match self.current_token {
            Token::Star => (0, None),
            Token::Plus => (1, None),
            Token::Question => (0, Some(1)),
            Token::LeftBrace => {
                self.advance()?; // consume '{'
                let min = self.parse_number()?;
                let max = if self.current_token == Token::Comma {
                    self.advance()?; // consume ','
                    if self.current_token == Token::RightBrace {
                        None
                    } else {
                        Some(self.parse_number()?)
                    }
                } else {
                    Some(min)
                };
                if self.current_token != Token::RightBrace {
                    return Err(self.unexpected("`}`").into());
                }
                (min, max)
            }
            _ => return Ok(None),
        };
        self.advance()?;
        Ok(Some(bounds))
    }

    /// Parse a decimal number inside braces
    fn parse_number(&mut self) -> Result<u32> {
        let mut digits = String::new();
        while let Token::Literal(c) = self.current_token {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.advance()?;
        }
        if digits.is_empty() {
            return Err(self.unexpected("number").into());
        }
        digits
            .parse()
            .map_err(|_| ParseError::InvalidQuantifier(format!("bound {} is too large", digits)).into())
    }

    /// atom := char | '\' char | '.' | class | '(' choice ')'
    fn parse_atom(&mut self) -> Result<Pattern> {
        let atom = match self.current_token {
            Token::Literal(c) | Token::Escape(c) => Pattern::literal(c),
            Token::Comma => Pattern::literal(','),
            Token::RightBrace => Pattern::literal('}'),
            Token::Caret => Pattern::literal('^'),
            Token::Dash => Pattern::literal('-'),
            Token::Dot => Pattern::Class(CharClass::any()),
            Token::LeftParen => {
                self.advance()?; // consume '('
                let inner = self.parse_choice()?;
                if self.current_token != Token::RightParen {
                    return Err(self.unexpected("`)`").into());
                }
                inner
            }
            Token::LeftBracket => return self.parse_class(),
            Token::Star | Token::Plus | Token::Question | Token::LeftBrace => {
                return Err(ParseError::InvalidQuantifier(format!(
                    "{} at position {} has nothing to repeat",
                    self.current_token, self.current_span.start
                ))
                .into());
            }
            _ => return Err(self.unexpected("expression").into()),
        };
        self.advance()?;
        Ok(atom)
    }

    /// class := '[' '^'? class_item+ ']'
    fn parse_class(&mut self) -> Result<Pattern> {
        self.expect(Token::LeftBracket)?;

        let negated = if self.current_token == Token::Caret {
            self.advance()?;
            true
        } else {
            false
        };

        let mut ranges = Vec::new();
        while self.current_token != Token::RightBracket {
            self.parse_class_item(&mut ranges)?;
        }
        if ranges.is_empty() {
            return Err(self.unexpected("character class item").into());
        }
        self.expect(Token::RightBracket)?;

        let class = if negated {
            CharClass::negated(ranges)
        } else {
            CharClass::new(ranges)
        };
        Ok(Pattern::Class(class))
    }

    /// class_item := char | char '-' char
    fn parse_class_item(&mut self, ranges: &mut Vec<CharRange>) -> Result<()> {
        let Some(start) = self.current_token.class_char() else {
            return Err(self.unexpected("character class item").into());
        };
        self.advance()?;

        if self.current_token != Token::Dash {
            ranges.push(CharRange::single(start));
            return Ok(());
        }
        self.advance()?; // consume '-'

        // A trailing dash is literal: `[a-]`
        if self.current_token == Token::RightBracket {
            ranges.extend([CharRange::single(start), CharRange::single('-')]);
            return Ok(());
        }
        let Some(end) = self.current_token.class_char() else {
            return Err(self.unexpected("range end").into());
        };
        if end < start {
            return Err(ParseError::InvalidRange(start, end).into());
        }
        self.advance()?;
        ranges.push(CharRange::new(start, end));
        Ok(())
    }
}

/// Parse a pattern string into a pattern tree
pub fn parse(input: &str) -> Result<Pattern> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PartexError;

    #[test]
    fn test_parse_literal_folds() {
        assert_eq!(parse("keyword").unwrap(), Pattern::literal("keyword"));
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(
            parse("keyword|key").unwrap(),
            Pattern::literals(["keyword", "key"])
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("").unwrap(), Pattern::literal(""));
        assert_eq!(
            parse("a|").unwrap(),
            Pattern::choice(vec![Pattern::literal("a"), Pattern::literal("")])
        );
    }

    #[test]
    fn test_quantifier_binds_to_last_char() {
        assert_eq!(
            parse("ab*").unwrap(),
            Pattern::sequence(vec![
                Pattern::literal("a"),
                Pattern::star(Pattern::literal("b")),
            ])
        );
    }

    #[test]
    fn test_parse_bounds() {
        let a = || Pattern::literal("a");
        assert_eq!(parse("a{3}").unwrap(), Pattern::repeat(a(), 3, Some(3)));
        assert_eq!(parse("a{2,}").unwrap(), Pattern::repeat(a(), 2, None));
        assert_eq!(parse("a{2,5}").unwrap(), Pattern::repeat(a(), 2, Some(5)));
        // Bounds are checked by the sort pass, not the parser.
        assert_eq!(parse("a{5,2}").unwrap(), Pattern::repeat(a(), 5, Some(2)));
    }

    #[test]
    fn test_parse_group() {
        assert_eq!(
            parse("x(a|b)+").unwrap(),
            Pattern::sequence(vec![
                Pattern::literal("x"),
                Pattern::plus(Pattern::literals(["a", "b"])),
            ])
        );
    }

    #[test]
    fn test_parse_class() {
        assert_eq!(parse("[a-z]").unwrap(), Pattern::range('a', 'z'));
        assert_eq!(
            parse("[_a-zA-Z]").unwrap(),
            Pattern::class([
                CharRange::single('_'),
                CharRange::new('a', 'z'),
                CharRange::new('A', 'Z'),
            ])
        );
        assert_eq!(
            parse("[^\"]").unwrap(),
            Pattern::Class(CharClass::negated([CharRange::single('"')]))
        );
        assert_eq!(
            parse("[a-]").unwrap(),
            Pattern::class([CharRange::single('a'), CharRange::single('-')])
        );
        assert_eq!(parse("[.*]").unwrap(), Pattern::class([CharRange::single('.'), CharRange::single('*')]));
    }

    #[test]
    fn test_parse_dot() {
        assert_eq!(parse(".").unwrap(), Pattern::Class(CharClass::any()));
    }

    #[test]
    fn test_parse_escapes() {
        assert_eq!(parse(r"a\*b\|").unwrap(), Pattern::literal("a*b|"));
    }

    #[test]
    fn test_parse_error_unclosed_group() {
        assert_eq!(
            parse("(abc").unwrap_err(),
            PartexError::Parse(ParseError::UnexpectedEof)
        );
    }

    #[test]
    fn test_parse_error_stray_paren() {
        assert_eq!(
            parse("ab)").unwrap_err(),
            PartexError::Parse(ParseError::UnexpectedToken {
                expected: "EOF".to_string(),
                found: "`)`".to_string(),
                position: 2,
            })
        );
    }

    #[test]
    fn test_parse_error_nothing_to_repeat() {
        assert!(matches!(
            parse("*a"),
            Err(PartexError::Parse(ParseError::InvalidQuantifier(_)))
        ));
    }

    #[test]
    fn test_parse_error_reversed_range() {
        assert_eq!(
            parse("[z-a]").unwrap_err(),
            PartexError::Parse(ParseError::InvalidRange('z', 'a'))
        );
    }

    #[test]
    fn test_parse_error_empty_class() {
        assert!(parse("[]").is_err());
    }

    #[test]
    fn test_lexer_error_surfaces() {
        assert!(matches!(parse("a\\"), Err(PartexError::Lexer { .. })));
    }
}
