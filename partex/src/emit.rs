//! Regex emission for annotated pattern trees
//!
//! Produces PCRE/Oniguruma-style text. A guarded branch prints as
//! `B(?!d1|d2)`; when `B` can backtrack it is wrapped in an atomic group
//! `(?>B)` so the engine cannot retreat into a shorter match of `B` that the
//! lookahead never examined.

use crate::ast::{Branch, Pattern};
use crate::charset::{CharClass, CharRange};
use crate::discriminator::Discriminator;

/// Serialize a pattern tree to regex text
pub fn emit(pattern: &Pattern) -> String {
    let mut out = String::new();
    write_pattern(&mut out, pattern);
    out
}

/// Serialize a character class
///
/// A single character prints escaped on its own, the full class as
/// `[\s\S]`, and anything else as a bracket expression. The negated form is
/// used when it needs fewer ranges.
pub fn class_to_regex(class: &CharClass) -> String {
    if let Some(c) = class.as_char() {
        return escape_char(c);
    }
    if class.is_empty() {
        return "[^\\s\\S]".to_string();
    }
    let complement = CharClass::negated(class.ranges().iter().copied());
    if complement.is_empty() {
        return "[\\s\\S]".to_string();
    }

    let mut out = String::from("[");
    let ranges = if complement.ranges().len() < class.ranges().len() {
        out.push('^');
        complement.ranges()
    } else {
        class.ranges()
    };
    for range in ranges {
        write_class_range(&mut out, range);
    }
    out.push(']');
    out
}

/// Serialize a discriminator as a negative lookahead
pub fn discriminator_to_regex(discriminator: &Discriminator) -> String {
    if discriminator.is_empty() {
        return String::new();
    }
    let alternatives: Vec<String> = discriminator
        .sequences()
        .map(|sequence| sequence.iter().map(class_to_regex).collect())
        .collect();
    format!("(?!{})", alternatives.join("|"))
}

fn write_pattern(out: &mut String, pattern: &Pattern) {
    match pattern {
        Pattern::Literal(text) => {
            for c in text.chars() {
                out.push_str(&escape_char(c));
            }
        }
        Pattern::Class(class) => out.push_str(&class_to_regex(class)),
        Pattern::Sequence(items) => {
            for item in items {
                if matches!(item, Pattern::Choice(_)) {
                    write_group(out, item);
                } else {
                    write_pattern(out, item);
                }
            }
        }
        Pattern::Choice(branches) => {
            for (i, branch) in branches.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                write_branch(out, branch);
            }
        }
        Pattern::Repetition { pattern, min, max } => {
            if is_single_atom(pattern) {
                write_pattern(out, pattern);
            } else {
                write_group(out, pattern);
            }
            write_quantifier(out, *min, *max);
        }
    }
}

fn write_branch(out: &mut String, branch: &Branch) {
    let guard = branch
        .discriminator
        .as_ref()
        .filter(|discriminator| !discriminator.is_empty());
    match guard {
        Some(discriminator) if branch.pattern.can_backtrack() => {
            out.push_str("(?>");
            write_pattern(out, &branch.pattern);
            out.push(')');
            out.push_str(&discriminator_to_regex(discriminator));
        }
        Some(discriminator) => {
            write_body(out, &branch.pattern);
            out.push_str(&discriminator_to_regex(discriminator));
        }
        None => write_body(out, &branch.pattern),
    }
}

/// A branch body; a choice nested directly in a branch keeps its own group
fn write_body(out: &mut String, pattern: &Pattern) {
    if matches!(pattern, Pattern::Choice(_)) {
        write_group(out, pattern);
    } else {
        write_pattern(out, pattern);
    }
}

fn write_group(out: &mut String, pattern: &Pattern) {
    out.push_str("(?:");
    write_pattern(out, pattern);
    out.push(')');
}

fn write_quantifier(out: &mut String, min: u32, max: Option<u32>) {
    match (min, max) {
        (0, None) => out.push('*'),
        (1, None) => out.push('+'),
        (0, Some(1)) => out.push('?'),
        (m, None) => out.push_str(&format!("{{{},}}", m)),
        (m, Some(n)) if m == n => out.push_str(&format!("{{{}}}", m)),
        (m, Some(n)) => out.push_str(&format!("{{{},{}}}", m, n)),
    }
}

/// Whether a quantifier can follow the pattern without a group
fn is_single_atom(pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Class(_) => true,
        Pattern::Literal(text) => text.chars().count() == 1,
        _ => false,
    }
}

fn write_class_range(out: &mut String, range: &CharRange) {
    out.push_str(&escape_class_char(range.start));
    if range.start == range.end {
        return;
    }
    // Two adjacent characters read better without a dash.
    if range.end as u32 != range.start as u32 + 1 {
        out.push('-');
    }
    out.push_str(&escape_class_char(range.end));
}

fn escape_char(c: char) -> String {
    match c {
        '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' => {
            format!("\\{}", c)
        }
        _ => escape_control(c),
    }
}

fn escape_class_char(c: char) -> String {
    match c {
        '\\' | ']' | '[' | '^' | '-' => format!("\\{}", c),
        _ => escape_control(c),
    }
}

fn escape_control(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        c if c.is_control() || c == '\u{10FFFF}' => format!("\\x{{{:x}}}", c as u32),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guarded(pattern: Pattern, words: &[&str]) -> Branch {
        Branch {
            pattern,
            discriminator: Some(Discriminator::from_literals(words.iter().copied())),
        }
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(emit(&Pattern::literal("a.b")), "a\\.b");
        assert_eq!(emit(&Pattern::literal("(x)*")), "\\(x\\)\\*");
        assert_eq!(emit(&Pattern::literal("tab\t")), "tab\\t");
    }

    #[test]
    fn test_class_forms() {
        assert_eq!(emit(&Pattern::range('a', 'z')), "[a-z]");
        assert_eq!(emit(&Pattern::range('a', 'b')), "[ab]");
        assert_eq!(emit(&Pattern::range('-', '-')), "-");
        assert_eq!(
            class_to_regex(&CharClass::new([CharRange::single('-'), CharRange::single(']')])),
            "[\\-\\]]"
        );
        assert_eq!(class_to_regex(&CharClass::any()), "[\\s\\S]");
        assert_eq!(class_to_regex(&CharClass::default()), "[^\\s\\S]");
    }

    #[test]
    fn test_negated_class_prints_compactly() {
        let class = CharClass::negated([CharRange::single('"'), CharRange::single('\\')]);
        assert_eq!(class_to_regex(&class), "[^\"\\\\]");
    }

    #[test]
    fn test_nested_choice_is_grouped() {
        let pattern = Pattern::sequence(vec![
            Pattern::literal("x"),
            Pattern::literals(["a", "b"]),
        ]);
        assert_eq!(emit(&pattern), "x(?:a|b)");
        let nested = Pattern::choice(vec![Pattern::literals(["a", "b"]), Pattern::literal("c")]);
        assert_eq!(emit(&nested), "(?:a|b)|c");
    }

    #[test]
    fn test_quantifiers() {
        let a = || Pattern::literal("a");
        assert_eq!(emit(&Pattern::star(a())), "a*");
        assert_eq!(emit(&Pattern::plus(a())), "a+");
        assert_eq!(emit(&Pattern::optional(a())), "a?");
        assert_eq!(emit(&Pattern::repeat(a(), 3, Some(3))), "a{3}");
        assert_eq!(emit(&Pattern::repeat(a(), 2, None)), "a{2,}");
        assert_eq!(emit(&Pattern::repeat(a(), 2, Some(5))), "a{2,5}");
        assert_eq!(emit(&Pattern::star(Pattern::literal("ab"))), "(?:ab)*");
        assert_eq!(emit(&Pattern::plus(Pattern::literals(["a", "b"]))), "(?:a|b)+");
    }

    #[test]
    fn test_guarded_literal_branch() {
        let pattern = Pattern::Choice(vec![
            guarded(Pattern::literal("key"), &["word"]),
            Branch::new(Pattern::literal("keyword")),
        ]);
        assert_eq!(emit(&pattern), "key(?!word)|keyword");
    }

    #[test]
    fn test_backtracking_branch_is_atomic() {
        let pattern = Pattern::Choice(vec![
            guarded(Pattern::plus(Pattern::literal("a")), &["b"]),
            Branch::new(Pattern::sequence(vec![
                Pattern::plus(Pattern::literal("a")),
                Pattern::literal("b"),
            ])),
        ]);
        assert_eq!(emit(&pattern), "(?>a+)(?!b)|a+b");
    }

    #[test]
    fn test_discriminator_with_classes() {
        let disc = Discriminator::new([
            vec![CharClass::new([CharRange::new('a', 'z')])],
            vec![CharClass::single('.'), CharClass::single('x')],
        ]);
        assert_eq!(discriminator_to_regex(&disc), "(?!\\.x|[a-z])");
        assert_eq!(discriminator_to_regex(&Discriminator::default()), "");
    }
}
