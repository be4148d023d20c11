//! Reference backtracking matcher
//!
//! Runs an annotated pattern tree with the semantics of the emitted regex:
//! ordered alternation, greedy repetition, and guarded branches that match
//! atomically before their discriminator is checked against the rest of the
//! input. It is used to check sorted trees against their intent.
//!
//! The tree is compiled into small backtracking programs. Backtrack points
//! live on an explicit stack, so input length never grows the call stack;
//! only guarded branches run as nested programs.

use crate::ast::{Branch, Pattern};
use crate::charset::CharClass;
use crate::discriminator::Discriminator;

/// A match result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Byte offset where the match starts
    pub start: usize,
    /// Byte offset where the match ends (exclusive)
    pub end: usize,
    /// Index of the root choice branch that fired, if the root is a choice
    pub branch: Option<usize>,
}

impl Match {
    /// Get the matched text
    pub fn as_str<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }

    /// Length of the match in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the match is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A matcher over a pattern tree
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Pattern,
    programs: Vec<Program>,
    /// One program per root branch, or a single one for a non-choice root
    entries: Vec<usize>,
}

impl Matcher {
    /// Create a matcher for a (usually sorted) pattern tree
    pub fn new(pattern: &Pattern) -> Self {
        let mut compiler = Compiler::default();
        let entries = match pattern {
            Pattern::Choice(branches) => branches
                .iter()
                .map(|branch| {
                    let mut program = Program::default();
                    compiler.branch(&mut program, branch);
                    compiler.finish(program)
                })
                .collect(),
            pattern => {
                let mut program = Program::default();
                compiler.pattern(&mut program, pattern);
                vec![compiler.finish(program)]
            }
        };
        Matcher {
            pattern: pattern.clone(),
            programs: compiler.programs,
            entries,
        }
    }

    /// The pattern being matched
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Check if the pattern matches anywhere in the input
    pub fn is_match(&self, input: &str) -> bool {
        self.find(input).is_some()
    }

    /// Find the first match in the input
    pub fn find(&self, input: &str) -> Option<Match> {
        let run = Run::new(input);
        (0..=run.chars.len()).find_map(|start| self.match_from(&run, start))
    }

    /// Match anchored at byte offset `pos`
    ///
    /// Returns `None` if `pos` is not a character boundary of `input`.
    pub fn match_at(&self, input: &str, pos: usize) -> Option<Match> {
        let run = Run::new(input);
        let start = run.offsets.binary_search(&pos).ok()?;
        self.match_from(&run, start)
    }

    fn match_from(&self, run: &Run<'_>, start: usize) -> Option<Match> {
        let (fired, end) = self
            .entries
            .iter()
            .enumerate()
            .find_map(|(fired, &entry)| Some((fired, run.exec(&self.programs, entry, start)?)))?;

        Some(Match {
            start: run.offsets[start],
            end: run.offsets[end],
            branch: matches!(self.pattern, Pattern::Choice(_)).then_some(fired),
        })
    }
}

#[derive(Debug, Clone)]
enum Inst {
    /// Consume this character
    Char(char),
    /// Consume one character of the class
    Class(CharClass),
    /// Continue at the first target; backtrack to the second
    Split(usize, usize),
    Jump(usize),
    /// Record where a loop iteration starts
    Mark(usize),
    /// Fail if the iteration begun at the slot's mark consumed nothing
    Progress(usize),
    /// Run a guarded branch to its first end, then check what follows
    Guard {
        body: usize,
        discriminator: Discriminator,
    },
    Fail,
    Match,
}

#[derive(Debug, Clone, Default)]
struct Program {
    insts: Vec<Inst>,
    slots: usize,
}

impl Program {
    fn push(&mut self, inst: Inst) -> usize {
        self.insts.push(inst);
        self.insts.len() - 1
    }

    fn next(&self) -> usize {
        self.insts.len()
    }
}

#[derive(Debug, Default)]
struct Compiler {
    programs: Vec<Program>,
}

impl Compiler {
    /// Terminate `program` and store it, returning its id
    fn finish(&mut self, mut program: Program) -> usize {
        program.push(Inst::Match);
        self.programs.push(program);
        self.programs.len() - 1
    }

    fn pattern(&mut self, program: &mut Program, pattern: &Pattern) {
        match pattern {
            Pattern::Literal(text) => program.insts.extend(text.chars().map(Inst::Char)),
            Pattern::Class(class) => {
                program.push(Inst::Class(class.clone()));
            }
            Pattern::Sequence(items) => {
                for item in items {
                    self.pattern(program, item);
                }
            }
            Pattern::Choice(branches) => self.choice(program, branches),
            Pattern::Repetition { pattern, min, max } => self.repeat(program, pattern, *min, *max),
        }
    }

    fn choice(&mut self, program: &mut Program, branches: &[Branch]) {
        let Some((last, rest)) = branches.split_last() else {
            program.push(Inst::Fail);
            return;
        };

        let mut exits = Vec::with_capacity(rest.len());
        for branch in rest {
            let split = program.push(Inst::Split(0, 0));
            self.branch(program, branch);
            exits.push(program.push(Inst::Jump(0)));
            program.insts[split] = Inst::Split(split + 1, program.next());
        }
        self.branch(program, last);

        let end = program.next();
        for exit in exits {
            program.insts[exit] = Inst::Jump(end);
        }
    }

    fn branch(&mut self, program: &mut Program, branch: &Branch) {
        let guard = branch
            .discriminator
            .as_ref()
            .filter(|discriminator| !discriminator.is_empty());
        match guard {
            Some(discriminator) => {
                let mut body = Program::default();
                self.pattern(&mut body, &branch.pattern);
                let body = self.finish(body);
                program.push(Inst::Guard {
                    body,
                    discriminator: discriminator.clone(),
                });
            }
            None => self.pattern(program, &branch.pattern),
        }
    }

    /// Greedy repetition, unrolled up to the bounds
    fn repeat(&mut self, program: &mut Program, pattern: &Pattern, min: u32, max: Option<u32>) {
        if max.is_some_and(|max| max < min) {
            program.push(Inst::Fail);
            return;
        }
        for _ in 0..min {
            self.pattern(program, pattern);
        }

        match max {
            None => {
                let top = program.push(Inst::Split(0, 0));
                self.iteration(program, pattern);
                program.push(Inst::Jump(top));
                program.insts[top] = Inst::Split(top + 1, program.next());
            }
            Some(max) => {
                let splits: Vec<usize> = (min..max)
                    .map(|_| {
                        let split = program.push(Inst::Split(0, 0));
                        self.iteration(program, pattern);
                        split
                    })
                    .collect();
                let end = program.next();
                for split in splits {
                    program.insts[split] = Inst::Split(split + 1, end);
                }
            }
        }
    }

    /// An optional iteration, which must consume input to count
    fn iteration(&mut self, program: &mut Program, pattern: &Pattern) {
        if !matches_empty(pattern) {
            self.pattern(program, pattern);
            return;
        }
        let slot = program.slots;
        program.slots += 1;
        program.push(Inst::Mark(slot));
        self.pattern(program, pattern);
        program.push(Inst::Progress(slot));
    }
}

fn matches_empty(pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Literal(text) => text.is_empty(),
        Pattern::Class(_) => false,
        Pattern::Sequence(items) => items.iter().all(matches_empty),
        Pattern::Choice(branches) => branches.iter().any(|branch| matches_empty(&branch.pattern)),
        Pattern::Repetition { pattern, min, .. } => *min == 0 || matches_empty(pattern),
    }
}

enum Frame {
    Resume { pc: usize, pos: usize },
    Restore { slot: usize, value: usize },
}

/// Input prepared for one matching call; positions are char indices
struct Run<'a> {
    input: &'a str,
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl<'a> Run<'a> {
    fn new(input: &'a str) -> Self {
        let mut chars = Vec::new();
        let mut offsets = Vec::new();
        for (offset, c) in input.char_indices() {
            offsets.push(offset);
            chars.push(c);
        }
        offsets.push(input.len());
        Run {
            input,
            chars,
            offsets,
        }
    }

    fn rest(&self, pos: usize) -> &'a str {
        &self.input[self.offsets[pos]..]
    }

    /// Run program `id` from `start`, returning the end of the first match
    fn exec(&self, programs: &[Program], id: usize, start: usize) -> Option<usize> {
        let program = &programs[id];
        let mut slots = vec![usize::MAX; program.slots];
        let mut stack = vec![Frame::Resume { pc: 0, pos: start }];

        while let Some(frame) = stack.pop() {
            let (mut pc, mut pos) = match frame {
                Frame::Resume { pc, pos } => (pc, pos),
                Frame::Restore { slot, value } => {
                    slots[slot] = value;
                    continue;
                }
            };
            loop {
                match &program.insts[pc] {
                    Inst::Char(c) if self.chars.get(pos) == Some(c) => {
                        pc += 1;
                        pos += 1;
                    }
                    Inst::Class(class) if self.chars.get(pos).is_some_and(|&c| class.contains(c)) => {
                        pc += 1;
                        pos += 1;
                    }
                    Inst::Split(first, second) => {
                        stack.push(Frame::Resume { pc: *second, pos });
                        pc = *first;
                    }
                    Inst::Jump(target) => pc = *target,
                    Inst::Mark(slot) => {
                        stack.push(Frame::Restore {
                            slot: *slot,
                            value: slots[*slot],
                        });
                        slots[*slot] = pos;
                        pc += 1;
                    }
                    Inst::Progress(slot) if slots[*slot] != pos => pc += 1,
                    Inst::Guard {
                        body,
                        discriminator,
                    } => match self.exec(programs, *body, pos) {
                        Some(end) if !discriminator.forbids(self.rest(end)) => {
                            pos = end;
                            pc += 1;
                        }
                        _ => break,
                    },
                    Inst::Match => return Some(pos),
                    _ => break,
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discriminator::Discriminator;

    fn guarded(pattern: Pattern, words: &[&str]) -> Branch {
        Branch {
            pattern,
            discriminator: Some(Discriminator::from_literals(words.iter().copied())),
        }
    }

    #[test]
    fn test_literal_match() {
        let matcher = Matcher::new(&Pattern::literal("abc"));
        assert!(matcher.is_match("xxabcxx"));
        assert!(!matcher.is_match("abx"));
        let m = matcher.find("xxabc").unwrap();
        assert_eq!((m.start, m.end, m.branch), (2, 5, None));
    }

    #[test]
    fn test_ordered_alternation_takes_first_branch() {
        let matcher = Matcher::new(&Pattern::literals(["key", "keyword"]));
        let m = matcher.match_at("keyword", 0).unwrap();
        assert_eq!(m.as_str("keyword"), "key");
        assert_eq!(m.branch, Some(0));
    }

    #[test]
    fn test_discriminator_rejects_branch() {
        let pattern = Pattern::Choice(vec![
            guarded(Pattern::literal("key"), &["word"]),
            Branch::new(Pattern::literal("keyword")),
        ]);
        let matcher = Matcher::new(&pattern);
        let m = matcher.match_at("keyword", 0).unwrap();
        assert_eq!((m.end, m.branch), (7, Some(1)));
        let m = matcher.match_at("keys", 0).unwrap();
        assert_eq!((m.end, m.branch), (3, Some(0)));
    }

    #[test]
    fn test_greedy_repetition_backtracks() {
        let pattern = Pattern::sequence(vec![
            Pattern::star(Pattern::literal("a")),
            Pattern::literal("ab"),
        ]);
        let m = Matcher::new(&pattern).match_at("aaab", 0).unwrap();
        assert_eq!(m.end, 4);
    }

    #[test]
    fn test_guarded_branch_is_atomic() {
        let a_plus = || Pattern::plus(Pattern::literal("a"));
        let pattern = Pattern::Choice(vec![
            guarded(a_plus(), &["b"]),
            Branch::new(Pattern::sequence(vec![a_plus(), Pattern::literal("b")])),
        ]);
        let matcher = Matcher::new(&pattern);
        // Retreating to "a" would dodge the lookahead; the atomic branch cannot.
        let m = matcher.match_at("aab", 0).unwrap();
        assert_eq!((m.end, m.branch), (3, Some(1)));
        let m = matcher.match_at("aac", 0).unwrap();
        assert_eq!((m.end, m.branch), (2, Some(0)));
    }

    #[test]
    fn test_bounded_repetition() {
        let matcher = Matcher::new(&Pattern::repeat(Pattern::literal("a"), 2, Some(3)));
        assert_eq!(matcher.match_at("aaaa", 0).unwrap().end, 3);
        assert!(matcher.match_at("a", 0).is_none());
    }

    #[test]
    fn test_empty_iterations_terminate() {
        let pattern = Pattern::star(Pattern::star(Pattern::literal("a")));
        let m = Matcher::new(&pattern).match_at("b", 0).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_multibyte_offsets() {
        let matcher = Matcher::new(&Pattern::plus(Pattern::range('à', 'ÿ')));
        let m = matcher.find("xéé!").unwrap();
        assert_eq!((m.start, m.end), (1, 5));
        assert_eq!(m.len(), 4);
        assert!(matcher.match_at("xéé", 2).is_none());
    }

    #[test]
    fn test_long_input_keeps_stack_flat() {
        let sorted = crate::sort(&crate::parse("[a-z]+|if").unwrap()).unwrap();
        let input = "a".repeat(100_000);
        let m = Matcher::new(&sorted).match_at(&input, 0).unwrap();
        assert_eq!((m.end, m.branch), (100_000, Some(1)));
    }

    #[test]
    fn test_long_group_repetition_backtracks() {
        let pattern = Pattern::sequence(vec![
            Pattern::star(Pattern::choice(vec![Pattern::literal("ab"), Pattern::literal("a")])),
            Pattern::literal("c"),
        ]);
        let mut input = "ab".repeat(50_000);
        input.push_str("ac");
        let m = Matcher::new(&pattern).match_at(&input, 0).unwrap();
        assert_eq!(m.end, input.len());
        input.pop();
        assert!(Matcher::new(&pattern).match_at(&input, 0).is_none());
    }

    #[test]
    fn test_empty_choice_never_matches() {
        let pattern = Pattern::sequence(vec![Pattern::literal("a"), Pattern::Choice(Vec::new())]);
        assert!(!Matcher::new(&pattern).is_match("aaa"));
    }
}
