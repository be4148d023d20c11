//! NFA (Nondeterministic Finite Automaton) construction
//!
//! This module implements Thompson's construction to build an NFA from a
//! pattern subtree. The accepting state of each choice branch is tagged with
//! a [`BranchMarker`] so that branch provenance survives determinization.

use std::collections::BTreeSet;

use crate::ast::{Branch, ChoiceId, Pattern};
use crate::charset::CharRange;
use crate::error::{MalformedKind, SortError};

/// An NFA state ID
pub type StateId = usize;

/// Identifies one alternative of one choice node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchMarker {
    /// The choice the branch belongs to
    pub choice: ChoiceId,
    /// Index of the branch within the choice
    pub branch: usize,
}

/// A transition in the NFA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Transition on any character in the range
    Range(CharRange),
    /// Epsilon transition (no input consumed)
    Epsilon,
}

/// An NFA state
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Transitions from this state
    pub transitions: Vec<(Transition, StateId)>,
    /// Branches that accept on reaching this state
    pub markers: BTreeSet<BranchMarker>,
}

/// An NFA with one accepting state per branch
#[derive(Debug, Default)]
pub struct Nfa {
    /// All states in the NFA
    pub states: Vec<State>,
    /// The start state
    pub start: StateId,
}

/// A partially built automaton: entry and exit states
type Fragment = (StateId, StateId);

impl Nfa {
    /// Create a new empty NFA
    pub fn new() -> Self {
        Nfa::default()
    }

    /// Build an NFA for a choice, one marker per branch
    pub fn for_choice(choice: ChoiceId, branches: &[Branch]) -> Result<Self, SortError> {
        if branches.is_empty() {
            return Err(MalformedKind::EmptyChoice.into());
        }
        let mut nfa = Nfa::new();
        let start = nfa.new_state();
        nfa.start = start;
        for (branch, alternative) in branches.iter().enumerate() {
            let (s, a) = nfa.compile(&alternative.pattern)?;
            nfa.add_transition(start, Transition::Epsilon, s);
            nfa.states[a].markers.insert(BranchMarker { choice, branch });
        }
        Ok(nfa)
    }

    /// Build an NFA for an arbitrary subtree
    ///
    /// A choice root gets one marker per branch; any other root is treated
    /// as a choice with a single branch.
    pub fn from_pattern(choice: ChoiceId, pattern: &Pattern) -> Result<Self, SortError> {
        match pattern {
            Pattern::Choice(branches) => Nfa::for_choice(choice, branches),
            other => Nfa::for_choice(choice, std::slice::from_ref(&Branch::new(other.clone()))),
        }
    }

    /// Allocate a new state and return its ID
    fn new_state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    /// Add a transition between states
    fn add_transition(&mut self, from: StateId, transition: Transition, to: StateId) {
        self.states[from].transitions.push((transition, to));
    }

    /// Every character range used by a transition
    pub fn ranges(&self) -> Vec<CharRange> {
        self.states
            .iter()
            .flat_map(|state| state.transitions.iter())
            .filter_map(|(transition, _)| match transition {
                Transition::Range(range) => Some(*range),
                Transition::Epsilon => None,
            })
            .collect()
    }

    /// Compile a pattern and return (start, accept) state IDs
    fn compile(&mut self, pattern: &Pattern) -> Result<Fragment, SortError> {
        match pattern {
            Pattern::Literal(text) => Ok(self.compile_literal(text)),
            Pattern::Class(class) => Ok(self.compile_ranges(class.ranges())),
            Pattern::Sequence(items) => self.compile_sequence(items),
            Pattern::Choice(branches) => self.compile_choice(branches),
            Pattern::Repetition { pattern, min, max } => self.compile_repetition(pattern, *min, *max),
        }
    }

    fn compile_empty(&mut self) -> Fragment {
        let start = self.new_state();
        let accept = self.new_state();
        self.add_transition(start, Transition::Epsilon, accept);
        (start, accept)
    }

    fn compile_literal(&mut self, text: &str) -> Fragment {
        let start = self.new_state();
        let mut prev = start;
        for c in text.chars() {
            let next = self.new_state();
            self.add_transition(prev, Transition::Range(CharRange::single(c)), next);
            prev = next;
        }
        if prev == start {
            return self.compile_empty();
        }
        (start, prev)
    }

    fn compile_ranges(&mut self, ranges: &[CharRange]) -> Fragment {
        let start = self.new_state();
        let accept = self.new_state();
        for range in ranges {
            self.add_transition(start, Transition::Range(*range), accept);
        }
        (start, accept)
    }

    fn compile_sequence(&mut self, items: &[Pattern]) -> Result<Fragment, SortError> {
        let Some((first, rest)) = items.split_first() else {
            return Err(MalformedKind::EmptySequence.into());
        };
        let (start, mut prev_accept) = self.compile(first)?;
        for item in rest {
            let (s, a) = self.compile(item)?;
            self.add_transition(prev_accept, Transition::Epsilon, s);
            prev_accept = a;
        }
        Ok((start, prev_accept))
    }

    fn compile_choice(&mut self, branches: &[Branch]) -> Result<Fragment, SortError> {
        if branches.is_empty() {
            return Err(MalformedKind::EmptyChoice.into());
        }
        let start = self.new_state();
        let accept = self.new_state();
        for branch in branches {
            let (s, a) = self.compile(&branch.pattern)?;
            self.add_transition(start, Transition::Epsilon, s);
            self.add_transition(a, Transition::Epsilon, accept);
        }
        Ok((start, accept))
    }

    fn compile_repetition(
        &mut self,
        pattern: &Pattern,
        min: u32,
        max: Option<u32>,
    ) -> Result<Fragment, SortError> {
        if let Some(max) = max {
            if min > max {
                return Err(MalformedKind::InvalidBounds { min, max }.into());
            }
        }

        // Mandatory copies first.
        let (start, mut prev_accept) = self.compile_empty();
        for _ in 0..min {
            let (s, a) = self.compile(pattern)?;
            self.add_transition(prev_accept, Transition::Epsilon, s);
            prev_accept = a;
        }

        let accept = self.new_state();
        match max {
            None => {
                // Kleene star over the tail.
                let (s, a) = self.compile(pattern)?;
                self.add_transition(prev_accept, Transition::Epsilon, s);
                self.add_transition(a, Transition::Epsilon, s);
                self.add_transition(a, Transition::Epsilon, accept);
            }
            Some(max) => {
                for _ in min..max {
                    let (s, a) = self.compile(pattern)?;
                    self.add_transition(prev_accept, Transition::Epsilon, s);
                    self.add_transition(prev_accept, Transition::Epsilon, accept);
                    prev_accept = a;
                }
            }
        }
        self.add_transition(prev_accept, Transition::Epsilon, accept);
        Ok((start, accept))
    }

    /// Compute epsilon closure of a set of states
    pub fn epsilon_closure(&self, states: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closure = states.clone();
        let mut stack: Vec<_> = states.iter().copied().collect();

        while let Some(state) = stack.pop() {
            for (transition, target) in &self.states[state].transitions {
                if matches!(transition, Transition::Epsilon) && closure.insert(*target) {
                    stack.push(*target);
                }
            }
        }

        closure
    }

    /// States reachable from `states` by consuming a character in `atom`
    ///
    /// `atom` must come from [`crate::charset::partition`] over this NFA's
    /// ranges, so each range either covers it entirely or not at all.
    pub fn step(&self, states: &BTreeSet<StateId>, atom: &CharRange) -> BTreeSet<StateId> {
        let mut next = BTreeSet::new();
        for &state in states {
            for (transition, target) in &self.states[state].transitions {
                if let Transition::Range(range) = transition {
                    if range.covers(atom) {
                        next.insert(*target);
                    }
                }
            }
        }
        self.epsilon_closure(&next)
    }
}
