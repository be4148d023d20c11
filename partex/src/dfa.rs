//! DFA (Deterministic Finite Automaton) construction
//!
//! Determinization by subset construction over a partitioned alphabet. Each
//! DFA state corresponds to a set of NFA states and carries the union of the
//! branch markers of its members, so branches whose languages coincide at some
//! point share a match state.
//!
//! Match states are never turned into sinks: they keep their outgoing
//! transitions toward longer alternatives. Discriminator synthesis reads
//! exactly those edges.
//!
//! Terminology follows the usual split:
//! - pre-match: reachable from the start without passing through a match state
//! - match: accepts for at least one branch
//! - post-match: everything else, i.e. only reachable after some branch matched

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use log::trace;

use crate::ast::{ChoiceId, Pattern};
use crate::charset::{self, CharClass, CharRange};
use crate::error::SortError;
use crate::nfa::{BranchMarker, Nfa};

/// A DFA state ID; the start state is always 0
pub type StateId = usize;

/// Classification of a DFA state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKind {
    /// Reachable before any branch has matched
    PreMatch,
    /// Accepts for at least one branch
    Match,
    /// Reachable only after some branch has matched
    PostMatch,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::PreMatch => "pre-match",
            StateKind::Match => "match",
            StateKind::PostMatch => "post-match",
        };
        f.write_str(name)
    }
}

/// A DFA state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaState {
    /// Successor per disjoint character range
    pub transitions: BTreeMap<CharRange, StateId>,
    /// Branches that accept here; empty for non-match states
    pub markers: BTreeSet<BranchMarker>,
    /// Classification tag
    pub kind: StateKind,
}

impl DfaState {
    /// Whether any branch accepts here
    pub fn is_match(&self) -> bool {
        !self.markers.is_empty()
    }

    /// Outgoing transitions grouped by successor, in successor order
    ///
    /// Ranges leading to the same state are merged into one class.
    pub fn grouped_transitions(&self) -> BTreeMap<StateId, CharClass> {
        let mut grouped: BTreeMap<StateId, Vec<CharRange>> = BTreeMap::new();
        for (range, &target) in &self.transitions {
            grouped.entry(target).or_default().push(*range);
        }
        grouped
            .into_iter()
            .map(|(target, ranges)| (target, CharClass::new(ranges)))
            .collect()
    }
}

/// A deterministic automaton for one pattern subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    states: Vec<DfaState>,
}

impl Dfa {
    /// The start state
    pub const START: StateId = 0;

    /// Build the minimal automaton of a subtree, tagging markers with `choice`
    pub fn from_pattern(choice: ChoiceId, pattern: &Pattern) -> Result<Self, SortError> {
        let nfa = Nfa::from_pattern(choice, pattern)?;
        Ok(Dfa::from_nfa(&nfa).minimized())
    }

    /// Determinize an NFA
    pub fn from_nfa(nfa: &Nfa) -> Self {
        let atoms = charset::partition(&nfa.ranges());
        let start = nfa.epsilon_closure(&BTreeSet::from([nfa.start]));

        let mut ids: HashMap<BTreeSet<usize>, StateId> = HashMap::new();
        let mut sets: Vec<BTreeSet<usize>> = Vec::new();
        let mut transitions: Vec<BTreeMap<CharRange, StateId>> = Vec::new();
        let mut queue = VecDeque::new();

        ids.insert(start.clone(), Dfa::START);
        sets.push(start);
        transitions.push(BTreeMap::new());
        queue.push_back(Dfa::START);

        while let Some(id) = queue.pop_front() {
            for atom in &atoms {
                let next = nfa.step(&sets[id], atom);
                if next.is_empty() {
                    continue;
                }
                let target = match ids.get(&next) {
                    Some(&target) => target,
                    None => {
                        let target = sets.len();
                        ids.insert(next.clone(), target);
                        sets.push(next);
                        transitions.push(BTreeMap::new());
                        queue.push_back(target);
                        target
                    }
                };
                transitions[id].insert(*atom, target);
            }
        }

        let states = sets
            .iter()
            .zip(transitions)
            .map(|(set, transitions)| DfaState {
                transitions,
                markers: set
                    .iter()
                    .flat_map(|&n| nfa.states[n].markers.iter().copied())
                    .collect(),
                kind: StateKind::PostMatch,
            })
            .collect();

        let mut dfa = Dfa { states };
        dfa.classify_states();
        trace!(
            "determinized {} NFA states into {} DFA states over {} atoms",
            nfa.states.len(),
            dfa.states.len(),
            atoms.len()
        );
        dfa
    }

    /// Merge states with identical markers and identical futures
    ///
    /// Partition refinement starting from blocks of equal marker sets. Blocks
    /// are numbered by their lowest member, so the start state stays 0 and the
    /// result is deterministic.
    pub fn minimized(&self) -> Self {
        let mut index: HashMap<&BTreeSet<BranchMarker>, usize> = HashMap::new();
        let mut block: Vec<usize> = self
            .states
            .iter()
            .map(|state| {
                let next = index.len();
                *index.entry(&state.markers).or_insert(next)
            })
            .collect();
        let mut count = index.len();

        loop {
            let mut index: HashMap<(usize, Vec<(CharRange, usize)>), usize> = HashMap::new();
            let refined: Vec<usize> = self
                .states
                .iter()
                .enumerate()
                .map(|(id, state)| {
                    let signature = state
                        .transitions
                        .iter()
                        .map(|(range, &target)| (*range, block[target]))
                        .collect();
                    let next = index.len();
                    *index.entry((block[id], signature)).or_insert(next)
                })
                .collect();
            let stable = index.len() == count;
            count = index.len();
            block = refined;
            if stable {
                break;
            }
        }

        let mut states: Vec<Option<DfaState>> = vec![None; count];
        for (id, state) in self.states.iter().enumerate() {
            if states[block[id]].is_some() {
                continue;
            }
            states[block[id]] = Some(DfaState {
                transitions: state
                    .transitions
                    .iter()
                    .map(|(range, &target)| (*range, block[target]))
                    .collect(),
                markers: state.markers.clone(),
                kind: state.kind,
            });
        }

        let mut dfa = Dfa {
            states: states.into_iter().flatten().collect(),
        };
        dfa.classify_states();
        dfa
    }

    fn classify_states(&mut self) {
        let pre = self.collect_pre_match();
        for (id, state) in self.states.iter_mut().enumerate() {
            state.kind = if state.is_match() {
                StateKind::Match
            } else if pre.contains(&id) {
                StateKind::PreMatch
            } else {
                StateKind::PostMatch
            };
        }
    }

    fn collect_pre_match(&self) -> BTreeSet<StateId> {
        let mut pre = BTreeSet::new();
        let mut stack = vec![Dfa::START];
        while let Some(id) = stack.pop() {
            if self.states[id].is_match() || !pre.insert(id) {
                continue;
            }
            stack.extend(self.states[id].transitions.values().copied());
        }
        pre
    }

    /// All states, indexed by ID
    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    /// A single state
    pub fn state(&self, id: StateId) -> &DfaState {
        &self.states[id]
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the automaton has no states
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn states_of_kind(&self, kind: StateKind) -> BTreeSet<StateId> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// States reachable before any match
    pub fn pre_match_states(&self) -> BTreeSet<StateId> {
        self.states_of_kind(StateKind::PreMatch)
    }

    /// States accepting for at least one branch
    pub fn match_states(&self) -> BTreeSet<StateId> {
        self.states_of_kind(StateKind::Match)
    }

    /// States reachable only after a match
    pub fn post_match_states(&self) -> BTreeSet<StateId> {
        self.states_of_kind(StateKind::PostMatch)
    }

    /// Run the automaton over `input` from the start state
    ///
    /// Returns the state reached, or `None` if the input leaves the automaton.
    pub fn run(&self, input: &str) -> Option<StateId> {
        input.chars().try_fold(Dfa::START, |id, c| self.advance(id, c))
    }

    /// The successor of `id` on `c`
    pub fn advance(&self, id: StateId, c: char) -> Option<StateId> {
        self.states[id]
            .transitions
            .range(..=CharRange::new(c, char::MAX))
            .next_back()
            .filter(|(range, _)| range.contains(c))
            .map(|(_, &target)| target)
    }

    /// Markers of the state reached by `input`, empty if none
    pub fn markers_after(&self, input: &str) -> BTreeSet<BranchMarker> {
        self.run(input)
            .map(|id| self.states[id].markers.clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn from_states(states: Vec<DfaState>) -> Self {
        let mut dfa = Dfa { states };
        dfa.classify_states();
        dfa
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.states.iter().enumerate() {
            write!(f, "{id}: {}", state.kind)?;
            if state.is_match() {
                let branches: Vec<String> = state
                    .markers
                    .iter()
                    .map(|m| format!("{}.{}", m.choice, m.branch))
                    .collect();
                write!(f, " [{}]", branches.join(", "))?;
            }
            writeln!(f)?;
            for (target, class) in state.grouped_transitions() {
                writeln!(f, "    {class} ==> {target}")?;
            }
        }
        Ok(())
    }
}
