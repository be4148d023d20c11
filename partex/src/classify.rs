//! Branch classification for a choice automaton
//!
//! For each branch this computes its match-state set, and for every ordered
//! pair of branches whether one is a subset of the other.
//!
//! `x ⊆ y` holds when `x` has at least one match state and every match state
//! of `x` can reach (in zero or more steps) a match state of `y`. Since a
//! DFA state stands for every string that reaches it, this is exactly "each
//! string matched by `x` is a prefix of, or equal to, some string matched by
//! `y`". Branches with an empty language are never subsets of anything.

use std::collections::BTreeSet;

use crate::dfa::{Dfa, StateId};

/// Match states and subset pairs of one choice's branches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    match_states: Vec<BTreeSet<StateId>>,
    subsets: BTreeSet<(usize, usize)>,
    live: Vec<bool>,
}

impl Classification {
    /// Classify the branches of a choice automaton with `branch_count` branches
    pub fn new(dfa: &Dfa, branch_count: usize) -> Self {
        let mut match_states = vec![BTreeSet::new(); branch_count];
        for (id, state) in dfa.states().iter().enumerate() {
            for marker in &state.markers {
                if let Some(set) = match_states.get_mut(marker.branch) {
                    set.insert(id);
                }
            }
        }

        let predecessors = predecessors(dfa);
        let reaches: Vec<Vec<bool>> = match_states
            .iter()
            .map(|targets| backward_reachable(&predecessors, targets))
            .collect();

        let mut subsets = BTreeSet::new();
        for (x, states) in match_states.iter().enumerate() {
            if states.is_empty() {
                continue;
            }
            for (y, reach) in reaches.iter().enumerate() {
                if x != y && states.iter().all(|&s| reach[s]) {
                    subsets.insert((x, y));
                }
            }
        }

        let live = (0..dfa.len())
            .map(|id| reaches.iter().any(|reach| reach[id]))
            .collect();

        Classification {
            match_states,
            subsets,
            live,
        }
    }

    /// Number of branches classified
    pub fn branch_count(&self) -> usize {
        self.match_states.len()
    }

    /// States where `branch` accepts
    pub fn match_states(&self, branch: usize) -> &BTreeSet<StateId> {
        &self.match_states[branch]
    }

    /// Whether `x ⊆ y`
    pub fn is_subset(&self, x: usize, y: usize) -> bool {
        self.subsets.contains(&(x, y))
    }

    /// All `(x, y)` pairs with `x ⊆ y`
    pub fn subset_pairs(&self) -> &BTreeSet<(usize, usize)> {
        &self.subsets
    }

    /// Whether `branch` is a subset of at least one other branch
    pub fn is_subsumed(&self, branch: usize) -> bool {
        self.subsets.iter().any(|&(x, _)| x == branch)
    }

    /// Branches that `branch` is a subset of
    pub fn supersets_of(&self, branch: usize) -> impl Iterator<Item = usize> + '_ {
        self.subsets
            .iter()
            .filter(move |&&(x, _)| x == branch)
            .map(|&(_, y)| y)
    }

    /// Whether some match state is reachable from `state`
    pub fn is_live(&self, state: StateId) -> bool {
        self.live.get(state).copied().unwrap_or(false)
    }

    #[cfg(test)]
    pub(crate) fn with_subset(mut self, pair: (usize, usize)) -> Self {
        self.subsets.insert(pair);
        self
    }
}

fn predecessors(dfa: &Dfa) -> Vec<Vec<StateId>> {
    let mut predecessors = vec![Vec::new(); dfa.len()];
    for (id, state) in dfa.states().iter().enumerate() {
        for &target in state.transitions.values() {
            predecessors[target].push(id);
        }
    }
    predecessors
}

/// Mark every state that can reach one of `targets`
fn backward_reachable(predecessors: &[Vec<StateId>], targets: &BTreeSet<StateId>) -> Vec<bool> {
    let mut reached = vec![false; predecessors.len()];
    let mut stack: Vec<StateId> = targets.iter().copied().collect();
    for &target in targets {
        reached[target] = true;
    }
    while let Some(id) = stack.pop() {
        for &pred in &predecessors[id] {
            if !reached[pred] {
                reached[pred] = true;
                stack.push(pred);
            }
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pattern;

    fn classify(pattern: &Pattern) -> Classification {
        let dfa = Dfa::from_pattern(0, pattern).unwrap();
        Classification::new(&dfa, pattern.branches().map_or(1, <[_]>::len))
    }

    #[test]
    fn test_prefix_literal_is_subset() {
        let classes = classify(&Pattern::literals(["keyword", "key"]));
        assert!(classes.is_subset(1, 0));
        assert!(!classes.is_subset(0, 1));
        assert!(classes.is_subsumed(1));
        assert!(!classes.is_subsumed(0));
        assert_eq!(classes.supersets_of(1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_disjoint_literals() {
        let classes = classify(&Pattern::literals(["foo", "bar"]));
        assert!(classes.subset_pairs().is_empty());
        assert_eq!(classes.match_states(0).len(), 1);
        assert_eq!(classes.match_states(1).len(), 1);
    }

    #[test]
    fn test_keyword_subset_of_identifier() {
        let ident = Pattern::plus(Pattern::range('a', 'z'));
        let classes = classify(&Pattern::choice(vec![ident, Pattern::literal("if")]));
        assert!(classes.is_subset(1, 0));
        // "a" is an identifier that never continues into "if".
        assert!(!classes.is_subset(0, 1));
    }

    #[test]
    fn test_partial_overlap_is_not_subset() {
        // "a" can grow into "ab" but "b" cannot.
        let classes = classify(&Pattern::choice(vec![
            Pattern::choice(vec![Pattern::literal("a"), Pattern::literal("b")]),
            Pattern::literal("ab"),
        ]));
        assert!(!classes.is_subset(0, 1));
        assert!(!classes.is_subset(1, 0));
    }

    #[test]
    fn test_mutual_subsets() {
        let a = || Pattern::literal("a");
        let classes = classify(&Pattern::choice(vec![Pattern::star(a()), Pattern::plus(a())]));
        assert!(classes.is_subset(0, 1));
        assert!(classes.is_subset(1, 0));
    }

    #[test]
    fn test_empty_language_is_never_subset() {
        let never = Pattern::Class(crate::charset::CharClass::default());
        let classes = classify(&Pattern::choice(vec![never, Pattern::literal("x")]));
        assert!(classes.match_states(0).is_empty());
        assert!(classes.subset_pairs().is_empty());
    }

    #[test]
    fn test_liveness() {
        let pattern = Pattern::literals(["ab", "abcd"]);
        let dfa = Dfa::from_pattern(0, &pattern).unwrap();
        let classes = Classification::new(&dfa, 2);
        assert!((0..dfa.len()).all(|id| classes.is_live(id)));
        assert!(!classes.is_live(dfa.len()));
    }
}
