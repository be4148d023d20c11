//! Discriminator (negative lookahead) synthesis
//!
//! A branch that is a subset of another branch can fire on input where
//! continuing would satisfy a longer or different alternative. Its
//! discriminator is the set of continuations that must not follow its match.
//!
//! For every match state `s` of the branch, each outgoing edge `(class, t)`
//! is examined:
//! - `t == s`: a self-loop only re-confirms the same match and is ignored;
//! - `t` is a match state (of any branch): `class` alone is forbidden;
//! - otherwise the edge is followed until match states are reached, and every
//!   complete path is forbidden.
//!
//! Paths that differ only in their last class are merged into one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::ChoiceId;
use crate::charset::{CharClass, CharRange};
use crate::classify::Classification;
use crate::dfa::{Dfa, StateId};
use crate::error::SortError;

/// A set of forbidden continuations attached to a branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Discriminator {
    forbidden: BTreeSet<Vec<CharClass>>,
}

impl Discriminator {
    /// Create a discriminator from forbidden sequences
    pub fn new(forbidden: impl IntoIterator<Item = Vec<CharClass>>) -> Self {
        Discriminator {
            forbidden: forbidden.into_iter().collect(),
        }
    }

    /// Create a discriminator forbidding literal continuations
    pub fn from_literals<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Discriminator::new(
            words
                .into_iter()
                .map(|word| word.chars().map(CharClass::single).collect()),
        )
    }

    /// The forbidden sequences, in a stable order
    pub fn sequences(&self) -> impl Iterator<Item = &[CharClass]> {
        self.forbidden.iter().map(Vec::as_slice)
    }

    /// Number of forbidden sequences
    pub fn len(&self) -> usize {
        self.forbidden.len()
    }

    /// Whether nothing is forbidden
    pub fn is_empty(&self) -> bool {
        self.forbidden.is_empty()
    }

    /// Whether `rest` begins with a forbidden continuation
    pub fn forbids(&self, rest: &str) -> bool {
        self.forbidden.iter().any(|sequence| {
            let mut chars = rest.chars();
            sequence
                .iter()
                .all(|class| chars.next().is_some_and(|c| class.contains(c)))
        })
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::emit::discriminator_to_regex(self))
    }
}

/// Synthesize the discriminator of one branch
///
/// Returns `None` when the branch is not a subset of any other branch, or
/// when nothing needs forbidding.
pub fn synthesize(
    dfa: &Dfa,
    classes: &Classification,
    choice: ChoiceId,
    branch: usize,
) -> Result<Option<Discriminator>, SortError> {
    if !classes.is_subsumed(branch) {
        return Ok(None);
    }

    let mut expansion = Expansion {
        dfa,
        classes,
        choice,
        branch,
        forbidden: BTreeSet::new(),
    };
    for &state in classes.match_states(branch) {
        for (target, class) in dfa.state(state).grouped_transitions() {
            if target == state {
                continue;
            }
            let mut path = vec![class];
            if dfa.state(target).is_match() {
                expansion.forbidden.insert(path);
            } else {
                let mut on_path = BTreeSet::from([target]);
                expansion.expand(target, &mut path, &mut on_path)?;
            }
        }
    }

    if expansion.forbidden.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Discriminator {
            forbidden: merge_tails(expansion.forbidden),
        }))
    }
}

/// Union the last classes of paths that share everything before them
fn merge_tails(forbidden: BTreeSet<Vec<CharClass>>) -> BTreeSet<Vec<CharClass>> {
    let mut tails: BTreeMap<Vec<CharClass>, Vec<CharRange>> = BTreeMap::new();
    for mut path in forbidden {
        let Some(last) = path.pop() else {
            continue;
        };
        tails.entry(path).or_default().extend_from_slice(last.ranges());
    }
    tails
        .into_iter()
        .map(|(mut path, ranges)| {
            path.push(CharClass::new(ranges));
            path
        })
        .collect()
}

/// Complete-transition expansion state for one branch
struct Expansion<'a> {
    dfa: &'a Dfa,
    classes: &'a Classification,
    choice: ChoiceId,
    branch: usize,
    forbidden: BTreeSet<Vec<CharClass>>,
}

impl Expansion<'_> {
    /// Follow every path out of a non-match state until a match state
    fn expand(
        &mut self,
        state: StateId,
        path: &mut Vec<CharClass>,
        on_path: &mut BTreeSet<StateId>,
    ) -> Result<(), SortError> {
        for (target, class) in self.dfa.state(state).grouped_transitions() {
            path.push(class);
            if self.dfa.state(target).is_match() {
                self.forbidden.insert(path.clone());
            } else if on_path.contains(&target) {
                if !self.classes.is_live(target) {
                    return Err(SortError::UnboundedLookahead {
                        choice: self.choice,
                        branch: self.branch,
                        state: target,
                    });
                }
                // Every continuation through the loop can still complete a
                // match, so the prefix up to the re-entry is forbidden.
                self.forbidden.insert(path.clone());
            } else {
                on_path.insert(target);
                self.expand(target, path, on_path)?;
                on_path.remove(&target);
            }
            path.pop();
        }
        Ok(())
    }
}
