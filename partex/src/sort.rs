//! The sort pass
//!
//! Walks a pattern tree bottom-up. Sequences and repetitions keep their
//! children in place; every choice is determinized on its own, its branches
//! are classified, reordered most-specific-first, and guarded with
//! discriminators where a branch could shadow a longer alternative.
//!
//! The pass is a pure function of its input. Existing discriminators in the
//! input are discarded and recomputed, so sorting a sorted tree returns it
//! unchanged.

use log::debug;

use crate::ast::{Branch, ChoiceId, Pattern};
use crate::classify::Classification;
use crate::dfa::Dfa;
use crate::discriminator::{self, Discriminator};
use crate::error::{MalformedKind, SortError};
use crate::order::plan_order;

/// Sort a pattern tree, returning the annotated tree
///
/// # Example
/// ```
/// use partex::{sort, Pattern};
///
/// let sorted = sort(&Pattern::literals(["keyword", "key"])).unwrap();
/// assert_eq!(sorted.to_string(), "key(?!word)|keyword");
/// ```
pub fn sort(pattern: &Pattern) -> Result<Pattern, SortError> {
    Sorter::new().sort(pattern)
}

/// Per-choice results of a sort pass, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceReport {
    /// The choice id, assigned in pre-order from 0
    pub choice: ChoiceId,
    /// Declaration indices in planned order
    pub order: Vec<usize>,
    /// `(x, y)` pairs with `x ⊆ y`, by declaration index
    pub subsets: Vec<(usize, usize)>,
    /// Discriminators by declaration index
    pub discriminators: Vec<Option<Discriminator>>,
    /// Number of states in the choice's automaton
    pub states: usize,
}

/// Drives one sort pass; owns the choice counter and collected reports
#[derive(Debug, Default)]
pub struct Sorter {
    next_choice: ChoiceId,
    reports: Vec<ChoiceReport>,
}

impl Sorter {
    /// Create a sorter for one pass
    pub fn new() -> Self {
        Sorter::default()
    }

    /// Sort a tree
    pub fn sort(&mut self, pattern: &Pattern) -> Result<Pattern, SortError> {
        match pattern {
            Pattern::Literal(_) | Pattern::Class(_) => Ok(pattern.clone()),
            Pattern::Sequence(items) => {
                if items.is_empty() {
                    return Err(MalformedKind::EmptySequence.into());
                }
                let items = items
                    .iter()
                    .map(|item| self.sort(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Pattern::Sequence(items))
            }
            Pattern::Repetition { pattern, min, max } => {
                if let Some(max) = *max {
                    if *min > max {
                        return Err(MalformedKind::InvalidBounds { min: *min, max }.into());
                    }
                }
                Ok(Pattern::Repetition {
                    pattern: Box::new(self.sort(pattern)?),
                    min: *min,
                    max: *max,
                })
            }
            Pattern::Choice(branches) => self.sort_choice(branches),
        }
    }

    /// Reports for every choice sorted so far, in pre-order
    pub fn reports(&self) -> &[ChoiceReport] {
        &self.reports
    }

    /// Consume the sorter and return its reports, in pre-order
    pub fn into_reports(self) -> Vec<ChoiceReport> {
        self.reports
    }

    fn sort_choice(&mut self, branches: &[Branch]) -> Result<Pattern, SortError> {
        if branches.is_empty() {
            return Err(MalformedKind::EmptyChoice.into());
        }
        let choice = self.next_choice;
        self.next_choice += 1;

        let mut sorted = branches
            .iter()
            .map(|branch| self.sort(&branch.pattern).map(Branch::new))
            .collect::<Result<Vec<_>, _>>()?;

        let dfa = Dfa::from_pattern(choice, &Pattern::Choice(sorted.clone()))?;
        let classes = Classification::new(&dfa, sorted.len());
        let order = plan_order(&classes, choice)?;
        let discriminators = (0..sorted.len())
            .map(|branch| discriminator::synthesize(&dfa, &classes, choice, branch))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "choice {choice}: {} states, subsets {:?}, order {:?}",
            dfa.len(),
            classes.subset_pairs(),
            order
        );
        for (branch, discriminator) in discriminators.iter().enumerate() {
            if let Some(discriminator) = discriminator {
                debug!("choice {choice}: branch {branch} guarded by {discriminator}");
            }
        }

        for (branch, discriminator) in sorted.iter_mut().zip(&discriminators) {
            branch.discriminator = discriminator.clone();
        }
        let mut slots: Vec<Option<Branch>> = sorted.into_iter().map(Some).collect();
        let planned = order
            .iter()
            .filter_map(|&index| slots[index].take())
            .collect();

        // Children finish first; keep the list ordered by choice id.
        let at = self.reports.partition_point(|report| report.choice < choice);
        self.reports.insert(
            at,
            ChoiceReport {
                choice,
                order,
                subsets: classes.subset_pairs().iter().copied().collect(),
                discriminators,
                states: dfa.len(),
            },
        );
        Ok(Pattern::Choice(planned))
    }
}
