//! Evaluation order planning for a choice
//!
//! Branches are topologically sorted so that every subset branch comes
//! strictly before its supersets. Among branches the relation leaves
//! unordered, the lowest declaration index goes first, which makes the plan
//! reproducible and leaves an already-planned choice unchanged.

use crate::ast::ChoiceId;
use crate::classify::Classification;
use crate::error::SortError;

/// Plan the evaluation order of a classified choice
///
/// Returns declaration indices in evaluation order, or
/// [`SortError::AmbiguousOrdering`] if the subset relation has a cycle.
pub fn plan_order(classes: &Classification, choice: ChoiceId) -> Result<Vec<usize>, SortError> {
    let count = classes.branch_count();
    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        // A branch is ready once every branch it must follow is placed.
        let ready = (0..count).find(|&y| {
            !placed[y] && (0..count).all(|x| placed[x] || !classes.is_subset(x, y))
        });
        match ready {
            Some(branch) => {
                placed[branch] = true;
                order.push(branch);
            }
            None => {
                let branches = (0..count).filter(|&b| !placed[b]).collect();
                return Err(SortError::AmbiguousOrdering { choice, branches });
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pattern;
    use crate::dfa::Dfa;

    fn plan(pattern: &Pattern) -> Result<Vec<usize>, SortError> {
        let dfa = Dfa::from_pattern(7, pattern).unwrap();
        let classes = Classification::new(&dfa, pattern.branches().map_or(1, <[_]>::len));
        plan_order(&classes, 7)
    }

    #[test]
    fn test_subset_moves_first() {
        assert_eq!(plan(&Pattern::literals(["keyword", "key"])).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_declaration_order_kept_when_unrelated() {
        assert_eq!(plan(&Pattern::literals(["foo", "bar", "baz"])).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_chain_of_prefixes() {
        assert_eq!(
            plan(&Pattern::literals(["abc", "x", "a", "ab"])).unwrap(),
            vec![1, 2, 3, 0]
        );
    }

    #[test]
    fn test_planned_order_is_fixed_point() {
        assert_eq!(plan(&Pattern::literals(["a", "ab", "abc"])).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_is_ambiguous() {
        let a = || Pattern::literal("a");
        let pattern = Pattern::choice(vec![Pattern::literal("b"), Pattern::star(a()), Pattern::plus(a())]);
        assert_eq!(
            plan(&pattern).unwrap_err(),
            SortError::AmbiguousOrdering {
                choice: 7,
                branches: vec![1, 2]
            }
        );
    }

    #[test]
    fn test_duplicate_branches_are_ambiguous() {
        assert!(matches!(
            plan(&Pattern::literals(["same", "same"])),
            Err(SortError::AmbiguousOrdering { .. })
        ));
    }
}
