// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rules for combining step verdicts into step and scenario verdicts.
//!
//! All functions here are pure: they never look at cached results, and they are total for any
//! step tree (trees are built by appending owned values, so they cannot contain cycles).

use crate::{ResultKind, TestStep};

/// Combines a sequence of results into one.
///
/// Returns [`ResultKind::Success`] for an empty sequence, otherwise the most severe result.
pub fn aggregate(results: impl IntoIterator<Item = ResultKind>) -> ResultKind {
    results.into_iter().max().unwrap_or(ResultKind::Success)
}

/// Computes the effective result of a step from its own result and its children.
///
/// A step with neither an own result nor children is a structural step and counts as a success.
pub fn effective_result(step: &TestStep) -> ResultKind {
    aggregate(
        step.own_result()
            .into_iter()
            .chain(step.children().iter().map(effective_result)),
    )
}

/// Computes the result of a scenario from its top-level steps and an optional override.
///
/// The override can only raise the result: a pending story forces its scenarios to at least
/// [`ResultKind::Pending`], but a failing step still makes the scenario fail.
pub fn outcome_result<'a>(
    steps: impl IntoIterator<Item = &'a TestStep>,
    result_override: Option<ResultKind>,
) -> ResultKind {
    let computed = aggregate(steps.into_iter().map(effective_result));
    match result_override {
        Some(result_override) => computed.max(result_override),
        None => computed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::test_helpers::arb_step;
    use proptest::{collection::vec, prelude::*};
    use test_case::test_case;
    use test_strategy::proptest;

    #[test]
    fn aggregate_empty_is_success() {
        assert_eq!(aggregate([]), ResultKind::Success);
    }

    #[test_case(&[ResultKind::Success, ResultKind::Success, ResultKind::Failure], ResultKind::Failure; "failure wins")]
    #[test_case(&[ResultKind::Pending, ResultKind::Skipped], ResultKind::Pending; "pending over skipped")]
    #[test_case(&[ResultKind::Error, ResultKind::Compromised], ResultKind::Error; "error over all")]
    #[test_case(&[ResultKind::Ignored], ResultKind::Ignored; "single")]
    fn aggregate_examples(input: &[ResultKind], expected: ResultKind) {
        assert_eq!(aggregate(input.iter().copied()), expected);
    }

    #[proptest]
    fn aggregate_is_maximum(#[strategy(vec(any::<ResultKind>(), 1..32))] results: Vec<ResultKind>) {
        let result = aggregate(results.iter().copied());
        prop_assert!(results.contains(&result));
        for other in &results {
            prop_assert!(result >= *other);
        }
    }

    #[proptest]
    fn effective_result_dominates_children(#[strategy(arb_step())] step: TestStep) {
        fn check(step: &TestStep) -> Result<(), TestCaseError> {
            let parent = effective_result(step);
            for child in step.children() {
                prop_assert!(parent >= effective_result(child));
                check(child)?;
            }
            Ok(())
        }
        check(&step)?;
    }

    #[test]
    fn structural_step_is_success() {
        let step = TestStep::new("a container with nothing in it").unwrap();
        assert_eq!(effective_result(&step), ResultKind::Success);
    }

    #[test]
    fn override_only_raises() {
        let passing = TestStep::leaf("Given a passing step", ResultKind::Success).unwrap();
        let failing = TestStep::leaf("Then it fails", ResultKind::Failure).unwrap();

        assert_eq!(
            outcome_result([&passing], Some(ResultKind::Pending)),
            ResultKind::Pending
        );
        assert_eq!(
            outcome_result([&passing, &failing], Some(ResultKind::Pending)),
            ResultKind::Failure
        );
        assert_eq!(outcome_result([], None), ResultKind::Success);
        assert_eq!(
            outcome_result([], Some(ResultKind::Pending)),
            ResultKind::Pending
        );
    }
}
