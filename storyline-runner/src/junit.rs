// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from recorded outcomes.
//!
//! Each story becomes a test suite and each scenario a test case, so that CI systems that only
//! understand JUnit can show storyline results.

use crate::errors::{DisplayErrorChain, JunitWriteError};
use camino::Utf8Path;
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;
use storyline_report::{ResultKind, TestOutcome};
use swrite::{SWrite, swrite};
use tracing::debug;

/// Builds a JUnit report, one outcome at a time.
#[derive(Clone, Debug)]
pub struct JunitExport {
    report_name: String,
    // Suites are keyed by story, in the order stories are first seen.
    test_suites: DebugIgnore<IndexMap<String, TestSuite>>,
}

impl JunitExport {
    /// Creates a new, empty export with the given report name.
    pub fn new(report_name: impl Into<String>) -> Self {
        Self {
            report_name: report_name.into(),
            test_suites: DebugIgnore(IndexMap::new()),
        }
    }

    /// Adds an outcome as a test case in its story's suite.
    pub fn add_outcome(&mut self, outcome: &TestOutcome) -> &mut Self {
        let testcase = testcase_for(outcome);
        let story = &outcome.id().story;
        self.test_suites
            .entry(story.clone())
            .or_insert_with(|| TestSuite::new(story.as_str()))
            .add_test_case(testcase);
        self
    }

    /// Adds every outcome in order.
    pub fn add_outcomes<'a>(
        &mut self,
        outcomes: impl IntoIterator<Item = &'a TestOutcome>,
    ) -> &mut Self {
        for outcome in outcomes {
            self.add_outcome(outcome);
        }
        self
    }

    /// Returns the JUnit report built so far.
    pub fn to_report(&self) -> Report {
        let mut report = Report::new(self.report_name.as_str());
        report.add_test_suites(self.test_suites.values().cloned());
        report
    }

    /// Writes the report to `path`, creating its parent directory if necessary.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), JunitWriteError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| JunitWriteError::Fs {
                file: dir.to_owned(),
                error,
            })?;
        }

        let f = File::create(path).map_err(|error| JunitWriteError::Fs {
            file: path.to_owned(),
            error,
        })?;
        self.to_report()
            .serialize(f)
            .map_err(|error| JunitWriteError::Junit {
                file: path.to_owned(),
                error,
            })?;

        debug!(
            %path,
            suites = self.test_suites.len(),
            "wrote JUnit report",
        );
        Ok(())
    }
}

fn testcase_for(outcome: &TestOutcome) -> TestCase {
    let result = outcome.result();
    let mut status = match result {
        ResultKind::Success | ResultKind::Ignored => TestCaseStatus::success(),
        ResultKind::Skipped | ResultKind::Pending => {
            let mut status = TestCaseStatus::skipped();
            status.set_type(result.as_str());
            status
        }
        ResultKind::Compromised | ResultKind::Failure => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
            status.set_type(result.as_str());
            status
        }
        ResultKind::Error => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
            status.set_type(result.as_str());
            status
        }
    };

    if !matches!(status, TestCaseStatus::Success { .. }) {
        match outcome.first_failure_message() {
            Some(message) => {
                status.set_message(message);
            }
            None => {
                status.set_message(format!("scenario {}", result.as_str().to_lowercase()));
            }
        }
        if let Some(tree) = failing_steps(outcome) {
            status.set_description(tree);
        }
    }

    let mut testcase = TestCase::new(outcome.name(), status);
    testcase.set_classname(outcome.id().story.as_str());
    if let Some(timestamp) = outcome.timestamp() {
        testcase.set_timestamp(timestamp);
    }
    if let Some(time) = outcome.time() {
        testcase.set_time(time);
    }
    testcase
}

// Lists every step that did not succeed, one per line, indented by depth.
fn failing_steps(outcome: &TestOutcome) -> Option<String> {
    let mut out = String::new();
    for step in outcome.steps() {
        push_failing_step(step, 0, &mut out);
    }
    (!out.is_empty()).then_some(out)
}

fn push_failing_step(step: &storyline_report::TestStep, depth: usize, out: &mut String) {
    let result = step.effective_result();
    if result.is_success() {
        return;
    }
    out.push_str(&"  ".repeat(depth));
    swrite!(out, "{} [{result}]", step.description());
    if let Some(message) = step.message() {
        swrite!(out, ": {message}");
    }
    out.push('\n');
    for child in step.children() {
        push_failing_step(child, depth + 1, out);
    }
}

/// Writes a JUnit report for `outcomes` to `path`.
pub fn write_junit<'a>(
    path: &Utf8Path,
    report_name: &str,
    outcomes: impl IntoIterator<Item = &'a TestOutcome>,
) -> Result<(), JunitWriteError> {
    let mut export = JunitExport::new(report_name);
    export.add_outcomes(outcomes);
    export.write_to(path).inspect_err(|error| {
        debug!("JUnit export failed: {}", DisplayErrorChain::new(error));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use storyline_report::{ScenarioId, TestStep};
    use test_case::test_case;

    fn outcome(story: &str, name: &str, result: ResultKind, message: Option<&str>) -> TestOutcome {
        let mut outcome = TestOutcome::new(ScenarioId::new(story, name).unwrap());
        // Finalized along with the outcome, so the message can still be attached.
        let mut step = TestStep::new("Then something happens").unwrap();
        step.set_result(result).unwrap();
        if let Some(message) = message {
            step.set_message(message).unwrap();
        }
        outcome.add_step(step).unwrap();
        outcome.finalize().unwrap();
        outcome
    }

    fn report_xml(export: &JunitExport) -> String {
        let mut buf = Vec::new();
        export.to_report().serialize(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test_case(ResultKind::Success, None; "success")]
    #[test_case(ResultKind::Ignored, None; "ignored")]
    #[test_case(ResultKind::Skipped, Some("skipped"); "skipped")]
    #[test_case(ResultKind::Pending, Some("skipped"); "pending")]
    #[test_case(ResultKind::Compromised, Some("failure"); "compromised")]
    #[test_case(ResultKind::Failure, Some("failure"); "failure")]
    #[test_case(ResultKind::Error, Some("error"); "error")]
    fn result_mapping(result: ResultKind, element: Option<&str>) {
        let testcase = testcase_for(&outcome("stories/a.story", "scenario", result, None));
        let actual = match &testcase.status {
            TestCaseStatus::Success { .. } => None,
            TestCaseStatus::Skipped { .. } => Some("skipped"),
            TestCaseStatus::NonSuccess { kind, .. } => Some(match kind {
                NonSuccessKind::Failure => "failure",
                NonSuccessKind::Error => "error",
            }),
        };
        assert_eq!(actual, element);
    }

    #[test]
    fn failure_message_comes_from_first_failing_step() {
        let testcase = testcase_for(&outcome(
            "stories/aFailingStory.story",
            "A failing scenario",
            ResultKind::Failure,
            Some("expected 2 but was 3"),
        ));
        let TestCaseStatus::NonSuccess {
            message,
            ty,
            description,
            ..
        } = &testcase.status
        else {
            panic!("expected a non-success status");
        };
        assert_eq!(message.as_deref(), Some("expected 2 but was 3"));
        assert_eq!(ty.as_deref(), Some("FAILURE"));
        assert_eq!(
            description.as_deref(),
            Some("Then something happens [FAILURE]: expected 2 but was 3\n")
        );
        assert_eq!(
            testcase.classname.as_deref(),
            Some("stories/aFailingStory.story")
        );
    }

    #[test]
    fn one_suite_per_story() {
        let mut export = JunitExport::new("storyline");
        export.add_outcomes([
            &outcome("stories/a.story", "first", ResultKind::Success, None),
            &outcome("stories/b.story", "second", ResultKind::Failure, Some("boom")),
            &outcome("stories/a.story", "third", ResultKind::Pending, None),
        ]);

        let report = export.to_report();
        let suites: Vec<_> = report
            .test_suites
            .iter()
            .map(|suite| (suite.name.as_str().to_owned(), suite.test_cases.len()))
            .collect();
        assert_eq!(
            suites,
            [
                ("stories/a.story".to_owned(), 2),
                ("stories/b.story".to_owned(), 1),
            ]
        );
        assert_eq!(report.tests, 3);
        assert_eq!(report.failures, 1);

        let xml = report_xml(&export);
        assert!(xml.contains(r#"<testsuites name="storyline""#), "{xml}");
        assert!(xml.contains(r#"message="boom""#), "{xml}");
    }

    #[test]
    fn write_to_creates_parent_directory() {
        let dir = camino_tempfile::tempdir().unwrap();
        let path = dir.path().join("junit/storyline.xml");
        write_junit(
            &path,
            "storyline",
            [&outcome("stories/a.story", "first", ResultKind::Success, None)],
        )
        .unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains(r#"<testcase name="first""#), "{xml}");
    }
}
