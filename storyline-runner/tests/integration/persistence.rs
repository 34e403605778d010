// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use fixture_data::stories::{EXPECTED_STORIES, PASSING_STORY_SCENARIOS};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use storyline_report::ResultKind;
use storyline_runner::{
    config::{PendingOverridePolicy, StorylineConfig},
    discovery::{StoryFilter, StoryStatus},
    junit::write_junit,
    listener::{LifecycleListener, OutcomeRecorder, StoryStart},
    report_dir::ReportDir,
    store::OutcomeStore,
    summary::RunSummary,
};

fn workspace_with_config(contents: &str) -> Result<Utf8TempDir> {
    let dir = camino_tempfile::tempdir()?;
    let config_path = dir.path().join(StorylineConfig::CONFIG_PATH);
    std::fs::create_dir_all(config_path.parent().expect("config path has a parent"))?;
    std::fs::write(&config_path, contents)?;
    Ok(dir)
}

#[test]
fn reports_round_trip_through_the_report_dir() -> Result<()> {
    test_init();

    let workspace = workspace_with_config("")?;
    let config = StorylineConfig::from_sources(workspace.path(), None, &[])?;
    let report_dir = ReportDir::from_config(&config);

    let store = run_selected(&StoryFilter::all())?;
    let paths = report_dir.write_store(&store.all())?;
    assert_eq!(paths.len(), 8);
    for path in &paths {
        assert!(path.starts_with(workspace.path().join("target/storyline")));
    }

    let loaded = report_dir.load_outcomes()?;
    assert!(loaded.rejected.is_empty());
    assert_eq!(loaded.reports.len(), 8);
    for report in &loaded.reports {
        report.outcome.revalidate()?;
        let original = store
            .find_by_name(report.outcome.name())
            .expect("loaded outcome was recorded");
        assert_eq!(report.outcome.result(), original.result());
        assert_eq!(
            report.outcome.nested_step_count(),
            original.nested_step_count()
        );
        assert_eq!(
            report.outcome.step_descriptions(),
            original.step_descriptions()
        );
    }

    let before = RunSummary::from_snapshot(&store.all());
    let after = RunSummary::from_snapshot(&loaded.snapshot());
    assert_eq!(before.counts(), after.counts());
    Ok(())
}

#[test]
fn configured_story_filter_selects_stories() -> Result<()> {
    test_init();

    let workspace = workspace_with_config(indoc! {r#"
        [stories]
        called = "*PassingStory.story"
    "#})?;
    let config = StorylineConfig::from_sources(workspace.path(), None, &[])?;
    let store = run_selected(config.story_filter())?;
    assert_eq!(store.count(), PASSING_STORY_SCENARIOS);
    Ok(())
}

fn run_pending_story_twice(policy: PendingOverridePolicy) -> Result<ResultKind> {
    let dir = camino_tempfile::tempdir()?;
    let report_dir = ReportDir::new(dir.path()).with_pending_policy(policy);
    let story = fixture_for("stories/aPendingStory.story");

    // First run: the story is pending.
    let store = Arc::new(OutcomeStore::new());
    replay_story(&mut OutcomeRecorder::new(store.clone()), story)?;
    report_dir.write_store(&store.all())?;

    // Second run: the story has since been implemented, and every step passes.
    let store = Arc::new(OutcomeStore::new());
    let mut recorder = OutcomeRecorder::new(store.clone());
    recorder.story_started(StoryStart::new(story.path, StoryStatus::Implemented))?;
    let scenario = &story.scenarios[0];
    recorder.scenario_started(scenario.name)?;
    for step in &scenario.steps {
        recorder.step_started(step.description)?;
        recorder.step_finished(ResultKind::Success)?;
    }
    let record = recorder.scenario_finished()?;
    recorder.story_finished()?;
    let outcome = record.outcome().expect("recorded");
    assert_eq!(outcome.result(), ResultKind::Success);

    let path = report_dir.write_outcome(outcome)?;
    Ok(report_dir.read_outcome(&path)?.result())
}

#[test]
fn pending_override_is_sticky_by_default() -> Result<()> {
    test_init();
    assert_eq!(
        run_pending_story_twice(PendingOverridePolicy::default())?,
        ResultKind::Pending
    );
    Ok(())
}

#[test]
fn latest_run_policy_replaces_pending_override() -> Result<()> {
    test_init();
    assert_eq!(
        run_pending_story_twice(PendingOverridePolicy::LatestRun)?,
        ResultKind::Success
    );
    Ok(())
}

#[test]
fn junit_export_has_one_suite_per_story() -> Result<()> {
    test_init();

    let dir = camino_tempfile::tempdir()?;
    let store = run_selected(&StoryFilter::all())?;
    let junit_path = dir.path().join("junit.xml");
    let snapshot = store.all();
    write_junit(
        &junit_path,
        "storyline",
        snapshot.iter().map(|outcome| outcome.as_ref()),
    )?;

    let xml = std::fs::read_to_string(&junit_path)?;
    assert_eq!(
        xml.matches("<testsuite ").count(),
        EXPECTED_STORIES.len()
    );
    assert_eq!(xml.matches("<testcase ").count(), 8);
    assert!(xml.contains("expected the total to be 3 but was 2"), "{xml}");
    Ok(())
}
