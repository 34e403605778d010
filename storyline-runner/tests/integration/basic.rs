// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino::Utf8Path;
use color_eyre::eyre::{Result, ensure};
use fixture_data::{
    models::scenario_count,
    stories::{
        EXPECTED_STORIES, PASSING_STORY_GLOB, PASSING_STORY_SCENARIOS, SUBSET_DIR,
        SUBSET_SCENARIOS,
    },
};
use pretty_assertions::assert_eq;
use std::{sync::Arc, thread};
use storyline_report::ResultKind;
use storyline_runner::{
    discovery::StoryFilter,
    listener::OutcomeRecorder,
    store::OutcomeStore,
    summary::RunSummary,
};

#[test]
fn all_stories_run_by_default() -> Result<()> {
    test_init();

    let store = run_selected(&StoryFilter::all())?;
    assert_eq!(store.count(), scenario_count(&EXPECTED_STORIES));
    assert_eq!(store.count(), 8);

    for story in EXPECTED_STORIES.iter() {
        for scenario in &story.scenarios {
            let outcome = store
                .find_by_name(scenario.name)
                .unwrap_or_else(|| panic!("scenario {} was recorded", scenario.name));
            assert_eq!(
                outcome.result(),
                scenario.expected,
                "result for {}",
                scenario.name
            );
            assert_eq!(outcome.id().story, story.path);
            assert_eq!(outcome.nested_step_count(), scenario.nested_step_count());
        }
    }
    Ok(())
}

#[test]
fn stories_in_a_directory_can_be_selected() -> Result<()> {
    test_init();

    let filter = StoryFilter::new(Some(Utf8Path::new(SUBSET_DIR)), None)?;
    let store = run_selected(&filter)?;
    assert_eq!(store.count(), SUBSET_SCENARIOS);
    for outcome in store.all().iter() {
        ensure!(
            outcome.id().story.starts_with("stories/subset/"),
            "{} is in the subset",
            outcome.id()
        );
    }
    Ok(())
}

#[test]
fn stories_matching_a_name_can_be_selected() -> Result<()> {
    test_init();

    let filter = StoryFilter::new(None, Some(PASSING_STORY_GLOB))?;
    let store = run_selected(&filter)?;
    assert_eq!(store.count(), PASSING_STORY_SCENARIOS);

    let mut stories: Vec<_> = store
        .all()
        .iter()
        .map(|outcome| outcome.id().story.clone())
        .collect();
    stories.sort();
    assert_eq!(
        stories,
        [
            "stories/aPassingStory.story",
            "stories/subset/aSubsetPassingStory.story",
            "stories/yetAnotherPassingStory.story",
        ]
    );
    Ok(())
}

#[test]
fn a_passing_story_is_reported_as_passing() -> Result<()> {
    test_init();

    let store = Arc::new(OutcomeStore::new());
    let mut recorder = OutcomeRecorder::new(store.clone());
    let records = replay_story(&mut recorder, fixture_for("stories/aPassingStory.story"))?;

    assert_eq!(records.len(), 1);
    let outcome = records[0].outcome().expect("scenario was recorded");
    assert_eq!(outcome.result(), ResultKind::Success);
    assert_eq!(store.count_where(ResultKind::Success), 1);
    Ok(())
}

#[test]
fn a_failing_story_is_reported_as_failing() -> Result<()> {
    test_init();

    let store = Arc::new(OutcomeStore::new());
    let mut recorder = OutcomeRecorder::new(store.clone());
    replay_story(&mut recorder, fixture_for("stories/aFailingStory.story"))?;

    let outcome = store.find_by_name("A scenario that fails").expect("recorded");
    let results: Vec<_> = outcome
        .steps()
        .iter()
        .map(|step| step.effective_result())
        .collect();
    assert_eq!(
        results,
        [ResultKind::Success, ResultKind::Success, ResultKind::Failure]
    );
    assert_eq!(outcome.result(), ResultKind::Failure);
    assert_eq!(
        outcome.first_failure_message(),
        Some("expected the total to be 3 but was 2")
    );
    Ok(())
}

#[test]
fn a_pending_story_is_reported_as_pending() -> Result<()> {
    test_init();

    let store = Arc::new(OutcomeStore::new());
    let mut recorder = OutcomeRecorder::new(store.clone());
    replay_story(&mut recorder, fixture_for("stories/aPendingStory.story"))?;

    let outcome = store
        .find_by_name("A scenario in a pending story")
        .expect("recorded");
    // Every step passed, but the story itself is pending.
    assert!(
        outcome
            .steps()
            .iter()
            .all(|step| step.effective_result() == ResultKind::Success)
    );
    assert_eq!(outcome.result(), ResultKind::Pending);
    Ok(())
}

#[test]
fn an_implemented_story_with_pending_steps_is_reported_as_pending() -> Result<()> {
    test_init();

    let store = Arc::new(OutcomeStore::new());
    let mut recorder = OutcomeRecorder::new(store.clone());
    replay_story(
        &mut recorder,
        fixture_for("stories/aPendingImplementedStory.story"),
    )?;

    let outcome = store
        .find_by_name("A scenario with pending steps")
        .expect("recorded");
    assert_eq!(outcome.result_override(), None);
    assert_eq!(outcome.result(), ResultKind::Pending);
    Ok(())
}

#[test]
fn nested_steps_are_recorded() -> Result<()> {
    test_init();

    let store = run_selected(&StoryFilter::new(
        None,
        Some("aPassingStoryWithSteps.story"),
    )?)?;
    let outcome = store.find_by_name("A scenario that works").expect("recorded");
    assert_eq!(outcome.steps().len(), 4);
    assert_eq!(outcome.nested_step_count(), 7);

    let nested: Vec<_> = outcome.steps()[2]
        .children()
        .iter()
        .map(|step| step.description())
        .collect();
    assert_eq!(
        nested,
        [
            "open the story file",
            "execute each step",
            "collect the results"
        ]
    );
    Ok(())
}

#[test]
fn given_when_then_clauses_keep_their_order() -> Result<()> {
    test_init();

    let store = run_selected(&StoryFilter::new(None, Some("aPassingStory.story"))?)?;
    assert_eq!(store.count(), 1);
    let outcome = store.get(0).expect("one outcome");
    assert_eq!(
        outcome.step_descriptions(),
        [
            "Given I have an implemented story",
            "When I run the story",
            "Then the story should pass",
        ]
    );
    Ok(())
}

#[test]
fn summary_counts_results() -> Result<()> {
    test_init();

    let store = run_selected(&StoryFilter::all())?;
    let summary = RunSummary::from_snapshot(&store.all());
    assert_eq!(summary.total(), 8);
    assert_eq!(summary.count(ResultKind::Success), 5);
    assert_eq!(summary.count(ResultKind::Pending), 2);
    assert_eq!(summary.count(ResultKind::Failure), 1);
    assert_eq!(summary.verdict(), ResultKind::Failure);
    assert_eq!(
        summary
            .scenario("A scenario that works")
            .expect("summarized")
            .nested_step_count,
        7
    );
    Ok(())
}

#[test]
fn stories_recorded_on_separate_threads_share_a_store() -> Result<()> {
    test_init();

    let store = Arc::new(OutcomeStore::new());
    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = EXPECTED_STORIES
            .iter()
            .map(|story| {
                let store = store.clone();
                scope.spawn(move || {
                    // One recorder per runner thread.
                    let mut recorder = OutcomeRecorder::new(store);
                    replay_story(&mut recorder, story).map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("runner thread panicked")?;
        }
        Ok(())
    })?;

    assert_eq!(store.count(), 8);
    for story in EXPECTED_STORIES.iter() {
        for scenario in &story.scenarios {
            let outcome = store.find_by_name(scenario.name).expect("recorded");
            assert_eq!(outcome.result(), scenario.expected);
        }
    }
    Ok(())
}
