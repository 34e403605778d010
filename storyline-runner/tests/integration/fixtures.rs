// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use color_eyre::eyre::{Result, WrapErr};
use fixture_data::{
    models::{StepFixture, StoryFixture, StoryFixtureStatus},
    stories::EXPECTED_STORIES,
};
use std::sync::{Arc, Once};
use storyline_runner::{
    discovery::{DiscoveredStory, StoryFilter, StoryStatus},
    listener::{LifecycleListener, OutcomeRecorder, ScenarioRecord, StoryStart},
    store::OutcomeStore,
};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Ignore errors: another test binary in the same process may have installed a hook.
        let _ = color_eyre::install();
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// The fixture stories as the discovery layer would hand them over.
pub(crate) fn discovered_stories() -> Vec<DiscoveredStory> {
    EXPECTED_STORIES
        .iter()
        .map(|story| {
            DiscoveredStory::new(
                story.path,
                story_status(story.status),
                story.scenarios.iter().map(|scenario| scenario.name),
            )
        })
        .collect()
}

pub(crate) fn story_status(status: StoryFixtureStatus) -> StoryStatus {
    match status {
        StoryFixtureStatus::Implemented => StoryStatus::Implemented,
        StoryFixtureStatus::Pending => StoryStatus::Pending,
    }
}

pub(crate) fn fixture_for(path: &str) -> &'static StoryFixture {
    EXPECTED_STORIES
        .iter()
        .find(|story| story.path == path)
        .unwrap_or_else(|| panic!("no fixture story at {path}"))
}

/// Runs every story selected by `filter` through a fresh recorder, and returns the store.
pub(crate) fn run_selected(filter: &StoryFilter) -> Result<Arc<OutcomeStore>> {
    let stories = discovered_stories();
    let store = Arc::new(OutcomeStore::new());
    let mut recorder = OutcomeRecorder::new(store.clone());
    for story in filter.select(&stories) {
        replay_story(&mut recorder, fixture_for(story.path.as_str()))?;
    }
    Ok(store)
}

/// Replays a fixture story as a runner would report it.
pub(crate) fn replay_story(
    listener: &mut impl LifecycleListener,
    story: &StoryFixture,
) -> Result<Vec<ScenarioRecord>> {
    listener
        .story_started(StoryStart::new(story.path, story_status(story.status)))
        .wrap_err_with(|| format!("starting story {}", story.path))?;

    let mut records = Vec::with_capacity(story.scenarios.len());
    for scenario in &story.scenarios {
        listener.scenario_started(scenario.name)?;
        for step in &scenario.steps {
            replay_step(listener, step)?;
        }
        records.push(
            listener
                .scenario_finished()
                .wrap_err_with(|| format!("finishing scenario {}", scenario.name))?,
        );
    }

    listener.story_finished()?;
    Ok(records)
}

fn replay_step(listener: &mut impl LifecycleListener, step: &StepFixture) -> Result<()> {
    listener.step_started(step.description)?;
    for child in &step.children {
        replay_step(listener, child)?;
    }
    if let Some(message) = step.message {
        listener.step_result(step.result, Some(message))?;
    }
    listener.step_finished(step.result)?;
    Ok(())
}
