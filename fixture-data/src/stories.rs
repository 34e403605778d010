// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixture stories, with the steps a runner reports for each scenario and the result each
//! scenario is expected to end up with.

use crate::models::{ScenarioFixture, StepFixture, StoryFixture, StoryFixtureStatus};
use iddqd::{IdOrdMap, id_ord_map};
use std::sync::LazyLock;
use storyline_report::ResultKind;

pub static EXPECTED_STORIES: LazyLock<IdOrdMap<StoryFixture>> = LazyLock::new(|| {
    use ResultKind::*;

    id_ord_map! {
        StoryFixture::new("stories/aPassingStory.story", StoryFixtureStatus::Implemented)
            .with_scenario(
                ScenarioFixture::new("A passing scenario", Success)
                    .with_step(StepFixture::new("Given I have an implemented story", Success))
                    .with_step(StepFixture::new("When I run the story", Success))
                    .with_step(StepFixture::new("Then the story should pass", Success)),
            ),
        StoryFixture::new("stories/aPassingStoryWithSteps.story", StoryFixtureStatus::Implemented)
            .with_scenario(
                ScenarioFixture::new("A scenario that works", Success)
                    .with_step(StepFixture::new("Given I have an implemented scenario", Success))
                    .with_step(StepFixture::new("And the scenario has steps", Success))
                    .with_step(
                        StepFixture::new("When I run the scenario", Success)
                            .with_child(StepFixture::new("open the story file", Success))
                            .with_child(StepFixture::new("execute each step", Success))
                            .with_child(StepFixture::new("collect the results", Success)),
                    )
                    .with_step(StepFixture::new(
                        "Then the steps should appear in the outcome",
                        Success,
                    )),
            ),
        StoryFixture::new("stories/aFailingStory.story", StoryFixtureStatus::Implemented)
            .with_scenario(
                ScenarioFixture::new("A scenario that fails", Failure)
                    .with_step(StepFixture::new("Given a passing step", Success))
                    .with_step(StepFixture::new("When another step passes", Success))
                    .with_step(
                        StepFixture::new("Then a step fails", Failure)
                            .with_message("expected the total to be 3 but was 2"),
                    ),
            ),
        StoryFixture::new("stories/aPendingStory.story", StoryFixtureStatus::Pending)
            .with_scenario(
                ScenarioFixture::new("A scenario in a pending story", Pending)
                    .with_step(StepFixture::new("Given a step that passes", Success))
                    .with_step(StepFixture::new("Then another step passes", Success)),
            ),
        StoryFixture::new(
            "stories/aPendingImplementedStory.story",
            StoryFixtureStatus::Implemented,
        )
        .with_scenario(
            ScenarioFixture::new("A scenario with pending steps", Pending)
                .with_step(StepFixture::new("Given a step that passes", Success))
                .with_step(StepFixture::new("When a step is not implemented yet", Pending))
                .with_step(StepFixture::new("Then the following steps are skipped", Skipped)),
        ),
        StoryFixture::new(
            "stories/subset/aSubsetPassingStory.story",
            StoryFixtureStatus::Implemented,
        )
        .with_scenario(
            ScenarioFixture::new("A passing scenario in a subset", Success)
                .with_step(StepFixture::new("Given a story in a subdirectory", Success))
                .with_step(StepFixture::new("Then it can be selected by directory", Success)),
        ),
        StoryFixture::new(
            "stories/subset/anotherSubsetStory.story",
            StoryFixtureStatus::Implemented,
        )
        .with_scenario(
            ScenarioFixture::new("Another scenario in a subset", Success)
                .with_step(StepFixture::new("Given another story in a subdirectory", Success)),
        ),
        StoryFixture::new(
            "stories/yetAnotherPassingStory.story",
            StoryFixtureStatus::Implemented,
        )
        .with_scenario(
            ScenarioFixture::new("Yet another passing scenario", Success)
                .with_step(StepFixture::new("Given yet another story", Success))
                .with_step(StepFixture::new("Then it passes too", Success)),
        ),
    }
});

/// The glob that selects every story whose file name ends in `PassingStory.story`.
pub const PASSING_STORY_GLOB: &str = "*PassingStory.story";

/// The number of scenarios [`PASSING_STORY_GLOB`] selects.
pub const PASSING_STORY_SCENARIOS: usize = 3;

/// The directory holding the subset stories.
pub const SUBSET_DIR: &str = "stories/subset";

/// The number of scenarios under [`SUBSET_DIR`].
pub const SUBSET_SCENARIOS: usize = 2;
