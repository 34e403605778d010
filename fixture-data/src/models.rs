// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture stories.

use iddqd::{IdOrdItem, IdOrdMap, id_upcast};
use storyline_report::ResultKind;

#[derive(Clone, Debug)]
pub struct StoryFixture {
    pub path: &'static str,
    pub status: StoryFixtureStatus,
    pub scenarios: Vec<ScenarioFixture>,
}

impl StoryFixture {
    pub fn new(path: &'static str, status: StoryFixtureStatus) -> Self {
        Self {
            path,
            status,
            scenarios: Vec::new(),
        }
    }

    pub fn with_scenario(mut self, scenario: ScenarioFixture) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// The story's file name.
    pub fn file_name(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }
}

impl IdOrdItem for StoryFixture {
    type Key<'a> = &'a str;
    fn key(&self) -> Self::Key<'_> {
        self.path
    }
    id_upcast!();
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoryFixtureStatus {
    Implemented,
    Pending,
}

#[derive(Clone, Debug)]
pub struct ScenarioFixture {
    pub name: &'static str,
    pub steps: Vec<StepFixture>,
    pub expected: ResultKind,
}

impl ScenarioFixture {
    pub fn new(name: &'static str, expected: ResultKind) -> Self {
        Self {
            name,
            steps: Vec::new(),
            expected,
        }
    }

    pub fn with_step(mut self, step: StepFixture) -> Self {
        self.steps.push(step);
        self
    }

    /// The number of steps at every nesting level.
    pub fn nested_step_count(&self) -> usize {
        self.steps.iter().map(StepFixture::nested_step_count).sum()
    }
}

#[derive(Clone, Debug)]
pub struct StepFixture {
    pub description: &'static str,
    pub result: ResultKind,
    pub message: Option<&'static str>,
    pub children: Vec<StepFixture>,
}

impl StepFixture {
    pub fn new(description: &'static str, result: ResultKind) -> Self {
        Self {
            description,
            result,
            message: None,
            children: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_child(mut self, child: StepFixture) -> Self {
        self.children.push(child);
        self
    }

    fn nested_step_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(StepFixture::nested_step_count)
            .sum::<usize>()
    }
}

/// Returns the total number of scenarios across `stories`.
pub fn scenario_count(stories: &IdOrdMap<StoryFixture>) -> usize {
    stories.iter().map(|story| story.scenarios.len()).sum()
}
