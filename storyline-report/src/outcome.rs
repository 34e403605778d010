// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ModelError, ModelSubject, ResultKind, RevalidateError, TestStep,
    aggregate::{effective_result, outcome_result},
};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Identifies a scenario within a run: the story it came from, plus its name.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct ScenarioId {
    /// The story the scenario belongs to, usually the path of the story file.
    pub story: String,

    /// The name of the scenario within the story.
    pub name: String,
}

impl ScenarioId {
    /// Creates a new `ScenarioId`.
    ///
    /// Returns an error if the scenario name is empty.
    pub fn new(story: impl Into<String>, name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyScenarioName);
        }
        Ok(Self {
            story: story.into(),
            name,
        })
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.story, self.name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum OutcomeState {
    Running,
    Finalized { result: ResultKind },
}

/// The recorded outcome of a single scenario.
///
/// An outcome owns its steps. It starts out running, accepting new top-level steps, and is
/// frozen by [`finalize`](Self::finalize), which computes and caches the scenario result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    id: ScenarioId,
    steps: Vec<TestStep>,
    result_override: Option<ResultKind>,
    timestamp: Option<DateTime<FixedOffset>>,
    time: Option<Duration>,
    properties: IndexMap<String, String>,
    state: OutcomeState,
}

impl TestOutcome {
    /// Creates a new running outcome for the given scenario.
    pub fn new(id: ScenarioId) -> Self {
        Self {
            id,
            steps: Vec::new(),
            result_override: None,
            timestamp: None,
            time: None,
            properties: IndexMap::new(),
            state: OutcomeState::Running,
        }
    }

    /// Used by the report reader: the stored result is trusted as-is.
    pub(crate) fn from_parts(
        id: ScenarioId,
        steps: Vec<TestStep>,
        result_override: Option<ResultKind>,
        timestamp: Option<DateTime<FixedOffset>>,
        time: Option<Duration>,
        properties: IndexMap<String, String>,
        stored_result: ResultKind,
    ) -> Self {
        Self {
            id,
            steps,
            result_override,
            timestamp,
            time,
            properties,
            state: OutcomeState::Finalized {
                result: stored_result,
            },
        }
    }

    /// The identity of the scenario.
    pub fn id(&self) -> &ScenarioId {
        &self.id
    }

    /// The scenario name.
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// The top-level steps, in the order they were recorded.
    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    /// The explicit result override, if one was set.
    pub fn result_override(&self) -> Option<ResultKind> {
        self.result_override
    }

    /// The time at which the scenario started.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp
    }

    /// The time the scenario took.
    pub fn time(&self) -> Option<Duration> {
        self.time
    }

    /// Custom properties recorded for the scenario, in insertion order.
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Returns true if the outcome has been finalized.
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, OutcomeState::Finalized { .. })
    }

    /// The scenario result.
    ///
    /// Once finalized, this is the frozen result. Before that, it is computed from the steps
    /// recorded so far.
    pub fn result(&self) -> ResultKind {
        match self.state {
            OutcomeState::Finalized { result } => result,
            OutcomeState::Running => outcome_result(&self.steps, self.result_override),
        }
    }

    /// Appends a top-level step and returns a mutable reference to it.
    pub fn add_step(&mut self, step: TestStep) -> Result<&mut TestStep, ModelError> {
        self.ensure_running("add a step")?;
        self.steps.push(step);
        Ok(self.steps.last_mut().expect("a step was just pushed"))
    }

    /// Raises the result override to at least `result`.
    ///
    /// An existing override is never lowered.
    pub fn raise_override(&mut self, result: ResultKind) -> Result<&mut Self, ModelError> {
        self.ensure_running("set the result override")?;
        self.result_override = Some(self.result_override.map_or(result, |r| r.max(result)));
        Ok(self)
    }

    /// Sets the start timestamp for the scenario.
    pub fn set_timestamp(
        &mut self,
        timestamp: impl Into<DateTime<FixedOffset>>,
    ) -> Result<&mut Self, ModelError> {
        self.ensure_running("set the timestamp")?;
        self.timestamp = Some(timestamp.into());
        Ok(self)
    }

    /// Sets the time taken by the scenario.
    ///
    /// Reports store whole milliseconds, so any finer precision is lost on a round trip.
    pub fn set_time(&mut self, time: Duration) -> Result<&mut Self, ModelError> {
        self.ensure_running("set the time")?;
        self.time = Some(time);
        Ok(self)
    }

    /// Adds a custom property, replacing any earlier value for the same key.
    pub fn add_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, ModelError> {
        self.ensure_running("add a property")?;
        self.properties.insert(key.into(), value.into());
        Ok(self)
    }

    /// Computes and freezes the scenario result, finalizing any steps still running.
    ///
    /// Finalizing an already-finalized outcome fails and leaves the stored result unchanged.
    pub fn finalize(&mut self) -> Result<ResultKind, ModelError> {
        self.ensure_running("finalize the outcome")?;
        for step in &mut self.steps {
            if !step.is_finalized() {
                step.finalize()?;
            }
        }
        let result = self
            .steps
            .iter()
            .map(TestStep::effective_result)
            .chain(self.result_override)
            .max()
            .unwrap_or(ResultKind::Success);
        self.state = OutcomeState::Finalized { result };
        Ok(result)
    }

    /// Consumes a finalized outcome and returns one whose override is raised to `result`.
    ///
    /// The new result is the higher of the old result and `result`.
    pub fn with_override_raised(mut self, result: ResultKind) -> Result<Self, ModelError> {
        let OutcomeState::Finalized { result: current } = self.state else {
            return Err(ModelError::running(
                ModelSubject::Outcome,
                "raise the override of",
            ));
        };
        self.result_override = Some(self.result_override.map_or(result, |r| r.max(result)));
        self.state = OutcomeState::Finalized {
            result: current.max(result),
        };
        Ok(self)
    }

    /// The total number of steps at every nesting level.
    pub fn nested_step_count(&self) -> usize {
        self.steps.iter().map(TestStep::nested_step_count).sum()
    }

    /// The descriptions of the top-level steps, in order.
    pub fn step_descriptions(&self) -> Vec<&str> {
        self.steps.iter().map(TestStep::description).collect()
    }

    /// Iterates over every step, depth-first.
    pub fn iter_steps(&self) -> impl Iterator<Item = &TestStep> + '_ {
        self.steps.iter().flat_map(TestStep::iter_depth_first)
    }

    /// The message of the first step, depth-first, whose own result is failing.
    pub fn first_failure_message(&self) -> Option<&str> {
        self.iter_steps()
            .filter(|step| step.own_result().is_some_and(ResultKind::is_failing))
            .find_map(TestStep::message)
    }

    /// Recomputes every cached result and checks it against the stored one.
    ///
    /// Reports are trusted when read; this is how callers can check that trust was warranted.
    pub fn revalidate(&self) -> Result<(), RevalidateError> {
        let OutcomeState::Finalized { result: stored } = self.state else {
            return Err(RevalidateError::NotFinalized);
        };

        for (index, step) in self.steps.iter().enumerate() {
            revalidate_step(step, format!("steps[{index}]"))?;
        }

        let computed = outcome_result(&self.steps, self.result_override);
        if stored != computed {
            return Err(RevalidateError::ResultMismatch {
                location: "outcome".to_owned(),
                stored,
                computed,
            });
        }
        Ok(())
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), ModelError> {
        if self.is_finalized() {
            Err(ModelError::finalized(ModelSubject::Outcome, operation))
        } else {
            Ok(())
        }
    }
}

fn revalidate_step(step: &TestStep, location: String) -> Result<(), RevalidateError> {
    for (index, child) in step.children().iter().enumerate() {
        revalidate_step(child, format!("{location}.steps[{index}]"))?;
    }
    let stored = step.effective_result();
    let computed = effective_result(step);
    if stored != computed {
        return Err(RevalidateError::ResultMismatch {
            location,
            stored,
            computed,
        });
    }
    Ok(())
}
