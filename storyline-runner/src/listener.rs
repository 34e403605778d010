// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification interface driven by the external test runner.
//!
//! A runner calls a [`LifecycleListener`] as it executes stories, in strictly nested order:
//!
//! ```text
//! story_started
//!     scenario_started
//!         step_started
//!             step_started ... step_finished   (steps nest to any depth)
//!             step_result                      (optional, more specific leaf result)
//!         step_finished
//!     scenario_finished
//! story_finished
//! ```
//!
//! [`OutcomeRecorder`] is the implementation that builds [`TestOutcome`]s from these
//! notifications and appends them to a shared [`OutcomeStore`]. One recorder is used per runner
//! thread; the store is the only shared state.

use crate::{
    discovery::{DiscoveredStory, StoryStatus},
    errors::{LifecycleEvent, ProtocolViolation, RecordError},
    store::OutcomeStore,
};
use chrono::{DateTime, FixedOffset, Local};
use std::{
    mem,
    sync::Arc,
    time::{Duration, Instant},
};
use storyline_report::{ResultKind, ScenarioId, TestOutcome, TestStep};
use tracing::{debug, warn};

/// Receives lifecycle notifications from a test runner.
pub trait LifecycleListener {
    /// A story is about to run.
    fn story_started(&mut self, story: StoryStart) -> Result<(), RecordError>;

    /// A scenario of the current story is about to run.
    ///
    /// If another scenario is still running, it is discarded and an error is returned, but the
    /// new scenario is started regardless.
    fn scenario_started(&mut self, name: &str) -> Result<(), RecordError>;

    /// A step is about to run, nested inside whichever step is currently open.
    fn step_started(&mut self, description: &str) -> Result<(), RecordError>;

    /// The currently open step produced a result, optionally with a message.
    ///
    /// This is more specific than the result passed to [`step_finished`](Self::step_finished),
    /// and takes priority over it.
    fn step_result(&mut self, result: ResultKind, message: Option<&str>)
    -> Result<(), RecordError>;

    /// The currently open step finished.
    fn step_finished(&mut self, result: ResultKind) -> Result<(), RecordError>;

    /// The current scenario finished.
    fn scenario_finished(&mut self) -> Result<ScenarioRecord, RecordError>;

    /// The current story finished.
    fn story_finished(&mut self) -> Result<(), RecordError>;
}

/// Describes a story as it starts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoryStart {
    /// The identity of the story, usually the path of the story file.
    pub story: String,

    /// Whether the story is implemented or pending as a whole.
    pub status: StoryStatus,
}

impl StoryStart {
    /// Creates a new `StoryStart`.
    pub fn new(story: impl Into<String>, status: StoryStatus) -> Self {
        Self {
            story: story.into(),
            status,
        }
    }
}

impl From<&DiscoveredStory> for StoryStart {
    fn from(story: &DiscoveredStory) -> Self {
        Self::new(story.path.as_str(), story.status)
    }
}

/// What happened to a scenario once it finished.
#[derive(Clone, Debug)]
pub enum ScenarioRecord {
    /// The scenario's outcome was finalized and appended to the store.
    ///
    /// The outcome may well have a failing result: that is a failing test that was recorded
    /// successfully.
    Recorded(Arc<TestOutcome>),

    /// Recording was aborted by an earlier error, and nothing was stored for this scenario.
    Discarded {
        /// The scenario that was discarded.
        id: ScenarioId,
    },
}

impl ScenarioRecord {
    /// Returns the recorded outcome, if there is one.
    pub fn outcome(&self) -> Option<&Arc<TestOutcome>> {
        match self {
            ScenarioRecord::Recorded(outcome) => Some(outcome),
            ScenarioRecord::Discarded { .. } => None,
        }
    }

    /// Returns true if nothing was recorded for the scenario.
    pub fn is_discarded(&self) -> bool {
        matches!(self, ScenarioRecord::Discarded { .. })
    }
}

/// Builds outcomes from lifecycle notifications and appends them to an [`OutcomeStore`].
#[derive(Debug)]
pub struct OutcomeRecorder {
    store: Arc<OutcomeStore>,
    story: Option<StoryStart>,
    scenario: ScenarioState,
}

#[derive(Debug, Default)]
enum ScenarioState {
    #[default]
    Idle,
    Running(RunningScenario),
    // An error aborted the scenario; its remaining step events are dropped until it finishes.
    Discarded(ScenarioId),
}

#[derive(Debug)]
struct RunningScenario {
    outcome: TestOutcome,
    // Steps that have started but not finished, innermost last.
    open_steps: Vec<TestStep>,
    start_time: Instant,
}

impl OutcomeRecorder {
    /// Creates a new recorder that appends finished outcomes to `store`.
    pub fn new(store: Arc<OutcomeStore>) -> Self {
        Self {
            store,
            story: None,
            scenario: ScenarioState::Idle,
        }
    }

    /// Returns the store this recorder appends to.
    pub fn store(&self) -> &Arc<OutcomeStore> {
        &self.store
    }

    /// Returns the story currently open, if any.
    pub fn current_story(&self) -> Option<&StoryStart> {
        self.story.as_ref()
    }

    /// Returns the number of steps currently open in the running scenario.
    pub fn open_step_depth(&self) -> usize {
        match &self.scenario {
            ScenarioState::Running(running) => running.open_steps.len(),
            ScenarioState::Idle | ScenarioState::Discarded(_) => 0,
        }
    }

    fn require_story(&self, event: LifecycleEvent) -> Result<&StoryStart, ProtocolViolation> {
        self.story
            .as_ref()
            .ok_or(ProtocolViolation::NoStoryStarted { event })
    }

    // Runs `f` against the running scenario. Any error discards the scenario.
    fn with_running(
        &mut self,
        event: LifecycleEvent,
        f: impl FnOnce(&mut RunningScenario) -> Result<(), RecordError>,
    ) -> Result<(), RecordError> {
        self.require_story(event)?;
        match &mut self.scenario {
            ScenarioState::Idle => Err(ProtocolViolation::NoScenarioRunning { event }.into()),
            ScenarioState::Discarded(id) => {
                debug!(scenario = %id, %event, "dropping event for discarded scenario");
                Ok(())
            }
            ScenarioState::Running(running) => match f(running) {
                Ok(()) => Ok(()),
                Err(error) => Err(self.discard(error)),
            },
        }
    }

    fn discard(&mut self, error: RecordError) -> RecordError {
        if let ScenarioState::Running(running) = mem::take(&mut self.scenario) {
            let id = running.outcome.id().clone();
            warn!(
                scenario = %id,
                steps = running.outcome.nested_step_count(),
                "discarding scenario: {error}",
            );
            self.scenario = ScenarioState::Discarded(id);
        }
        error
    }
}

impl LifecycleListener for OutcomeRecorder {
    fn story_started(&mut self, story: StoryStart) -> Result<(), RecordError> {
        if let Some(current) = &self.story {
            return Err(ProtocolViolation::StoryAlreadyStarted {
                current: current.story.clone(),
                new: story.story,
            }
            .into());
        }
        debug!(story = %story.story, status = %story.status, "story started");
        self.story = Some(story);
        Ok(())
    }

    fn scenario_started(&mut self, name: &str) -> Result<(), RecordError> {
        let story = self.require_story(LifecycleEvent::ScenarioStarted)?;
        let id = ScenarioId::new(story.story.as_str(), name)?;
        let pending = story.status.is_pending();

        // The running scenario is discarded, but the new one still starts.
        let interrupted = match &self.scenario {
            ScenarioState::Running(running) => {
                let violation = ProtocolViolation::ScenarioAlreadyRunning {
                    current: running.outcome.name().to_owned(),
                    new: name.to_owned(),
                };
                Some(self.discard(violation.into()))
            }
            ScenarioState::Discarded(previous) => {
                debug!(scenario = %previous, "discarded scenario was never finished");
                None
            }
            ScenarioState::Idle => None,
        };

        let mut outcome = TestOutcome::new(id);
        outcome.set_timestamp(now())?;
        if pending {
            outcome.raise_override(ResultKind::Pending)?;
        }
        debug!(scenario = %outcome.id(), pending, "scenario started");
        self.scenario = ScenarioState::Running(RunningScenario {
            outcome,
            open_steps: Vec::new(),
            start_time: Instant::now(),
        });
        interrupted.map_or(Ok(()), Err)
    }

    fn step_started(&mut self, description: &str) -> Result<(), RecordError> {
        self.with_running(LifecycleEvent::StepStarted, |running| {
            let step = TestStep::new(description)?;
            debug!(
                scenario = %running.outcome.id(),
                step = description,
                depth = running.open_steps.len(),
                "step started",
            );
            running.open_steps.push(step);
            Ok(())
        })
    }

    fn step_result(
        &mut self,
        result: ResultKind,
        message: Option<&str>,
    ) -> Result<(), RecordError> {
        self.with_running(LifecycleEvent::StepResult, |running| {
            let step = running
                .open_steps
                .last_mut()
                .ok_or_else(|| ProtocolViolation::NoOpenStep {
                    event: LifecycleEvent::StepResult,
                    scenario: running.outcome.name().to_owned(),
                })?;
            step.set_result(result)?;
            if let Some(message) = message {
                step.set_message(message)?;
            }
            Ok(())
        })
    }

    fn step_finished(&mut self, result: ResultKind) -> Result<(), RecordError> {
        self.with_running(LifecycleEvent::StepFinished, |running| {
            let mut step =
                running
                    .open_steps
                    .pop()
                    .ok_or_else(|| ProtocolViolation::NoOpenStep {
                        event: LifecycleEvent::StepFinished,
                        scenario: running.outcome.name().to_owned(),
                    })?;
            step.set_result_if_unset(result)?;
            let effective = step.finalize()?;
            debug!(
                scenario = %running.outcome.id(),
                step = step.description(),
                result = %effective,
                "step finished",
            );
            match running.open_steps.last_mut() {
                Some(parent) => parent.add_child(step)?,
                None => running.outcome.add_step(step)?,
            };
            Ok(())
        })
    }

    fn scenario_finished(&mut self) -> Result<ScenarioRecord, RecordError> {
        self.require_story(LifecycleEvent::ScenarioFinished)?;
        match mem::take(&mut self.scenario) {
            ScenarioState::Idle => Err(ProtocolViolation::NoScenarioRunning {
                event: LifecycleEvent::ScenarioFinished,
            }
            .into()),
            ScenarioState::Discarded(id) => {
                debug!(scenario = %id, "discarded scenario finished");
                Ok(ScenarioRecord::Discarded { id })
            }
            ScenarioState::Running(running) => {
                let RunningScenario {
                    mut outcome,
                    open_steps,
                    start_time,
                } = running;
                if !open_steps.is_empty() {
                    let violation = ProtocolViolation::UnbalancedSteps {
                        scenario: outcome.name().to_owned(),
                        open: open_steps.len(),
                    };
                    warn!(
                        scenario = %outcome.id(),
                        "discarding scenario: {violation}",
                    );
                    return Err(violation.into());
                }

                outcome.set_time(elapsed_millis(start_time))?;
                let result = outcome.finalize()?;
                debug!(
                    scenario = %outcome.id(),
                    %result,
                    steps = outcome.nested_step_count(),
                    "scenario finished",
                );
                let outcome = self.store.append(outcome)?;
                Ok(ScenarioRecord::Recorded(outcome))
            }
        }
    }

    fn story_finished(&mut self) -> Result<(), RecordError> {
        let story = self
            .story
            .take()
            .ok_or(ProtocolViolation::NoStoryStarted {
                event: LifecycleEvent::StoryFinished,
            })?;

        match mem::take(&mut self.scenario) {
            ScenarioState::Running(running) => {
                let violation = ProtocolViolation::StoryFinishedDuringScenario {
                    story: story.story,
                    scenario: running.outcome.name().to_owned(),
                };
                warn!(
                    scenario = %running.outcome.id(),
                    "discarding scenario: {violation}",
                );
                Err(violation.into())
            }
            ScenarioState::Discarded(id) => {
                debug!(scenario = %id, "discarded scenario was never finished");
                debug!(story = %story.story, "story finished");
                Ok(())
            }
            ScenarioState::Idle => {
                debug!(story = %story.story, "story finished");
                Ok(())
            }
        }
    }
}

// Reports store whole milliseconds, so the recorded time is truncated to match.
fn elapsed_millis(start_time: Instant) -> Duration {
    let millis = start_time.elapsed().as_millis();
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
