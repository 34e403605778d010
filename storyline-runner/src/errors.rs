// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by storyline.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::fmt;
use storyline_report::{ModelError, ReportParseError, SerializeError};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse storyline config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of [`ConfigParseError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A story filter in the config is invalid.
    #[error(transparent)]
    StoryFilter(StoryFilterError),
}

/// An error that occurs while building a [`StoryFilter`](crate::discovery::StoryFilter).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoryFilterError {
    /// The story name pattern is not a valid glob.
    #[error("invalid story name pattern `{pattern}`")]
    InvalidGlob {
        /// The pattern as given.
        pattern: String,

        /// The underlying error.
        #[source]
        error: globset::Error,
    },
}

/// The lifecycle notification that could not be handled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifecycleEvent {
    /// `story_started`
    StoryStarted,
    /// `scenario_started`
    ScenarioStarted,
    /// `step_started`
    StepStarted,
    /// `step_result`
    StepResult,
    /// `step_finished`
    StepFinished,
    /// `scenario_finished`
    ScenarioFinished,
    /// `story_finished`
    StoryFinished,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleEvent::StoryStarted => "story started",
            LifecycleEvent::ScenarioStarted => "scenario started",
            LifecycleEvent::StepStarted => "step started",
            LifecycleEvent::StepResult => "step result",
            LifecycleEvent::StepFinished => "step finished",
            LifecycleEvent::ScenarioFinished => "scenario finished",
            LifecycleEvent::StoryFinished => "story finished",
        };
        f.write_str(name)
    }
}

/// Lifecycle notifications arrived out of the required nesting order.
///
/// When this happens inside a running scenario, that scenario's partial outcome is discarded.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ProtocolViolation {
    /// A notification needed an open story, but none was started.
    #[error("{event} received with no story started")]
    NoStoryStarted {
        /// The notification received.
        event: LifecycleEvent,
    },

    /// A story was started while another was still open.
    #[error("story `{new}` started while story `{current}` is still open")]
    StoryAlreadyStarted {
        /// The story that is open.
        current: String,
        /// The story that was started.
        new: String,
    },

    /// A story was finished while one of its scenarios was still running.
    #[error("story `{story}` finished while scenario `{scenario}` is still running")]
    StoryFinishedDuringScenario {
        /// The story.
        story: String,
        /// The running scenario.
        scenario: String,
    },

    /// A scenario was started while another was running.
    #[error("scenario `{new}` started while scenario `{current}` is still running")]
    ScenarioAlreadyRunning {
        /// The running scenario.
        current: String,
        /// The scenario that was started.
        new: String,
    },

    /// A notification needed a running scenario, but none was.
    #[error("{event} received with no scenario running")]
    NoScenarioRunning {
        /// The notification received.
        event: LifecycleEvent,
    },

    /// A step notification arrived with no step open.
    #[error("{event} received in scenario `{scenario}` with no step open")]
    NoOpenStep {
        /// The notification received.
        event: LifecycleEvent,
        /// The running scenario.
        scenario: String,
    },

    /// A scenario finished with steps still open.
    #[error("scenario `{scenario}` finished with {open} step(s) still open")]
    UnbalancedSteps {
        /// The running scenario.
        scenario: String,
        /// The number of steps that were never finished.
        open: usize,
    },
}

/// An error returned by a [`LifecycleListener`](crate::listener::LifecycleListener).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum RecordError {
    /// Notifications arrived out of order.
    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolViolation),

    /// The model rejected an operation, for example an empty step description.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RecordError {
    /// Returns the protocol violation, if this is one.
    pub fn as_protocol_violation(&self) -> Option<&ProtocolViolation> {
        match self {
            RecordError::ProtocolViolation(violation) => Some(violation),
            RecordError::Model(_) => None,
        }
    }
}

/// An error that occurs while reading or writing a report directory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportDirError {
    /// The report directory could not be created.
    #[error("error creating report directory `{dir}`")]
    DirCreate {
        /// The directory.
        dir: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The report directory could not be listed.
    #[error("error reading report directory `{dir}`")]
    DirRead {
        /// The directory.
        dir: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// An outcome could not be serialized.
    #[error("error serializing report for `{path}`")]
    Serialize {
        /// The report path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: SerializeError,
    },

    /// A report could not be written.
    #[error("error writing report `{path}`")]
    Write {
        /// The report path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A report could not be read.
    #[error("error reading report `{path}`")]
    Read {
        /// The report path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A report was read but is not a valid report.
    #[error("error parsing report `{path}`")]
    Parse {
        /// The report path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: ReportParseError,
    },
}

/// An error that occurs while writing a JUnit report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JunitWriteError {
    /// An error occurred while creating the parent directory or the file.
    #[error("error writing JUnit output to `{file}`")]
    Fs {
        /// The output file.
        file: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while serializing the JUnit report.
    #[error("error serializing JUnit output to `{file}`")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// Displays an error and its chain of sources on one line, separated by `: `.
#[derive(Clone, Copy, Debug)]
pub struct DisplayErrorChain<E>(E);

impl<E: std::error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: std::error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}
