// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{REPORT_FORMAT_VERSION, ReportFormatVersion, ResultKind};
use std::fmt;
use thiserror::Error;

/// Error returned while parsing a [`ResultKind`] from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized result kind: {input}\n(known values: {})",
    ResultKind::variants().join(", "),
)]
pub struct ResultKindParseError {
    input: String,
}

impl ResultKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// The part of the model an operation was attempted on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModelSubject {
    /// A [`TestStep`](crate::TestStep).
    Step,
    /// A [`TestOutcome`](crate::TestOutcome).
    Outcome,
}

impl fmt::Display for ModelSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSubject::Step => write!(f, "step"),
            ModelSubject::Outcome => write!(f, "outcome"),
        }
    }
}

/// The lifecycle state of a step or outcome.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    /// Still accepting children and results.
    Running,
    /// Result frozen; no further mutation permitted.
    Finalized,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Running => write!(f, "still running"),
            LifecycleState::Finalized => write!(f, "already finalized"),
        }
    }
}

/// An error that occurs while building or finalizing steps and outcomes.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ModelError {
    /// A step was created with an empty description.
    #[error("step description must not be empty")]
    EmptyDescription,

    /// A scenario was created with an empty name.
    #[error("scenario name must not be empty")]
    EmptyScenarioName,

    /// An operation was attempted in the wrong lifecycle state.
    #[error("cannot {operation}: {subject} is {state}")]
    InvalidState {
        /// What the operation was attempted on.
        subject: ModelSubject,

        /// The operation, for example "add a child step".
        operation: &'static str,

        /// The state the subject was in.
        state: LifecycleState,
    },
}

impl ModelError {
    pub(crate) fn finalized(subject: ModelSubject, operation: &'static str) -> Self {
        ModelError::InvalidState {
            subject,
            operation,
            state: LifecycleState::Finalized,
        }
    }

    pub(crate) fn running(subject: ModelSubject, operation: &'static str) -> Self {
        ModelError::InvalidState {
            subject,
            operation,
            state: LifecycleState::Running,
        }
    }

    /// Returns true if this is an [`InvalidState`](Self::InvalidState) error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, ModelError::InvalidState { .. })
    }
}

/// An error that occurs while serializing a [`TestOutcome`](crate::TestOutcome) to a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializeError {
    /// Only finalized outcomes can be serialized.
    #[error("error serializing report")]
    Model(#[from] ModelError),

    /// The JSON writer failed, usually because the underlying writer failed.
    #[error("error serializing report")]
    Json(#[from] serde_json::Error),
}

/// An error that occurs while reading a report.
///
/// No partially-read outcome is ever returned alongside this error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportParseError {
    /// The document is not a structurally valid report.
    #[error("malformed report: {message}")]
    MalformedReport {
        /// A description of what was wrong.
        message: String,
    },

    /// The document was written by a newer version of the format.
    #[error(
        "unsupported report format version {found} (this version supports up to {supported})"
    )]
    UnsupportedVersion {
        /// The version found in the document.
        found: ReportFormatVersion,

        /// The newest version this crate can read.
        supported: ReportFormatVersion,
    },
}

impl ReportParseError {
    pub(crate) fn malformed(message: impl fmt::Display) -> Self {
        ReportParseError::MalformedReport {
            message: message.to_string(),
        }
    }

    pub(crate) fn unsupported(found: ReportFormatVersion) -> Self {
        ReportParseError::UnsupportedVersion {
            found,
            supported: REPORT_FORMAT_VERSION,
        }
    }
}

/// Returned by [`TestOutcome::revalidate`](crate::TestOutcome::revalidate) when a persisted
/// result no longer matches what aggregation computes.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum RevalidateError {
    /// A stored result differs from the recomputed one.
    #[error("stored result {stored} for {location} does not match computed result {computed}")]
    ResultMismatch {
        /// The step path (for example `steps[2].steps[0]`), or `outcome`.
        location: String,

        /// The result read from the report.
        stored: ResultKind,

        /// The result computed from the step tree.
        computed: ResultKind,
    },

    /// The outcome was never finalized, so there is nothing to check against.
    #[error("cannot revalidate an outcome that is still running")]
    NotFinalized,
}
