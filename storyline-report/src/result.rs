// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ResultKindParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The verdict of a step or a scenario.
///
/// Variants are declared from least to most severe, and the derived `Ord` follows that order:
///
/// `Success < Ignored < Skipped < Pending < Compromised < Failure < Error`
///
/// When verdicts are combined, the most severe one wins. See [`aggregate`](crate::aggregate).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum ResultKind {
    /// The step or scenario ran and passed.
    Success,

    /// The step was deliberately ignored.
    Ignored,

    /// The step was not run, usually because an earlier step did not pass.
    Skipped,

    /// The step or scenario is not implemented yet.
    Pending,

    /// The step ran, but something outside the system under test prevented a clean verdict.
    Compromised,

    /// An assertion in the step failed.
    Failure,

    /// The step hit an unexpected error.
    Error,
}

impl ResultKind {
    /// All result kinds, from least to most severe.
    pub const ALL: [ResultKind; 7] = [
        ResultKind::Success,
        ResultKind::Ignored,
        ResultKind::Skipped,
        ResultKind::Pending,
        ResultKind::Compromised,
        ResultKind::Failure,
        ResultKind::Error,
    ];

    /// Returns the string tokens for all result kinds, in severity order.
    pub fn variants() -> [&'static str; 7] {
        Self::ALL.map(ResultKind::as_str)
    }

    /// Returns the token used for this result in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Success => "SUCCESS",
            ResultKind::Ignored => "IGNORED",
            ResultKind::Skipped => "SKIPPED",
            ResultKind::Pending => "PENDING",
            ResultKind::Compromised => "COMPROMISED",
            ResultKind::Failure => "FAILURE",
            ResultKind::Error => "ERROR",
        }
    }

    /// Returns true if this is [`ResultKind::Success`].
    pub fn is_success(self) -> bool {
        self == ResultKind::Success
    }

    /// Returns true if this result should fail a run: compromised, failed or errored.
    pub fn is_failing(self) -> bool {
        self >= ResultKind::Compromised
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = ResultKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ResultKindParseError::new(s))
    }
}
