// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// How a pending override persisted by an earlier run interacts with later runs of the same
/// scenario.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingOverridePolicy {
    /// A persisted pending override is carried into every later report for the same scenario.
    #[default]
    Sticky,

    /// Each run is reported on its own; earlier overrides are replaced.
    LatestRun,
}

impl PendingOverridePolicy {
    /// String values accepted for this policy.
    pub fn variants() -> [&'static str; 2] {
        ["sticky", "latest-run"]
    }
}

impl fmt::Display for PendingOverridePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOverridePolicy::Sticky => write!(f, "sticky"),
            PendingOverridePolicy::LatestRun => write!(f, "latest-run"),
        }
    }
}

impl FromStr for PendingOverridePolicy {
    type Err = PendingOverridePolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sticky" => Ok(PendingOverridePolicy::Sticky),
            "latest-run" => Ok(PendingOverridePolicy::LatestRun),
            other => Err(PendingOverridePolicyParseError {
                input: other.to_owned(),
            }),
        }
    }
}

/// Error returned while parsing a [`PendingOverridePolicy`] value from a string.
#[derive(Clone, Debug, thiserror::Error)]
#[error(
    "unrecognized value for pending policy: {input}\n(known values: {})",
    PendingOverridePolicy::variants().join(", "),
)]
pub struct PendingOverridePolicyParseError {
    input: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct StoreConfigImpl {
    pub(super) dir: Utf8PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct ReportConfigImpl {
    pub(super) pretty: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct PendingConfigImpl {
    pub(super) policy: PendingOverridePolicy,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct StoriesConfigImpl {
    #[serde(default, rename = "in")]
    pub(super) in_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub(super) called: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct StorylineConfigDeserialize {
    pub(super) store: StoreConfigImpl,
    pub(super) report: ReportConfigImpl,
    pub(super) pending: PendingConfigImpl,
    #[serde(default)]
    pub(super) stories: StoriesConfigImpl,
}
