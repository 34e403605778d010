// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted report format.
//!
//! A report is a JSON document holding one finalized [`TestOutcome`]:
//!
//! ```json
//! {
//!   "formatVersion": 1,
//!   "scenarioId": { "story": "stories/login.story", "name": "Logging in" },
//!   "result": "FAILURE",
//!   "steps": [
//!     { "description": "Given a registered user", "result": "SUCCESS", "ownResult": "SUCCESS" },
//!     { "description": "Then the dashboard is shown", "result": "FAILURE", "ownResult": "FAILURE",
//!       "message": "element not found" }
//!   ]
//! }
//! ```
//!
//! Readers accept any version up to [`REPORT_FORMAT_VERSION`]. Stored results are trusted on
//! read; use [`TestOutcome::revalidate`] to recompute them.

use crate::{
    ModelError, ModelSubject, ReportParseError, ResultKind, ScenarioId, SerializeError,
    TestOutcome, TestStep,
};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fmt, io, time::Duration};

/// The version of the report format.
///
/// Increment this when adding semantically important fields. Readers refuse documents with a
/// version newer than the one they were built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ReportFormatVersion(u32);

impl ReportFormatVersion {
    /// Creates a new `ReportFormatVersion`.
    pub const fn new(version: u32) -> Self {
        Self(version)
    }
}

impl fmt::Display for ReportFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The report format version written by this crate.
pub const REPORT_FORMAT_VERSION: ReportFormatVersion = ReportFormatVersion::new(1);

/// Serializes a finalized outcome to pretty-printed JSON bytes.
pub fn serialize(outcome: &TestOutcome) -> Result<Vec<u8>, SerializeError> {
    let mut buf = Vec::new();
    serialize_to(outcome, &mut buf, true)?;
    Ok(buf)
}

/// Serializes a finalized outcome to the given writer.
pub fn serialize_to(
    outcome: &TestOutcome,
    writer: impl io::Write,
    pretty: bool,
) -> Result<(), SerializeError> {
    let document = ReportDocument::from_outcome(outcome)?;
    if pretty {
        serde_json::to_writer_pretty(writer, &document)?;
    } else {
        serde_json::to_writer(writer, &document)?;
    }
    Ok(())
}

/// Reads an outcome from report bytes.
pub fn deserialize(bytes: &[u8]) -> Result<TestOutcome, ReportParseError> {
    // Check the version before anything else, so that newer documents get a version error
    // rather than a confusing structural one.
    let header: ReportHeader = serde_json::from_slice(bytes).map_err(ReportParseError::malformed)?;
    let version = header
        .format_version
        .ok_or_else(|| ReportParseError::malformed("missing field `formatVersion`"))?;
    if version > REPORT_FORMAT_VERSION {
        return Err(ReportParseError::unsupported(version));
    }

    let document: ReportDocument =
        serde_json::from_slice(bytes).map_err(ReportParseError::malformed)?;
    document.into_outcome()
}

impl TestOutcome {
    /// Serializes this outcome to a pretty-printed JSON string.
    ///
    /// Only finalized outcomes can be serialized.
    pub fn to_report_string(&self) -> Result<String, SerializeError> {
        let buf = serialize(self)?;
        Ok(String::from_utf8(buf).expect("serde_json always produces valid UTF-8"))
    }

    /// Reads an outcome from a report string.
    pub fn from_report_str(s: &str) -> Result<Self, ReportParseError> {
        deserialize(s.as_bytes())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportHeader {
    format_version: Option<ReportFormatVersion>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
    format_version: ReportFormatVersion,
    scenario_id: ScenarioId,
    result: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result_override: Option<ResultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, String>,
    steps: Vec<StepDocument>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepDocument {
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<ResultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    own_result: Option<ResultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    steps: Vec<StepDocument>,
}

impl ReportDocument {
    fn from_outcome(outcome: &TestOutcome) -> Result<Self, ModelError> {
        if !outcome.is_finalized() {
            return Err(ModelError::running(ModelSubject::Outcome, "serialize"));
        }
        Ok(Self {
            format_version: REPORT_FORMAT_VERSION,
            scenario_id: outcome.id().clone(),
            result: outcome.result(),
            result_override: outcome.result_override(),
            timestamp: outcome.timestamp(),
            duration_ms: outcome
                .time()
                .map(|time| u64::try_from(time.as_millis()).unwrap_or(u64::MAX)),
            properties: outcome.properties().clone(),
            steps: outcome.steps().iter().map(StepDocument::from_step).collect(),
        })
    }

    fn into_outcome(self) -> Result<TestOutcome, ReportParseError> {
        let Self {
            format_version: _,
            scenario_id,
            result,
            result_override,
            timestamp,
            duration_ms,
            properties,
            steps,
        } = self;

        let ScenarioId { story, name } = scenario_id;
        let id = ScenarioId::new(story, name).map_err(ReportParseError::malformed)?;
        let steps = steps
            .into_iter()
            .map(StepDocument::into_step)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TestOutcome::from_parts(
            id,
            steps,
            result_override,
            timestamp,
            duration_ms.map(Duration::from_millis),
            properties,
            result,
        ))
    }
}

impl StepDocument {
    fn from_step(step: &TestStep) -> Self {
        Self {
            description: step.description().to_owned(),
            result: Some(step.effective_result()),
            own_result: step.own_result(),
            message: step.message().map(str::to_owned),
            steps: step.children().iter().map(StepDocument::from_step).collect(),
        }
    }

    fn into_step(self) -> Result<TestStep, ReportParseError> {
        let Self {
            description,
            result,
            own_result,
            message,
            steps,
        } = self;

        if description.trim().is_empty() {
            return Err(ReportParseError::malformed(ModelError::EmptyDescription));
        }

        // Documents from other writers may only carry `result` on leaves.
        let own_result = match own_result {
            Some(own_result) => Some(own_result),
            None if steps.is_empty() => result,
            None => None,
        };
        let children = steps
            .into_iter()
            .map(StepDocument::into_step)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TestStep::from_parts(
            description,
            own_result,
            message,
            children,
            result,
        ))
    }
}
