// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading and writing report files.
//!
//! Each outcome is stored as one JSON file in a report directory. File names are derived from the
//! scenario identity, so a later run of the same scenario replaces the earlier report.

use crate::{
    config::{PendingOverridePolicy, StorylineConfig},
    errors::{DisplayErrorChain, ReportDirError},
    store::OutcomeSnapshot,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    borrow::Cow,
    io::{self, Write},
    sync::Arc,
};
use storyline_report::{ScenarioId, TestOutcome, format};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

/// The extension used for report files.
pub const REPORT_EXTENSION: &str = "json";

// Each name component of a report file name is cut to at most this many bytes.
const MAX_COMPONENT_LEN: usize = 48;

/// A directory of report files.
#[derive(Clone, Debug)]
pub struct ReportDir {
    dir: Utf8PathBuf,
    pretty: bool,
    pending_policy: PendingOverridePolicy,
}

impl ReportDir {
    /// Creates a new `ReportDir` for the given directory, writing pretty-printed reports with the
    /// default pending policy.
    ///
    /// The directory is created when the first report is written.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pretty: true,
            pending_policy: PendingOverridePolicy::default(),
        }
    }

    /// Creates a `ReportDir` for the configured store directory and settings.
    pub fn from_config(config: &StorylineConfig) -> Self {
        Self::new(config.store_dir())
            .with_pretty(config.pretty())
            .with_pending_policy(config.pending_policy())
    }

    /// Sets whether reports are pretty-printed.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the policy for pending overrides found in existing reports.
    pub fn with_pending_policy(mut self, pending_policy: PendingOverridePolicy) -> Self {
        self.pending_policy = pending_policy;
        self
    }

    /// Returns the directory.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the pending policy in effect.
    pub fn pending_policy(&self) -> PendingOverridePolicy {
        self.pending_policy
    }

    /// Returns the path of the report for the given scenario.
    ///
    /// The file name is made of readable forms of the story and scenario names, followed by a hash
    /// of the full identity so that distinct scenarios never share a file.
    pub fn report_path(&self, id: &ScenarioId) -> Utf8PathBuf {
        self.dir.join(report_file_name(id))
    }

    /// Writes the report for a finalized outcome, replacing any earlier report for the same
    /// scenario.
    ///
    /// Returns the path written to. The file is replaced atomically: readers see either the old
    /// report or the new one.
    pub fn write_outcome(&self, outcome: &TestOutcome) -> Result<Utf8PathBuf, ReportDirError> {
        let path = self.report_path(outcome.id());
        std::fs::create_dir_all(&self.dir).map_err(|error| ReportDirError::DirCreate {
            dir: self.dir.clone(),
            error,
        })?;

        let outcome = self.apply_pending_policy(&path, outcome);

        let mut bytes = Vec::new();
        format::serialize_to(&outcome, &mut bytes, self.pretty).map_err(|error| {
            ReportDirError::Serialize {
                path: path.clone(),
                error,
            }
        })?;
        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|file| file.write_all(&bytes))
            .map_err(|error| {
                let error = match error {
                    atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => error,
                };
                ReportDirError::Write {
                    path: path.clone(),
                    error,
                }
            })?;

        debug!(
            scenario = %outcome.id(),
            result = %outcome.result(),
            %path,
            "wrote report",
        );
        Ok(path)
    }

    /// Writes reports for every outcome in the snapshot, stopping at the first error.
    pub fn write_store(&self, snapshot: &OutcomeSnapshot) -> Result<Vec<Utf8PathBuf>, ReportDirError> {
        snapshot
            .iter()
            .map(|outcome| self.write_outcome(outcome))
            .collect()
    }

    /// Reads a single report.
    pub fn read_outcome(&self, path: &Utf8Path) -> Result<TestOutcome, ReportDirError> {
        read_report(path)
    }

    /// Reads the report for the given scenario, if one exists.
    pub fn read_scenario(&self, id: &ScenarioId) -> Result<Option<TestOutcome>, ReportDirError> {
        let path = self.report_path(id);
        match read_report(&path) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(ReportDirError::Read { error, .. }) if error.kind() == io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Reads every report in the directory, in file name order.
    ///
    /// Reports that cannot be read or parsed are returned separately and are never partially
    /// loaded. A missing directory has no reports.
    pub fn load_outcomes(&self) -> Result<LoadedOutcomes, ReportDirError> {
        let entries = match self.dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %self.dir, "report directory does not exist");
                return Ok(LoadedOutcomes::default());
            }
            Err(error) => {
                return Err(ReportDirError::DirRead {
                    dir: self.dir.clone(),
                    error,
                });
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| ReportDirError::DirRead {
                dir: self.dir.clone(),
                error,
            })?;
            let path = entry.path();
            if path.extension() == Some(REPORT_EXTENSION) && path.is_file() {
                paths.push(path.to_owned());
            }
        }
        paths.sort_unstable();

        let mut loaded = LoadedOutcomes::default();
        for path in paths {
            match read_report(&path) {
                Ok(outcome) => loaded.reports.push(LoadedReport {
                    path,
                    outcome: Arc::new(outcome),
                }),
                Err(error) => {
                    warn!("skipping report: {}", DisplayErrorChain::new(&error));
                    loaded.rejected.push(error);
                }
            }
        }
        Ok(loaded)
    }

    fn apply_pending_policy<'a>(
        &self,
        path: &Utf8Path,
        outcome: &'a TestOutcome,
    ) -> Cow<'a, TestOutcome> {
        match self.pending_policy {
            PendingOverridePolicy::LatestRun => Cow::Borrowed(outcome),
            PendingOverridePolicy::Sticky => {
                let previous = match read_report(path) {
                    Ok(previous) => previous,
                    Err(ReportDirError::Read { error, .. })
                        if error.kind() == io::ErrorKind::NotFound =>
                    {
                        return Cow::Borrowed(outcome);
                    }
                    Err(error) => {
                        warn!(
                            "replacing unreadable report: {}",
                            DisplayErrorChain::new(&error)
                        );
                        return Cow::Borrowed(outcome);
                    }
                };

                let Some(carried) = previous.result_override() else {
                    return Cow::Borrowed(outcome);
                };
                if outcome.result_override().is_some_and(|current| current >= carried) {
                    return Cow::Borrowed(outcome);
                }
                match outcome.clone().with_override_raised(carried) {
                    Ok(raised) => {
                        debug!(
                            scenario = %outcome.id(),
                            %carried,
                            "carrying result override from earlier report",
                        );
                        Cow::Owned(raised)
                    }
                    // Only finalized outcomes reach the writer; serializing reports the error.
                    Err(_) => Cow::Borrowed(outcome),
                }
            }
        }
    }
}

/// The reports read from a [`ReportDir`].
#[derive(Debug, Default)]
pub struct LoadedOutcomes {
    /// Reports that were read successfully, in file name order.
    pub reports: Vec<LoadedReport>,

    /// Reports that could not be read or parsed.
    pub rejected: Vec<ReportDirError>,
}

impl LoadedOutcomes {
    /// Returns the loaded outcomes as a snapshot.
    pub fn snapshot(&self) -> OutcomeSnapshot {
        OutcomeSnapshot::from_outcomes(self.reports.iter().map(|report| report.outcome.clone()))
    }
}

/// A report read from disk.
#[derive(Clone, Debug)]
pub struct LoadedReport {
    /// The path the report was read from.
    pub path: Utf8PathBuf,

    /// The outcome held by the report.
    pub outcome: Arc<TestOutcome>,
}

fn read_report(path: &Utf8Path) -> Result<TestOutcome, ReportDirError> {
    let bytes = std::fs::read(path).map_err(|error| ReportDirError::Read {
        path: path.to_owned(),
        error,
    })?;
    format::deserialize(&bytes).map_err(|error| ReportDirError::Parse {
        path: path.to_owned(),
        error,
    })
}

fn report_file_name(id: &ScenarioId) -> String {
    let mut hash_input = Vec::with_capacity(id.story.len() + id.name.len() + 1);
    hash_input.extend_from_slice(id.story.as_bytes());
    // The separator keeps ("ab", "c") and ("a", "bc") apart.
    hash_input.push(0);
    hash_input.extend_from_slice(id.name.as_bytes());
    let hash = xxh3_64(&hash_input);

    let story = Utf8Path::new(&id.story)
        .file_stem()
        .unwrap_or(id.story.as_str());
    format!(
        "{}-{}-{hash:016x}.{REPORT_EXTENSION}",
        sanitize_component(story),
        sanitize_component(&id.name),
    )
}

// Keeps ASCII alphanumerics, `-` and `_`, and replaces runs of anything else with one `_`.
fn sanitize_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_COMPONENT_LEN));
    let mut last_was_replacement = false;
    for ch in s.chars() {
        if out.len() >= MAX_COMPONENT_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
            last_was_replacement = false;
        } else if !last_was_replacement {
            out.push('_');
            last_was_replacement = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "_".to_owned()
    } else {
        trimmed.to_owned()
    }
}
