// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use camino::{FromPathBufError, Utf8PathBuf};
use owo_colors::OwoColorize;
use std::error::Error;
use storyline_report::ResultKind;
use storyline_runner::errors::{
    ConfigParseError, ConfigParseErrorKind, JunitWriteError, ReportDirError,
};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `storyline` failures.
///
/// Unknown or unexpected failures always result in exit code 1.
pub enum StorylineExitCode {}

impl StorylineExitCode {
    /// No errors occurred, and every summarized scenario passed.
    pub const OK: i32 = 0;

    /// The summarized reports contain a failing scenario.
    pub const RUN_FAILED: i32 = 100;

    /// One or more reports could not be read, or their stored results do not match their steps.
    pub const INVALID_REPORTS: i32 = 101;

    /// Writing output to stdout or to a file failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// An error occurred while setting up: the workspace root or the config is invalid.
    pub const SETUP_ERROR: i32 = 96;
}

// The #[error()] strings are placeholders: errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An error that storyline expects might happen, with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("workspace root is not valid UTF-8")]
    WorkspaceRootInvalidUtf8 {
        #[source]
        err: FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("report directory error")]
    ReportDirError {
        #[from]
        err: ReportDirError,
    },
    #[error("JUnit write error")]
    JunitWriteError {
        #[from]
        err: JunitWriteError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("scenarios failed")]
    RunFailed { verdict: ResultKind, failing: usize },
    #[error("invalid reports")]
    InvalidReports { dir: Utf8PathBuf, invalid: usize },
}

impl ExpectedError {
    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::WorkspaceRootInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ReportDirError { .. } => StorylineExitCode::SETUP_ERROR,
            Self::JunitWriteError { .. } | Self::WriteOutputError { .. } => {
                StorylineExitCode::WRITE_OUTPUT_ERROR
            }
            Self::RunFailed { .. } => StorylineExitCode::RUN_FAILED,
            Self::InvalidReports { .. } => StorylineExitCode::INVALID_REPORTS,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::WorkspaceRootInvalidUtf8 { err } => {
                error!("workspace root is not valid UTF-8");
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { err } => match err.kind() {
                ConfigParseErrorKind::BuildError(build_error) => {
                    error!(
                        "failed to parse storyline config at `{}`",
                        err.config_file().style(styles.bold)
                    );
                    Some(&**build_error as &dyn Error)
                }
                ConfigParseErrorKind::DeserializeError(deserialize_error) => {
                    error!(
                        "failed to parse storyline config at `{}`: key `{}` is invalid",
                        err.config_file().style(styles.bold),
                        deserialize_error.path().style(styles.bold),
                    );
                    Some(deserialize_error.inner() as &dyn Error)
                }
                ConfigParseErrorKind::StoryFilter(filter_error) => {
                    error!(
                        "in storyline config at `{}`, {}",
                        err.config_file().style(styles.bold),
                        filter_error,
                    );
                    filter_error.source()
                }
                _ => {
                    error!("{err}");
                    err.source()
                }
            },
            Self::ReportDirError { err } => {
                error!("{err}");
                err.source()
            }
            Self::JunitWriteError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
            Self::RunFailed { verdict, failing } => {
                let noun = if *failing == 1 { "scenario" } else { "scenarios" };
                error!(
                    "{failing} {noun} did not pass (overall result: {})",
                    verdict.style(styles.bold),
                );
                None
            }
            Self::InvalidReports { dir, invalid } => {
                let noun = if *invalid == 1 { "report" } else { "reports" };
                error!(
                    "{invalid} invalid {noun} in `{}`",
                    dir.style(styles.bold)
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: "storyline::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
