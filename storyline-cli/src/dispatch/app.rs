// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use super::commands::{exec_junit, exec_show, exec_summary, exec_validate};
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use storyline_runner::{config::StorylineConfig, report_dir::ReportDir};
use tracing::debug;

/// Inspect, validate and export storyline scenario reports.
#[derive(Debug, Parser)]
#[command(
    name = "storyline",
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct StorylineApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl StorylineApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Summary { dir_opts } => {
                let base = BaseApp::new(&self.config_opts, dir_opts.dir.as_deref())?;
                exec_summary(&base, output, output_writer)
            }
            Command::Show { report } => {
                let base = BaseApp::new(&self.config_opts, None)?;
                exec_show(&base, &report, output, output_writer)
            }
            Command::Validate { dir_opts } => {
                let base = BaseApp::new(&self.config_opts, dir_opts.dir.as_deref())?;
                exec_validate(&base, output, output_writer)
            }
            Command::Junit {
                dir_opts,
                output: junit_path,
                name,
            } => {
                let base = BaseApp::new(&self.config_opts, dir_opts.dir.as_deref())?;
                exec_junit(&base, &junit_path, &name)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize the reports in the report directory
    ///
    /// Prints one line per scenario and the number of scenarios with each result. Exits with a
    /// non-zero code if any scenario is compromised, failed or errored.
    Summary {
        #[clap(flatten)]
        dir_opts: ReportDirOpts,
    },

    /// Show a single report with its step tree
    Show {
        /// Path to the report file
        #[arg(value_name = "REPORT")]
        report: Utf8PathBuf,
    },

    /// Check that every report can be read and that stored results match their steps
    ///
    /// Results stored in reports are trusted when summarizing. This command recomputes each
    /// result from its step tree and reports any disagreement.
    Validate {
        #[clap(flatten)]
        dir_opts: ReportDirOpts,
    },

    /// Export the reports as JUnit XML
    Junit {
        #[clap(flatten)]
        dir_opts: ReportDirOpts,

        /// Path to write the JUnit XML to
        #[arg(long, short, value_name = "PATH")]
        output: Utf8PathBuf,

        /// Name of the top-level JUnit report
        #[arg(long, default_value = "storyline", value_name = "NAME")]
        name: String,
    },
}

/// Configuration options for storyline.
#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Workspace root [default: current directory]
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "STORYLINE_WORKSPACE_ROOT"
    )]
    workspace_root: Option<Utf8PathBuf>,

    /// Config file [default: workspace-root/.config/storyline.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct ReportDirOpts {
    /// Report directory, relative to the workspace root [default: the configured store
    /// directory]
    #[arg(long, value_name = "DIR")]
    dir: Option<Utf8PathBuf>,
}

/// Configuration and report directory shared by every command.
#[derive(Debug)]
pub(super) struct BaseApp {
    pub(super) config: StorylineConfig,
    pub(super) report_dir: ReportDir,
}

impl BaseApp {
    fn new(config_opts: &ConfigOpts, dir: Option<&Utf8Path>) -> Result<Self> {
        let workspace_root = match &config_opts.workspace_root {
            Some(root) => root.clone(),
            None => current_dir()?,
        };

        let mut overrides = Vec::new();
        if let Some(dir) = dir {
            overrides.push(("store.dir", dir.as_str()));
        }
        let config = StorylineConfig::from_sources(
            workspace_root,
            config_opts.config_file.as_deref(),
            &overrides,
        )?;
        let report_dir = ReportDir::from_config(&config);
        debug!(dir = %report_dir.dir(), "using report directory");

        Ok(Self { config, report_dir })
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(dir).map_err(|err| ExpectedError::WorkspaceRootInvalidUtf8 { err })
}
