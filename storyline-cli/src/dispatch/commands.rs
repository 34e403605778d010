// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Implementations of the storyline commands.

use super::app::BaseApp;
use crate::{
    ExpectedError, Result, StorylineExitCode,
    output::{OutputContext, OutputWriter, ReportStyles},
};
use camino::Utf8Path;
use owo_colors::OwoColorize;
use std::io::{self, Write};
use storyline_report::{ResultKind, TestOutcome, TestStep};
use storyline_runner::{
    errors::DisplayErrorChain,
    junit::write_junit,
    report_dir::{LoadedOutcomes, LoadedReport},
    summary::RunSummary,
};
use tracing::{info, warn};

/// Width of the result column: the longest result token, `COMPROMISED`, plus a space.
const RESULT_WIDTH: usize = 12;

pub(super) fn exec_summary(
    base: &BaseApp,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let loaded = base.report_dir.load_outcomes()?;
    warn_rejected(base, &loaded);
    let reports = selected_reports(base, &loaded);
    if reports.is_empty() {
        info!("no reports found in `{}`", base.report_dir.dir());
        return Ok(StorylineExitCode::OK);
    }

    let summary = RunSummary::from_outcomes(reports.iter().map(|report| report.outcome.as_ref()));
    let styles = output.stdout_styles();
    let mut writer = output_writer.stdout_writer();
    write_summary(&reports, &summary, &styles, output.verbose, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(ExpectedError::write_output)?;

    if summary.is_passing() {
        Ok(StorylineExitCode::OK)
    } else {
        let failing = summary
            .counts()
            .iter()
            .filter(|(result, _)| result.is_failing())
            .map(|(_, count)| count)
            .sum();
        Err(ExpectedError::RunFailed {
            verdict: summary.verdict(),
            failing,
        })
    }
}

pub(super) fn exec_show(
    base: &BaseApp,
    report: &Utf8Path,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let outcome = base.report_dir.read_outcome(report)?;
    let styles = output.stdout_styles();
    let mut writer = output_writer.stdout_writer();
    write_outcome_details(&outcome, &styles, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(ExpectedError::write_output)?;
    Ok(StorylineExitCode::OK)
}

pub(super) fn exec_validate(
    base: &BaseApp,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let loaded = base.report_dir.load_outcomes()?;
    let styles = output.stdout_styles();
    let mut writer = output_writer.stdout_writer();

    let invalid = write_validation(&loaded, &styles, output.verbose, &mut writer)
        .and_then(|invalid| writer.flush().map(|()| invalid))
        .map_err(ExpectedError::write_output)?;

    if invalid == 0 {
        Ok(StorylineExitCode::OK)
    } else {
        Err(ExpectedError::InvalidReports {
            dir: base.report_dir.dir().to_owned(),
            invalid,
        })
    }
}

pub(super) fn exec_junit(base: &BaseApp, junit_path: &Utf8Path, name: &str) -> Result<i32> {
    let loaded = base.report_dir.load_outcomes()?;
    warn_rejected(base, &loaded);
    let reports = selected_reports(base, &loaded);

    write_junit(
        junit_path,
        name,
        reports.iter().map(|report| report.outcome.as_ref()),
    )?;
    info!(
        "wrote JUnit report for {} to `{junit_path}`",
        plural(reports.len(), "scenario", "scenarios")
    );
    Ok(StorylineExitCode::OK)
}

/// Returns the loaded reports whose story passes the configured story filter.
fn selected_reports<'a>(base: &BaseApp, loaded: &'a LoadedOutcomes) -> Vec<&'a LoadedReport> {
    let filter = base.config.story_filter();
    loaded
        .reports
        .iter()
        .filter(|report| filter.is_match(Utf8Path::new(&report.outcome.id().story)))
        .collect()
}

fn warn_rejected(base: &BaseApp, loaded: &LoadedOutcomes) {
    if !loaded.rejected.is_empty() {
        warn!(
            "skipped {} in `{}` (run `storyline validate` for details)",
            plural(loaded.rejected.len(), "unreadable report", "unreadable reports"),
            base.report_dir.dir(),
        );
    }
}

fn write_summary(
    reports: &[&LoadedReport],
    summary: &RunSummary,
    styles: &ReportStyles,
    verbose: bool,
    writer: &mut dyn Write,
) -> io::Result<()> {
    for report in reports {
        let outcome = &report.outcome;
        write_result_label(outcome.result(), styles, writer)?;
        writeln!(
            writer,
            "{} ({})",
            outcome.id(),
            plural(outcome.nested_step_count(), "step", "steps"),
        )?;
        if outcome.result().is_failing() {
            if let Some(message) = outcome.first_failure_message() {
                writeln!(
                    writer,
                    "{:RESULT_WIDTH$}{}",
                    "",
                    message.style(styles.message)
                )?;
            }
        }
        if verbose {
            for step in outcome.steps() {
                write_step(step, 1, styles, writer)?;
            }
        }
    }

    writeln!(writer)?;
    let counts = summary
        .counts()
        .iter()
        .map(|(result, count)| format!("{count} {}", result.style(styles.for_result(*result))))
        .collect::<Vec<_>>()
        .join(", ");
    write!(
        writer,
        "{}: {}: {counts}; result {}",
        "Summary".style(styles.bold),
        plural(summary.total(), "scenario", "scenarios"),
        summary.verdict().style(styles.for_result(summary.verdict())),
    )?;
    let total_time = summary.total_time();
    if !total_time.is_zero() {
        write!(writer, " in {:.3}s", total_time.as_secs_f64())?;
    }
    writeln!(writer)
}

fn write_outcome_details(
    outcome: &TestOutcome,
    styles: &ReportStyles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    writeln!(writer, "{}", outcome.id().style(styles.bold))?;
    writeln!(
        writer,
        "  result: {}",
        outcome.result().style(styles.for_result(outcome.result()))
    )?;
    if let Some(result_override) = outcome.result_override() {
        writeln!(writer, "  override: {result_override}")?;
    }
    if let Some(timestamp) = outcome.timestamp() {
        writeln!(writer, "  started: {}", timestamp.to_rfc3339())?;
    }
    if let Some(time) = outcome.time() {
        writeln!(writer, "  time: {:.3}s", time.as_secs_f64())?;
    }
    if !outcome.properties().is_empty() {
        writeln!(writer, "  properties:")?;
        for (key, value) in outcome.properties() {
            writeln!(writer, "    {key}: {value}")?;
        }
    }
    writeln!(
        writer,
        "  steps: {}",
        plural(outcome.nested_step_count(), "step", "steps")
    )?;
    for step in outcome.steps() {
        write_step(step, 1, styles, writer)?;
    }
    Ok(())
}

/// Writes one line per step, nested steps indented below their parent.
fn write_step(
    step: &TestStep,
    depth: usize,
    styles: &ReportStyles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    write!(writer, "{indent}")?;
    write_result_label(step.effective_result(), styles, writer)?;
    writeln!(writer, "{}", step.description())?;
    if let Some(message) = step.message() {
        writeln!(
            writer,
            "{indent}{:RESULT_WIDTH$}{}",
            "",
            message.style(styles.message)
        )?;
    }
    for child in step.children() {
        write_step(child, depth + 1, styles, writer)?;
    }
    Ok(())
}

/// Checks every report, and returns the number of invalid ones.
fn write_validation(
    loaded: &LoadedOutcomes,
    styles: &ReportStyles,
    verbose: bool,
    writer: &mut dyn Write,
) -> io::Result<usize> {
    let mut invalid = 0;
    for error in &loaded.rejected {
        invalid += 1;
        writeln!(
            writer,
            "{}{}",
            pad_label("INVALID").style(styles.failed),
            DisplayErrorChain::new(error)
        )?;
    }

    for report in &loaded.reports {
        match report.outcome.revalidate() {
            Ok(()) => {
                if verbose {
                    writeln!(
                        writer,
                        "{}{}",
                        pad_label("VALID").style(styles.passed),
                        report.path
                    )?;
                }
            }
            Err(error) => {
                invalid += 1;
                writeln!(
                    writer,
                    "{}{}: {}",
                    pad_label("INVALID").style(styles.failed),
                    report.path,
                    DisplayErrorChain::new(&error)
                )?;
            }
        }
    }

    let total = loaded.rejected.len() + loaded.reports.len();
    writeln!(
        writer,
        "{}: {}, {invalid} invalid",
        "Validated".style(styles.bold),
        plural(total, "report", "reports"),
    )?;
    Ok(invalid)
}

fn write_result_label(
    result: ResultKind,
    styles: &ReportStyles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    // Pad before styling so escape codes don't count towards the width.
    write!(
        writer,
        "{}",
        pad_label(result.as_str()).style(styles.for_result(result))
    )
}

fn pad_label(label: &str) -> String {
    format!("{label:<RESULT_WIDTH$}")
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}
