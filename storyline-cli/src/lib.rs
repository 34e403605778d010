// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line access to storyline scenario reports.
//!
//! The `storyline` binary reads the reports a run left in the report directory, and can
//! summarize them, show a single report, check that stored results still agree with their step
//! trees, and export them as JUnit XML.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
