// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Record, aggregate and persist the outcomes of behaviour-driven test runs.
//!
//! A run is made up of scenarios, each represented by a [`TestOutcome`]. An outcome owns an
//! ordered tree of [`TestStep`]s, and every step and outcome has a [`ResultKind`] computed by the
//! rules in [`aggregate`]. Finalized outcomes can be written to and read back from the versioned
//! JSON report format in [`format`].

pub mod aggregate;
mod errors;
pub mod format;
mod outcome;
mod result;
mod step;

pub use errors::*;
pub use format::{REPORT_FORMAT_VERSION, ReportFormatVersion};
pub use outcome::*;
pub use result::*;
pub use step::*;
