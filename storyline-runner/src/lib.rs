// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Recording and persistence for storyline runs.
//!
//! The external test runner drives a [`listener::LifecycleListener`] with story, scenario and
//! step notifications. The [`listener::OutcomeRecorder`] turns those into
//! [`TestOutcome`](storyline_report::TestOutcome)s, which are collected in a shared
//! [`store::OutcomeStore`] and written out through a [`report_dir::ReportDir`].

pub mod config;
pub mod discovery;
pub mod errors;
pub mod junit;
pub mod listener;
pub mod report_dir;
pub mod store;
pub mod summary;
