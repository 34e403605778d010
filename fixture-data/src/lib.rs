// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture stories shared by storyline's integration tests.

pub mod models;
pub mod stories;
