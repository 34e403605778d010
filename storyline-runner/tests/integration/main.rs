// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that drive the recorder with the fixture stories.

mod basic;
mod fixtures;
mod persistence;
