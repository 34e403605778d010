// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for storyline.
//!
//! Configuration is read once, from the embedded defaults, an optional TOML file and any
//! overrides, and then passed explicitly to the components that need it.

mod elements;
mod imp;

pub use elements::*;
pub use imp::*;
