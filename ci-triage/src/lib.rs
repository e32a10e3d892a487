// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classify the failures in a CI pipeline and render a chat notification summarizing them.
//!
//! The core logic lives in [`ci_triage_core`]. This crate contains the command-line interface.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod exit_codes;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use exit_codes::TriageExitCode;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
