// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for ci-triage: classifying failed CI jobs and rendering
//! a chat notification that summarizes them.
//!
//! The basic flow is:
//!
//! 1. Failed jobs are loaded (see [`input`]) and classified into a
//!    [`FailedJobs`](failed_jobs::FailedJobs) accumulator.
//! 2. Failed tests are resolved to a [`FailedTest`](test_identity::FailedTest),
//!    which carries the teams that own the test.
//! 3. A [`SlackMessage`](message::SlackMessage) renders everything into the
//!    final notification text.

pub mod codeowners;
pub mod config;
pub mod errors;
pub mod failed_jobs;
pub mod failure;
pub mod input;
pub mod job;
pub mod locator;
pub mod message;
pub mod test_identity;

#[cfg(test)]
mod test_helpers;
