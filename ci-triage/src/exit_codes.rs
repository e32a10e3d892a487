// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `ci-triage` failures.
///
/// `ci-triage` runs can fail for a variety of reasons. This structure documents the different
/// exit codes that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TriageExitCode {}

impl TriageExitCode {
    /// No errors occurred and ci-triage exited normally.
    pub const OK: i32 = 0;

    /// An error was encountered while loading the config or the CODEOWNERS file.
    pub const SETUP_ERROR: i32 = 96;

    /// The pipeline failure records could not be read or were invalid.
    pub const INPUT_ERROR: i32 = 97;

    /// An error occurred while writing output.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
