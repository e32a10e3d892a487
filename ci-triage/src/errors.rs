// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    TriageExitCode,
    output::{NO_HEADING_TARGET, StderrStyles},
};
use camino::Utf8PathBuf;
use ci_triage_core::errors::{CodeownersParseError, ConfigParseError, InputError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that ci-triage knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("repository root is invalid")]
    RepoRootInvalid { repo_root: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("CODEOWNERS parse error")]
    CodeownersParseError {
        #[from]
        err: CodeownersParseError,
    },
    #[error("failed to load pipeline failures")]
    InputError {
        input_file: Utf8PathBuf,
        #[source]
        err: InputError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn input_error(input_file: impl Into<Utf8PathBuf>, err: InputError) -> Self {
        Self::InputError {
            input_file: input_file.into(),
            err,
        }
    }

    pub(crate) fn write_output_error(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::RepoRootInvalid { .. }
            | Self::ConfigParseError { .. }
            | Self::CodeownersParseError { .. } => TriageExitCode::SETUP_ERROR,
            Self::InputError { .. } => TriageExitCode::INPUT_ERROR,
            Self::WriteOutputError { .. } => TriageExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::RepoRootInvalid { repo_root } => {
                error!(
                    "repository root `{}` is not a directory",
                    repo_root.style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::CodeownersParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InputError { input_file, err } => {
                error!(
                    "failed to load pipeline failures from `{}`",
                    input_file.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
