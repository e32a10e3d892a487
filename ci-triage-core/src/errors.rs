// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by ci-triage.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse ci-triage config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of a [`ConfigParseError`].
#[derive(Debug, Error)]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error that occurred while loading pipeline failure records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InputError {
    /// The input file could not be read.
    #[error("failed to read failures from `{path}`")]
    Read {
        /// The path that was being read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The input was not valid JSON, or did not match the expected shape.
    #[error("failed to parse failures at `{}`", .err.path())]
    Parse {
        /// The underlying error, along with the path within the document at which it occurred.
        #[source]
        err: serde_path_to_error::Error<serde_json::Error>,
    },

    /// A test failure referred to a job that was not part of the input.
    #[error("test `{test_name}` refers to unknown job id {job_id}")]
    UnknownJob {
        /// The name of the failing test.
        test_name: String,

        /// The job id that could not be found.
        job_id: u64,
    },

    /// Two jobs in the input had the same id.
    #[error("job id {job_id} appears more than once")]
    DuplicateJob {
        /// The duplicated id.
        job_id: u64,
    },
}

/// An error that occurred while parsing a CODEOWNERS file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodeownersParseError {
    /// The file could not be read.
    #[error("failed to read CODEOWNERS file `{path}`")]
    Read {
        /// The path to the CODEOWNERS file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// A pattern in the file could not be compiled.
    #[error("invalid pattern `{pattern}` on line {line}")]
    InvalidPattern {
        /// The 1-based line number.
        line: usize,

        /// The pattern as written.
        pattern: String,

        /// The underlying error.
        #[source]
        err: globset::Error,
    },
}

/// An error that occurred while looking for the source file defining a test.
///
/// These errors are never propagated past test resolution: a test whose file cannot be located is
/// still reported, just without owners.
#[derive(Debug)]
#[non_exhaustive]
pub enum LocateError {
    /// The package directory does not exist.
    PackageDirMissing {
        /// The directory that was searched.
        dir: Utf8PathBuf,
    },

    /// An error occurred while walking the package directory.
    Walk(walkdir::Error),

    /// A candidate file could not be read.
    ReadFile {
        /// The file that could not be read.
        path: Utf8PathBuf,

        /// The underlying error.
        err: std::io::Error,
    },
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PackageDirMissing { dir } => {
                write!(f, "package directory `{dir}` does not exist")
            }
            Self::Walk(_) => write!(f, "error walking package directory"),
            Self::ReadFile { path, .. } => write!(f, "error reading `{path}`"),
        }
    }
}

impl error::Error for LocateError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::PackageDirMissing { .. } => None,
            Self::Walk(err) => Some(err),
            Self::ReadFile { err, .. } => Some(err),
        }
    }
}

/// An error returned while parsing a [`FailureKind`](crate::failure::FailureKind) or
/// [`FailureReason`](crate::failure::FailureReason) from a string.
#[derive(Clone, Debug, Error)]
#[error("unrecognized {what}: {input}\n(known values: {})", .known.join(", "))]
pub struct FailureParseError {
    what: &'static str,
    input: String,
    known: Vec<&'static str>,
}

impl FailureParseError {
    pub(crate) fn new(
        what: &'static str,
        input: impl Into<String>,
        known: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self {
            what,
            input: input.into(),
            known: known.into_iter().collect(),
        }
    }
}
