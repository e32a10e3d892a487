// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for ci-triage.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

/// Overall configuration for ci-triage.
///
/// Repository-specific configuration is layered on top of the [default
/// config](Self::DEFAULT_CONFIG).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TriageConfig {
    package_prefix: String,
    test_file_suffix: String,
    codeowners: Utf8PathBuf,
    jobs_skipped_on_pr: Vec<String>,
}

impl TriageConfig {
    /// The default location of the config within the repository: `.config/ci-triage.toml`.
    pub const CONFIG_PATH: &'static str = ".config/ci-triage.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/ci-triage.toml` in
    /// the repository root.
    ///
    /// An explicitly specified file must exist. If no file is specified and the repository does
    /// not have `.config/ci-triage.toml`, the default config is used.
    pub fn from_sources(
        repo_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = repo_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid")
    }

    /// Returns the prefix stripped from package names.
    pub fn package_prefix(&self) -> &str {
        &self.package_prefix
    }

    /// Returns the suffix identifying test files.
    pub fn test_file_suffix(&self) -> &str {
        &self.test_file_suffix
    }

    /// Returns the path to the CODEOWNERS file, resolved against `repo_root`.
    pub fn codeowners_path(&self, repo_root: &Utf8Path) -> Utf8PathBuf {
        repo_root.join(&self.codeowners)
    }

    /// Returns the names of jobs that are not run on pull requests.
    pub fn jobs_skipped_on_pr(&self) -> &[String] {
        &self.jobs_skipped_on_pr
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))
    }
}
