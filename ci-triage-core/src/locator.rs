// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finding the source file that defines a test, by searching the repository checkout.

use crate::{errors::LocateError, test_identity::SourceLocator};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A [`SourceLocator`] that searches a package directory on disk.
///
/// A file defines a test if its name ends with the test file suffix (e.g. `_test.go`) and its
/// contents mention the test's name. Directories are walked in file name order, and the first
/// matching file is returned.
#[derive(Clone, Debug)]
pub struct FsSourceLocator {
    repo_root: Utf8PathBuf,
    test_file_suffix: String,
}

impl FsSourceLocator {
    /// Creates a new locator rooted at `repo_root`.
    ///
    /// Paths returned by the locator are relative to `repo_root`.
    pub fn new(repo_root: impl Into<Utf8PathBuf>, test_file_suffix: impl Into<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            test_file_suffix: test_file_suffix.into(),
        }
    }

    /// Returns the root of the repository being searched.
    pub fn repo_root(&self) -> &Utf8Path {
        &self.repo_root
    }
}

impl SourceLocator for FsSourceLocator {
    fn find(&self, test_name: &str, package: &str) -> Result<Option<Utf8PathBuf>, LocateError> {
        let dir = self.repo_root.join(package);
        if !dir.is_dir() {
            return Err(LocateError::PackageDirMissing { dir });
        }

        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(LocateError::Walk)?;
            if !entry.file_type().is_file() {
                continue;
            }
            // Non-UTF-8 paths can't be test files we know how to report on.
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                continue;
            };
            if !path.as_str().ends_with(&self.test_file_suffix) {
                continue;
            }

            let contents = std::fs::read(path).map_err(|err| LocateError::ReadFile {
                path: path.to_owned(),
                err,
            })?;
            if !contains(&contents, test_name.as_bytes()) {
                continue;
            }

            let relative = path.strip_prefix(&self.repo_root).unwrap_or(path);
            debug!("found test {test_name} in {relative}");
            return Ok(Some(relative.to_owned()));
        }

        Ok(None)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
