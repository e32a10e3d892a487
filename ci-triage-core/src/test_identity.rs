// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifying failed tests and the teams that own them.
//!
//! A failed test is identified by its name and its package. The teams that own a test are found by
//! locating the source file that defines it (through a [`SourceLocator`]) and looking that file up
//! in an [`OwnershipRegistry`]. Both lookups are best-effort: a test whose file cannot be found is
//! still reported, just without owners.

use crate::errors::LocateError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use tracing::{debug, warn};

/// The path used to query the ownership registry when a test's source file could not be located.
pub const NO_FILE_SENTINEL: &str = ".none";

/// Finds the source file that defines a test.
pub trait SourceLocator {
    /// Returns the file under `package` that defines `test_name`, if any.
    ///
    /// If several files match, implementations must return the first one in a deterministic
    /// order.
    fn find(&self, test_name: &str, package: &str) -> Result<Option<Utf8PathBuf>, LocateError>;
}

/// Looks up the registered owners of a file.
pub trait OwnershipRegistry {
    /// Returns the owners of `path`, in the order the registry lists them.
    fn owners_of(&self, path: &Utf8Path) -> Vec<Owner>;
}

/// The kind of an entry in an ownership registry.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum OwnerKind {
    /// A team, e.g. `@org/team-name`.
    Team,

    /// An individual user, e.g. `@username`.
    User,

    /// An email address.
    Email,
}

/// A single entry in an ownership registry.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Owner {
    /// The kind of owner.
    pub kind: OwnerKind,

    /// The owner's name, as written in the registry.
    pub name: String,
}

impl Owner {
    /// Creates a new owner.
    pub fn new(kind: OwnerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// The unique key for a failed test: its name and normalized package.
///
/// Two failures with the same key are the same test, no matter which job ran them.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestKey {
    /// The name of the test.
    pub name: String,

    /// The package the test is in, with the repository prefix removed.
    pub package: String,
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.package)
    }
}

/// The result of looking for the source file that defines a test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LocatedFile {
    /// The file was found.
    Found(Utf8PathBuf),

    /// No file was found, or the search failed.
    NotFound,
}

impl LocatedFile {
    /// Returns the path to query the ownership registry with.
    ///
    /// This is [`NO_FILE_SENTINEL`] if no file was found.
    pub fn registry_path(&self) -> &Utf8Path {
        match self {
            Self::Found(path) => path,
            Self::NotFound => Utf8Path::new(NO_FILE_SENTINEL),
        }
    }
}

/// Everything needed to resolve the owners of a failed test.
pub struct TestOwnership<'a> {
    package_prefix: &'a str,
    locator: &'a dyn SourceLocator,
    registry: &'a dyn OwnershipRegistry,
}

impl<'a> TestOwnership<'a> {
    /// Creates a new `TestOwnership`.
    ///
    /// `package_prefix` is stripped from package names before they're used, e.g. the Go module
    /// path of the repository.
    pub fn new(
        package_prefix: &'a str,
        locator: &'a dyn SourceLocator,
        registry: &'a dyn OwnershipRegistry,
    ) -> Self {
        Self {
            package_prefix,
            locator,
            registry,
        }
    }

    /// Strips the package prefix from `package`, leaving it unchanged if the prefix is absent.
    pub fn normalize_package<'p>(&self, package: &'p str) -> &'p str {
        package
            .strip_prefix(self.package_prefix)
            .unwrap_or(package)
    }

    fn locate(&self, name: &str, package: &str) -> LocatedFile {
        match self.locator.find(name, package) {
            Ok(Some(path)) => LocatedFile::Found(path),
            Ok(None) => {
                debug!(
                    "no file defines test {name} in package {package}; \
                     setting file to `{NO_FILE_SENTINEL}`"
                );
                LocatedFile::NotFound
            }
            Err(error) => {
                warn!(
                    "error while finding test {name} from package {package}: {error}; \
                     setting file to `{NO_FILE_SENTINEL}` so its ownership can be investigated"
                );
                LocatedFile::NotFound
            }
        }
    }

    fn team_owners(&self, file: &LocatedFile) -> Vec<String> {
        self.registry
            .owners_of(file.registry_path())
            .into_iter()
            .filter(|owner| owner.kind == OwnerKind::Team)
            .map(|owner| owner.name)
            .collect()
    }
}

/// A failed test, along with the teams that own it.
#[derive(Clone, Debug)]
pub struct FailedTest {
    key: TestKey,
    file: LocatedFile,
    owners: Vec<String>,
}

impl FailedTest {
    /// Resolves a failed test's identity and owners.
    ///
    /// This never fails: if the test's source file cannot be located, the test is still returned
    /// with [`LocatedFile::NotFound`].
    pub fn resolve(name: &str, package: &str, ownership: &TestOwnership<'_>) -> Self {
        let package = ownership.normalize_package(package);
        let file = ownership.locate(name, package);
        let owners = ownership.team_owners(&file);
        Self {
            key: TestKey {
                name: name.to_owned(),
                package: package.to_owned(),
            },
            file,
            owners,
        }
    }

    /// Returns the key identifying this test.
    pub fn key(&self) -> &TestKey {
        &self.key
    }

    /// Returns the name of this test.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Returns the normalized package for this test.
    pub fn package(&self) -> &str {
        &self.key.package
    }

    /// Returns the file that defines this test.
    pub fn file(&self) -> &LocatedFile {
        &self.file
    }

    /// Returns the teams that own this test.
    pub fn owners(&self) -> &[String] {
        &self.owners
    }
}

impl PartialEq for FailedTest {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FailedTest {}

impl std::hash::Hash for FailedTest {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
