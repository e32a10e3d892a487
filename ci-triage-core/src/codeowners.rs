// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ownership lookups backed by a GitHub `CODEOWNERS` file.

use crate::{
    errors::CodeownersParseError,
    test_identity::{Owner, OwnerKind, OwnershipRegistry},
};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

/// A parsed `CODEOWNERS` file.
///
/// Patterns follow `.gitignore` rules. As with GitHub, the last rule matching a path wins.
#[derive(Clone, Debug)]
pub struct Codeowners {
    rules: Vec<Rule>,
}

#[derive(Clone, Debug)]
struct Rule {
    pattern: String,
    matcher: GlobSet,
    owners: Vec<Owner>,
}

impl Codeowners {
    /// Reads and parses a `CODEOWNERS` file.
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Result<Self, CodeownersParseError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|err| CodeownersParseError::Read { path: path.clone(), err })?;
        let codeowners = Self::parse(&contents)?;
        debug!(
            "loaded {} CODEOWNERS rules from {path}",
            codeowners.rules.len()
        );
        Ok(codeowners)
    }

    /// Parses the contents of a `CODEOWNERS` file.
    pub fn parse(contents: &str) -> Result<Self, CodeownersParseError> {
        let mut rules = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            };
            let mut tokens = line.split_whitespace();
            let Some(pattern) = tokens.next() else {
                continue;
            };
            let matcher = compile_pattern(pattern).map_err(|err| {
                CodeownersParseError::InvalidPattern {
                    line: index + 1,
                    pattern: pattern.to_owned(),
                    err,
                }
            })?;
            let owners = tokens.filter_map(parse_owner).collect();
            rules.push(Rule {
                pattern: pattern.to_owned(),
                matcher,
                owners,
            });
        }
        Ok(Self { rules })
    }

    /// Returns the pattern of the rule that applies to `path`, if any.
    pub fn matching_pattern(&self, path: &Utf8Path) -> Option<&str> {
        self.matching_rule(path).map(|rule| rule.pattern.as_str())
    }

    fn matching_rule(&self, path: &Utf8Path) -> Option<&Rule> {
        let path = path.as_str().trim_start_matches("./");
        self.rules.iter().rev().find(|rule| rule.matcher.is_match(path))
    }
}

impl OwnershipRegistry for Codeowners {
    fn owners_of(&self, path: &Utf8Path) -> Vec<Owner> {
        self.matching_rule(path)
            .map(|rule| rule.owners.clone())
            .unwrap_or_default()
    }
}

/// Turns a `.gitignore`-style pattern into a set of globs.
///
/// * A leading `/`, or a `/` in the middle of the pattern, anchors it to the repository root.
///   Otherwise it may match at any depth.
/// * A trailing `/` only matches directories, i.e. everything under them.
/// * Patterns without a trailing `/` match files as well as everything under directories.
fn compile_pattern(pattern: &str) -> Result<GlobSet, globset::Error> {
    let dir_only = pattern.ends_with('/');
    let trimmed = pattern.trim_end_matches('/');
    let anchored = trimmed.contains('/');
    let trimmed = trimmed.trim_start_matches('/');

    let base = if anchored || trimmed.starts_with("**") {
        trimmed.to_owned()
    } else {
        format!("**/{trimmed}")
    };

    let mut builder = GlobSetBuilder::new();
    if !dir_only {
        builder.add(glob(&base)?);
    }
    builder.add(glob(&format!("{base}/**"))?);
    builder.build()
}

fn glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

fn parse_owner(token: &str) -> Option<Owner> {
    let kind = match token.strip_prefix('@') {
        Some(name) if name.contains('/') => OwnerKind::Team,
        Some(_) => OwnerKind::User,
        None if token.contains('@') => OwnerKind::Email,
        None => {
            debug!("ignoring unrecognized CODEOWNERS entry `{token}`");
            return None;
        }
    };
    Some(Owner::new(kind, token))
}
