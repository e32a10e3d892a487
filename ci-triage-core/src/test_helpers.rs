// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::LocateError,
    failure::JobFailure,
    job::Job,
    test_identity::{Owner, OwnerKind, OwnershipRegistry, SourceLocator},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    cell::RefCell,
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;

/// Returns a mandatory job that failed in its own script, with a single attempt.
pub(crate) fn job(id: u64, name: &str, stage: &str) -> Job {
    Job {
        id,
        name: name.to_owned(),
        web_url: format!("https://ci.example.com/jobs/{id}"),
        stage: stage.to_owned(),
        allow_failure: false,
        failure: JobFailure::job_script(),
        retry_summary: vec!["failed".to_owned()],
        bridge: None,
    }
}

/// Returns a mandatory job that failed because of a runner problem.
pub(crate) fn infra_job(id: u64, name: &str, stage: &str) -> Job {
    Job {
        failure: JobFailure::infra("runner_system_failure"),
        ..job(id, name, stage)
    }
}

/// Returns a copy of `job` that is allowed to fail.
pub(crate) fn optional(job: Job) -> Job {
    Job {
        allow_failure: true,
        ..job
    }
}

/// What a [`FakeLocator`] returns for a given test.
pub(crate) enum FakeLocation {
    Found(&'static str),
    NotFound,
    Error,
}

/// A source locator that returns canned results, recording every lookup.
#[derive(Default)]
pub(crate) struct FakeLocator {
    results: HashMap<String, FakeLocation>,
    pub(crate) calls: RefCell<Vec<(String, String)>>,
}

impl FakeLocator {
    pub(crate) fn with(mut self, test_name: &str, location: FakeLocation) -> Self {
        self.results.insert(test_name.to_owned(), location);
        self
    }
}

impl SourceLocator for FakeLocator {
    fn find(&self, test_name: &str, package: &str) -> Result<Option<Utf8PathBuf>, LocateError> {
        self.calls
            .borrow_mut()
            .push((test_name.to_owned(), package.to_owned()));
        match self.results.get(test_name) {
            Some(FakeLocation::Found(path)) => Ok(Some(Utf8PathBuf::from(*path))),
            Some(FakeLocation::NotFound) | None => Ok(None),
            Some(FakeLocation::Error) => Err(LocateError::PackageDirMissing {
                dir: Utf8PathBuf::from(package),
            }),
        }
    }
}

/// An ownership registry backed by a fixed path -> owners map, recording every query.
#[derive(Default)]
pub(crate) struct FakeRegistry {
    owners: HashMap<Utf8PathBuf, Vec<Owner>>,
    pub(crate) queries: RefCell<Vec<Utf8PathBuf>>,
}

impl FakeRegistry {
    pub(crate) fn with(mut self, path: &str, owners: &[(OwnerKind, &str)]) -> Self {
        self.owners.insert(
            Utf8PathBuf::from(path),
            owners
                .iter()
                .map(|&(kind, name)| Owner::new(kind, name))
                .collect(),
        );
        self
    }
}

impl OwnershipRegistry for FakeRegistry {
    fn owners_of(&self, path: &Utf8Path) -> Vec<Owner> {
        self.queries.borrow_mut().push(path.to_owned());
        self.owners.get(path).cloned().unwrap_or_default()
    }
}

/// Runs `f` with a subscriber that records every event at `DEBUG` or above, returning the
/// formatted log lines alongside the result.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = buf.0.lock().expect("log buffer is not poisoned").clone();
    (result, String::from_utf8(logs).expect("logs are UTF-8"))
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer is not poisoned")
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
