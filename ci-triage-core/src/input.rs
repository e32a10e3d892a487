// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading failure records for a pipeline.
//!
//! Failure records are produced by whatever talks to the CI provider, and handed to ci-triage as
//! JSON. See [`PipelineFailures`] for the format.

use crate::{
    errors::InputError,
    failed_jobs::FailedJobs,
    failure::{FailureKind, FailureReason, JobFailure},
    job::{BridgeInfo, Job},
    message::SlackMessage,
    test_identity::{FailedTest, TestOwnership},
};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::Deserialize;
use std::io;
use tracing::debug;

/// The failures in a single pipeline run, as read from JSON.
///
/// ```json
/// {
///   "jobs": [
///     {
///       "id": 1,
///       "name": "tests_deb-x64",
///       "web_url": "https://gitlab.example.com/jobs/1",
///       "stage": "source_test",
///       "allow_failure": false,
///       "failure_reason": "script_failure",
///       "retry_summary": ["failed", "failed"]
///     }
///   ],
///   "tests": [
///     { "name": "TestFoo", "package": "github.com/DataDog/datadog-agent/pkg/x", "job_id": 1 }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineFailures {
    /// The failed jobs.
    #[serde(default)]
    pub jobs: Vec<JobRecord>,

    /// The failed tests.
    #[serde(default)]
    pub tests: Vec<TestFailureRecord>,
}

/// A single failed job, as reported by the CI provider.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobRecord {
    /// The job's id.
    pub id: u64,

    /// The job's name.
    pub name: String,

    /// A link to the job.
    pub web_url: String,

    /// The stage the job ran in.
    pub stage: String,

    /// Whether the job is allowed to fail.
    #[serde(default)]
    pub allow_failure: bool,

    /// The raw failure reason reported by the CI provider.
    #[serde(default)]
    pub failure_reason: Option<String>,

    /// The failure kind, if it is already known (for example from inspecting the job's logs).
    ///
    /// If unset, the kind is derived from `failure_reason`.
    #[serde(default)]
    pub failure_type: Option<FailureKind>,

    /// For infrastructure failures, the reason, if it is already known.
    ///
    /// If unset, the reason is derived from `failure_reason`.
    #[serde(default)]
    pub infra_reason: Option<FailureReason>,

    /// The status of each attempt at running this job, oldest first.
    #[serde(default)]
    pub retry_summary: Option<Vec<String>>,

    /// For trigger jobs, information about the downstream pipeline.
    #[serde(default)]
    pub bridge: Option<BridgeRecord>,
}

/// Information about a downstream pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeRecord {
    /// A link to the downstream pipeline.
    #[serde(default)]
    pub downstream_pipeline: Option<String>,
}

/// A test that failed within a job.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestFailureRecord {
    /// The name of the test.
    pub name: String,

    /// The package the test is in, as reported by the test runner.
    pub package: String,

    /// The id of the job the test failed in.
    pub job_id: u64,
}

impl JobRecord {
    /// Classifies this record's failure.
    pub fn failure(&self) -> JobFailure {
        let raw = self.failure_reason.as_deref();
        match self.failure_type {
            Some(FailureKind::InfraFailure) => match self.infra_reason {
                Some(reason) => JobFailure::infra_with_reason(reason),
                None => JobFailure::infra(raw.unwrap_or_default()),
            },
            Some(FailureKind::BridgeFailure) => JobFailure::bridge(),
            Some(FailureKind::JobFailure) => JobFailure::job_script(),
            None => JobFailure::classify(raw, self.bridge.is_some()),
        }
    }

    /// Converts this record into a [`Job`].
    pub fn into_job(self) -> Job {
        let failure = self.failure();
        let retry_summary = self
            .retry_summary
            .unwrap_or_else(|| vec!["failed".to_owned()]);
        Job {
            id: self.id,
            name: self.name,
            web_url: self.web_url,
            stage: self.stage,
            allow_failure: self.allow_failure,
            failure,
            retry_summary,
            bridge: self.bridge.map(|bridge| BridgeInfo {
                downstream_pipeline: bridge.downstream_pipeline,
            }),
        }
    }
}

impl PipelineFailures {
    /// Reads failures from a JSON file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, InputError> {
        let file = std::fs::File::open(path).map_err(|err| InputError::Read {
            path: path.to_owned(),
            err,
        })?;
        Self::from_reader(io::BufReader::new(file))
    }

    /// Reads failures from JSON.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, InputError> {
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|err| InputError::Parse { err })
    }

    /// Checks that job ids are unique and that every failed test refers to a known job.
    pub fn validate(&self) -> Result<(), InputError> {
        self.jobs_by_id().map(|_| ())
    }

    /// Classifies every job into a [`FailedJobs`].
    ///
    /// The records are validated first, as with [`Self::validate`].
    pub fn failed_jobs(&self) -> Result<FailedJobs, InputError> {
        let mut failed_jobs = FailedJobs::new();
        for job in self.jobs_by_id()?.into_values() {
            failed_jobs.add_failed_job(job);
        }
        Ok(failed_jobs)
    }

    /// Builds a [`SlackMessage`] out of these failures.
    ///
    /// Each failed test is resolved against `ownership`, in the order the tests are listed.
    pub fn into_message(
        self,
        base: impl Into<String>,
        skipped_jobs: impl IntoIterator<Item = impl Into<String>>,
        ownership: &TestOwnership<'_>,
    ) -> Result<SlackMessage, InputError> {
        // Validate before resolving any test.
        let jobs_by_id = self.jobs_by_id()?;

        let mut failed_jobs = FailedJobs::new();
        for job in jobs_by_id.values() {
            failed_jobs.add_failed_job(job.clone());
        }
        let mut message = SlackMessage::new(base, failed_jobs, skipped_jobs);

        for record in &self.tests {
            let test = FailedTest::resolve(&record.name, &record.package, ownership);
            debug!(
                "test {} failed in job {}, owned by [{}]",
                test.key(),
                record.job_id,
                test.owners().join(", "),
            );
            message.add_test_failure(&test, jobs_by_id[&record.job_id].clone());
        }

        Ok(message)
    }

    fn jobs_by_id(&self) -> Result<IndexMap<u64, Job>, InputError> {
        let mut jobs_by_id = IndexMap::with_capacity(self.jobs.len());
        for record in &self.jobs {
            let job = record.clone().into_job();
            let job_id = job.id;
            if jobs_by_id.insert(job_id, job).is_some() {
                return Err(InputError::DuplicateJob { job_id });
            }
        }

        if let Some(test) = self
            .tests
            .iter()
            .find(|test| !jobs_by_id.contains_key(&test.job_id))
        {
            return Err(InputError::UnknownJob {
                test_name: test.name.clone(),
                job_id: test.job_id,
            });
        }

        Ok(jobs_by_id)
    }
}
