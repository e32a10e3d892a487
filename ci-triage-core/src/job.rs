// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failed CI jobs.

use crate::failure::{FailureKind, FailureReason, JobFailure};

/// A failed job in a CI pipeline.
///
/// Jobs are read-only once constructed: ci-triage only ever classifies and reports on them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Job {
    /// The job's unique identifier within the CI provider.
    pub id: u64,

    /// The job's display name.
    pub name: String,

    /// A link to the job's page.
    pub web_url: String,

    /// The pipeline stage the job ran in.
    pub stage: String,

    /// Whether the job is allowed to fail without failing the pipeline.
    pub allow_failure: bool,

    /// How the job failed.
    pub failure: JobFailure,

    /// The status of every attempt at running the job, oldest first.
    ///
    /// A job that was never retried has exactly one entry.
    pub retry_summary: Vec<String>,

    /// For trigger jobs, information about the downstream pipeline.
    pub bridge: Option<BridgeInfo>,
}

impl Job {
    /// Returns the number of times this job was retried.
    pub fn retry_count(&self) -> usize {
        self.retry_summary.len().saturating_sub(1)
    }

    /// Returns the kind of failure for this job.
    pub fn failure_kind(&self) -> FailureKind {
        self.failure.kind()
    }

    /// Returns the reason this job failed.
    pub fn failure_reason(&self) -> FailureReason {
        self.failure.reason()
    }

    /// Returns true if this job failed because of an infrastructure problem.
    pub fn is_infra_failure(&self) -> bool {
        self.failure.is_infra()
    }
}

/// Information about the downstream pipeline started by a trigger job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BridgeInfo {
    /// A link to the downstream pipeline, if one was created.
    pub downstream_pipeline: Option<String>,
}
