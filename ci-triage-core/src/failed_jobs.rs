// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifying failed jobs.

use crate::job::Job;
use tracing::debug;

/// An accumulator of failed jobs, partitioned along two axes: whether the failure was caused by
/// infrastructure, and whether the job was allowed to fail.
///
/// Jobs are only ever appended: once added, a job stays in its bucket.
#[derive(Clone, Debug, Default)]
pub struct FailedJobs {
    mandatory: Vec<Job>,
    optional: Vec<Job>,
    mandatory_infra: Vec<Job>,
    optional_infra: Vec<Job>,
}

impl FailedJobs {
    /// Creates a new, empty `FailedJobs`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a failed job to the bucket it belongs to.
    pub fn add_failed_job(&mut self, job: Job) {
        debug!(
            "classifying job {} ({}): kind {}, reason {}, allow_failure {}",
            job.name,
            job.id,
            job.failure_kind(),
            job.failure_reason(),
            job.allow_failure,
        );
        let bucket = match (job.is_infra_failure(), job.allow_failure) {
            (false, false) => &mut self.mandatory,
            (false, true) => &mut self.optional,
            (true, false) => &mut self.mandatory_infra,
            (true, true) => &mut self.optional_infra,
        };
        bucket.push(job);
    }

    /// Jobs that are not allowed to fail and failed for a reason other than infrastructure.
    pub fn mandatory_job_failures(&self) -> &[Job] {
        &self.mandatory
    }

    /// Jobs that are allowed to fail and failed for a reason other than infrastructure.
    pub fn optional_job_failures(&self) -> &[Job] {
        &self.optional
    }

    /// Jobs that are not allowed to fail and failed because of infrastructure.
    pub fn mandatory_infra_job_failures(&self) -> &[Job] {
        &self.mandatory_infra
    }

    /// Jobs that are allowed to fail and failed because of infrastructure.
    pub fn optional_infra_job_failures(&self) -> &[Job] {
        &self.optional_infra
    }

    /// All jobs that failed for a reason other than infrastructure: mandatory ones first, then
    /// optional ones.
    pub fn all_non_infra_failures(&self) -> impl Iterator<Item = &Job> + '_ {
        self.mandatory.iter().chain(&self.optional)
    }

    /// All jobs that are not allowed to fail: non-infra failures first, then infra failures.
    pub fn all_mandatory_failures(&self) -> impl Iterator<Item = &Job> + '_ {
        self.mandatory.iter().chain(&self.mandatory_infra)
    }

    /// All failed jobs, in bucket order: mandatory, optional, mandatory infra, optional infra.
    pub fn all_failures(&self) -> impl Iterator<Item = &Job> + '_ {
        self.mandatory
            .iter()
            .chain(&self.optional)
            .chain(&self.mandatory_infra)
            .chain(&self.optional_infra)
    }

    /// Returns the total number of failed jobs.
    pub fn len(&self) -> usize {
        self.mandatory.len()
            + self.optional.len()
            + self.mandatory_infra.len()
            + self.optional_infra.len()
    }

    /// Returns true if no failed jobs have been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
