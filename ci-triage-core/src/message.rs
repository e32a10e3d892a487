// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering failure notifications.
//!
//! A [`SlackMessage`] collects classified job failures and failed tests over the course of a
//! pipeline run, then renders them into a single chat message. Links use the `<url|text>` syntax
//! understood by Slack.

use crate::{
    failed_jobs::FailedJobs,
    job::Job,
    test_identity::{FailedTest, TestKey},
};
use indexmap::IndexMap;
use itertools::Itertools;
use std::{collections::BTreeSet, fmt};
use swrite::{SWrite, swrite, swriteln};

/// The header for the section listing failed jobs.
pub const JOBS_SECTION_HEADER: &str = "Failed jobs:";

/// The header for the section listing jobs that failed because of infrastructure.
pub const INFRA_SECTION_HEADER: &str = "Infrastructure failures:";

/// The header for the section listing failed tests.
pub const TEST_SECTION_HEADER: &str = "Failed tests:";

/// The maximum number of jobs linked to for each failed test.
pub const MAX_JOBS_PER_TEST: usize = 2;

/// Appended to jobs that do not run on pull requests.
const SKIPPED_ON_PR_MARKER: &str = " :job-skipped-on-pr:";

/// A failed test, along with the jobs it failed in.
#[derive(Clone, Debug)]
struct TestFailures {
    owners: Vec<String>,
    jobs: Vec<Job>,
}

/// A notification summarizing the failures in a pipeline.
#[derive(Clone, Debug, Default)]
pub struct SlackMessage {
    base: String,
    failed_jobs: FailedJobs,
    failed_tests: IndexMap<TestKey, TestFailures>,
    coda: String,
    skipped_jobs: BTreeSet<String>,
}

impl SlackMessage {
    /// Creates a new message.
    ///
    /// `base` is printed at the top of the message. `skipped_jobs` are the names of jobs that are
    /// not run on pull requests: they're flagged as such when listed.
    pub fn new(
        base: impl Into<String>,
        failed_jobs: FailedJobs,
        skipped_jobs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            base: base.into(),
            failed_jobs,
            failed_tests: IndexMap::new(),
            coda: String::new(),
            skipped_jobs: skipped_jobs.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the text printed at the end of the message.
    pub fn set_coda(&mut self, coda: impl Into<String>) -> &mut Self {
        self.coda = coda.into();
        self
    }

    /// Records that `test` failed in `job`.
    ///
    /// The owners of a test are taken from the first failure recorded for it.
    pub fn add_test_failure(&mut self, test: &FailedTest, job: Job) -> &mut Self {
        self.failed_tests
            .entry(test.key().clone())
            .or_insert_with(|| TestFailures {
                owners: test.owners().to_vec(),
                jobs: Vec::new(),
            })
            .jobs
            .push(job);
        self
    }

    /// Returns the failed jobs in this message.
    pub fn failed_jobs(&self) -> &FailedJobs {
        &self.failed_jobs
    }

    /// Returns the failed tests in this message along with the jobs they failed in, in the order
    /// they were first recorded.
    pub fn failed_tests(&self) -> impl Iterator<Item = (&TestKey, &[Job])> + '_ {
        self.failed_tests
            .iter()
            .map(|(key, failures)| (key, failures.jobs.as_slice()))
    }

    /// Returns the teams that own at least one failed test, in sorted order.
    pub fn teams(&self) -> BTreeSet<&str> {
        self.failed_tests
            .values()
            .flat_map(|failures| failures.owners.iter().map(String::as_str))
            .collect()
    }

    /// Returns a message that only contains the failed tests owned by `team`.
    ///
    /// The preamble, coda and skipped jobs are carried over, but failed jobs are not.
    pub fn for_team(&self, team: &str) -> Self {
        let failed_tests = self
            .failed_tests
            .iter()
            .filter(|(_, failures)| failures.owners.iter().any(|owner| owner == team))
            .map(|(key, failures)| (key.clone(), failures.clone()))
            .collect();
        Self {
            base: self.base.clone(),
            failed_jobs: FailedJobs::new(),
            failed_tests,
            coda: self.coda.clone(),
            skipped_jobs: self.skipped_jobs.clone(),
        }
    }

    /// Renders this message.
    ///
    /// Only mandatory failures are listed: jobs that are allowed to fail are tracked but never
    /// rendered. Sections with nothing to show are left out.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.base.is_empty() {
            swriteln!(out, "{}", self.base);
        }
        self.render_jobs_section(
            JOBS_SECTION_HEADER,
            self.failed_jobs.mandatory_job_failures(),
            &mut out,
        );
        self.render_jobs_section(
            INFRA_SECTION_HEADER,
            self.failed_jobs.mandatory_infra_job_failures(),
            &mut out,
        );
        if !self.failed_tests.is_empty() {
            self.render_tests_section(&mut out);
        }
        if !self.coda.is_empty() {
            swriteln!(out, "{}", self.coda);
        }
        out
    }

    fn render_jobs_section(&self, header: &str, jobs: &[Job], out: &mut String) {
        if jobs.is_empty() {
            return;
        }

        swriteln!(out, "{header}");

        let mut jobs_per_stage: IndexMap<&str, Vec<&Job>> = IndexMap::new();
        for job in jobs {
            jobs_per_stage.entry(job.stage.as_str()).or_default().push(job);
        }

        for (stage, jobs) in jobs_per_stage {
            let jobs_info = jobs.iter().map(|job| self.job_info(job)).join(", ");
            swriteln!(out, "- {jobs_info} (`{stage}` stage)");
        }
    }

    fn job_info(&self, job: &Job) -> String {
        let mut info = link(job);
        if self.skipped_jobs.contains(&job.name) {
            info.push_str(SKIPPED_ON_PR_MARKER);
        }
        let retries = job.retry_count();
        if retries > 0 {
            swrite!(info, " ({retries} retries)");
        }
        info
    }

    fn render_tests_section(&self, out: &mut String) {
        swriteln!(out, "{TEST_SECTION_HEADER}");
        for (key, failures) in &self.failed_tests {
            let mut job_list = failures
                .jobs
                .iter()
                .take(MAX_JOBS_PER_TEST)
                .map(link)
                .join(", ");
            if failures.jobs.len() > MAX_JOBS_PER_TEST {
                swrite!(
                    job_list,
                    " and {} more",
                    failures.jobs.len() - MAX_JOBS_PER_TEST
                );
            }
            swriteln!(
                out,
                "- `{}` from package `{}` (in {job_list})",
                key.name,
                key.package,
            );
        }
    }
}

impl fmt::Display for SlackMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn link(job: &Job) -> String {
    format!("<{}|{}>", job.web_url, job.name)
}
