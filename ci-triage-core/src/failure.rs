// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure kinds and reasons for CI jobs.
//!
//! CI providers report a raw, stringly-typed failure reason for each job. ci-triage maps those onto
//! a small closed taxonomy: a [`FailureKind`] saying what went wrong at a high level, and a
//! [`FailureReason`] narrowing it down.

use crate::errors::FailureParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The high-level kind of a job failure.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The job itself failed, e.g. a test or a build step.
    JobFailure,

    /// The job failed because of a problem with CI infrastructure.
    InfraFailure,

    /// A downstream pipeline triggered by this job failed.
    BridgeFailure,
}

impl FailureKind {
    /// Returns the string representations of all known variants.
    pub fn variants() -> [&'static str; 3] {
        ["job_failure", "infra_failure", "bridge_failure"]
    }

    /// Returns the string representation of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobFailure => "job_failure",
            Self::InfraFailure => "infra_failure",
            Self::BridgeFailure => "bridge_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = FailureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "job_failure" => Self::JobFailure,
            "infra_failure" => Self::InfraFailure,
            "bridge_failure" => Self::BridgeFailure,
            other => {
                return Err(FailureParseError::new(
                    "failure kind",
                    other,
                    Self::variants(),
                ));
            }
        };
        Ok(kind)
    }
}

/// The reason a job failed.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The runner executing the job had a problem.
    Runner,

    /// The job's script exited with an error.
    FailedJobScript,

    /// A generic problem with the CI platform.
    Gitlab,

    /// The spot instance running the job was reclaimed.
    Ec2Spot,

    /// The end-to-end test environment could not be set up.
    E2eInfraFailure,

    /// A job in a triggered pipeline failed.
    FailedBridgeJob,
}

/// Raw infrastructure failure reasons, and the reason each one maps to.
///
/// Raw reasons not in this table map to [`FailureReason::Gitlab`].
static INFRA_FAILURE_MAPPING: &[(&str, FailureReason)] = &[
    ("runner_system_failure", FailureReason::Runner),
    ("stuck_or_timeout_failure", FailureReason::Gitlab),
    ("unknown_failure", FailureReason::Gitlab),
    ("api_failure", FailureReason::Gitlab),
    ("scheduler_failure", FailureReason::Gitlab),
    ("stale_schedule", FailureReason::Gitlab),
    ("data_integrity_failure", FailureReason::Gitlab),
];

impl FailureReason {
    /// Returns the string representations of all known variants.
    pub fn variants() -> [&'static str; 6] {
        [
            "runner",
            "failed_job_script",
            "gitlab",
            "ec2_spot",
            "e2e_infra_failure",
            "failed_bridge_job",
        ]
    }

    /// Returns the string representation of this reason.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Runner => "runner",
            Self::FailedJobScript => "failed_job_script",
            Self::Gitlab => "gitlab",
            Self::Ec2Spot => "ec2_spot",
            Self::E2eInfraFailure => "e2e_infra_failure",
            Self::FailedBridgeJob => "failed_bridge_job",
        }
    }

    /// Maps a raw failure reason reported by the CI provider to a `FailureReason`.
    ///
    /// This never fails: unknown reasons map to [`FailureReason::Gitlab`].
    pub fn from_raw(raw: &str) -> Self {
        INFRA_FAILURE_MAPPING
            .iter()
            .find_map(|&(key, reason)| (key == raw).then_some(reason))
            .unwrap_or(Self::Gitlab)
    }

    /// Returns true if `raw` is a raw failure reason known to indicate an infrastructure problem.
    pub fn is_infra_reason(raw: &str) -> bool {
        INFRA_FAILURE_MAPPING.iter().any(|&(key, _)| key == raw)
    }

    /// Returns the raw infrastructure failure reasons known to ci-triage, along with what they map
    /// to.
    pub fn infra_failure_mapping() -> &'static [(&'static str, FailureReason)] {
        INFRA_FAILURE_MAPPING
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = FailureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reason = match s {
            "runner" => Self::Runner,
            "failed_job_script" => Self::FailedJobScript,
            "gitlab" => Self::Gitlab,
            "ec2_spot" => Self::Ec2Spot,
            "e2e_infra_failure" => Self::E2eInfraFailure,
            "failed_bridge_job" => Self::FailedBridgeJob,
            other => {
                return Err(FailureParseError::new(
                    "failure reason",
                    other,
                    Self::variants(),
                ));
            }
        };
        Ok(reason)
    }
}

/// The classification of a single failed job: a kind along with a reason.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct JobFailure {
    kind: FailureKind,
    reason: FailureReason,
}

impl JobFailure {
    /// An infrastructure failure, with the reason derived from the raw reason string.
    pub fn infra(raw_reason: &str) -> Self {
        Self::infra_with_reason(FailureReason::from_raw(raw_reason))
    }

    /// An infrastructure failure with an already-known reason, e.g. one found by inspecting the
    /// job's logs.
    pub fn infra_with_reason(reason: FailureReason) -> Self {
        Self {
            kind: FailureKind::InfraFailure,
            reason,
        }
    }

    /// A failure in the job's own script.
    pub fn job_script() -> Self {
        Self {
            kind: FailureKind::JobFailure,
            reason: FailureReason::FailedJobScript,
        }
    }

    /// A failure in a downstream, triggered pipeline.
    pub fn bridge() -> Self {
        Self {
            kind: FailureKind::BridgeFailure,
            reason: FailureReason::FailedBridgeJob,
        }
    }

    /// Classifies a job from the raw failure reason reported by the CI provider.
    ///
    /// Bridge jobs are always bridge failures. Otherwise, raw reasons known to indicate an
    /// infrastructure problem produce an infrastructure failure, and everything else (including a
    /// missing reason) is treated as a script failure.
    pub fn classify(raw_reason: Option<&str>, is_bridge: bool) -> Self {
        if is_bridge {
            return Self::bridge();
        }
        match raw_reason {
            Some(raw) if FailureReason::is_infra_reason(raw) => Self::infra(raw),
            _ => Self::job_script(),
        }
    }

    /// Returns the kind of failure.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the reason for the failure.
    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    /// Returns true if this is an infrastructure failure.
    pub fn is_infra(&self) -> bool {
        self.kind == FailureKind::InfraFailure
    }
}
