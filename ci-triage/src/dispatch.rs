// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use ci_triage_core::{
    codeowners::Codeowners,
    config::TriageConfig,
    failed_jobs::FailedJobs,
    failure::{FailureReason, JobFailure},
    input::PipelineFailures,
    locator::FsSourceLocator,
    message::SlackMessage,
    test_identity::TestOwnership,
};
use clap::{Args, Parser, Subcommand};
use swrite::{SWrite, swriteln};
use tracing::{debug, info};

/// Classify the failures in a CI pipeline and summarize them for a chat notification.
///
/// Failures are read from a JSON file describing the failed jobs of a pipeline and the tests that
/// failed within them.
#[derive(Debug, Parser)]
#[command(version, max_term_width = 100)]
pub struct CiTriageApp {
    #[clap(flatten)]
    common: CommonOpts,

    #[clap(subcommand)]
    command: Command,
}

impl CiTriageApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.common.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        let text = match self.command {
            Command::Reason { raw, bridge } => reason_text(&raw, bridge),
            Command::Summary { input } => {
                let failed_jobs = input
                    .load()?
                    .failed_jobs()
                    .map_err(|err| ExpectedError::input_error(input.failures.clone(), err))?;
                summary_text(&failed_jobs)
            }
            Command::Owners { input } => {
                let base = BaseApp::new(self.common)?;
                let failures = input.load()?;
                let message =
                    base.build_message(&input, failures, "", std::iter::empty::<String>())?;
                owners_text(&message)
            }
            Command::Render(opts) => {
                let base = BaseApp::new(self.common)?;
                opts.exec(&base)?
            }
        };

        output_writer
            .write_stdout(&text)
            .map_err(ExpectedError::write_output_error)?;

        Ok(crate::TriageExitCode::OK)
    }
}

#[derive(Debug, Args)]
struct CommonOpts {
    /// Root of the repository the pipeline ran against
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        default_value = ".",
        env = "CI_TRIAGE_REPO_ROOT"
    )]
    repo_root: Utf8PathBuf,

    /// Config file [default: .config/ci-triage.toml in the repository root]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    #[clap(flatten)]
    output: OutputOpts,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render the notification for a pipeline
    Render(RenderOpts),

    /// List the teams owning failed tests, along with their tests
    Owners {
        #[clap(flatten)]
        input: InputOpts,
    },

    /// Count the failed jobs of a pipeline, per category
    Summary {
        #[clap(flatten)]
        input: InputOpts,
    },

    /// Show how a raw CI failure reason is classified
    Reason {
        /// The failure reason reported by the CI provider, e.g. `runner_system_failure`
        raw: String,

        /// Classify the failure as that of a trigger job
        #[arg(long)]
        bridge: bool,
    },
}

#[derive(Debug, Args)]
struct InputOpts {
    /// JSON file with the pipeline's failed jobs and tests
    #[arg(long, short = 'f', value_name = "PATH")]
    failures: Utf8PathBuf,
}

impl InputOpts {
    fn load(&self) -> Result<PipelineFailures> {
        PipelineFailures::from_path(&self.failures)
            .map_err(|err| ExpectedError::input_error(self.failures.clone(), err))
    }
}

#[derive(Debug, Args)]
struct RenderOpts {
    #[clap(flatten)]
    input: InputOpts,

    /// Text printed at the top of the notification
    #[arg(long, value_name = "TEXT", default_value = "")]
    preamble: String,

    /// Text printed at the end of the notification
    #[arg(long, value_name = "TEXT")]
    coda: Option<String>,

    /// Name of a job that is not run on pull requests, in addition to those in the config
    #[arg(long = "skipped-job", value_name = "NAME")]
    skipped_jobs: Vec<String>,

    /// Only render the failed tests owned by this team
    #[arg(long, value_name = "TEAM")]
    team: Option<String>,
}

impl RenderOpts {
    fn exec(self, base: &BaseApp) -> Result<String> {
        let failures = self.input.load()?;
        let skipped_jobs = base
            .config
            .jobs_skipped_on_pr()
            .iter()
            .cloned()
            .chain(self.skipped_jobs);

        let mut message = base.build_message(&self.input, failures, self.preamble, skipped_jobs)?;
        if let Some(coda) = self.coda {
            message.set_coda(coda);
        }

        match self.team {
            Some(team) => {
                let team_message = message.for_team(&team);
                if team_message.failed_tests().next().is_none() {
                    info!("no failed tests are owned by {team}");
                }
                Ok(team_message.render())
            }
            None => Ok(message.render()),
        }
    }
}

/// State shared by the subcommands that look at a repository.
struct BaseApp {
    repo_root: Utf8PathBuf,
    config: TriageConfig,
}

impl BaseApp {
    fn new(common: CommonOpts) -> Result<Self> {
        let CommonOpts {
            repo_root,
            config_file,
            ..
        } = common;
        if !repo_root.is_dir() {
            return Err(ExpectedError::RepoRootInvalid { repo_root });
        }

        let config = TriageConfig::from_sources(&repo_root, config_file.as_deref())?;
        debug!(
            "loaded config: package prefix `{}`, test file suffix `{}`",
            config.package_prefix(),
            config.test_file_suffix(),
        );

        Ok(Self { repo_root, config })
    }

    fn build_message(
        &self,
        input: &InputOpts,
        failures: PipelineFailures,
        preamble: impl Into<String>,
        skipped_jobs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<SlackMessage> {
        let codeowners = Codeowners::from_path(self.config.codeowners_path(&self.repo_root))?;
        let locator = FsSourceLocator::new(&self.repo_root, self.config.test_file_suffix());
        let ownership = TestOwnership::new(self.config.package_prefix(), &locator, &codeowners);

        failures
            .into_message(preamble, skipped_jobs, &ownership)
            .map_err(|err| ExpectedError::input_error(input.failures.clone(), err))
    }
}

fn reason_text(raw: &str, bridge: bool) -> String {
    let failure = JobFailure::classify(Some(raw), bridge);
    let mut out = String::new();
    swriteln!(out, "{} ({})", failure.reason(), failure.kind());
    if !bridge && !FailureReason::is_infra_reason(raw) {
        swriteln!(
            out,
            "`{raw}` is not a known infrastructure failure reason; if reported as one, it maps to {}",
            FailureReason::from_raw(raw),
        );
    }
    out
}

fn summary_text(failed_jobs: &FailedJobs) -> String {
    let rows = [
        ("mandatory job failures", failed_jobs.mandatory_job_failures().len()),
        ("optional job failures", failed_jobs.optional_job_failures().len()),
        (
            "mandatory infrastructure failures",
            failed_jobs.mandatory_infra_job_failures().len(),
        ),
        (
            "optional infrastructure failures",
            failed_jobs.optional_infra_job_failures().len(),
        ),
        (
            "non-infrastructure failures",
            failed_jobs.all_non_infra_failures().count(),
        ),
        ("mandatory failures", failed_jobs.all_mandatory_failures().count()),
        ("all failures", failed_jobs.all_failures().count()),
    ];

    let mut out = String::new();
    for (label, count) in rows {
        swriteln!(out, "{label}: {count}");
    }
    out
}

fn owners_text(message: &SlackMessage) -> String {
    let mut out = String::new();
    for team in message.teams() {
        swriteln!(out, "{team}");
        for (key, _) in message.for_team(team).failed_tests() {
            swriteln!(out, "- {key}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use camino_tempfile::Utf8TempDir;
    use clap::CommandFactory;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    static CODEOWNERS: &str = indoc! {"
        /pkg/foo/   @DataDog/agent-runtimes @someone
        .none       @DataDog/agent-devx
    "};

    static FAILURES: &str = indoc! {r#"
        {
          "jobs": [
            {
              "id": 1,
              "name": "tests_deb-x64",
              "web_url": "https://ci/jobs/1",
              "stage": "source_test",
              "failure_reason": "script_failure",
              "retry_summary": ["failed", "failed"]
            },
            {
              "id": 2,
              "name": "deploy_staging",
              "web_url": "https://ci/jobs/2",
              "stage": "deploy",
              "failure_reason": "runner_system_failure"
            },
            {
              "id": 3,
              "name": "kitchen_windows",
              "web_url": "https://ci/jobs/3",
              "stage": "kitchen",
              "allow_failure": true,
              "failure_reason": "script_failure"
            }
          ],
          "tests": [
            { "name": "TestFoo", "package": "github.com/DataDog/datadog-agent/pkg/foo", "job_id": 1 },
            { "name": "TestBaz", "package": "github.com/DataDog/datadog-agent/pkg/missing", "job_id": 1 }
          ]
        }
    "#};

    fn write_file(root: &Utf8Path, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("path has a parent"))
            .expect("created parent dir");
        std::fs::write(&path, contents).expect("wrote file");
        path
    }

    fn fixture() -> Utf8TempDir {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write_file(dir.path(), ".github/CODEOWNERS", CODEOWNERS);
        write_file(
            dir.path(),
            "pkg/foo/foo_test.go",
            "package foo\n\nfunc TestFoo(t *testing.T) {}\n",
        );
        write_file(dir.path(), "failures.json", FAILURES);
        dir
    }

    fn run(dir: &Utf8TempDir, args: &[&str]) -> Result<String> {
        let repo_root = dir.path().as_str();
        let failures = dir.path().join("failures.json");
        let mut cli = vec!["ci-triage", "--repo-root", repo_root];
        for &arg in args {
            // `FAILURES` stands in for the fixture's failures file.
            cli.push(if arg == "FAILURES" {
                failures.as_str()
            } else {
                arg
            });
        }

        let app = CiTriageApp::try_parse_from(cli).expect("arguments are valid");
        let mut output_writer = OutputWriter::Test { stdout: Vec::new() };
        let code = app.exec(&mut output_writer)?;
        assert_eq!(code, crate::TriageExitCode::OK);

        let OutputWriter::Test { stdout } = output_writer else {
            unreachable!("output writer is a test writer")
        };
        Ok(String::from_utf8(stdout).expect("output is UTF-8"))
    }

    #[test]
    fn verify_app() {
        CiTriageApp::command().debug_assert();
    }

    #[test]
    fn render() {
        let dir = fixture();
        let output = run(
            &dir,
            &[
                "render",
                "--failures",
                "FAILURES",
                "--preamble",
                "Pipeline failed on main.",
                "--coda",
                "Reach out in #ci-help.",
                "--skipped-job",
                "deploy_staging",
            ],
        )
        .expect("render succeeded");

        assert_eq!(
            output,
            indoc! {"
                Pipeline failed on main.
                Failed jobs:
                - <https://ci/jobs/1|tests_deb-x64> (1 retries) (`source_test` stage)
                Infrastructure failures:
                - <https://ci/jobs/2|deploy_staging> :job-skipped-on-pr: (`deploy` stage)
                Failed tests:
                - `TestFoo` from package `pkg/foo` (in <https://ci/jobs/1|tests_deb-x64>)
                - `TestBaz` from package `pkg/missing` (in <https://ci/jobs/1|tests_deb-x64>)
                Reach out in #ci-help.
            "},
        );
    }

    #[test]
    fn render_for_team() {
        let dir = fixture();
        let output = run(
            &dir,
            &[
                "render",
                "-f",
                "FAILURES",
                "--team",
                "@DataDog/agent-devx",
            ],
        )
        .expect("render succeeded");

        assert_eq!(
            output,
            indoc! {"
                Failed tests:
                - `TestBaz` from package `pkg/missing` (in <https://ci/jobs/1|tests_deb-x64>)
            "},
        );
    }

    #[test]
    fn render_uses_config_skipped_jobs() {
        let dir = fixture();
        write_file(
            dir.path(),
            ".config/ci-triage.toml",
            "jobs-skipped-on-pr = [\"tests_deb-x64\"]\n",
        );
        let output = run(&dir, &["render", "-f", "FAILURES"]).expect("render succeeded");

        assert!(
            output.contains(
                "- <https://ci/jobs/1|tests_deb-x64> :job-skipped-on-pr: (1 retries) \
                 (`source_test` stage)\n"
            ),
            "output: {output}"
        );
    }

    #[test]
    fn owners() {
        let dir = fixture();
        let output = run(&dir, &["owners", "-f", "FAILURES"]).expect("owners succeeded");

        assert_eq!(
            output,
            indoc! {"
                @DataDog/agent-devx
                - TestBaz (pkg/missing)
                @DataDog/agent-runtimes
                - TestFoo (pkg/foo)
            "},
        );
    }

    #[test]
    fn summary() {
        let dir = fixture();
        let output = run(&dir, &["summary", "-f", "FAILURES"]).expect("summary succeeded");

        assert_eq!(
            output,
            indoc! {"
                mandatory job failures: 1
                optional job failures: 1
                mandatory infrastructure failures: 1
                optional infrastructure failures: 0
                non-infrastructure failures: 2
                mandatory failures: 2
                all failures: 3
            "},
        );
    }

    #[test]
    fn summary_rejects_inconsistent_failures() {
        let dir = fixture();
        let job = r#"{ "id": 1, "name": "a", "web_url": "u", "stage": "s" }"#;

        write_file(
            dir.path(),
            "failures.json",
            &format!(r#"{{ "jobs": [{job}, {job}] }}"#),
        );
        let error = run(&dir, &["summary", "-f", "FAILURES"]).expect_err("job 1 is duplicated");
        assert!(
            matches!(error, ExpectedError::InputError { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), crate::TriageExitCode::INPUT_ERROR);

        write_file(
            dir.path(),
            "failures.json",
            &format!(
                r#"{{ "jobs": [{job}], "tests": [{{ "name": "TestFoo", "package": "pkg/foo", "job_id": 42 }}] }}"#
            ),
        );
        let error = run(&dir, &["summary", "-f", "FAILURES"]).expect_err("job 42 is unknown");
        assert!(
            matches!(error, ExpectedError::InputError { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), crate::TriageExitCode::INPUT_ERROR);
    }

    #[test]
    fn reason() {
        let dir = Utf8TempDir::new().expect("created temp dir");

        let output = run(&dir, &["reason", "runner_system_failure"]).expect("reason succeeded");
        assert_eq!(output, "runner (infra_failure)\n");

        let output = run(&dir, &["reason", "script_failure"]).expect("reason succeeded");
        assert_eq!(
            output,
            indoc! {"
                failed_job_script (job_failure)
                `script_failure` is not a known infrastructure failure reason; if reported as one, it maps to gitlab
            "},
        );

        let output =
            run(&dir, &["reason", "--bridge", "script_failure"]).expect("reason succeeded");
        assert_eq!(output, "failed_bridge_job (bridge_failure)\n");
    }

    #[test]
    fn invalid_repo_root() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let missing = dir.path().join("missing");
        let app = CiTriageApp::try_parse_from([
            "ci-triage",
            "--repo-root",
            missing.as_str(),
            "owners",
            "-f",
            "failures.json",
        ])
        .expect("arguments are valid");

        let error = app
            .exec(&mut OutputWriter::Test { stdout: Vec::new() })
            .expect_err("repo root is missing");
        assert!(
            matches!(&error, ExpectedError::RepoRootInvalid { repo_root } if *repo_root == missing),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), crate::TriageExitCode::SETUP_ERROR);
    }

    #[test]
    fn missing_codeowners() {
        let dir = fixture();
        std::fs::remove_file(dir.path().join(".github/CODEOWNERS")).expect("removed CODEOWNERS");

        let error = run(&dir, &["owners", "-f", "FAILURES"]).expect_err("CODEOWNERS is missing");
        assert!(
            matches!(error, ExpectedError::CodeownersParseError { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), crate::TriageExitCode::SETUP_ERROR);
    }

    #[test]
    fn unknown_job() {
        let dir = fixture();
        write_file(
            dir.path(),
            "failures.json",
            r#"{ "tests": [{ "name": "TestFoo", "package": "pkg/foo", "job_id": 7 }] }"#,
        );

        let error = run(&dir, &["render", "-f", "FAILURES"]).expect_err("job 7 is unknown");
        assert!(
            matches!(error, ExpectedError::InputError { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), crate::TriageExitCode::INPUT_ERROR);
    }
}
