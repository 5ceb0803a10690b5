// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoking the test runner and reading back its results.
//!
//! The runner is expected to accept Jest's command-line interface: a `--testNamePattern` filter,
//! and `--json --outputFile <path>` to write machine-readable results.

use crate::{errors::RunnerError, helpers::DisplayRoundedDuration};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{
    fs,
    time::{Duration, Instant},
};
use tickettest_metadata::{RunnerSummary, SuiteFailureSummary};
use tracing::{debug, warn};

/// The name of the results file within the temporary output directory.
const RESULTS_FILE_NAME: &str = "results.json";

/// A test runner command line, split into a program and its arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunnerCommand {
    program: String,
    args: Vec<String>,
}

impl RunnerCommand {
    /// Splits `command_line` into words using shell quoting rules.
    pub fn parse(command_line: &str) -> Result<Self, RunnerError> {
        let mut words = shell_words::split(command_line)
            .map_err(|error| RunnerError::CommandParse {
                command: command_line.to_owned(),
                error,
            })?
            .into_iter();
        let program = words.next().ok_or(RunnerError::EmptyCommand)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// The program to execute.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments that are part of the command itself, e.g. `jest` in `npx jest`.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Runs tests through an external test runner.
#[derive(Clone, Debug)]
pub struct TestRunner {
    command: RunnerCommand,
    extra_args: Vec<String>,
    cwd: Option<Utf8PathBuf>,
}

impl TestRunner {
    /// Creates a new `TestRunner` for `command`.
    pub fn new(command: RunnerCommand) -> Self {
        Self {
            command,
            extra_args: Vec::new(),
            cwd: None,
        }
    }

    /// Adds arguments passed to the runner before the name filter.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the directory the runner is executed in. Defaults to the current directory.
    pub fn with_cwd(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Runs the tests whose full names match `pattern`.
    ///
    /// The runner is invoked exactly once. Its standard output is redirected to standard error,
    /// so that tickettest's own standard output stays machine-readable.
    ///
    /// A non-zero exit status is expected when tests fail, and is not an error by itself: the
    /// exit code is returned as part of [`RunnerOutput`].
    pub fn run(&self, pattern: &str) -> Result<RunnerOutput, RunnerError> {
        let output_dir = camino_tempfile::Builder::new()
            .prefix("tickettest-")
            .tempdir()
            .map_err(|error| RunnerError::TempDir { error })?;
        let output_path = output_dir.path().join(RESULTS_FILE_NAME);

        let args = self.args_for(pattern, &output_path);
        let command = shell_words::join(
            std::iter::once(self.command.program()).chain(args.iter().map(String::as_str)),
        );

        let mut expression = duct::cmd(self.command.program(), args.iter().map(String::as_str))
            .stdout_to_stderr()
            .unchecked();
        if let Some(cwd) = &self.cwd {
            expression = expression.dir(cwd.as_std_path());
        }

        debug!("running test runner: {command}");
        let start = Instant::now();
        let output = expression.run().map_err(|error| RunnerError::Spawn {
            command: command.clone(),
            error,
        })?;
        let elapsed = start.elapsed();
        let exit_code = output.status.code();
        debug!(
            "test runner exited with {} after {}",
            exit_code.map_or_else(|| "signal".to_owned(), |code| code.to_string()),
            DisplayRoundedDuration(elapsed),
        );

        if !output_path.exists() {
            return Err(RunnerError::MissingOutput {
                command,
                path: output_path,
                exit_code,
            });
        }
        let contents = fs::read_to_string(&output_path).map_err(|error| RunnerError::OutputRead {
            path: output_path.clone(),
            error,
        })?;
        let parsed = parse_jest_output(&contents).map_err(|error| RunnerError::OutputParse {
            path: output_path.clone(),
            error,
        })?;

        for failure in &parsed.suite_failures {
            warn!(
                "test file `{}` failed without running any tests:\n{}",
                failure.test_file, failure.message,
            );
        }

        Ok(RunnerOutput {
            results: parsed.results,
            suite_failures: parsed.suite_failures,
            command,
            exit_code,
            elapsed,
        })
    }

    fn args_for(&self, pattern: &str, output_path: &Utf8Path) -> Vec<String> {
        let mut args = self.command.args().to_vec();
        args.extend(self.extra_args.iter().cloned());
        args.extend([
            "--testNamePattern".to_owned(),
            pattern.to_owned(),
            "--json".to_owned(),
            "--outputFile".to_owned(),
            output_path.to_string(),
        ]);
        args
    }
}

/// A single test reported by the test runner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunnerResult {
    /// The test's own title, without the names of its enclosing groups.
    pub reported_title: String,

    /// The enclosing group names followed by the title, if reported.
    pub full_name: Option<String>,

    /// The status string reported by the runner, e.g. `passed`, `failed` or `pending`.
    pub status: String,

    /// Failure messages, with terminal escape sequences removed.
    pub failure_detail: Option<String>,

    /// How long the test took, if reported.
    pub duration: Option<Duration>,

    /// The test file the test was defined in.
    pub test_file: Option<Utf8PathBuf>,
}

impl RunnerResult {
    /// Creates a new `RunnerResult` with just a title and a status.
    pub fn new(reported_title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            reported_title: reported_title.into(),
            full_name: None,
            status: status.into(),
            failure_detail: None,
            duration: None,
            test_file: None,
        }
    }

    /// Returns true if the runner reported this test as passed.
    ///
    /// Only the exact status `passed` counts.
    pub fn is_passed(&self) -> bool {
        self.status == "passed"
    }
}

/// A test file that failed as a whole, without reporting any tests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuiteFailure {
    /// The path to the test file.
    pub test_file: Utf8PathBuf,

    /// The runner's message, with terminal escape sequences removed.
    pub message: String,
}

impl SuiteFailure {
    /// Returns a serializable summary of this failure.
    pub fn to_summary(&self) -> SuiteFailureSummary {
        SuiteFailureSummary {
            test_file: self.test_file.clone(),
            message: self.message.clone(),
        }
    }
}

/// Results parsed from the runner's JSON output.
#[derive(Clone, Debug, Default)]
pub struct ParsedOutput {
    /// Tests, in the order the runner reported them.
    pub results: Vec<RunnerResult>,

    /// Test files that failed without reporting tests.
    pub suite_failures: Vec<SuiteFailure>,
}

/// The output of a single runner invocation.
#[derive(Clone, Debug)]
pub struct RunnerOutput {
    /// Tests, in the order the runner reported them.
    pub results: Vec<RunnerResult>,

    /// Test files that failed without reporting tests.
    pub suite_failures: Vec<SuiteFailure>,

    /// The command line that was executed.
    pub command: String,

    /// The runner's exit code, or `None` if it was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Wall-clock time the runner took.
    pub elapsed: Duration,
}

impl RunnerOutput {
    /// Returns a serializable summary of this invocation.
    pub fn to_summary(&self) -> RunnerSummary {
        RunnerSummary {
            command: self.command.clone(),
            exit_code: self.exit_code,
            elapsed_ms: duration_millis(self.elapsed),
            suite_failures: self
                .suite_failures
                .iter()
                .map(SuiteFailure::to_summary)
                .collect(),
        }
    }
}

/// Parses the JSON written by `jest --json`.
///
/// Every assertion result becomes a [`RunnerResult`], in report order. A test file that failed
/// without reporting any assertion results becomes a [`SuiteFailure`].
pub fn parse_jest_output(
    input: &str,
) -> Result<ParsedOutput, serde_path_to_error::Error<serde_json::Error>> {
    let deserializer = &mut serde_json::Deserializer::from_str(input);
    let report: JestReport = serde_path_to_error::deserialize(deserializer)?;

    let mut parsed = ParsedOutput::default();
    for file in report.test_results {
        if file.assertion_results.is_empty() {
            if file.status == "failed" {
                parsed.suite_failures.push(SuiteFailure {
                    test_file: file.name,
                    message: strip_ansi_escapes::strip_str(&file.message)
                        .trim()
                        .to_owned(),
                });
            }
            continue;
        }

        for assertion in file.assertion_results {
            let failure_detail = if assertion.failure_messages.is_empty() {
                None
            } else {
                let messages: Vec<_> = assertion
                    .failure_messages
                    .iter()
                    .map(|message| strip_ansi_escapes::strip_str(message))
                    .collect();
                Some(messages.join("\n\n"))
            };

            parsed.results.push(RunnerResult {
                reported_title: assertion.title,
                full_name: assertion.full_name,
                status: assertion.status,
                failure_detail,
                duration: assertion
                    .duration
                    .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok()),
                test_file: Some(file.name.clone()),
            });
        }
    }

    Ok(parsed)
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JestReport {
    #[serde(default)]
    test_results: Vec<JestTestFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JestTestFile {
    name: Utf8PathBuf,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    assertion_results: Vec<JestAssertion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JestAssertion {
    title: String,
    #[serde(default)]
    full_name: Option<String>,
    status: String,
    #[serde(default)]
    failure_messages: Vec<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    static JEST_OUTPUT: &str = include_str!("../../fixtures/jest-output.json");

    #[test_case("npx jest", "npx", &["jest"]; "default command")]
    #[test_case("jest", "jest", &[]; "bare program")]
    #[test_case("  yarn   test  ", "yarn", &["test"]; "extra whitespace")]
    #[test_case(
        r#"node "node_modules/.bin/jest" --config 'jest config.js'"#,
        "node",
        &["node_modules/.bin/jest", "--config", "jest config.js"];
        "quoted words"
    )]
    fn parse_command(input: &str, program: &str, args: &[&str]) {
        let command = RunnerCommand::parse(input).expect("command is valid");
        assert_eq!(command.program(), program);
        assert_eq!(command.args(), args);
    }

    #[test]
    fn parse_command_errors() {
        assert!(matches!(
            RunnerCommand::parse("   "),
            Err(RunnerError::EmptyCommand)
        ));
        assert!(matches!(
            RunnerCommand::parse("npx 'jest"),
            Err(RunnerError::CommandParse { .. })
        ));
    }

    #[test]
    fn args_order() {
        let runner = TestRunner::new(RunnerCommand::parse("npx jest").expect("valid"))
            .with_args(["--ci", "--runInBand"]);
        let args = runner.args_for("(a$)|(b$)", Utf8Path::new("/tmp/out/results.json"));
        assert_eq!(
            args,
            [
                "jest",
                "--ci",
                "--runInBand",
                "--testNamePattern",
                "(a$)|(b$)",
                "--json",
                "--outputFile",
                "/tmp/out/results.json",
            ]
        );
    }

    #[test]
    fn parse_fixture() {
        let parsed = parse_jest_output(JEST_OUTPUT).expect("fixture is valid");

        let titles: Vec<_> = parsed
            .results
            .iter()
            .map(|result| (result.reported_title.as_str(), result.status.as_str()))
            .collect();
        assert_eq!(
            titles,
            [
                ("adds item", "passed"),
                ("removes item", "failed"),
                ("applies coupon", "pending"),
                ("charges card", "passed"),
            ]
        );

        let adds = &parsed.results[0];
        assert!(adds.is_passed());
        assert_eq!(adds.full_name.as_deref(), Some("cart adds item"));
        assert_eq!(adds.duration, Some(Duration::from_millis(12)));
        assert_eq!(
            adds.test_file.as_deref(),
            Some(Utf8Path::new("/work/shop/src/cart.test.js"))
        );
        assert_eq!(adds.failure_detail, None);

        let removes = &parsed.results[1];
        assert!(!removes.is_passed());
        assert_eq!(removes.duration, Some(Duration::from_micros(4500)));
        assert_eq!(
            removes.failure_detail.as_deref(),
            Some(indoc! {"
                Error: expect(received).toBe(expected)

                Expected: 0
                Received: 1
                    at Object.toBe (/work/shop/src/cart.test.js:14:22)

                Error: second failure"
            })
        );

        assert_eq!(parsed.results[2].duration, None);
        assert_eq!(parsed.results[3].full_name.as_deref(), Some("checkout payment charges card"));

        assert_eq!(
            parsed.suite_failures,
            [SuiteFailure {
                test_file: "/work/shop/src/broken.test.js".into(),
                message: "Test suite failed to run\n\n    SyntaxError: Unexpected token (3:4)"
                    .to_owned(),
            }]
        );
    }

    #[test]
    fn parse_error_has_path() {
        let input = r#"{ "testResults": [ { "name": "a.test.js", "assertionResults": [ { "title": 5, "status": "passed" } ] } ] }"#;
        let error = parse_jest_output(input).expect_err("title must be a string");
        assert_eq!(
            error.path().to_string(),
            "testResults[0].assertionResults[0].title"
        );
    }

    #[test]
    fn empty_report() {
        let parsed = parse_jest_output("{}").expect("empty report is valid");
        assert!(parsed.results.is_empty());
        assert!(parsed.suite_failures.is_empty());
    }

    #[test]
    fn summary_includes_suite_failures() {
        let output = RunnerOutput {
            results: Vec::new(),
            suite_failures: vec![SuiteFailure {
                test_file: "broken.test.js".into(),
                message: "SyntaxError".to_owned(),
            }],
            command: "npx jest".to_owned(),
            exit_code: Some(1),
            elapsed: Duration::from_millis(1500),
        };
        let summary = output.to_summary();
        assert_eq!(summary.elapsed_ms, 1500);
        assert_eq!(summary.exit_code, Some(1));
        assert_eq!(summary.suite_failures.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn missing_output_is_an_error() {
        // `true` ignores its arguments and never writes a results file.
        let runner = TestRunner::new(RunnerCommand::parse("true").expect("valid"));
        match runner.run("a$") {
            Err(RunnerError::MissingOutput {
                exit_code, path, ..
            }) => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(path.file_name(), Some(RESULTS_FILE_NAME));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn spawn_error() {
        let runner = TestRunner::new(
            RunnerCommand::parse("tickettest-this-program-does-not-exist").expect("valid"),
        );
        assert!(matches!(
            runner.run("a$"),
            Err(RunnerError::Spawn { .. })
        ));
    }
}
