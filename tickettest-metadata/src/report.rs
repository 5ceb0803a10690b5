// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The current version of the [`RunReport`] format.
///
/// Bumped whenever a field is removed or changes meaning. Added fields don't bump the version.
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// A report of a single `tickettest run` invocation, as written to the JSON report file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunReport {
    /// The version of this format. See [`REPORT_FORMAT_VERSION`].
    pub format_version: u32,

    /// The ticket the test cases were collected from.
    pub ticket: TicketSummary,

    /// When the report was generated.
    pub generated_at: DateTime<FixedOffset>,

    /// The name-filter pattern passed to the test runner.
    ///
    /// Empty if there were no test cases to run.
    pub pattern: String,

    /// Warnings produced while building the pattern, e.g. for duplicate titles.
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Outcome counts across all test cases.
    pub counts: OutcomeCountsSummary,

    /// One record per collected test case, in collection order.
    pub test_cases: Vec<TestCaseReport>,

    /// Linked issues and subtasks that were not turned into test cases.
    #[serde(default)]
    pub skipped_issues: Vec<SkippedIssueSummary>,

    /// Information about the test runner invocation, if the runner was invoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerSummary>,
}

/// A summary of the ticket that was tested.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TicketSummary {
    /// The issue key, e.g. `PROJ-123`.
    pub key: String,

    /// The ticket's summary line.
    pub summary: String,
}

/// Outcome counts for a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutcomeCountsSummary {
    /// The total number of test cases.
    pub total: usize,

    /// The number of test cases that passed.
    pub passed: usize,

    /// The number of test cases that failed.
    pub failed: usize,

    /// The number of test cases the runner did not report.
    pub unmatched: usize,
}

/// Serializable information about a test case.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseSummary {
    /// The issue key of the test case.
    pub key: String,

    /// The title used to match against the test runner's results.
    pub title: String,

    /// Labels on the test case issue.
    #[serde(default)]
    pub labels: Vec<String>,

    /// How the test case is related to the ticket.
    pub origin: TestCaseOriginSummary,
}

/// How a test case relates to the ticket it was collected from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum TestCaseOriginSummary {
    /// The test case is a subtask of the ticket.
    Subtask,

    /// The test case is linked to the ticket.
    LinkedIssue {
        /// The name of the link type.
        #[serde(rename = "link-type")]
        link_type: String,
    },
}

/// A test case along with its outcome.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseReport {
    /// The test case.
    #[serde(flatten)]
    pub test_case: TestCaseSummary,

    /// The outcome of the test case.
    pub outcome: RunOutcomeSummary,

    /// The full name reported by the test runner, if the test case was matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// The status reported by the test runner, if the test case was matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_status: Option<String>,

    /// The duration reported by the test runner, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Failure messages reported by the test runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
}

/// The outcome of a single test case.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcomeSummary {
    /// The runner reported the test as passed.
    Passed,

    /// The runner reported the test with any status other than passed.
    Failed,

    /// The runner did not report a test with this title.
    Unmatched,
}

impl fmt::Display for RunOutcomeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// An issue that was considered but not turned into a test case.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SkippedIssueSummary {
    /// The issue key.
    pub key: String,

    /// A human-readable reason the issue was skipped.
    pub reason: String,
}

/// Information about a test runner invocation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerSummary {
    /// The command line that was executed.
    pub command: String,

    /// The exit code of the runner, if it exited normally.
    #[serde(default)]
    pub exit_code: Option<i32>,

    /// Wall-clock time the runner took, in milliseconds.
    pub elapsed_ms: u64,

    /// Test files that failed without reporting individual tests.
    #[serde(default)]
    pub suite_failures: Vec<SuiteFailureSummary>,
}

/// A test file that failed as a whole, e.g. because it could not be compiled.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SuiteFailureSummary {
    /// The path to the test file.
    pub test_file: Utf8PathBuf,

    /// The message reported by the runner.
    pub message: String,
}

/// Output of `tickettest list --message-format json`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseListSummary {
    /// The ticket the test cases were collected from.
    pub ticket: TicketSummary,

    /// The name-filter pattern that would be passed to the test runner.
    pub pattern: String,

    /// Warnings produced while building the pattern.
    #[serde(default)]
    pub warnings: Vec<String>,

    /// The collected test cases.
    pub test_cases: Vec<TestCaseSummary>,

    /// Issues that were not turned into test cases.
    #[serde(default)]
    pub skipped_issues: Vec<SkippedIssueSummary>,
}
