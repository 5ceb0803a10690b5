// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting the results of a run.
//!
//! Results are reported in three places: to the console through [`ConsoleReporter`], to a JSON
//! file through [`write_report`], and back to the tracker through [`post_comments`].

mod comment;
mod console;
mod json;

pub use comment::*;
pub use console::*;
pub use json::*;

use crate::{
    collect::CollectedTestCases,
    matcher::MatchResult,
    reconcile::{OutcomeCounts, ReconciledTestCase, RunOutcome, reconcile},
    runner::{RunnerOutput, RunnerResult},
};

/// Everything known about a run, reconciled and ready to report.
#[derive(Clone, Debug)]
pub struct RunResults<'a> {
    collected: &'a CollectedTestCases,
    matched: &'a MatchResult,
    runner_output: Option<&'a RunnerOutput>,
    reconciled: Vec<ReconciledTestCase<'a>>,
    counts: OutcomeCounts,
}

impl<'a> RunResults<'a> {
    /// Reconciles the runner's output against the matched test cases.
    ///
    /// `runner_output` is `None` if the runner wasn't invoked, in which case every test case is
    /// unmatched.
    pub fn new(
        collected: &'a CollectedTestCases,
        matched: &'a MatchResult,
        runner_output: Option<&'a RunnerOutput>,
    ) -> Self {
        let runner_results: &'a [RunnerResult] =
            runner_output.map_or(&[], |output| output.results.as_slice());
        let reconciled = reconcile(matched.test_cases(), runner_results);
        let counts = OutcomeCounts::new(&reconciled);
        Self {
            collected,
            matched,
            runner_output,
            reconciled,
            counts,
        }
    }

    /// The collected test cases, along with the ticket.
    pub fn collected(&self) -> &'a CollectedTestCases {
        self.collected
    }

    /// The pattern and test cases the runner was invoked with.
    pub fn matched(&self) -> &'a MatchResult {
        self.matched
    }

    /// The runner's output, if it was invoked.
    pub fn runner_output(&self) -> Option<&'a RunnerOutput> {
        self.runner_output
    }

    /// One entry per test case, in collection order.
    pub fn reconciled(&self) -> &[ReconciledTestCase<'a>] {
        &self.reconciled
    }

    /// Outcome counts across all test cases.
    pub fn counts(&self) -> OutcomeCounts {
        self.counts
    }

    /// The key of the ticket the test cases were collected from.
    pub fn ticket_key(&self) -> &'a str {
        &self.collected.ticket.key
    }
}

/// A short, uppercase label for an outcome, e.g. `PASS`.
pub(crate) fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Passed => "PASS",
        RunOutcome::Failed => "FAIL",
        RunOutcome::Unmatched => "NOT RUN",
    }
}
