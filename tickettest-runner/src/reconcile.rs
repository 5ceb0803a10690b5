// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping test runner results back onto test cases.

use crate::{runner::RunnerResult, test_case::TestCase};
use std::{collections::HashMap, fmt};
use tickettest_metadata::{OutcomeCountsSummary, RunOutcomeSummary};

/// The outcome of a single test case.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RunOutcome {
    /// The runner reported a test with this title as passed.
    Passed,

    /// The runner reported a test with this title, with any status other than passed.
    Failed,

    /// The runner did not report a test with this title.
    Unmatched,
}

impl RunOutcome {
    /// Returns a serializable summary of this outcome.
    pub fn to_summary(self) -> RunOutcomeSummary {
        match self {
            Self::Passed => RunOutcomeSummary::Passed,
            Self::Failed => RunOutcomeSummary::Failed,
            Self::Unmatched => RunOutcomeSummary::Unmatched,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_summary(), f)
    }
}

/// A test case along with its outcome.
#[derive(Clone, Copy, Debug)]
pub struct ReconciledTestCase<'a> {
    /// The test case.
    pub test_case: &'a TestCase,

    /// The outcome of the test case.
    pub outcome: RunOutcome,

    /// The runner result this test case was matched with, if any.
    pub runner_result: Option<&'a RunnerResult>,
}

/// Reconciles `runner_results` against `test_cases` by exact title equality.
///
/// Returns exactly one [`ReconciledTestCase`] per test case, in the same order.
///
/// If the runner reported more than one test with the same title, the first one is used for
/// every test case with that title. This means two tests with the same title in different groups
/// can't be told apart.
pub fn reconcile<'a>(
    test_cases: &'a [TestCase],
    runner_results: &'a [RunnerResult],
) -> Vec<ReconciledTestCase<'a>> {
    let mut by_title: HashMap<&str, &RunnerResult> = HashMap::with_capacity(runner_results.len());
    for result in runner_results {
        by_title
            .entry(result.reported_title.as_str())
            .or_insert(result);
    }

    test_cases
        .iter()
        .map(|test_case| {
            let runner_result = by_title.get(test_case.title()).copied();
            let outcome = match runner_result {
                None => RunOutcome::Unmatched,
                Some(result) if result.is_passed() => RunOutcome::Passed,
                Some(_) => RunOutcome::Failed,
            };
            ReconciledTestCase {
                test_case,
                outcome,
                runner_result,
            }
        })
        .collect()
}

/// Counts of test case outcomes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OutcomeCounts {
    /// The number of test cases that passed.
    pub passed: usize,

    /// The number of test cases that failed.
    pub failed: usize,

    /// The number of test cases the runner did not report.
    pub unmatched: usize,
}

impl OutcomeCounts {
    /// Counts outcomes across `reconciled`.
    pub fn new(reconciled: &[ReconciledTestCase<'_>]) -> Self {
        let mut counts = Self::default();
        for case in reconciled {
            match case.outcome {
                RunOutcome::Passed => counts.passed += 1,
                RunOutcome::Failed => counts.failed += 1,
                RunOutcome::Unmatched => counts.unmatched += 1,
            }
        }
        counts
    }

    /// The total number of test cases.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.unmatched
    }

    /// Returns true if every test case passed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.unmatched == 0
    }

    /// Returns a serializable summary of these counts.
    pub fn to_summary(self) -> OutcomeCountsSummary {
        OutcomeCountsSummary {
            total: self.total(),
            passed: self.passed,
            failed: self.failed,
            unmatched: self.unmatched,
        }
    }
}
