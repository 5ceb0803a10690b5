// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test cases collected from the issue tracker.

use std::fmt;
use tickettest_metadata::{TestCaseOriginSummary, TestCaseSummary};

/// A test case sourced from an issue in the tracker.
///
/// A test case is expected to correspond 1:1 with a named test in the test runner. Test cases are
/// unique by [`key`](Self::key), but are matched against runner results by
/// [`title`](Self::title).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestCase {
    key: String,
    title: String,
    labels: Vec<String>,
    origin: TestCaseOrigin,
}

impl TestCase {
    /// Creates a new `TestCase`.
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        labels: impl IntoIterator<Item = impl Into<String>>,
        origin: TestCaseOrigin,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            origin,
        }
    }

    /// The issue key, e.g. `PROJ-123`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The title of the test case, matched exactly against the runner's reported titles.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Labels on the test case's issue, in tracker order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// How the test case relates to the ticket it was collected from.
    pub fn origin(&self) -> &TestCaseOrigin {
        &self.origin
    }

    /// Returns a serializable summary of this test case.
    pub fn to_summary(&self) -> TestCaseSummary {
        TestCaseSummary {
            key: self.key.clone(),
            title: self.title.clone(),
            labels: self.labels.clone(),
            origin: self.origin.to_summary(),
        }
    }
}

/// How a test case relates to the ticket it was collected from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestCaseOrigin {
    /// The test case is a subtask of the ticket.
    Subtask,

    /// The test case is linked to the ticket.
    LinkedIssue {
        /// The name of the link type, e.g. `Tests`.
        link_type: String,
    },
}

impl TestCaseOrigin {
    /// Returns a serializable summary of this origin.
    pub fn to_summary(&self) -> TestCaseOriginSummary {
        match self {
            Self::Subtask => TestCaseOriginSummary::Subtask,
            Self::LinkedIssue { link_type } => TestCaseOriginSummary::LinkedIssue {
                link_type: link_type.clone(),
            },
        }
    }
}

impl fmt::Display for TestCaseOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subtask => write!(f, "subtask"),
            Self::LinkedIssue { link_type } => write!(f, "linked ({link_type})"),
        }
    }
}
