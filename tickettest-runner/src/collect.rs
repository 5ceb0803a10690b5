// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collecting test cases from a ticket's subtasks and linked issues.

use crate::{
    errors::TrackerError,
    test_case::{TestCase, TestCaseOrigin},
    tracker::{Issue, IssueTracker, Lookup},
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use tickettest_metadata::{SkippedIssueSummary, TicketSummary};
use tracing::debug;

/// Options controlling which related issues become test cases.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct CollectOptions {
    /// Whether subtasks of the ticket are collected.
    pub include_subtasks: bool,

    /// Whether issues linked to the ticket are collected.
    pub include_linked: bool,

    /// If non-empty, only links with one of these type names are followed.
    ///
    /// Link type names are compared ASCII case-insensitively.
    #[serde(default)]
    pub link_types: Vec<String>,

    /// If non-empty, only issues with at least one of these labels become test cases.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            include_subtasks: true,
            include_linked: true,
            link_types: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl CollectOptions {
    fn follows_link_type(&self, link_type: &str) -> bool {
        self.link_types.is_empty()
            || self
                .link_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(link_type))
    }

    fn accepts_labels(&self, labels: &[String]) -> bool {
        self.labels.is_empty() || labels.iter().any(|label| self.labels.contains(label))
    }
}

/// Test cases collected from a ticket.
#[derive(Clone, Debug)]
pub struct CollectedTestCases {
    /// The ticket itself.
    pub ticket: Issue,

    /// The collected test cases: subtasks first, then linked issues, each in tracker order.
    pub test_cases: Vec<TestCase>,

    /// Related issues that did not become test cases.
    pub skipped: Vec<SkippedIssue>,
}

impl CollectedTestCases {
    /// Returns a serializable summary of the ticket.
    pub fn ticket_summary(&self) -> TicketSummary {
        TicketSummary {
            key: self.ticket.key.clone(),
            summary: self.ticket.summary.clone(),
        }
    }

    /// Returns serializable summaries of the skipped issues.
    pub fn skipped_summaries(&self) -> Vec<SkippedIssueSummary> {
        self.skipped.iter().map(SkippedIssue::to_summary).collect()
    }
}

/// A related issue that did not become a test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkippedIssue {
    /// The issue key.
    pub key: String,

    /// Why the issue was skipped.
    pub reason: SkipReason,
}

impl SkippedIssue {
    /// Returns a serializable summary of this skipped issue.
    pub fn to_summary(&self) -> SkippedIssueSummary {
        SkippedIssueSummary {
            key: self.key.clone(),
            reason: self.reason.to_string(),
        }
    }
}

/// The reason a related issue was skipped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The issue doesn't exist or isn't visible.
    NotFound,

    /// The issue has none of the required labels.
    MissingLabel,

    /// The issue has an empty summary, which can't be matched against a test.
    EmptyTitle,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "issue not found"),
            Self::MissingLabel => write!(f, "none of the required labels"),
            Self::EmptyTitle => write!(f, "empty summary"),
        }
    }
}

/// Collects test cases for a ticket from an [`IssueTracker`].
#[derive(Debug)]
pub struct TestCaseCollector<'a, T: ?Sized> {
    tracker: &'a T,
    options: CollectOptions,
}

impl<'a, T: IssueTracker + ?Sized> TestCaseCollector<'a, T> {
    /// Creates a new collector.
    pub fn new(tracker: &'a T, options: CollectOptions) -> Self {
        Self { tracker, options }
    }

    /// Collects test cases for the ticket with key `ticket_key`.
    ///
    /// The ticket's subtasks come first, then its linked issues, each in tracker order. An issue
    /// that is reachable more than once keeps the origin it was first seen with. Each candidate
    /// is fetched individually to obtain its title and labels.
    ///
    /// Returns [`Lookup::NotFound`] if the ticket itself doesn't exist. Candidates that don't
    /// exist are recorded in [`CollectedTestCases::skipped`].
    pub fn collect(&self, ticket_key: &str) -> Result<Lookup<CollectedTestCases>, TrackerError> {
        let ticket = match self.tracker.fetch_issue(ticket_key)? {
            Lookup::Found(ticket) => ticket,
            Lookup::NotFound { key } => return Ok(Lookup::NotFound { key }),
        };

        let candidates = self.candidates(&ticket);
        debug!(
            "{}: {} candidate test case issues",
            ticket.key,
            candidates.len()
        );

        let mut test_cases = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();
        for (key, origin) in candidates {
            let issue = match self.tracker.fetch_issue(&key)? {
                Lookup::Found(issue) => issue,
                Lookup::NotFound { key } => {
                    skipped.push(SkippedIssue {
                        key,
                        reason: SkipReason::NotFound,
                    });
                    continue;
                }
            };

            let reason = if !self.options.accepts_labels(&issue.labels) {
                Some(SkipReason::MissingLabel)
            } else if issue.summary.is_empty() {
                Some(SkipReason::EmptyTitle)
            } else {
                None
            };
            match reason {
                Some(reason) => skipped.push(SkippedIssue {
                    key: issue.key,
                    reason,
                }),
                None => test_cases.push(TestCase::new(
                    issue.key,
                    issue.summary,
                    issue.labels,
                    origin,
                )),
            }
        }

        Ok(Lookup::Found(CollectedTestCases {
            ticket,
            test_cases,
            skipped,
        }))
    }

    fn candidates(&self, ticket: &Issue) -> IndexMap<String, TestCaseOrigin> {
        let mut candidates = IndexMap::new();
        let mut add = |key: &str, origin: TestCaseOrigin| {
            if key != ticket.key {
                candidates.entry(key.to_owned()).or_insert(origin);
            }
        };

        if self.options.include_subtasks {
            for subtask in &ticket.subtasks {
                add(&subtask.key, TestCaseOrigin::Subtask);
            }
        }
        if self.options.include_linked {
            for link in &ticket.links {
                if self.options.follows_link_type(&link.link_type) {
                    add(
                        &link.issue.key,
                        TestCaseOrigin::LinkedIssue {
                            link_type: link.link_type.clone(),
                        },
                    );
                }
            }
        }

        candidates
    }
}
