// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Comment, Issue, IssueTracker, Lookup};
use crate::errors::TrackerError;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};

/// An [`IssueTracker`] backed by a fixed set of issues.
///
/// Comments are recorded rather than posted, and can be inspected with
/// [`comments`](Self::comments). Useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    issues: IndexMap<String, Issue>,
    comments: RefCell<Vec<(String, Comment)>>,
    fetch_count: Cell<usize>,
}

impl InMemoryTracker {
    /// Creates a tracker with no issues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue, replacing any existing issue with the same key.
    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue.key.clone(), issue);
        self
    }

    /// Returns the comments added so far, as `(issue key, comment)` pairs in the order they were
    /// added.
    pub fn comments(&self) -> Vec<(String, Comment)> {
        self.comments.borrow().clone()
    }

    /// Returns the number of times [`IssueTracker::fetch_issue`] was called.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.get()
    }
}

impl IssueTracker for InMemoryTracker {
    fn fetch_issue(&self, key: &str) -> Result<Lookup<Issue>, TrackerError> {
        self.fetch_count.set(self.fetch_count.get() + 1);
        Ok(match self.issues.get(key) {
            Some(issue) => Lookup::Found(issue.clone()),
            None => Lookup::not_found(key),
        })
    }

    fn add_comment(&self, key: &str, comment: &Comment) -> Result<Lookup<()>, TrackerError> {
        if !self.issues.contains_key(key) {
            return Ok(Lookup::not_found(key));
        }
        self.comments
            .borrow_mut()
            .push((key.to_owned(), comment.clone()));
        Ok(Lookup::Found(()))
    }
}
