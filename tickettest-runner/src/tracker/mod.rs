// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access to the issue tracker that test cases are collected from.
//!
//! The [`IssueTracker`] trait is the seam between tickettest and the tracker. [`JiraClient`]
//! implements it over Jira's REST API, and [`InMemoryTracker`] implements it over a fixed set of
//! issues.

mod jira;
mod memory;

pub use jira::*;
pub use memory::*;

use crate::errors::TrackerError;
use std::fmt;

/// Operations tickettest needs from an issue tracker.
pub trait IssueTracker {
    /// Fetches the issue with the given key.
    ///
    /// Returns [`Lookup::NotFound`] if the issue doesn't exist or isn't visible.
    fn fetch_issue(&self, key: &str) -> Result<Lookup<Issue>, TrackerError>;

    /// Adds a comment to the issue with the given key.
    ///
    /// Returns [`Lookup::NotFound`] if the issue doesn't exist or isn't visible.
    fn add_comment(&self, key: &str, comment: &Comment) -> Result<Lookup<()>, TrackerError>;
}

impl<T: IssueTracker + ?Sized> IssueTracker for &T {
    fn fetch_issue(&self, key: &str) -> Result<Lookup<Issue>, TrackerError> {
        (**self).fetch_issue(key)
    }

    fn add_comment(&self, key: &str, comment: &Comment) -> Result<Lookup<()>, TrackerError> {
        (**self).add_comment(key, comment)
    }
}

/// The result of looking up an issue by key.
///
/// A missing issue is an expected condition rather than an error, so it's represented as a value.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum Lookup<T> {
    /// The issue was found.
    Found(T),

    /// No issue with this key exists, or it isn't visible with the current credentials.
    NotFound {
        /// The key that was looked up.
        key: String,
    },
}

impl<T> Lookup<T> {
    /// Creates a new [`Lookup::NotFound`].
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Returns the found value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound { .. } => None,
        }
    }

    /// Maps the found value with `f`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound { key } => Lookup::NotFound { key },
        }
    }

    /// Returns true if the issue was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// An issue in the tracker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Issue {
    /// The issue key, e.g. `PROJ-123`.
    pub key: String,

    /// The issue's one-line summary.
    pub summary: String,

    /// Labels on the issue, in tracker order.
    pub labels: Vec<String>,

    /// The name of the issue type, e.g. `Story` or `Test`.
    pub issue_type: Option<String>,

    /// Subtasks of the issue, in tracker order.
    pub subtasks: Vec<IssueRef>,

    /// Links to other issues, in tracker order.
    pub links: Vec<IssueLink>,
}

impl Issue {
    /// Creates a new issue with no labels, subtasks or links.
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            labels: Vec::new(),
            issue_type: None,
            subtasks: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Adds labels to this issue.
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Adds a subtask to this issue.
    pub fn with_subtask(mut self, key: impl Into<String>) -> Self {
        self.subtasks.push(IssueRef::new(key));
        self
    }

    /// Adds a link to another issue.
    pub fn with_link(
        mut self,
        link_type: impl Into<String>,
        direction: LinkDirection,
        key: impl Into<String>,
    ) -> Self {
        self.links.push(IssueLink {
            link_type: link_type.into(),
            direction,
            issue: IssueRef::new(key),
        });
        self
    }
}

/// A reference to another issue, as embedded in an issue's subtasks or links.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssueRef {
    /// The referenced issue's key.
    pub key: String,

    /// The referenced issue's summary, if the tracker included it.
    pub summary: Option<String>,
}

impl IssueRef {
    /// Creates a new reference without a summary.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: None,
        }
    }
}

/// A link from one issue to another.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssueLink {
    /// The name of the link type, e.g. `Tests` or `Relates`.
    pub link_type: String,

    /// Which end of the link the other issue is on.
    pub direction: LinkDirection,

    /// The other issue.
    pub issue: IssueRef,
}

/// The direction of an [`IssueLink`], from the point of view of the issue that has it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkDirection {
    /// The other issue points at this one, e.g. "is tested by".
    Inward,

    /// This issue points at the other one, e.g. "tests".
    Outward,
}

/// A comment to post on an issue, made of an ordered list of blocks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Comment {
    blocks: Vec<CommentBlock>,
}

impl Comment {
    /// Creates an empty comment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a paragraph of plain text.
    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(CommentBlock::Paragraph(text.into()));
        self
    }

    /// Appends a block of preformatted text.
    pub fn preformatted(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(CommentBlock::Preformatted(text.into()));
        self
    }

    /// The blocks in this comment, in order.
    pub fn blocks(&self) -> &[CommentBlock] {
        &self.blocks
    }
}

/// Renders the comment as plain text, with preformatted blocks fenced by `{noformat}`.
impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            match block {
                CommentBlock::Paragraph(text) => f.write_str(text)?,
                CommentBlock::Preformatted(text) => write!(f, "{{noformat}}\n{text}\n{{noformat}}")?,
            }
        }
        Ok(())
    }
}

/// A block within a [`Comment`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommentBlock {
    /// A paragraph of plain text.
    Paragraph(String),

    /// Preformatted text, e.g. a failure message.
    Preformatted(String),
}
