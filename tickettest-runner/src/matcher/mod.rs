// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building a test runner name filter from a set of test cases.
//!
//! The main entry point is [`build_pattern`], which produces a [`MatchResult`].

mod pattern;

pub use pattern::{combined_pattern, escape, exact_pattern};

use crate::{
    errors::{BuildPatternError, PatternConstructionError, UnsupportedModeError},
    test_case::TestCase,
};
use indexmap::IndexMap;
use regex::Regex;
use std::{fmt, str::FromStr};
use tracing::debug;

/// How test cases are matched against the test runner's tests.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MatchMode {
    /// Match test cases by their title.
    #[default]
    Title,
}

impl MatchMode {
    /// Returns the string names of all supported modes.
    pub fn variants() -> [&'static str; 1] {
        ["title"]
    }
}

impl FromStr for MatchMode {
    type Err = UnsupportedModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            other => Err(UnsupportedModeError::new(other)),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
        }
    }
}

/// The result of [`build_pattern`].
#[derive(Clone, Debug)]
pub struct MatchResult {
    pattern: String,
    test_cases: Vec<TestCase>,
    warnings: Vec<MatchWarning>,
}

impl MatchResult {
    /// The pattern to pass to the test runner's name filter.
    ///
    /// This is empty if and only if there are no test cases, in which case the runner must not
    /// be invoked.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    /// The test cases this pattern was built from, in their original order and including
    /// duplicates.
    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    /// Warnings produced while building the pattern.
    pub fn warnings(&self) -> &[MatchWarning] {
        &self.warnings
    }
}

/// A warning produced while building a pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum MatchWarning {
    /// More than one test case has the same title.
    DuplicateTitle {
        /// The shared title.
        title: String,

        /// The number of test cases with this title.
        count: usize,
    },
}

impl fmt::Display for MatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTitle { title, count } => write!(
                f,
                "title `{title}` is shared by {count} test cases; all occurrences will be executed",
            ),
        }
    }
}

/// Builds a name-filter pattern from `test_cases`.
///
/// Titles are deduplicated before building the pattern, with a [`MatchWarning::DuplicateTitle`]
/// for each title that appears more than once. The returned [`MatchResult`] still contains every
/// test case, so that each of them can be reconciled against the runner's results.
///
/// If `test_cases` is empty, the pattern is empty.
///
/// # Errors
///
/// Returns an error if `mode` isn't a supported [`MatchMode`], or (indicating a bug) if the
/// resulting pattern isn't a valid regular expression.
pub fn build_pattern(
    test_cases: Vec<TestCase>,
    mode: &str,
) -> Result<MatchResult, BuildPatternError> {
    let mode: MatchMode = mode.parse()?;
    if test_cases.is_empty() {
        return Ok(MatchResult {
            pattern: String::new(),
            test_cases,
            warnings: Vec::new(),
        });
    }

    let (pattern, warnings) = match mode {
        MatchMode::Title => title_pattern(&test_cases),
    };

    Regex::new(&pattern).map_err(|error| PatternConstructionError::new(&pattern, error))?;
    debug!(
        "built pattern from {} test cases ({} warnings): {pattern}",
        test_cases.len(),
        warnings.len(),
    );

    Ok(MatchResult {
        pattern,
        test_cases,
        warnings,
    })
}

fn title_pattern(test_cases: &[TestCase]) -> (String, Vec<MatchWarning>) {
    // Counts are kept in first-seen order so that both the pattern and the warnings are
    // deterministic.
    let mut counts: IndexMap<&str, usize> = IndexMap::with_capacity(test_cases.len());
    for test_case in test_cases {
        *counts.entry(test_case.title()).or_default() += 1;
    }

    let warnings = counts
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|(&title, &count)| MatchWarning::DuplicateTitle {
            title: title.to_owned(),
            count,
        })
        .collect();

    (combined_pattern(counts.keys()), warnings)
}
