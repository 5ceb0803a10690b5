// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for tickettest-runner.

use std::{fmt, time::Duration};

/// Utilities for pluralizing various words based on count.
pub mod plural {
    /// Returns "test case" if `count` is 1, otherwise "test cases".
    pub fn test_cases_str(count: usize) -> &'static str {
        if count == 1 { "test case" } else { "test cases" }
    }

    /// Returns "issue" if `count` is 1, otherwise "issues".
    pub fn issues_str(count: usize) -> &'static str {
        if count == 1 { "issue" } else { "issues" }
    }

    /// Returns "warning" if `count` is 1, otherwise "warnings".
    pub fn warnings_str(count: usize) -> &'static str {
        if count == 1 { "warning" } else { "warnings" }
    }
}

/// Displays a duration as seconds with millisecond precision, right-aligned in brackets.
pub(crate) struct DisplayBracketedDuration(pub(crate) Duration);

impl fmt::Display for DisplayBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(f, "[{:>8.3?}s]", self.0.as_secs_f64())
    }
}

/// Displays an optional duration like [`DisplayBracketedDuration`], or blank padding of the same
/// width if absent.
pub(crate) struct DisplayOptionalBracketedDuration(pub(crate) Option<Duration>);

impl fmt::Display for DisplayOptionalBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(duration) => write!(f, "{}", DisplayBracketedDuration(duration)),
            None => write!(f, "[{:>9}]", ""),
        }
    }
}

/// Displays a duration in human-readable form, rounded to milliseconds, e.g. `1s 250ms`.
pub(crate) struct DisplayRoundedDuration(pub(crate) Duration);

impl fmt::Display for DisplayRoundedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX);
        write!(
            f,
            "{}",
            humantime::format_duration(Duration::from_millis(millis))
        )
    }
}
