// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{RunResults, outcome_label};
use crate::{
    errors::DisplayErrorChain,
    helpers::{DisplayRoundedDuration, plural},
    reconcile::{ReconciledTestCase, RunOutcome},
    tracker::{Comment, IssueTracker, Lookup},
};
use swrite::{SWrite, swrite, swriteln};
use tracing::{debug, warn};

/// The number of comments posted by [`post_comments`], and the number that couldn't be.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PostedComments {
    /// Comments that were posted.
    pub posted: usize,

    /// Comments that failed to post, or whose issue wasn't found.
    pub failed: usize,
}

/// Posts one comment on each test case's issue, then a summary comment on the ticket.
///
/// Failing to post a comment doesn't stop the remaining comments from being posted. Failures are
/// logged as warnings and counted in the returned [`PostedComments`].
pub fn post_comments<T: IssueTracker + ?Sized>(
    tracker: &T,
    results: &RunResults<'_>,
) -> PostedComments {
    let mut stats = PostedComments::default();
    let comments = results
        .reconciled()
        .iter()
        .map(|case| {
            (
                case.test_case.key(),
                test_case_comment(results.ticket_key(), case),
            )
        })
        .chain(std::iter::once((
            results.ticket_key(),
            summary_comment(results),
        )));

    for (key, comment) in comments {
        match tracker.add_comment(key, &comment) {
            Ok(Lookup::Found(())) => {
                debug!("posted comment on {key}");
                stats.posted += 1;
            }
            Ok(Lookup::NotFound { .. }) => {
                warn!("failed to post comment: issue {key} not found");
                stats.failed += 1;
            }
            Err(error) => {
                warn!(
                    "failed to post comment on {key}: {}",
                    DisplayErrorChain::new(error)
                );
                stats.failed += 1;
            }
        }
    }

    stats
}

/// Builds the comment posted on a test case's issue.
pub fn test_case_comment(ticket_key: &str, case: &ReconciledTestCase<'_>) -> Comment {
    let mut headline = format!(
        "tickettest: {} in test run for {ticket_key}",
        outcome_label(case.outcome),
    );
    if let Some(duration) = case.runner_result.and_then(|result| result.duration) {
        swrite!(headline, " ({})", DisplayRoundedDuration(duration));
    }
    headline.push('.');
    let comment = Comment::new().paragraph(headline);

    match (case.outcome, case.runner_result) {
        (RunOutcome::Unmatched, _) | (_, None) => comment.paragraph(format!(
            "The test runner did not report a test titled \"{}\".",
            case.test_case.title(),
        )),
        (RunOutcome::Passed, Some(result)) => comment.paragraph(format!(
            "Matched test: {}",
            result.full_name.as_deref().unwrap_or(&result.reported_title),
        )),
        (RunOutcome::Failed, Some(result)) => {
            let comment = comment.paragraph(format!(
                "Matched test: {} (status: {})",
                result.full_name.as_deref().unwrap_or(&result.reported_title),
                result.status,
            ));
            match &result.failure_detail {
                Some(detail) => comment.preformatted(detail.clone()),
                None => comment,
            }
        }
    }
}

/// Builds the summary comment posted on the ticket.
pub fn summary_comment(results: &RunResults<'_>) -> Comment {
    let counts = results.counts();
    let mut headline = format!(
        "tickettest: {} {}: {} passed, {} failed, {} not run",
        counts.total(),
        plural::test_cases_str(counts.total()),
        counts.passed,
        counts.failed,
        counts.unmatched,
    );
    if let Some(output) = results.runner_output() {
        swrite!(headline, " ({})", DisplayRoundedDuration(output.elapsed));
    }
    headline.push('.');
    let mut comment = Comment::new().paragraph(headline);

    if !results.reconciled().is_empty() {
        let mut table = String::new();
        for case in results.reconciled() {
            swriteln!(
                table,
                "{:<8}{} {}",
                outcome_label(case.outcome),
                case.test_case.key(),
                case.test_case.title(),
            );
        }
        comment = comment.preformatted(table.trim_end());
    }

    let warnings = results.matched().warnings();
    if !warnings.is_empty() {
        let mut text = format!("{}:", capitalize(plural::warnings_str(warnings.len())));
        for warning in warnings {
            swrite!(text, "\n- {warning}");
        }
        comment = comment.paragraph(text);
    }

    let skipped = &results.collected().skipped;
    if !skipped.is_empty() {
        let mut text = format!(
            "Skipped {} {}:",
            skipped.len(),
            plural::issues_str(skipped.len())
        );
        for issue in skipped {
            swrite!(text, "\n- {} ({})", issue.key, issue.reason);
        }
        comment = comment.paragraph(text);
    }

    comment
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
