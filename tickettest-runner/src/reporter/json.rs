// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RunResults;
use crate::{
    collect::CollectedTestCases, errors::WriteReportError, matcher::MatchResult,
    runner::duration_millis,
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::{
    fs,
    io::{self, BufWriter, Write},
};
use tickettest_metadata::{
    REPORT_FORMAT_VERSION, RunReport, TestCaseListSummary, TestCaseReport,
};
use tracing::debug;

/// Builds the JSON report for a run.
pub fn to_run_report(results: &RunResults<'_>, generated_at: DateTime<FixedOffset>) -> RunReport {
    let collected = results.collected();
    let matched = results.matched();

    let test_cases = results
        .reconciled()
        .iter()
        .map(|case| {
            let runner_result = case.runner_result;
            TestCaseReport {
                test_case: case.test_case.to_summary(),
                outcome: case.outcome.to_summary(),
                full_name: runner_result.and_then(|result| result.full_name.clone()),
                runner_status: runner_result.map(|result| result.status.clone()),
                duration_ms: runner_result
                    .and_then(|result| result.duration)
                    .map(duration_millis),
                failure_detail: runner_result.and_then(|result| result.failure_detail.clone()),
            }
        })
        .collect();

    RunReport {
        format_version: REPORT_FORMAT_VERSION,
        ticket: collected.ticket_summary(),
        generated_at,
        pattern: matched.pattern().to_owned(),
        warnings: matched
            .warnings()
            .iter()
            .map(|warning| warning.to_string())
            .collect(),
        counts: results.counts().to_summary(),
        test_cases,
        skipped_issues: collected.skipped_summaries(),
        runner: results.runner_output().map(|output| output.to_summary()),
    }
}

/// Builds the output of `tickettest list --message-format json`.
pub fn to_list_summary(collected: &CollectedTestCases, matched: &MatchResult) -> TestCaseListSummary {
    TestCaseListSummary {
        ticket: collected.ticket_summary(),
        pattern: matched.pattern().to_owned(),
        warnings: matched
            .warnings()
            .iter()
            .map(|warning| warning.to_string())
            .collect(),
        test_cases: collected
            .test_cases
            .iter()
            .map(|test_case| test_case.to_summary())
            .collect(),
        skipped_issues: collected.skipped_summaries(),
    }
}

/// Writes `report` to `path` as pretty-printed JSON.
///
/// The file is replaced atomically, so readers never observe a partially-written report. Missing
/// parent directories are created.
pub fn write_report(path: &Utf8Path, report: &impl Serialize) -> Result<(), WriteReportError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| WriteReportError::new(path, error))?;
    }

    atomicwrites::AtomicFile::new(path, atomicwrites::AllowOverwrite)
        .write(|file| -> io::Result<()> {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, report)?;
            writer.write_all(b"\n")?;
            writer.flush()
        })
        .map_err(|error| {
            let error = match error {
                atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => error,
            };
            WriteReportError::new(path, error)
        })?;

    debug!("wrote report to {path}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_helpers::*;
    use pretty_assertions::assert_eq;
    use tickettest_metadata::{RunOutcomeSummary, TestCaseOriginSummary};

    fn generated_at() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-19T12:30:00+02:00").expect("valid timestamp")
    }

    #[test]
    fn report_contents() {
        let collected = collected();
        let matched = matched(&collected);
        let output = runner_output();
        let results = RunResults::new(&collected, &matched, Some(&output));

        let report = to_run_report(&results, generated_at());
        assert_eq!(report.format_version, REPORT_FORMAT_VERSION);
        assert_eq!(report.ticket.key, "SHOP-1");
        assert_eq!(report.pattern, "(adds item$)|(removes item$)|(charges card$)");
        assert!(report.warnings.is_empty());
        assert_eq!(report.counts.total, 3);
        assert_eq!(report.counts.unmatched, 1);

        let failed = &report.test_cases[1];
        assert_eq!(failed.test_case.key, "SHOP-3");
        assert_eq!(failed.outcome, RunOutcomeSummary::Failed);
        assert_eq!(failed.full_name.as_deref(), Some("cart removes item"));
        assert_eq!(failed.runner_status.as_deref(), Some("failed"));
        assert_eq!(failed.duration_ms, Some(5));
        assert_eq!(
            failed.failure_detail.as_deref(),
            Some("Error: expected 0\nReceived: 1")
        );

        let unmatched = &report.test_cases[2];
        assert_eq!(unmatched.outcome, RunOutcomeSummary::Unmatched);
        assert_eq!(unmatched.runner_status, None);
        assert_eq!(
            unmatched.test_case.origin,
            TestCaseOriginSummary::LinkedIssue {
                link_type: "Tests".to_owned()
            }
        );

        assert_eq!(report.skipped_issues.len(), 1);
        assert_eq!(report.skipped_issues[0].reason, "empty summary");
        let runner = report.runner.expect("runner was invoked");
        assert_eq!(runner.exit_code, Some(1));
        assert_eq!(runner.elapsed_ms, 1500);
    }

    #[test]
    fn list_summary() {
        let collected = collected();
        let matched = matched(&collected);

        let summary = to_list_summary(&collected, &matched);
        assert_eq!(summary.ticket.summary, "Checkout flow");
        assert_eq!(summary.pattern, matched.pattern());
        let keys: Vec<_> = summary.test_cases.iter().map(|case| case.key.as_str()).collect();
        assert_eq!(keys, ["SHOP-2", "SHOP-3", "SHOP-4"]);
        assert_eq!(summary.test_cases[0].labels, ["smoke"]);
        assert_eq!(summary.skipped_issues[0].key, "SHOP-5");
    }

    #[test]
    fn write_and_read_back() {
        let collected = collected();
        let matched = matched(&collected);
        let results = RunResults::new(&collected, &matched, None);
        let report = to_run_report(&results, generated_at());

        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let path = dir.path().join("reports/nested/report.json");
        write_report(&path, &report).expect("report written");
        // Overwriting is allowed.
        write_report(&path, &report).expect("report overwritten");

        let contents = fs::read_to_string(&path).expect("report read");
        assert!(contents.ends_with("}\n"));
        let read_back: RunReport = serde_json::from_str(&contents).expect("report parsed");
        assert_eq!(read_back, report);
        assert_eq!(read_back.runner, None);
    }

    #[test]
    fn write_error_has_path() {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        // A directory can't be replaced by the report.
        let path = dir.path().join("taken");
        fs::create_dir(&path).expect("created directory");
        fs::write(path.join("file"), "").expect("created file");

        let error = write_report(&path, &serde_json::json!({})).expect_err("path is a directory");
        assert_eq!(error.path(), &path);
    }
}
