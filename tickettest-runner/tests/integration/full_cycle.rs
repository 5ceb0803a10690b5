// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use chrono::DateTime;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use tickettest_metadata::RunOutcomeSummary;
use tickettest_runner::{
    collect::{CollectOptions, SkipReason, TestCaseCollector},
    matcher::build_pattern,
    reconcile::OutcomeCounts,
    reporter::{PostedComments, RunResults, post_comments, to_run_report, write_report},
    runner::{RunnerCommand, TestRunner},
    tracker::Lookup,
};

#[test]
fn collect_run_and_report() -> Result<()> {
    let tracker = shop_tracker();
    let options = CollectOptions {
        link_types: vec!["tests".to_owned()],
        ..CollectOptions::default()
    };

    let collected = match TestCaseCollector::new(&tracker, options).collect("SHOP-1")? {
        Lookup::Found(collected) => collected,
        Lookup::NotFound { key } => color_eyre::eyre::bail!("ticket {key} not found"),
    };
    let keys: Vec<_> = collected.test_cases.iter().map(|case| case.key()).collect();
    assert_eq!(keys, ["SHOP-2", "SHOP-3", "SHOP-4", "SHOP-6"]);
    assert_eq!(collected.skipped.len(), 1);
    assert_eq!(collected.skipped[0].key, "SHOP-99");
    assert_eq!(collected.skipped[0].reason, SkipReason::NotFound);

    let matched = build_pattern(collected.test_cases.clone(), "title")?;
    assert_eq!(
        matched.pattern(),
        "(adds item$)|(removes item$)|(charges card$)|(refunds order$)"
    );

    let command = RunnerCommand::parse(&shell_words::join([
        "sh",
        fake_jest_path().as_str(),
        jest_output_path().as_str(),
    ]))?;
    let output = TestRunner::new(command)
        .with_args(["--ci"])
        .with_cwd(manifest_dir())
        .run(matched.pattern())?;
    assert_eq!(output.exit_code, Some(1));
    assert_eq!(output.results.len(), 4);
    assert_eq!(output.suite_failures.len(), 1);
    ensure!(
        output.command.contains("--testNamePattern"),
        "command line recorded: {}",
        output.command
    );

    let results = RunResults::new(&collected, &matched, Some(&output));
    assert_eq!(
        results.counts(),
        OutcomeCounts {
            passed: 2,
            failed: 1,
            unmatched: 1,
        }
    );

    let dir = camino_tempfile::tempdir()?;
    let report_path = dir.path().join("report.json");
    let generated_at = DateTime::parse_from_rfc3339("2026-10-19T09:00:00Z")?;
    write_report(&report_path, &to_run_report(&results, generated_at))?;
    let report: tickettest_metadata::RunReport =
        serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    let outcomes: Vec<_> = report
        .test_cases
        .iter()
        .map(|case| (case.test_case.key.as_str(), case.outcome))
        .collect();
    assert_eq!(
        outcomes,
        [
            ("SHOP-2", RunOutcomeSummary::Passed),
            ("SHOP-3", RunOutcomeSummary::Failed),
            ("SHOP-4", RunOutcomeSummary::Passed),
            ("SHOP-6", RunOutcomeSummary::Unmatched),
        ]
    );

    let posted = post_comments(&tracker, &results);
    assert_eq!(posted, PostedComments { posted: 5, failed: 0 });
    let commented: Vec<_> = tracker
        .comments()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(commented, ["SHOP-2", "SHOP-3", "SHOP-4", "SHOP-6", "SHOP-1"]);

    Ok(())
}

#[test]
fn no_test_cases_means_empty_pattern() -> Result<()> {
    let tracker = shop_tracker();
    let options = CollectOptions {
        include_subtasks: false,
        include_linked: false,
        ..CollectOptions::default()
    };
    let collected = TestCaseCollector::new(&tracker, options)
        .collect("SHOP-1")?
        .found()
        .ok_or_else(|| color_eyre::eyre::eyre!("ticket not found"))?;
    let matched = build_pattern(collected.test_cases.clone(), "title")?;
    ensure!(matched.is_empty(), "no test cases collected");
    assert_eq!(matched.pattern(), "");

    let results = RunResults::new(&collected, &matched, None);
    assert_eq!(results.counts().total(), 0);
    Ok(())
}
