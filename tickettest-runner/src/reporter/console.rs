// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{RunResults, outcome_label};
use crate::{
    collect::CollectedTestCases,
    helpers::{DisplayBracketedDuration, DisplayOptionalBracketedDuration, plural},
    matcher::MatchResult,
    reconcile::{ReconciledTestCase, RunOutcome},
};
use owo_colors::{OwoColorize, Style};
use std::{io, time::Duration};

/// The number of lines of failure output shown for each failed test case, unless verbose.
const FAILURE_DETAIL_LINES: usize = 10;

/// Width of the right-aligned status column, plus a space.
const INDENT: &str = "             ";

/// Writes human-readable progress and results to a terminal.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    styles: Box<Styles>,
    verbose: bool,
}

impl ConsoleReporter {
    /// Creates a new reporter. In verbose mode, failure output is never truncated.
    pub fn new(verbose: bool) -> Self {
        Self {
            styles: Box::default(),
            verbose,
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes what was collected from the ticket, and the pattern the runner will be invoked with.
    pub fn write_collected(
        &self,
        collected: &CollectedTestCases,
        matched: &MatchResult,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        let count = collected.test_cases.len();
        writeln!(
            writer,
            "{:>12} {} {} from {} ({})",
            "Collected".style(self.styles.pass),
            count.style(self.styles.count),
            plural::test_cases_str(count),
            collected.ticket.key.style(self.styles.key),
            collected.ticket.summary,
        )?;
        for skipped in &collected.skipped {
            writeln!(
                writer,
                "{:>12} {} ({})",
                "Skipped".style(self.styles.skip),
                skipped.key.style(self.styles.key),
                skipped.reason,
            )?;
        }
        if !matched.is_empty() {
            writeln!(
                writer,
                "{:>12} {}",
                "Pattern".style(self.styles.pass),
                matched.pattern(),
            )?;
        }
        Ok(())
    }

    /// Writes one line per test case, failure output for failed test cases, and a summary.
    pub fn write_results(
        &self,
        results: &RunResults<'_>,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        for case in results.reconciled() {
            self.write_test_case(case, writer)?;
        }

        if let Some(output) = results.runner_output() {
            for failure in &output.suite_failures {
                writeln!(
                    writer,
                    "{:>12} {}",
                    "SUITE FAIL".style(self.styles.fail),
                    failure.test_file,
                )?;
                self.write_detail(&failure.message, writer)?;
            }
        }

        let counts = results.counts();
        let elapsed = results
            .runner_output()
            .map_or(Duration::ZERO, |output| output.elapsed);
        writeln!(writer, "------------")?;
        writeln!(
            writer,
            "{:>12} {} {} {}: {} passed, {} failed, {} not run",
            "Summary".style(self.styles.pass),
            DisplayBracketedDuration(elapsed),
            counts.total().style(self.styles.count),
            plural::test_cases_str(counts.total()),
            counts.passed.style(self.styles.pass),
            counts.failed.style(self.styles.fail),
            counts.unmatched.style(self.styles.skip),
        )
    }

    /// Writes the output of `tickettest list`.
    pub fn write_list(
        &self,
        collected: &CollectedTestCases,
        matched: &MatchResult,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "{}: {}",
            collected.ticket.key.style(self.styles.key),
            collected.ticket.summary,
        )?;
        if collected.test_cases.is_empty() {
            writeln!(writer, "    (no test cases)")?;
        }
        for test_case in &collected.test_cases {
            writeln!(
                writer,
                "    {} {} ({})",
                test_case.key().style(self.styles.key),
                test_case.title(),
                test_case.origin(),
            )?;
        }
        for skipped in &collected.skipped {
            writeln!(
                writer,
                "    {} {} ({})",
                "skipped".style(self.styles.skip),
                skipped.key.style(self.styles.key),
                skipped.reason,
            )?;
        }
        if !matched.is_empty() {
            writeln!(writer, "pattern: {}", matched.pattern())?;
        }
        Ok(())
    }

    fn write_test_case(
        &self,
        case: &ReconciledTestCase<'_>,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        let style = match case.outcome {
            RunOutcome::Passed => self.styles.pass,
            RunOutcome::Failed => self.styles.fail,
            RunOutcome::Unmatched => self.styles.skip,
        };
        writeln!(
            writer,
            "{:>12} {} {} {}",
            outcome_label(case.outcome).style(style),
            DisplayOptionalBracketedDuration(case.runner_result.and_then(|result| result.duration)),
            case.test_case.key().style(self.styles.key),
            case.test_case.title(),
        )?;

        if case.outcome == RunOutcome::Failed
            && let Some(detail) = case
                .runner_result
                .and_then(|result| result.failure_detail.as_deref())
        {
            self.write_detail(detail, writer)?;
        }
        Ok(())
    }

    fn write_detail(&self, detail: &str, writer: &mut dyn io::Write) -> io::Result<()> {
        let lines: Vec<_> = detail.lines().collect();
        let shown = if self.verbose {
            lines.len()
        } else {
            lines.len().min(FAILURE_DETAIL_LINES)
        };

        for line in &lines[..shown] {
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                writeln!(writer, "{INDENT}{line}")?;
            }
        }
        if shown < lines.len() {
            let hidden = lines.len() - shown;
            writeln!(
                writer,
                "{INDENT}{}",
                format!("... {hidden} more {}", if hidden == 1 { "line" } else { "lines" })
                    .style(self.styles.count),
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    key: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.key = Style::new().cyan();
    }
}
