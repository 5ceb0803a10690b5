// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use supports_color::Stream;
use tickettest_metadata::TicketTestExitCode;
use tickettest_runner::{
    collect::{CollectOptions, CollectedTestCases, TestCaseCollector},
    config::{ReportConfig, RunnerConfig, TicketTestConfig},
    errors::BuildPatternError,
    helpers::plural,
    matcher::{MatchMode, MatchResult, build_pattern},
    reporter::{
        ConsoleReporter, RunResults, post_comments, to_list_summary, to_run_report, write_report,
    },
    runner::{RunnerCommand, TestRunner},
    tracker::{IssueTracker, JiraClient, Lookup},
};
use tracing::{info, warn};

/// Runs the test cases attached to an issue tracker ticket, and reports the results back.
///
/// Test cases are the ticket's subtasks and linked issues. Each test case's title is matched
/// against the names of Jest tests.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "tickettest",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct TicketTestApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl TicketTestApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let cwd = current_dir()?;
        let config = self.config_opts.make_config(&cwd)?;
        let tracker = JiraClient::new(&config.tracker);
        self.command.exec(config, &tracker, output, output_writer)
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: .config/tickettest.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, cwd: &Utf8Path) -> Result<TicketTestConfig> {
        Ok(TicketTestConfig::from_sources(
            cwd,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the test cases attached to a ticket
    ///
    /// This command collects test cases from the ticket's subtasks and linked issues, and prints
    /// them along with the pattern the test runner would be invoked with. Nothing is run.
    /// Use --message-format json to get machine-readable output.
    List {
        #[command(flatten)]
        ticket_opts: TicketOpts,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "Output options",
            value_name = "FMT"
        )]
        message_format: MessageFormat,
    },

    /// Run the test cases attached to a ticket
    ///
    /// This command collects test cases from the ticket, runs the matching tests once, then
    /// reports the results to the console, to a JSON report, and as comments on the ticket and
    /// its test case issues.
    Run {
        #[command(flatten)]
        ticket_opts: TicketOpts,

        #[command(flatten)]
        runner_opts: RunnerOpts,

        #[command(flatten)]
        report_opts: ReportOpts,
    },
}

impl Command {
    fn exec<T: IssueTracker + ?Sized>(
        self,
        mut config: TicketTestConfig,
        tracker: &T,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        match self {
            Self::List {
                ticket_opts,
                message_format,
            } => {
                ticket_opts.collect_opts.apply(&mut config.collect);
                let (collected, matched) = ticket_opts.collect_and_match(tracker, config.collect)?;

                let mut stdout = output_writer.stdout_writer();
                match message_format {
                    MessageFormat::Human => {
                        let mut reporter = ConsoleReporter::new(output.verbose);
                        if output.color.should_colorize(Stream::Stdout) {
                            reporter.colorize();
                        }
                        reporter
                            .write_list(&collected, &matched, &mut stdout)
                            .map_err(ExpectedError::write_stdout)?;
                    }
                    MessageFormat::Json => {
                        serde_json::to_writer_pretty(
                            &mut stdout,
                            &to_list_summary(&collected, &matched),
                        )
                        .map_err(ExpectedError::serialize_output)?;
                        writeln!(stdout).map_err(ExpectedError::write_stdout)?;
                    }
                }
                stdout.flush().map_err(ExpectedError::write_stdout)?;

                Ok(TicketTestExitCode::OK)
            }
            Self::Run {
                ticket_opts,
                runner_opts,
                report_opts,
            } => {
                ticket_opts.collect_opts.apply(&mut config.collect);
                runner_opts.apply(&mut config.runner);
                report_opts.apply(&mut config.report);
                let (collected, matched) = ticket_opts.collect_and_match(tracker, config.collect)?;

                run_test_cases(
                    &collected,
                    &matched,
                    &config.runner,
                    &config.report,
                    tracker,
                    output,
                    output_writer,
                )
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormat {
    /// A human-readable list
    #[default]
    Human,
    /// JSON, as described by `tickettest_metadata::TestCaseListSummary`
    Json,
}

#[derive(Debug, Args)]
struct TicketOpts {
    /// The key of the ticket, e.g. PROJ-123
    #[arg(value_name = "TICKET")]
    ticket: String,

    /// How test cases are matched against test names
    #[arg(long, default_value = "title", value_name = "MODE")]
    match_mode: String,

    #[command(flatten)]
    collect_opts: CollectOpts,
}

impl TicketOpts {
    fn collect_and_match<T: IssueTracker + ?Sized>(
        &self,
        tracker: &T,
        options: CollectOptions,
    ) -> Result<(CollectedTestCases, MatchResult)> {
        // Fail before talking to the tracker.
        self.match_mode
            .parse::<MatchMode>()
            .map_err(BuildPatternError::from)?;

        let collected = match TestCaseCollector::new(tracker, options).collect(&self.ticket)? {
            Lookup::Found(collected) => collected,
            Lookup::NotFound { key } => return Err(ExpectedError::ticket_not_found(key)),
        };
        let matched = build_pattern(collected.test_cases.clone(), &self.match_mode)?;
        for warning in matched.warnings() {
            warn!("{warning}");
        }

        Ok((collected, matched))
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Collection options")]
struct CollectOpts {
    /// Don't collect the ticket's subtasks
    #[arg(long)]
    no_subtasks: bool,

    /// Don't collect issues linked to the ticket
    #[arg(long)]
    no_linked: bool,

    /// Only follow links of this type (case-insensitive, may be repeated)
    #[arg(long = "link-type", value_name = "NAME")]
    link_types: Vec<String>,

    /// Only collect issues with this label (may be repeated)
    #[arg(long = "label", value_name = "LABEL")]
    labels: Vec<String>,
}

impl CollectOpts {
    fn apply(&self, options: &mut CollectOptions) {
        if self.no_subtasks {
            options.include_subtasks = false;
        }
        if self.no_linked {
            options.include_linked = false;
        }
        if !self.link_types.is_empty() {
            options.link_types.clone_from(&self.link_types);
        }
        if !self.labels.is_empty() {
            options.labels.clone_from(&self.labels);
        }
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Runner options")]
struct RunnerOpts {
    /// Test runner command line [default: npx jest]
    #[arg(long, value_name = "CMD")]
    runner_command: Option<String>,

    /// Extra argument passed to the test runner (may be repeated)
    #[arg(long = "runner-arg", value_name = "ARG", allow_hyphen_values = true)]
    runner_args: Vec<String>,
}

impl RunnerOpts {
    fn apply(&self, config: &mut RunnerConfig) {
        if let Some(command) = &self.runner_command {
            config.command.clone_from(command);
        }
        // Arguments passed on the command line come after configured ones.
        config.args.extend(self.runner_args.iter().cloned());
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Reporter options")]
struct ReportOpts {
    /// Write the JSON report to this path [default: tickettest-report.json]
    #[arg(long, value_name = "PATH", conflicts_with = "no_report")]
    report_file: Option<Utf8PathBuf>,

    /// Don't write a JSON report
    #[arg(long)]
    no_report: bool,

    /// Don't post results as comments on the tracker
    #[arg(long)]
    no_comment: bool,
}

impl ReportOpts {
    fn apply(&self, config: &mut ReportConfig) {
        if let Some(path) = &self.report_file {
            config.path = Some(path.clone());
        }
        if self.no_report {
            config.path = None;
        }
        if self.no_comment {
            config.comment = false;
        }
    }
}

fn run_test_cases<T: IssueTracker + ?Sized>(
    collected: &CollectedTestCases,
    matched: &MatchResult,
    runner_config: &RunnerConfig,
    report_config: &ReportConfig,
    tracker: &T,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let mut reporter = ConsoleReporter::new(output.verbose);
    if output.color.should_colorize(Stream::Stderr) {
        reporter.colorize();
    }
    let mut stderr = output_writer.stderr_writer();
    reporter
        .write_collected(collected, matched, &mut stderr)
        .map_err(ExpectedError::write_stderr)?;

    let runner_output = if matched.is_empty() {
        None
    } else {
        let command =
            RunnerCommand::parse(&runner_config.command).map_err(ExpectedError::runner_command)?;
        stderr.flush().map_err(ExpectedError::write_stderr)?;
        let runner_output = TestRunner::new(command)
            .with_args(runner_config.args.iter().cloned())
            .run(matched.pattern())
            .map_err(ExpectedError::runner_failed)?;
        Some(runner_output)
    };

    let results = RunResults::new(collected, matched, runner_output.as_ref());
    if runner_output.is_some() {
        reporter
            .write_results(&results, &mut stderr)
            .map_err(ExpectedError::write_stderr)?;
    }
    stderr.flush().map_err(ExpectedError::write_stderr)?;

    if let Some(path) = &report_config.path {
        let report = to_run_report(&results, chrono::Local::now().fixed_offset());
        write_report(path, &report)?;
        info!("wrote report to {path}");
    }

    if runner_output.is_none() {
        warn!(
            "no test cases found for {}: the test runner was not invoked",
            collected.ticket.key
        );
        return Ok(TicketTestExitCode::NO_TEST_CASES);
    }

    if report_config.comment {
        let posted = post_comments(tracker, &results);
        if posted.failed > 0 {
            warn!(
                "posted {} comments, {} could not be posted",
                posted.posted, posted.failed
            );
        } else {
            info!("posted {} comments", posted.posted);
        }
    }

    let counts = results.counts();
    if counts.failed > 0 {
        return Err(ExpectedError::test_run_failed(counts.failed));
    }
    if counts.unmatched > 0 {
        warn!(
            "{} {} not reported by the test runner",
            counts.unmatched,
            plural::test_cases_str(counts.unmatched),
        );
        return Ok(TicketTestExitCode::TEST_CASES_UNMATCHED);
    }
    Ok(TicketTestExitCode::OK)
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(ExpectedError::current_dir_failed)?;
    Utf8PathBuf::try_from(cwd).map_err(ExpectedError::current_dir_invalid_utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use test_case::test_case;
    use tickettest_metadata::{RunReport, TestCaseListSummary};
    use tickettest_runner::{
        config::TrackerConfig,
        tracker::{ApiVersionSetting, Credentials, InMemoryTracker, Issue, LinkDirection},
    };

    #[test]
    fn verify_app() {
        TicketTestApp::command().debug_assert();
    }

    #[test_case(&["tickettest", "list", "SHOP-1"]; "list")]
    #[test_case(&["tickettest", "list", "SHOP-1", "-T", "json", "--no-linked"]; "list json")]
    #[test_case(&["tickettest", "--color", "never", "-v", "run", "SHOP-1"]; "global options")]
    #[test_case(&["tickettest", "run", "SHOP-1", "--config-file", "ci.toml"]; "global after command")]
    #[test_case(
        &["tickettest", "run", "SHOP-1", "--runner-arg", "--ci", "--runner-arg=--silent"];
        "hyphenated runner args"
    )]
    #[test_case(
        &["tickettest", "run", "SHOP-1", "--link-type", "Tests", "--link-type", "Verifies"];
        "repeated link types"
    )]
    #[test_case(&["tickettest", "run", "SHOP-1", "--no-report", "--no-comment"]; "no output")]
    fn valid_args(args: &[&str]) {
        if let Err(error) = TicketTestApp::try_parse_from(args) {
            panic!("{args:?} should parse, but failed with:\n{error}");
        }
    }

    #[test_case(&["tickettest", "run"]; "missing ticket")]
    #[test_case(
        &["tickettest", "run", "SHOP-1", "--report-file", "r.json", "--no-report"];
        "report file conflicts with no report"
    )]
    #[test_case(&["tickettest", "--color", "sometimes", "list", "SHOP-1"]; "invalid color")]
    #[test_case(&["tickettest", "list", "SHOP-1", "-T", "xml"]; "invalid message format")]
    #[test_case(&["tickettest", "list", "SHOP-1", "--no-comment"]; "run option on list")]
    fn invalid_args(args: &[&str]) {
        TicketTestApp::try_parse_from(args).expect_err("arguments should be rejected");
    }

    #[test]
    fn command_line_overrides_config() {
        let app = TicketTestApp::try_parse_from([
            "tickettest",
            "run",
            "SHOP-1",
            "--no-subtasks",
            "--label",
            "smoke",
            "--runner-command",
            "yarn jest",
            "--runner-arg",
            "--ci",
            "--no-report",
        ])
        .expect("arguments parse");
        let Command::Run {
            ticket_opts,
            runner_opts,
            report_opts,
        } = app.command
        else {
            panic!("expected run command");
        };

        let mut collect = CollectOptions::default();
        ticket_opts.collect_opts.apply(&mut collect);
        assert_eq!(
            collect,
            CollectOptions {
                include_subtasks: false,
                include_linked: true,
                link_types: Vec::new(),
                labels: vec!["smoke".to_owned()],
            }
        );

        let mut runner = RunnerConfig {
            command: "npx jest".to_owned(),
            args: vec!["--runInBand".to_owned()],
        };
        runner_opts.apply(&mut runner);
        assert_eq!(runner.command, "yarn jest");
        assert_eq!(runner.args, ["--runInBand", "--ci"]);

        let mut report = ReportConfig {
            path: Some("tickettest-report.json".into()),
            comment: true,
        };
        report_opts.apply(&mut report);
        assert_eq!(
            report,
            ReportConfig {
                path: None,
                comment: true,
            }
        );
    }

    fn test_config(report_path: Option<Utf8PathBuf>, runner_command: &str) -> TicketTestConfig {
        TicketTestConfig {
            tracker: TrackerConfig {
                base_url: "https://jira.invalid".to_owned(),
                credentials: Credentials::default(),
                api_version: ApiVersionSetting::default(),
                timeout: Duration::from_secs(1),
            },
            runner: RunnerConfig {
                command: runner_command.to_owned(),
                args: Vec::new(),
            },
            collect: CollectOptions::default(),
            report: ReportConfig {
                path: report_path,
                comment: true,
            },
        }
    }

    fn shop_tracker(subtasks: &[(&str, &str)]) -> InMemoryTracker {
        let ticket = subtasks.iter().fold(
            Issue::new("SHOP-1", "Checkout flow").with_link("Blocks", LinkDirection::Outward, "SHOP-8"),
            |ticket, (key, _)| ticket.with_subtask(*key),
        );
        subtasks.iter().fold(
            InMemoryTracker::new()
                .with_issue(ticket)
                .with_issue(Issue::new("SHOP-8", "Payment provider outage")),
            |tracker, (key, title)| tracker.with_issue(Issue::new(*key, *title)),
        )
    }

    fn exec(
        args: &[&str],
        config: TicketTestConfig,
        tracker: &InMemoryTracker,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let app = TicketTestApp::try_parse_from(args).expect("arguments parse");
        app.command
            .exec(config, tracker, OutputContext::for_tests(), output_writer)
    }

    #[test]
    fn list_json() {
        let tracker = shop_tracker(&[("SHOP-2", "adds item"), ("SHOP-3", "removes item")]);
        let mut output_writer = OutputWriter::new_test();

        let code = exec(
            &["tickettest", "list", "SHOP-1", "--message-format", "json"],
            test_config(None, "npx jest"),
            &tracker,
            &mut output_writer,
        )
        .expect("list succeeds");
        assert_eq!(code, TicketTestExitCode::OK);

        let summary: TestCaseListSummary =
            serde_json::from_str(output_writer.test_stdout()).expect("stdout is a list summary");
        assert_eq!(summary.ticket.key, "SHOP-1");
        assert_eq!(summary.pattern, "(adds item$)|(removes item$)|(Payment provider outage$)");
        assert_eq!(summary.test_cases.len(), 3);
    }

    #[test]
    fn list_human() {
        let tracker = shop_tracker(&[("SHOP-2", "adds item")]);
        let mut output_writer = OutputWriter::new_test();

        exec(
            &["tickettest", "list", "SHOP-1", "--no-linked"],
            test_config(None, "npx jest"),
            &tracker,
            &mut output_writer,
        )
        .expect("list succeeds");
        assert_eq!(
            output_writer.test_stdout(),
            "SHOP-1: Checkout flow\n    SHOP-2 adds item (subtask)\npattern: adds item$\n"
        );
    }

    #[test]
    fn unsupported_match_mode_fails_before_collecting() {
        let tracker = shop_tracker(&[("SHOP-2", "adds item")]);
        let mut output_writer = OutputWriter::new_test();

        let error = exec(
            &["tickettest", "run", "SHOP-1", "--match-mode", "Title"],
            test_config(None, "npx jest"),
            &tracker,
            &mut output_writer,
        )
        .expect_err("mode is case-sensitive");
        assert_eq!(
            error.process_exit_code(),
            TicketTestExitCode::UNSUPPORTED_MATCH_MODE
        );
        assert_eq!(tracker.fetch_count(), 0);
    }

    #[test]
    fn ticket_not_found() {
        let tracker = shop_tracker(&[]);
        let mut output_writer = OutputWriter::new_test();

        let error = exec(
            &["tickettest", "run", "SHOP-404"],
            test_config(None, "npx jest"),
            &tracker,
            &mut output_writer,
        )
        .expect_err("ticket doesn't exist");
        assert_eq!(error.process_exit_code(), TicketTestExitCode::TICKET_NOT_FOUND);
    }

    #[test]
    fn no_test_cases_skips_runner() {
        let tracker = shop_tracker(&[("SHOP-2", "adds item")]);
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let report_path = dir.path().join("report.json");
        let mut output_writer = OutputWriter::new_test();

        // The runner command doesn't exist, so invoking it would fail.
        let code = exec(
            &["tickettest", "run", "SHOP-1", "--no-subtasks", "--no-linked"],
            test_config(Some(report_path.clone()), "tickettest-no-such-runner"),
            &tracker,
            &mut output_writer,
        )
        .expect("run succeeds");
        assert_eq!(code, TicketTestExitCode::NO_TEST_CASES);

        let report: RunReport = serde_json::from_str(
            &std::fs::read_to_string(&report_path).expect("report written"),
        )
        .expect("report parsed");
        assert_eq!(report.pattern, "");
        assert_eq!(report.runner, None);
        assert!(tracker.comments().is_empty());
        assert!(
            output_writer
                .test_stderr()
                .contains("Collected 0 test cases from SHOP-1"),
            "{}",
            output_writer.test_stderr()
        );
    }

    #[cfg(unix)]
    #[test_case(
        &[("SHOP-2", "adds item"), ("SHOP-3", "removes item")],
        TicketTestExitCode::TEST_RUN_FAILED;
        "failed test case"
    )]
    #[test_case(
        &[("SHOP-2", "adds item"), ("SHOP-4", "charges card")],
        TicketTestExitCode::OK;
        "all passed"
    )]
    #[test_case(
        &[("SHOP-2", "adds item"), ("SHOP-6", "refunds order")],
        TicketTestExitCode::TEST_CASES_UNMATCHED;
        "unmatched test case"
    )]
    fn run_with_fake_runner(subtasks: &[(&str, &str)], expected_code: i32) {
        let workspace_root = Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .expect("crate has a parent directory");
        let runner_command = format!(
            "sh '{}' '{}'",
            workspace_root.join("tickettest-runner/test-helpers/fake-jest.sh"),
            workspace_root.join("fixtures/jest-output.json"),
        );
        let tracker = shop_tracker(subtasks);
        let mut output_writer = OutputWriter::new_test();

        let result = exec(
            &["tickettest", "run", "SHOP-1", "--no-linked", "--no-report"],
            test_config(None, &runner_command),
            &tracker,
            &mut output_writer,
        );
        let code = result.unwrap_or_else(|error| error.process_exit_code());
        assert_eq!(code, expected_code);

        // One comment per test case, plus the summary.
        assert_eq!(tracker.comments().len(), subtasks.len() + 1);
        let stderr = output_writer.test_stderr();
        assert!(stderr.contains("     Summary ["), "{stderr}");
        assert!(stderr.contains("  SUITE FAIL /work/shop/src/broken.test.js"), "{stderr}");
    }
}
