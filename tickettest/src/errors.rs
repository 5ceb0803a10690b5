// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tickettest_metadata::TicketTestExitCode;
use tickettest_runner::errors::*;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error: something went wrong in tickettest's environment, not in tickettest itself.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: camino::FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("ticket not found")]
    TicketNotFound { key: String },
    #[error("tracker error")]
    TrackerError {
        #[from]
        err: TrackerError,
    },
    #[error("pattern build error")]
    BuildPatternError {
        #[from]
        err: BuildPatternError,
    },
    #[error("runner command parse error")]
    RunnerCommandError {
        #[source]
        err: RunnerError,
    },
    #[error("test runner failed")]
    RunnerFailed {
        #[source]
        err: RunnerError,
    },
    #[error("write report error")]
    WriteReportError {
        #[from]
        err: WriteReportError,
    },
    #[error("error writing {output}")]
    WriteOutputError {
        output: &'static str,
        #[source]
        err: std::io::Error,
    },
    #[error("error serializing output")]
    SerializeOutputError {
        #[source]
        err: serde_json::Error,
    },
    #[error("test run failed")]
    TestRunFailed { failed: usize },
}

impl ExpectedError {
    pub(crate) fn current_dir_failed(err: std::io::Error) -> Self {
        Self::CurrentDirFailed { err }
    }

    pub(crate) fn current_dir_invalid_utf8(err: camino::FromPathBufError) -> Self {
        Self::CurrentDirInvalidUtf8 { err }
    }

    pub(crate) fn ticket_not_found(key: impl Into<String>) -> Self {
        Self::TicketNotFound { key: key.into() }
    }

    pub(crate) fn runner_command(err: RunnerError) -> Self {
        Self::RunnerCommandError { err }
    }

    pub(crate) fn runner_failed(err: RunnerError) -> Self {
        Self::RunnerFailed { err }
    }

    pub(crate) fn write_stdout(err: std::io::Error) -> Self {
        Self::WriteOutputError {
            output: "stdout",
            err,
        }
    }

    pub(crate) fn write_stderr(err: std::io::Error) -> Self {
        Self::WriteOutputError {
            output: "stderr",
            err,
        }
    }

    pub(crate) fn serialize_output(err: serde_json::Error) -> Self {
        Self::SerializeOutputError { err }
    }

    pub(crate) fn test_run_failed(failed: usize) -> Self {
        Self::TestRunFailed { failed }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::RunnerCommandError { .. } => TicketTestExitCode::SETUP_ERROR,
            Self::TicketNotFound { .. } => TicketTestExitCode::TICKET_NOT_FOUND,
            Self::TrackerError { .. } => TicketTestExitCode::TRACKER_ERROR,
            Self::BuildPatternError { .. } => TicketTestExitCode::UNSUPPORTED_MATCH_MODE,
            Self::RunnerFailed { .. } => TicketTestExitCode::RUNNER_FAILED,
            Self::WriteReportError { .. }
            | Self::WriteOutputError { .. }
            | Self::SerializeOutputError { .. } => TicketTestExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed { .. } => TicketTestExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    err.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                match err.config_file() {
                    Some(config_file) => error!(
                        "failed to parse tickettest config at `{}`",
                        config_file.style(styles.bold)
                    ),
                    None => error!("failed to parse tickettest config"),
                }
                Some(err.kind() as &dyn Error)
            }
            Self::TicketNotFound { key } => {
                error!(
                    "ticket `{}` not found in the issue tracker",
                    key.style(styles.bold)
                );
                None
            }
            Self::TrackerError { err } => {
                error!("error communicating with the issue tracker");
                Some(err as &dyn Error)
            }
            Self::BuildPatternError { err } => {
                error!("{err}");
                err.source()
            }
            Self::RunnerCommandError { err } => {
                error!("invalid test runner command");
                Some(err as &dyn Error)
            }
            Self::RunnerFailed { err } => {
                error!("test runner failed");
                Some(err as &dyn Error)
            }
            Self::WriteReportError { err } => {
                error!("failed to write report to `{}`", err.path().style(styles.bold));
                err.source()
            }
            Self::WriteOutputError { output, err } => {
                error!("error writing to {output}");
                Some(err as &dyn Error)
            }
            Self::SerializeOutputError { err } => {
                error!("error serializing output");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed { failed } => {
                error!(
                    "test run failed: {} {} failed",
                    failed.style(styles.bold),
                    tickettest_runner::helpers::plural::test_cases_str(*failed),
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: "tickettest::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
