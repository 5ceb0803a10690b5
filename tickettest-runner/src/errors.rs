// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by tickettest.

use crate::matcher::MatchMode;
use camino::Utf8PathBuf;
use config::ConfigError;
use http::StatusCode;
use itertools::Itertools;
use std::{error::Error, fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse tickettest config{}", display_config_file(.config_file))]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that was being read, if any.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The issue tracker's base URL wasn't specified anywhere.
    #[error("issue tracker base URL is not set (set `base_url` in the config file, or JIRA_BASE_URL)")]
    MissingBaseUrl,

    /// Only half of the credentials needed for basic authentication were specified.
    #[error("`{present}` is set but `{missing}` is not: basic authentication requires both")]
    IncompleteCredentials {
        /// The key that was set.
        present: &'static str,

        /// The key that was missing.
        missing: &'static str,
    },
}

/// An error returned when a matching mode other than the supported ones is requested.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "unsupported match mode `{mode}` (supported modes: {})",
    MatchMode::variants().iter().join(", "),
)]
pub struct UnsupportedModeError {
    mode: String,
}

impl UnsupportedModeError {
    pub(crate) fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }

    /// Returns the mode that was requested.
    pub fn mode(&self) -> &str {
        &self.mode
    }
}

/// An error returned when a generated test pattern does not compile as a regular expression.
///
/// Titles are escaped before being turned into patterns, so this indicates a bug in tickettest.
#[derive(Clone, Debug, Error)]
#[error("generated test pattern `{pattern}` is not a valid regular expression")]
pub struct PatternConstructionError {
    pattern: String,
    #[source]
    error: regex::Error,
}

impl PatternConstructionError {
    pub(crate) fn new(pattern: impl Into<String>, error: regex::Error) -> Self {
        Self {
            pattern: pattern.into(),
            error,
        }
    }

    /// Returns the pattern that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// An error that occurred while building a test pattern from a list of test cases.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum BuildPatternError {
    /// The requested matching mode isn't supported.
    #[error(transparent)]
    UnsupportedMode(#[from] UnsupportedModeError),

    /// The generated pattern failed to compile.
    #[error(transparent)]
    PatternConstruction(#[from] PatternConstructionError),
}

/// An error that occurred while talking to the issue tracker.
///
/// Issues that don't exist are not errors: they're reported through
/// [`Lookup::NotFound`](crate::tracker::Lookup::NotFound).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    /// Sending the request or receiving the response failed.
    #[error("error sending {method} request to `{url}`")]
    Request {
        /// The HTTP method.
        method: &'static str,

        /// The URL the request was sent to.
        url: String,

        /// The underlying error.
        #[source]
        error: Box<ureq::Error>,
    },

    /// The tracker responded with an unexpected status code.
    #[error("{method} `{url}` returned {status}{}", display_body(.body))]
    Status {
        /// The HTTP method.
        method: &'static str,

        /// The URL the request was sent to.
        url: String,

        /// The status code returned.
        status: StatusCode,

        /// The start of the response body.
        body: String,
    },

    /// Reading the response body failed.
    #[error("error reading response body from `{url}`")]
    ReadBody {
        /// The URL the request was sent to.
        url: String,

        /// The underlying error.
        #[source]
        error: Box<ureq::Error>,
    },

    /// The response body did not have the expected shape.
    #[error("failed to parse response from `{url}`")]
    Deserialize {
        /// The URL the request was sent to.
        url: String,

        /// The underlying error, along with the path to the field that failed.
        #[source]
        error: serde_path_to_error::Error<serde_json::Error>,
    },

    /// Serializing a request body failed.
    #[error("failed to serialize request body for `{url}`")]
    Serialize {
        /// The URL the request was to be sent to.
        url: String,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// An issue key was not of the form `PROJ-123`.
    #[error("`{key}` is not a valid issue key (expected a key like `PROJ-123`)")]
    InvalidIssueKey {
        /// The rejected key.
        key: String,
    },

    /// Neither of the supported REST API versions responded successfully.
    #[error(
        "could not detect the REST API version of the issue tracker at `{base_url}` \
         (v3 returned {v3_status}, v2 returned {v2_status})"
    )]
    ApiVersionDetection {
        /// The base URL of the tracker.
        base_url: String,

        /// The status returned by the v3 probe.
        v3_status: StatusCode,

        /// The status returned by the v2 probe.
        v2_status: StatusCode,
    },
}

/// An error that occurred while invoking the test runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// The configured test runner command is empty.
    #[error("test runner command is empty")]
    EmptyCommand,

    /// The configured test runner command could not be split into arguments.
    #[error("failed to parse test runner command `{command}`")]
    CommandParse {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// Creating a directory for the runner's output failed.
    #[error("failed to create temporary directory for test runner output")]
    TempDir {
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The test runner could not be executed.
    #[error("failed to execute `{command}`")]
    Spawn {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The test runner exited without writing its results file.
    #[error(
        "`{command}` did not write results to `{path}` ({})",
        display_exit_code(.exit_code)
    )]
    MissingOutput {
        /// The command line.
        command: String,

        /// The path the results were expected at.
        path: Utf8PathBuf,

        /// The exit code of the runner, if it exited normally.
        exit_code: Option<i32>,
    },

    /// Reading the results file failed.
    #[error("failed to read test runner output at `{path}`")]
    OutputRead {
        /// The path to the results file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The results file did not have the expected shape.
    #[error("failed to parse test runner output at `{path}`")]
    OutputParse {
        /// The path to the results file.
        path: Utf8PathBuf,

        /// The underlying error, along with the path to the field that failed.
        #[source]
        error: serde_path_to_error::Error<serde_json::Error>,
    },
}

/// An error that occurred while writing the JSON report.
#[derive(Debug, Error)]
#[error("failed to write report to `{path}`")]
pub struct WriteReportError {
    path: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl WriteReportError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// Returns the path that was being written to.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

fn display_config_file(config_file: &Option<Utf8PathBuf>) -> String {
    match config_file {
        Some(file) => format!(" at `{file}`"),
        None => String::new(),
    }
}

fn display_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

fn display_exit_code(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

/// Displays an error along with its chain of sources, on a single line.
///
/// Used where an error is logged rather than propagated, e.g. when posting a comment fails.
pub struct DisplayErrorChain<E>(E);

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

impl<E: fmt::Debug> fmt::Debug for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisplayErrorChain").field(&self.0).finish()
    }
}
