// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tickettest configuration.
//!
//! Configuration is layered, from lowest to highest priority:
//!
//! 1. the [default config](TicketTestConfig::DEFAULT_CONFIG) embedded in tickettest;
//! 2. a config file, `.config/tickettest.toml` by default;
//! 3. `JIRA_*` environment variables for tracker settings;
//! 4. `TICKETTEST_<SECTION>__<KEY>` environment variables for everything else.
//!
//! Command-line arguments are applied on top by the caller.

use crate::{
    collect::CollectOptions,
    errors::{ConfigParseError, ConfigParseErrorKind},
    tracker::{ApiVersionSetting, Credentials},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::{debug, warn};

/// Environment variables read for tracker settings, along with their config keys.
const TRACKER_ENV_VARS: &[&str] = &[
    "JIRA_BASE_URL",
    "JIRA_EMAIL",
    "JIRA_API_TOKEN",
    "JIRA_BEARER_TOKEN",
    "JIRA_API_VERSION",
    "JIRA_TIMEOUT",
];

/// Keys read from `TICKETTEST_*` environment variables as comma-separated lists.
const LIST_KEYS: &[&str] = &["runner.args", "collect.link_types", "collect.labels"];

/// Resolved tickettest configuration.
#[derive(Clone, Debug)]
pub struct TicketTestConfig {
    /// How to connect to the issue tracker.
    pub tracker: TrackerConfig,

    /// How to invoke the test runner.
    pub runner: RunnerConfig,

    /// Which related issues become test cases.
    pub collect: CollectOptions,

    /// What to do with the results.
    pub report: ReportConfig,
}

impl TicketTestConfig {
    /// The default location of the config file, relative to the current directory.
    pub const CONFIG_PATH: &'static str = ".config/tickettest.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a `_`.
    pub const ENVIRONMENT_PREFIX: &'static str = "TICKETTEST";

    /// Tracker settings in the environment use this prefix, plus a `_`.
    pub const TRACKER_ENVIRONMENT_PREFIX: &'static str = "JIRA";

    /// Reads the config from the given file, or if not specified from `.config/tickettest.toml`
    /// in `cwd`, and from the environment.
    ///
    /// A config file passed in explicitly must exist. The default config file is optional.
    pub fn from_sources(
        cwd: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(
            cwd,
            config_file,
            std::env::vars(),
            |config_file, unknown| {
                let mut unknown_str = String::new();
                if unknown.len() == 1 {
                    // Print this on the same line.
                    unknown_str.push(' ');
                    unknown_str.extend(unknown.iter().map(String::as_str));
                } else {
                    for ignored_key in unknown {
                        unknown_str.push_str("\n  - ");
                        unknown_str.push_str(ignored_key);
                    }
                }

                match config_file {
                    Some(config_file) => warn!(
                        "ignoring unknown configuration keys in config file {config_file}:{unknown_str}"
                    ),
                    None => warn!("ignoring unknown configuration keys:{unknown_str}"),
                }
            },
        )
    }

    // The environment and unknown_callback are passed in so that tests don't depend on the
    // process environment.
    fn from_sources_impl(
        cwd: &Utf8Path,
        config_file: Option<&Utf8Path>,
        env: impl IntoIterator<Item = (String, String)>,
        mut unknown_callback: impl FnMut(Option<&Utf8Path>, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let (file, required) = match config_file {
            Some(config_file) => (cwd.join(config_file), true),
            None => (cwd.join(Self::CONFIG_PATH), false),
        };
        let reported_file = (required || file.exists()).then(|| file.clone());
        debug!(
            "reading config from {file} ({})",
            if required { "required" } else { "optional" }
        );

        let (tracker_env, tickettest_env) = split_env(env);
        let builder = Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::new(file.as_str(), FileFormat::Toml).required(required))
            .add_source(
                Environment::with_prefix(Self::TRACKER_ENVIRONMENT_PREFIX).source(Some(tracker_env)),
            )
            .add_source(tickettest_environment().source(Some(tickettest_env)));

        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(reported_file.clone(), kind))?;
        if !unknown.is_empty() {
            unknown_callback(reported_file.as_deref(), &unknown);
        }

        deserialized
            .into_config()
            .map_err(|kind| ConfigParseError::new(reported_file, kind))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ConfigDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // serde_path_to_error already reports the key, so drop it from the config error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// How to connect to the issue tracker.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// The tracker's base URL, e.g. `https://example.atlassian.net`.
    pub base_url: String,

    /// Credentials used to authenticate.
    pub credentials: Credentials,

    /// Which REST API version to use.
    pub api_version: ApiVersionSetting,

    /// The timeout for each request.
    pub timeout: Duration,
}

/// How to invoke the test runner.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RunnerConfig {
    /// The runner command line, e.g. `npx jest`.
    pub command: String,

    /// Extra arguments passed before the name filter.
    #[serde(default)]
    pub args: Vec<String>,
}

/// What to do with the results of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportConfig {
    /// Where to write the JSON report, or `None` to not write one.
    pub path: Option<Utf8PathBuf>,

    /// Whether to post results back to the tracker as comments.
    pub comment: bool,
}

fn tickettest_environment() -> Environment {
    LIST_KEYS.iter().fold(
        Environment::with_prefix(TicketTestConfig::ENVIRONMENT_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
        |env, key| env.with_list_parse_key(key),
    )
}

/// Splits the environment into tracker variables and sectioned tickettest variables.
///
/// Other variables with the same prefixes, such as `TICKETTEST_LOG`, aren't configuration and are
/// dropped so that they aren't reported as unknown keys.
fn split_env(
    env: impl IntoIterator<Item = (String, String)>,
) -> (config::Map<String, String>, config::Map<String, String>) {
    let mut tracker = config::Map::new();
    let mut tickettest = config::Map::new();
    let prefix = format!("{}_", TicketTestConfig::ENVIRONMENT_PREFIX);
    for (name, value) in env {
        if TRACKER_ENV_VARS.contains(&name.as_str()) {
            tracker.insert(name, value);
        } else if name
            .strip_prefix(&prefix)
            .is_some_and(|rest| rest.contains("__"))
        {
            tickettest.insert(name, value);
        }
    }
    (tracker, tickettest)
}

#[derive(Deserialize)]
struct ConfigDeserialize {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default)]
    bearer_token: Option<String>,
    #[serde(default)]
    api_version: ApiVersionSetting,
    #[serde(with = "humantime_serde")]
    timeout: Duration,
    runner: RunnerConfig,
    collect: CollectOptions,
    report: ReportDeserialize,
}

impl ConfigDeserialize {
    fn into_config(self) -> Result<TicketTestConfig, ConfigParseErrorKind> {
        let base_url = non_empty(self.base_url).ok_or(ConfigParseErrorKind::MissingBaseUrl)?;
        let credentials = resolve_credentials(
            non_empty(self.email),
            non_empty(self.api_token),
            non_empty(self.bearer_token),
        )?;

        Ok(TicketTestConfig {
            tracker: TrackerConfig {
                base_url,
                credentials,
                api_version: self.api_version,
                timeout: self.timeout,
            },
            runner: self.runner,
            collect: self.collect,
            report: ReportConfig {
                path: non_empty(self.report.path).map(Utf8PathBuf::from),
                comment: self.report.comment,
            },
        })
    }
}

#[derive(Deserialize)]
struct ReportDeserialize {
    #[serde(default)]
    path: Option<String>,
    comment: bool,
}

fn resolve_credentials(
    email: Option<String>,
    api_token: Option<String>,
    bearer_token: Option<String>,
) -> Result<Credentials, ConfigParseErrorKind> {
    if let Some(token) = bearer_token {
        if email.is_some() || api_token.is_some() {
            debug!("bearer_token is set: ignoring email and api_token");
        }
        return Ok(Credentials::Bearer { token });
    }

    match (email, api_token) {
        (Some(email), Some(api_token)) => Ok(Credentials::Basic { email, api_token }),
        (Some(_), None) => Err(ConfigParseErrorKind::IncompleteCredentials {
            present: "email",
            missing: "api_token",
        }),
        (None, Some(_)) => Err(ConfigParseErrorKind::IncompleteCredentials {
            present: "api_token",
            missing: "email",
        }),
        (None, None) => Ok(Credentials::Anonymous),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::ApiVersion;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn temp_dir() -> Utf8TempDir {
        camino_tempfile::Builder::new()
            .prefix("tickettest-config-")
            .tempdir()
            .expect("created temp dir")
    }

    fn write_default_config_file(dir: &Utf8Path, contents: &str) {
        let config_dir = dir.join(".config");
        fs::create_dir_all(&config_dir).expect("created .config");
        fs::write(config_dir.join("tickettest.toml"), contents).expect("wrote config");
    }

    fn env(vars: &[(&str, &str)]) -> Vec<(String, String)> {
        vars.iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect()
    }

    fn load(
        dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
        vars: &[(&str, &str)],
    ) -> Result<(TicketTestConfig, BTreeSet<String>), ConfigParseError> {
        let mut unknown = BTreeSet::new();
        let config = TicketTestConfig::from_sources_impl(dir, config_file, env(vars), |_, keys| {
            unknown.extend(keys.iter().cloned());
        })?;
        Ok((config, unknown))
    }

    #[test]
    fn defaults_with_env_base_url() {
        let dir = temp_dir();
        let (config, unknown) = load(
            dir.path(),
            None,
            &[
                ("JIRA_BASE_URL", "https://example.atlassian.net"),
                ("TICKETTEST_LOG", "debug"),
                ("PATH", "/usr/bin"),
            ],
        )
        .expect("config is valid");

        assert!(unknown.is_empty(), "unknown keys: {unknown:?}");
        assert_eq!(config.tracker.base_url, "https://example.atlassian.net");
        assert_eq!(config.tracker.credentials, Credentials::Anonymous);
        assert_eq!(config.tracker.api_version, ApiVersionSetting::Auto);
        assert_eq!(config.tracker.timeout, Duration::from_secs(30));
        assert_eq!(
            config.runner,
            RunnerConfig {
                command: "npx jest".to_owned(),
                args: Vec::new(),
            }
        );
        assert_eq!(config.collect, CollectOptions::default());
        assert_eq!(
            config.report,
            ReportConfig {
                path: Some("tickettest-report.json".into()),
                comment: true,
            }
        );
    }

    #[test]
    fn file_then_env() {
        let dir = temp_dir();
        write_default_config_file(
            dir.path(),
            indoc! {r#"
                base_url = "https://jira.example.com/"
                email = "qa@example.com"
                api_token = "from-file"
                api_version = 2
                timeout = "1m 30s"

                [runner]
                command = "yarn jest"
                args = ["--ci"]

                [collect]
                include_linked = false
                labels = ["smoke"]

                [report]
                path = ""
                comment = false
            "#},
        );

        let (config, unknown) = load(
            dir.path(),
            None,
            &[
                ("JIRA_API_TOKEN", "from-env"),
                ("TICKETTEST_RUNNER__ARGS", "--runInBand,--silent"),
                ("TICKETTEST_COLLECT__LINK_TYPES", "Tests,Verifies"),
                ("TICKETTEST_REPORT__COMMENT", "true"),
            ],
        )
        .expect("config is valid");

        assert!(unknown.is_empty(), "unknown keys: {unknown:?}");
        assert_eq!(config.tracker.base_url, "https://jira.example.com/");
        assert_eq!(
            config.tracker.credentials,
            Credentials::Basic {
                email: "qa@example.com".to_owned(),
                api_token: "from-env".to_owned(),
            }
        );
        assert_eq!(
            config.tracker.api_version,
            ApiVersionSetting::Fixed(ApiVersion::V2)
        );
        assert_eq!(config.tracker.timeout, Duration::from_secs(90));
        assert_eq!(config.runner.command, "yarn jest");
        assert_eq!(config.runner.args, ["--runInBand", "--silent"]);
        assert_eq!(
            config.collect,
            CollectOptions {
                include_subtasks: true,
                include_linked: false,
                link_types: vec!["Tests".to_owned(), "Verifies".to_owned()],
                labels: vec!["smoke".to_owned()],
            }
        );
        assert_eq!(
            config.report,
            ReportConfig {
                path: None,
                comment: true,
            }
        );
    }

    #[test]
    fn bearer_token_takes_precedence() {
        let dir = temp_dir();
        let (config, _) = load(
            dir.path(),
            None,
            &[
                ("JIRA_BASE_URL", "https://jira.example.com"),
                ("JIRA_EMAIL", "qa@example.com"),
                ("JIRA_BEARER_TOKEN", "pat-123"),
            ],
        )
        .expect("config is valid");
        assert_eq!(
            config.tracker.credentials,
            Credentials::Bearer {
                token: "pat-123".to_owned(),
            }
        );
    }

    #[test]
    fn unknown_keys_are_reported() {
        let dir = temp_dir();
        write_default_config_file(
            dir.path(),
            indoc! {r#"
                base_url = "https://jira.example.com"
                retries = 3

                [runner]
                command = "npx jest"
                shell = "bash"
            "#},
        );

        let (_, unknown) = load(dir.path(), None, &[]).expect("config is valid");
        assert_eq!(
            unknown,
            BTreeSet::from(["retries".to_owned(), "runner.shell".to_owned()])
        );
    }

    #[test]
    fn explicit_config_file() {
        let dir = temp_dir();
        fs::write(
            dir.path().join("ci.toml"),
            "base_url = \"https://ci.example.com\"\n",
        )
        .expect("wrote config");
        // Ignored when a config file is passed in.
        write_default_config_file(dir.path(), "base_url = \"https://default.example.com\"\n");

        let (config, _) = load(dir.path(), Some(Utf8Path::new("ci.toml")), &[])
            .expect("config is valid");
        assert_eq!(config.tracker.base_url, "https://ci.example.com");

        let error = load(dir.path(), Some(Utf8Path::new("missing.toml")), &[])
            .expect_err("missing config file is an error");
        assert_eq!(error.config_file(), Some(&dir.path().join("missing.toml")));
        assert!(matches!(error.kind(), ConfigParseErrorKind::BuildError(_)));
    }

    #[test]
    fn missing_base_url() {
        let dir = temp_dir();
        let error = load(dir.path(), None, &[("JIRA_BASE_URL", "  ")])
            .expect_err("base URL is required");
        assert!(matches!(error.kind(), ConfigParseErrorKind::MissingBaseUrl));
        assert_eq!(error.config_file(), None);
    }

    #[test]
    fn incomplete_credentials() {
        let dir = temp_dir();
        let error = load(
            dir.path(),
            None,
            &[
                ("JIRA_BASE_URL", "https://jira.example.com"),
                ("JIRA_API_TOKEN", "s3cret"),
            ],
        )
        .expect_err("email is missing");
        assert!(matches!(
            error.kind(),
            ConfigParseErrorKind::IncompleteCredentials {
                present: "api_token",
                missing: "email",
            }
        ));
    }

    #[test]
    fn deserialize_error_has_path() {
        let dir = temp_dir();
        write_default_config_file(
            dir.path(),
            indoc! {r#"
                base_url = "https://jira.example.com"

                [collect]
                include_subtasks = "sometimes"
            "#},
        );

        let error = load(dir.path(), None, &[]).expect_err("invalid boolean");
        assert_eq!(
            error.config_file(),
            Some(&dir.path().join(TicketTestConfig::CONFIG_PATH))
        );
        match error.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "collect.include_subtasks");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn invalid_timeout() {
        let dir = temp_dir();
        let error = load(
            dir.path(),
            None,
            &[
                ("JIRA_BASE_URL", "https://jira.example.com"),
                ("JIRA_TIMEOUT", "soon"),
            ],
        )
        .expect_err("invalid timeout");
        match error.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "timeout");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
