// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Comment, CommentBlock, Issue, IssueLink, IssueRef, IssueTracker, LinkDirection, Lookup};
use crate::{config::TrackerConfig, errors::TrackerError};
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{Response, StatusCode};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{DeserializeOwned, Visitor},
};
use std::{cell::OnceCell, fmt, str::FromStr, time::Duration};
use tracing::{debug, warn};
use ureq::{Agent, Body};

/// The fields requested when fetching an issue.
const ISSUE_FIELDS: &str = "summary,labels,issuetype,subtasks,issuelinks";

/// The maximum number of characters of an error response body included in errors.
const MAX_ERROR_BODY_CHARS: usize = 512;

static USER_AGENT: &str = concat!("tickettest/", env!("CARGO_PKG_VERSION"));

/// A version of Jira's REST API.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApiVersion {
    /// Version 2, used by Jira Server and Data Center. Comments are plain text.
    V2,

    /// Version 3, used by Jira Cloud. Comments are Atlassian documents.
    V3,
}

impl ApiVersion {
    fn path_segment(self) -> &'static str {
        match self {
            Self::V2 => "2",
            Self::V3 => "3",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.path_segment())
    }
}

/// Which REST API version to use: a fixed one, or whichever the server supports.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ApiVersionSetting {
    /// Probe the server on first use, preferring version 3.
    #[default]
    Auto,

    /// Always use this version.
    Fixed(ApiVersion),
}

impl FromStr for ApiVersionSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "2" => Ok(Self::Fixed(ApiVersion::V2)),
            "3" => Ok(Self::Fixed(ApiVersion::V3)),
            other => Err(format!(
                "unsupported API version `{other}` (expected \"auto\", \"2\" or \"3\")"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ApiVersionSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct V;

        impl Visitor<'_> for V {
            type Value = ApiVersionSetting;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("\"auto\", 2 or 3")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v.to_string())
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v.to_string())
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// Credentials used to authenticate with the tracker.
#[derive(Clone, Default, Eq, PartialEq)]
pub enum Credentials {
    /// A personal access token, sent as `Authorization: Bearer <token>`.
    Bearer {
        /// The token.
        token: String,
    },

    /// An email address and API token, sent as HTTP basic authentication.
    Basic {
        /// The account's email address.
        email: String,

        /// The API token.
        api_token: String,
    },

    /// No credentials.
    #[default]
    Anonymous,
}

impl Credentials {
    /// Returns the value of the `Authorization` header for these credentials, if any.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            Self::Bearer { token } => Some(format!("Bearer {token}")),
            Self::Basic { email, api_token } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{email}:{api_token}"))
            )),
            Self::Anonymous => None,
        }
    }
}

// Secrets are never printed.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("api_token", &"<redacted>")
                .finish(),
            Self::Anonymous => write!(f, "Anonymous"),
        }
    }
}

/// An [`IssueTracker`] that talks to Jira over its REST API.
#[derive(Debug)]
pub struct JiraClient {
    agent: Agent,
    base_url: String,
    authorization: Option<String>,
    api_version: ApiVersionSetting,
    detected_version: OnceCell<ApiVersion>,
}

impl JiraClient {
    /// Creates a new client from the given config.
    ///
    /// No requests are made until the client is used.
    pub fn new(config: &TrackerConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let authorization = config.credentials.authorization_header();
        if authorization.is_none() {
            warn!("no credentials configured for {base_url}: requests will be anonymous");
        }

        Self {
            agent: build_agent(config.timeout),
            base_url,
            authorization,
            api_version: config.api_version,
            detected_version: OnceCell::new(),
        }
    }

    /// The base URL of the tracker, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the REST API version in use, probing the server if necessary.
    ///
    /// The result of probing is remembered for the lifetime of the client.
    pub fn api_version(&self) -> Result<ApiVersion, TrackerError> {
        match self.api_version {
            ApiVersionSetting::Fixed(version) => Ok(version),
            ApiVersionSetting::Auto => {
                if let Some(version) = self.detected_version.get() {
                    return Ok(*version);
                }
                let version = self.detect_api_version()?;
                debug!("detected REST API {version} at {}", self.base_url);
                Ok(*self.detected_version.get_or_init(|| version))
            }
        }
    }

    fn detect_api_version(&self) -> Result<ApiVersion, TrackerError> {
        let v3_status = self.probe(ApiVersion::V3)?;
        if v3_status.is_success() {
            return Ok(ApiVersion::V3);
        }
        let v2_status = self.probe(ApiVersion::V2)?;
        if v2_status.is_success() {
            return Ok(ApiVersion::V2);
        }
        Err(TrackerError::ApiVersionDetection {
            base_url: self.base_url.clone(),
            v3_status,
            v2_status,
        })
    }

    fn probe(&self, version: ApiVersion) -> Result<StatusCode, TrackerError> {
        let url = self.api_url(version, "serverInfo");
        let response = self.get(&url)?;
        Ok(response.status())
    }

    fn api_url(&self, version: ApiVersion, path: &str) -> String {
        format!(
            "{}/rest/api/{}/{path}",
            self.base_url,
            version.path_segment()
        )
    }

    fn issue_url(&self, version: ApiVersion, key: &str, suffix: &str) -> Result<String, TrackerError> {
        if !is_valid_issue_key(key) {
            return Err(TrackerError::InvalidIssueKey {
                key: key.to_owned(),
            });
        }
        Ok(self.api_url(version, &format!("issue/{key}{suffix}")))
    }

    fn get(&self, url: &str) -> Result<Response<Body>, TrackerError> {
        let mut request = self.agent.get(url).header("Accept", "application/json");
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }
        request.call().map_err(|error| TrackerError::Request {
            method: "GET",
            url: url.to_owned(),
            error: Box::new(error),
        })
    }

    fn post_json(&self, url: &str, body: String) -> Result<Response<Body>, TrackerError> {
        let mut request = self
            .agent
            .post(url)
            .header("Accept", "application/json")
            .content_type("application/json");
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }
        request.send(body).map_err(|error| TrackerError::Request {
            method: "POST",
            url: url.to_owned(),
            error: Box::new(error),
        })
    }
}

impl IssueTracker for JiraClient {
    fn fetch_issue(&self, key: &str) -> Result<Lookup<Issue>, TrackerError> {
        let version = self.api_version()?;
        let url = format!("{}?fields={ISSUE_FIELDS}", self.issue_url(version, key, "")?);
        debug!("fetching issue {key}");

        let mut response = self.get(&url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::not_found(key));
        }
        check_status("GET", &url, &mut response)?;

        let body = read_body(&url, &mut response)?;
        let issue: IssueResponse = parse_json(&url, &body)?;
        Ok(Lookup::Found(issue.into_issue()))
    }

    fn add_comment(&self, key: &str, comment: &Comment) -> Result<Lookup<()>, TrackerError> {
        let version = self.api_version()?;
        let url = self.issue_url(version, key, "/comment")?;
        let body = comment_request_body(version, comment).map_err(|error| {
            TrackerError::Serialize {
                url: url.clone(),
                error,
            }
        })?;
        debug!("adding comment to {key}");

        let mut response = self.post_json(&url, body)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::not_found(key));
        }
        check_status("POST", &url, &mut response)?;
        Ok(Lookup::Found(()))
    }
}

/// Returns true if `key` looks like `PROJ-123`: a project key starting with a letter, a dash, and
/// a number.
///
/// Keys end up in URL paths, so anything else is rejected before a request is made.
fn is_valid_issue_key(key: &str) -> bool {
    let Some((project, number)) = key.rsplit_once('-') else {
        return false;
    };
    let mut project_chars = project.chars();
    project_chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && project_chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !number.is_empty()
        && number.bytes().all(|b| b.is_ascii_digit())
}

fn build_agent(timeout: Duration) -> Agent {
    install_crypto_provider();

    let builder = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .user_agent(USER_AGENT);
    #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
    let builder = builder.tls_config(
        ureq::tls::TlsConfig::builder()
            .provider(ureq::tls::TlsProvider::NativeTls)
            .build(),
    );
    builder.build().into()
}

#[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
fn install_crypto_provider() {
    // This fails if a provider is already installed, which is fine.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
fn install_crypto_provider() {}

fn check_status(
    method: &'static str,
    url: &str,
    response: &mut Response<Body>,
) -> Result<(), TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    // The body only adds context here, so failing to read it isn't an error of its own.
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(TrackerError::Status {
        method,
        url: url.to_owned(),
        status,
        body: truncate_body(body.trim()),
    })
}

fn read_body(url: &str, response: &mut Response<Body>) -> Result<String, TrackerError> {
    response
        .body_mut()
        .read_to_string()
        .map_err(|error| TrackerError::ReadBody {
            url: url.to_owned(),
            error: Box::new(error),
        })
}

fn parse_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, TrackerError> {
    let deserializer = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(deserializer).map_err(|error| TrackerError::Deserialize {
        url: url.to_owned(),
        error,
    })
}

fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let truncated: String = chars.by_ref().take(MAX_ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

fn comment_request_body(version: ApiVersion, comment: &Comment) -> serde_json::Result<String> {
    match version {
        ApiVersion::V2 => serde_json::to_string(&CommentRequest {
            body: comment.to_string(),
        }),
        ApiVersion::V3 => serde_json::to_string(&CommentRequest {
            body: AdfDocument::new(comment),
        }),
    }
}

// ---
// Request bodies
// ---

#[derive(Serialize)]
struct CommentRequest<B> {
    body: B,
}

/// A minimal Atlassian document: paragraphs and code blocks of plain text.
#[derive(Serialize)]
struct AdfDocument<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    content: Vec<AdfBlock<'a>>,
}

impl<'a> AdfDocument<'a> {
    fn new(comment: &'a Comment) -> Self {
        let content = comment
            .blocks()
            .iter()
            .map(|block| match block {
                CommentBlock::Paragraph(text) => AdfBlock::new("paragraph", text),
                CommentBlock::Preformatted(text) => AdfBlock::new("codeBlock", text),
            })
            .collect();
        Self {
            kind: "doc",
            version: 1,
            content,
        }
    }
}

#[derive(Serialize)]
struct AdfBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<AdfText<'a>>,
}

impl<'a> AdfBlock<'a> {
    fn new(kind: &'static str, text: &'a str) -> Self {
        // Empty text nodes are rejected by the API.
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![AdfText { kind: "text", text }]
        };
        Self { kind, content }
    }
}

#[derive(Serialize)]
struct AdfText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

// ---
// Response bodies
// ---

#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueFields,
}

impl IssueResponse {
    fn into_issue(self) -> Issue {
        let key = self.key;
        let links = self
            .fields
            .issuelinks
            .into_iter()
            .filter_map(|link| {
                let link_type = link.link_type.name.clone();
                let converted = link.into_link();
                if converted.is_none() {
                    debug!("{key}: ignoring `{link_type}` link with no issue on either end");
                }
                converted
            })
            .collect();

        Issue {
            key,
            summary: self.fields.summary,
            labels: self.fields.labels,
            issue_type: self.fields.issuetype.map(|issue_type| issue_type.name),
            subtasks: self
                .fields
                .subtasks
                .into_iter()
                .map(IssueRefResponse::into_ref)
                .collect(),
            links,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    issuetype: Option<IssueTypeResponse>,
    #[serde(default)]
    subtasks: Vec<IssueRefResponse>,
    #[serde(default)]
    issuelinks: Vec<IssueLinkResponse>,
}

#[derive(Debug, Deserialize)]
struct IssueTypeResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IssueRefResponse {
    key: String,
    #[serde(default)]
    fields: Option<IssueRefFields>,
}

impl IssueRefResponse {
    fn into_ref(self) -> IssueRef {
        IssueRef {
            key: self.key,
            summary: self.fields.and_then(|fields| fields.summary),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueRefFields {
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueLinkResponse {
    #[serde(rename = "type")]
    link_type: LinkTypeResponse,
    #[serde(default)]
    inward_issue: Option<IssueRefResponse>,
    #[serde(default)]
    outward_issue: Option<IssueRefResponse>,
}

impl IssueLinkResponse {
    fn into_link(self) -> Option<IssueLink> {
        let (direction, issue) = match (self.inward_issue, self.outward_issue) {
            (Some(issue), _) => (LinkDirection::Inward, issue),
            (None, Some(issue)) => (LinkDirection::Outward, issue),
            (None, None) => return None,
        };
        Some(IssueLink {
            link_type: self.link_type.name,
            direction,
            issue: issue.into_ref(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LinkTypeResponse {
    name: String,
}
