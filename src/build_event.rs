//! Build event model
//!
//! Mirrors the subset of the Cloud Build `Build` resource the notifier reads.
//! Events arrive as JSON with camelCase keys; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Substitution holding the service name
pub const APP_NAME_KEY: &str = "_APP_NAME";
/// Substitution holding the public URL of the deployed service
pub const URL_KEY: &str = "_URL";

/// Build lifecycle status
///
/// Values outside the known set are kept verbatim in `Unrecognized` so they
/// can still be logged and matched by filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    #[default]
    StatusUnknown,
    Pending,
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    Expired,
    Unrecognized(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::StatusUnknown => "STATUS_UNKNOWN",
            BuildStatus::Pending => "PENDING",
            BuildStatus::Queued => "QUEUED",
            BuildStatus::Working => "WORKING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::InternalError => "INTERNAL_ERROR",
            BuildStatus::Timeout => "TIMEOUT",
            BuildStatus::Cancelled => "CANCELLED",
            BuildStatus::Expired => "EXPIRED",
            BuildStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(value: &str) -> Self {
        match value {
            "STATUS_UNKNOWN" => BuildStatus::StatusUnknown,
            "PENDING" => BuildStatus::Pending,
            "QUEUED" => BuildStatus::Queued,
            "WORKING" => BuildStatus::Working,
            "SUCCESS" => BuildStatus::Success,
            "FAILURE" => BuildStatus::Failure,
            "INTERNAL_ERROR" => BuildStatus::InternalError,
            "TIMEOUT" => BuildStatus::Timeout,
            "CANCELLED" => BuildStatus::Cancelled,
            "EXPIRED" => BuildStatus::Expired,
            other => BuildStatus::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        BuildStatus::from(value.as_str())
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source repository reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSource {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

/// Where the build sources came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_source: Option<RepoSource>,
}

/// One build run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEvent {
    /// Build ID
    #[serde(default)]
    pub id: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: BuildStatus,
    /// Project the build ran in
    #[serde(default)]
    pub project_id: String,
    /// Link to the build logs
    #[serde(default)]
    pub log_url: String,
    /// User-defined substitutions (`_APP_NAME`, `_URL`, ...)
    #[serde(default)]
    pub substitutions: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BuildSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
}

impl BuildEvent {
    pub fn new(id: impl Into<String>, status: BuildStatus) -> Self {
        Self {
            id: id.into(),
            status,
            ..Default::default()
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_log_url(mut self, log_url: impl Into<String>) -> Self {
        self.log_url = log_url.into();
        self
    }

    pub fn with_substitution(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(key.into(), value.into());
        self
    }

    pub fn with_repo_name(mut self, repo_name: impl Into<String>) -> Self {
        self.source = Some(BuildSource {
            repo_source: Some(RepoSource {
                repo_name: repo_name.into(),
                ..Default::default()
            }),
        });
        self
    }

    /// Substitution value, empty when the key is absent
    pub fn substitution(&self, key: &str) -> &str {
        self.substitutions.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn app_name(&self) -> &str {
        self.substitution(APP_NAME_KEY)
    }

    pub fn access_url(&self) -> &str {
        self.substitution(URL_KEY)
    }

    pub fn repo_source(&self) -> Option<&RepoSource> {
        self.source.as_ref().and_then(|s| s.repo_source.as_ref())
    }

    /// Repository name, `None` when there is no repo source or the name is empty
    pub fn repo_name(&self) -> Option<&str> {
        self.repo_source()
            .map(|r| r.repo_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Wall-clock duration of a finished build
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }

    /// Parse a single event from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
