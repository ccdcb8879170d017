//! Notifier configuration
//!
//! Loaded once at startup from a JSON file. Default location:
//! `<config_dir>/build-notifier/config.json`.
//!
//! ```json
//! {
//!   "apiVersion": "cloud-build-notifiers/v1",
//!   "kind": "DiscordNotifier",
//!   "metadata": { "name": "deploys" },
//!   "spec": {
//!     "notification": {
//!       "filter": "build.status == Build.Status.SUCCESS",
//!       "delivery": { "webhookUrl": { "secretRef": "webhook-url" } }
//!     },
//!     "secrets": [
//!       { "name": "webhook-url", "value": "projects/p/secrets/discord/versions/latest" }
//!     ]
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::NotifierError;

/// Delivery field holding the webhook URL secret reference
pub const WEBHOOK_URL_SECRET_NAME: &str = "webhookUrl";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierConfig {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: Spec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    pub notification: NotificationSpec,
    #[serde(default)]
    pub secrets: Vec<SecretConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationSpec {
    /// Events matching this expression are not delivered
    #[serde(default)]
    pub filter: String,
    /// Free-form delivery settings; secret-backed fields look like
    /// `{ "<field>": { "secretRef": "<secret name>" } }`
    #[serde(default)]
    pub delivery: HashMap<String, serde_json::Value>,
}

/// Maps a local secret name to a secret-store resource name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    pub name: String,
    pub value: String,
}

impl NotifierConfig {
    /// Default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("build-notifier")
            .join("config.json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Filter expression, `None` when unset or blank
    pub fn filter_expression(&self) -> Option<&str> {
        let filter = self.spec.notification.filter.trim();
        if filter.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    /// Secret name referenced by a delivery field
    pub fn secret_ref(&self, field: &str) -> Result<&str, NotifierError> {
        self.spec
            .notification
            .delivery
            .get(field)
            .and_then(|v| v.get("secretRef"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NotifierError::MissingSecretRef {
                field: field.to_string(),
            })
    }

    /// Resource name of the secret with the given local name
    pub fn find_secret_resource_name(&self, name: &str) -> Result<&str, NotifierError> {
        self.spec
            .secrets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value.as_str())
            .ok_or_else(|| NotifierError::UnresolvedSecret {
                name: name.to_string(),
            })
    }
}
