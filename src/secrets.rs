//! Secret lookup used at setup to obtain the webhook URL

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Fetches a secret value by its resolved resource name
/// (e.g. `projects/p/secrets/webhook/versions/latest`)
pub trait SecretGetter: Send + Sync {
    fn get_secret(&self, resource_name: &str) -> Result<String>;
}

/// In-memory secret store, optionally loaded from a JSON object file
#[derive(Debug, Clone, Default)]
pub struct LocalSecretStore {
    values: HashMap<String, String>,
}

impl LocalSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, resource_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(resource_name.into(), value.into());
        self
    }

    /// Load `{ "<resource name>": "<value>", ... }`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read secrets file {}", path.display()))?;
        let values: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse secrets file {}", path.display()))?;
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SecretGetter for LocalSecretStore {
    fn get_secret(&self, resource_name: &str) -> Result<String> {
        self.values
            .get(resource_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("secret {} not found", resource_name))
    }
}
