//! Front-door configuration: flags, environment, and the desired-state
//! file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use vigil_sync::{ApiClient, PolicyDeclaration, ReconciliationEngine, RunSummary, SyncResult};

/// Configuration failure during startup. Fail fast, with the offending
/// input named.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("API key cannot be empty; pass --api-key or set VIGIL_API_KEY")]
    MissingApiKey,

    #[error("cannot read desired-state file {path}: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse desired-state file {path}: {source}")]
    ParseConfig {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Desired-state file shape: a list of policy declarations.
#[derive(Debug, Deserialize)]
struct DesiredState {
    #[serde(default)]
    alert_policies: Vec<PolicyDeclaration>,
}

/// Validated runtime settings.
#[derive(Debug)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub retention_hours: i64,
    pub declarations: Vec<PolicyDeclaration>,
}

impl Settings {
    /// Load and validate settings.
    pub fn load(
        api_key: Option<&str>,
        base_url: &str,
        config_path: &Path,
        retention_hours: i64,
    ) -> Result<Self, SettingsError> {
        let api_key = api_key.unwrap_or("").trim().to_string();
        if api_key.is_empty() {
            return Err(SettingsError::MissingApiKey);
        }

        let raw = fs::read_to_string(config_path).map_err(|source| SettingsError::ReadConfig {
            path: config_path.display().to_string(),
            source,
        })?;
        let desired: DesiredState =
            serde_yaml::from_str(&raw).map_err(|source| SettingsError::ParseConfig {
                path: config_path.display().to_string(),
                source,
            })?;

        Ok(Self {
            api_key,
            base_url: base_url.to_string(),
            retention_hours,
            declarations: desired.alert_policies,
        })
    }

    /// Run one reconciliation pass against the remote API.
    pub async fn reconcile(&self) -> SyncResult<RunSummary> {
        let client = ApiClient::new(&self.base_url, &self.api_key)?;
        ReconciliationEngine::reconcile(&client, &self.declarations, self.retention_hours).await
    }
}
