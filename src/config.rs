use crate::errors::*;
use crate::retry::Backoff;
use crate::stack::SchemaVersion;
use crate::status::Settings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Operator configuration. Every field has a default, so an empty file is valid.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Schema version stacks are upgraded to.
    pub target_version: SchemaVersion,
    pub reconcile_interval_secs: u64,
    pub error_requeue_secs: u64,
    /// Upper bound for each phase of a reconciliation talking to the API server.
    pub api_timeout_secs: u64,
    /// Backoff for conflicting schema upgrade writes.
    pub retry: Backoff,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_version: SchemaVersion::LATEST,
            reconcile_interval_secs: 300,
            error_requeue_secs: 60,
            api_timeout_secs: 30,
            retry: Backoff::default(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .chain_err(|| format!("failed to read config {}", p.display()))?;
                Self::from_yaml(&raw)
                    .chain_err(|| format!("failed to parse config {}", p.display()))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // serde_yaml rejects an empty document
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            target_version: self.target_version,
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}
