//! Harness configuration

use bankflow_verify::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::session::Credentials;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding YAML suite specs
    pub specs_dir: PathBuf,

    /// Fixture file (JSON). Built-in fixtures are used when absent.
    pub fixtures: Option<PathBuf>,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Login form input for every session
    pub credentials: Credentials,

    /// Retry policies per flow phase
    pub policies: PhasePolicies,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("tests/specs"),
            fixtures: None,
            output_dir: PathBuf::from("test-results"),
            credentials: Credentials::default(),
            policies: PhasePolicies::default(),
        }
    }
}

/// Retry policy for each verification phase of a transaction flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasePolicies {
    /// Waiting for the login page, the home page and the transaction form
    pub navigation: RetryPolicy,

    /// Waiting for the confirmation page after submit
    pub confirmation: RetryPolicy,

    /// Waiting for the success page after confirm
    pub success: RetryPolicy,

    /// Waiting for the history to reflect the transaction
    pub history: RetryPolicy,
}

impl Default for PhasePolicies {
    fn default() -> Self {
        let page = RetryPolicy::fixed(10, Duration::from_millis(1000))
            .with_attempt_timeout(Some(Duration::from_secs(10)));
        Self {
            navigation: page.clone(),
            confirmation: page.clone(),
            success: page,
            history: RetryPolicy::fixed(8, Duration::from_millis(1000))
                .with_attempt_timeout(Some(Duration::from_secs(5))),
        }
    }
}

impl PhasePolicies {
    /// Same policy for every phase
    pub fn uniform(policy: RetryPolicy) -> Self {
        Self {
            navigation: policy.clone(),
            confirmation: policy.clone(),
            success: policy.clone(),
            history: policy,
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        self.navigation.validate()?;
        self.confirmation.validate()?;
        self.success.validate()?;
        self.history.validate()?;
        Ok(())
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when missing
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.policies.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| E2eError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path of the JSON results file
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("test-results.json")
    }
}
