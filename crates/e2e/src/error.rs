//! Error types for banking flow verification

use bankflow_verify::{PlanInvalid, VerificationOutcome, VerifyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("UI action failed: {action} - {reason}")]
    UiAction { action: String, reason: String },

    #[error("Suite spec parse error: {0}")]
    SpecParse(String),

    #[error("Fixture not found: {0}")]
    FixtureNotFound(String),

    #[error("Invalid fixture '{name}': {reason}")]
    InvalidFixture { name: String, reason: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(Box<VerificationOutcome>),

    #[error("Flow cancelled before {0}")]
    Cancelled(String),

    #[error("Invalid verification plan: {0}")]
    Plan(#[from] PlanInvalid),

    #[error("Verification engine error: {0}")]
    Verify(#[from] VerifyError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl E2eError {
    pub fn ui(action: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::UiAction {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
