//! Error types for the verification engine

use thiserror::Error;

/// Result type alias using the engine error
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Reasons a plan cannot be run at all.
///
/// Building an un-runnable plan is a programmer error and is reported
/// before any probe is evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanInvalid {
    #[error("verification plan has no probes")]
    NoProbes,

    #[error("max_attempts must be at least 1 (got {0})")]
    ZeroAttempts(u32),

    #[error("probe name must not be empty (position {0})")]
    EmptyProbeName(usize),

    #[error("duplicate probe name: {0}")]
    DuplicateProbe(String),

    #[error("backoff multiplier must be a finite value >= 1.0 (got {0})")]
    InvalidMultiplier(f64),

    #[error("backoff jitter must be within 0.0..=1.0 (got {0})")]
    InvalidJitter(f64),

    #[error("attempt timeout must be greater than zero")]
    ZeroAttemptTimeout,
}

/// Engine error types
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Invalid verification plan: {0}")]
    PlanInvalid(#[from] PlanInvalid),

    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
