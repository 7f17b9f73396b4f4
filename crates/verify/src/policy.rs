//! Serializable retry policies
//!
//! A policy is the plain-data form of a plan's retry budget and timing, so it
//! can live in configuration files and be applied to any [`PlanBuilder`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff::Backoff;
use crate::error::{PlanInvalid, Result, VerifyError};
use crate::plan::PlanBuilder;

/// Shape of the delay schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

/// Retry budget and timing for one kind of verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts (>= 1)
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub delay_ms: u64,

    /// How the delay evolves across attempts
    pub backoff: BackoffKind,

    /// Linear: added per attempt. Ignored otherwise.
    pub step_ms: u64,

    /// Exponential: growth factor. Ignored otherwise.
    pub multiplier: f64,

    /// Upper bound on any single delay
    pub max_delay_ms: Option<u64>,

    /// Fraction (0.0 - 1.0) by which a delay may be randomly shortened
    pub jitter: f64,

    /// Upper bound on a single probe evaluation
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            delay_ms: 1000,
            backoff: BackoffKind::Fixed,
            step_ms: 0,
            multiplier: 2.0,
            max_delay_ms: None,
            jitter: 0.0,
            attempt_timeout_ms: Some(5000),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn exponential(max_attempts: u32, initial: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            delay_ms: initial.as_millis() as u64,
            backoff: BackoffKind::Exponential,
            multiplier,
            ..Default::default()
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay_ms = Some(max.as_millis() as u64);
        self
    }

    /// Delay schedule described by this policy
    pub fn to_backoff(&self) -> Backoff {
        let initial = Duration::from_millis(self.delay_ms);
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed(initial),
            BackoffKind::Linear => Backoff::linear(initial, Duration::from_millis(self.step_ms)),
            BackoffKind::Exponential => Backoff::exponential(initial, self.multiplier),
        };
        match self.max_delay_ms {
            Some(max) => backoff.with_max(Duration::from_millis(max)),
            None => backoff,
        }
    }

    /// Copy budget and timing onto a plan builder
    pub fn apply(&self, builder: PlanBuilder) -> PlanBuilder {
        let builder = builder
            .max_attempts(self.max_attempts)
            .backoff(self.to_backoff())
            .jitter(self.jitter);
        match self.attempt_timeout_ms {
            Some(ms) => builder.attempt_timeout(Duration::from_millis(ms)),
            None => builder,
        }
    }

    /// Check the policy without building a plan
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(PlanInvalid::ZeroAttempts(0).into());
        }
        self.to_backoff().validate()?;
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(PlanInvalid::InvalidJitter(self.jitter).into());
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err(VerifyError::InvalidPolicy(
                "attempt_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a policy from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Worst-case time spent sleeping if every attempt fails
    pub fn worst_case_sleep(&self) -> Duration {
        let backoff = self.to_backoff();
        (1..self.max_attempts)
            .map(|a| backoff.delay_for(a))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}
