//! Verification outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a verification run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every probe held within one attempt
    Success,
    /// The attempt budget ran out
    Exhausted,
    /// A probe reported a condition that can never hold
    Fatal,
    /// The external cancellation signal was raised
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Success => "success",
            Termination::Exhausted => "exhausted",
            Termination::Fatal => "fatal",
            Termination::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Immutable result of running one plan.
///
/// `failed_probe` is always `None` when the run succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    plan: String,
    termination: Termination,
    attempts_used: u32,
    max_attempts: u32,
    failed_probe: Option<String>,
    detail: Option<String>,
    elapsed: Duration,
}

impl VerificationOutcome {
    pub(crate) fn success(plan: &str, attempts_used: u32, max_attempts: u32, elapsed: Duration) -> Self {
        Self {
            plan: plan.to_string(),
            termination: Termination::Success,
            attempts_used,
            max_attempts,
            failed_probe: None,
            detail: None,
            elapsed,
        }
    }

    pub(crate) fn failure(
        plan: &str,
        termination: Termination,
        attempts_used: u32,
        max_attempts: u32,
        failed_probe: Option<String>,
        detail: Option<String>,
        elapsed: Duration,
    ) -> Self {
        debug_assert!(termination != Termination::Success);
        Self {
            plan: plan.to_string(),
            termination,
            attempts_used,
            max_attempts,
            failed_probe,
            detail,
            elapsed,
        }
    }

    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn succeeded(&self) -> bool {
        self.termination == Termination::Success
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_fatal(&self) -> bool {
        self.termination == Termination::Fatal
    }

    pub fn is_cancelled(&self) -> bool {
        self.termination == Termination::Cancelled
    }

    /// Attempts that began evaluating probes
    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// First probe that failed on the final attempt
    pub fn failed_probe(&self) -> Option<&str> {
        self.failed_probe.as_deref()
    }

    /// Last transient/fatal message reported by the failing probe, if any
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} after {}/{} attempt(s) in {:?}",
            self.plan, self.termination, self.attempts_used, self.max_attempts, self.elapsed
        )?;
        if let Some(probe) = &self.failed_probe {
            write!(f, " (failed probe: {})", probe)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " - {}", detail)?;
        }
        Ok(())
    }
}
