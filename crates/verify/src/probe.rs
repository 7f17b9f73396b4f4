//! Condition probes
//!
//! A probe is one observable fact about current UI state. Evaluating it must
//! not advance application state: no form submission, no clicks.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Failure signalled by a probe that could not produce a boolean.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The check could not complete right now (element lookup timed out,
    /// page still rendering). Treated exactly like `Ok(false)`.
    #[error("transient: {0}")]
    Transient(String),

    /// The condition can never become true (structurally absent page,
    /// malformed descriptor). Aborts the remaining attempts.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ProbeError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Result of a single probe evaluation
pub type ProbeResult = Result<bool, ProbeError>;

/// A single, idempotent, side-effect-free check against live UI state.
#[async_trait]
pub trait ConditionProbe: Send + Sync {
    /// Identifier used in diagnostics and as `failed_probe` in outcomes.
    fn name(&self) -> &str;

    /// `Ok(true)` if the condition currently holds, `Ok(false)` if not.
    async fn evaluate(&self) -> ProbeResult;
}

/// Probe backed by an async closure.
pub struct FnProbe<F> {
    name: String,
    check: F,
}

impl<F> fmt::Debug for FnProbe<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProbe").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> ConditionProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self) -> ProbeResult {
        (self.check)().await
    }
}

/// Build a probe from a name and an async closure.
///
/// ```
/// use bankflow_verify::probe;
///
/// let visible = probe("history-visible", || async { Ok(true) });
/// ```
pub fn probe<F, Fut>(name: impl Into<String>, check: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send,
{
    FnProbe {
        name: name.into(),
        check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fn_probe_reports_name_and_value() {
        let p = probe("section-visible", || async { Ok(true) });
        assert_eq!(p.name(), "section-visible");
        assert_eq!(p.evaluate().await, Ok(true));
    }

    #[tokio::test]
    async fn test_fn_probe_is_reevaluated_each_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let p = probe("counting", move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 1) }
        });

        assert_eq!(p.evaluate().await, Ok(false));
        assert_eq!(p.evaluate().await, Ok(true));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_probe_error_kinds() {
        assert!(ProbeError::fatal("page missing").is_fatal());
        assert!(!ProbeError::transient("lookup timed out").is_fatal());
        assert_eq!(
            ProbeError::transient("lookup timed out").to_string(),
            "transient: lookup timed out"
        );
    }
}
