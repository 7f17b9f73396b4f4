//! Retry verifier
//!
//! Executes a [`VerificationPlan`], turning "poll until true or give up" into
//! a single deterministic [`VerificationOutcome`]. Attempts are strictly
//! sequential; suspension between them goes through the injected
//! [`Sleeper`] and races the cancellation token.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::backoff::apply_jitter;
use crate::outcome::{Termination, VerificationOutcome};
use crate::plan::VerificationPlan;
use crate::probe::{ConditionProbe, ProbeError, ProbeResult};
use crate::sleeper::{Sleeper, TokioSleeper};

/// Lifecycle of one run. `Success`, `Exhausted` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    Idle,
    Evaluating(u32),
    Retrying(u32),
    Success,
    Exhausted,
    Aborted(Termination),
}

impl VerifierState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerifierState::Success | VerifierState::Exhausted | VerifierState::Aborted(_)
        )
    }
}

impl fmt::Display for VerifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierState::Idle => write!(f, "idle"),
            VerifierState::Evaluating(n) => write!(f, "evaluating({})", n),
            VerifierState::Retrying(n) => write!(f, "retrying({})", n),
            VerifierState::Success => write!(f, "success"),
            VerifierState::Exhausted => write!(f, "exhausted"),
            VerifierState::Aborted(t) => write!(f, "aborted({})", t),
        }
    }
}

/// What a single attempt observed
enum AttemptResult {
    AllHeld,
    NotYet { probe: String, detail: Option<String> },
    Fatal { probe: String, detail: String },
    Cancelled,
}

/// Per-run bookkeeping. Never shared between runs.
struct Run<'a> {
    plan: &'a VerificationPlan,
    started: Instant,
    state: VerifierState,
    last_failure: Option<(String, Option<String>)>,
}

impl<'a> Run<'a> {
    fn new(plan: &'a VerificationPlan) -> Self {
        Self {
            plan,
            started: Instant::now(),
            state: VerifierState::Idle,
            last_failure: None,
        }
    }

    fn transition(&mut self, next: VerifierState) {
        trace!(plan = self.plan.name(), "{} -> {}", self.state, next);
        self.state = next;
    }

    fn succeed(mut self, attempt: u32) -> VerificationOutcome {
        self.transition(VerifierState::Success);
        let elapsed = self.started.elapsed();
        info!(
            "Verification '{}' succeeded on attempt {}/{} ({:?})",
            self.plan.name(),
            attempt,
            self.plan.max_attempts(),
            elapsed
        );
        VerificationOutcome::success(self.plan.name(), attempt, self.plan.max_attempts(), elapsed)
    }

    fn fail(mut self, termination: Termination, attempts_used: u32) -> VerificationOutcome {
        self.transition(match termination {
            Termination::Exhausted => VerifierState::Exhausted,
            other => VerifierState::Aborted(other),
        });
        let elapsed = self.started.elapsed();
        let (failed_probe, detail) = match self.last_failure.take() {
            Some((probe, detail)) => (Some(probe), detail),
            None => (None, None),
        };
        let outcome = VerificationOutcome::failure(
            self.plan.name(),
            termination,
            attempts_used,
            self.plan.max_attempts(),
            failed_probe,
            detail,
            elapsed,
        );
        warn!("Verification failed - {}", outcome);
        outcome
    }
}

/// Stateless executor of verification plans.
///
/// Holds only the sleeper, so one verifier can serve any number of
/// concurrent, unrelated runs.
#[derive(Clone)]
pub struct RetryVerifier {
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryVerifier")
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

impl RetryVerifier {
    /// Verifier that sleeps on tokio timers
    pub fn new() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper<S>(sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        Self {
            sleeper: Arc::new(sleeper),
        }
    }

    pub fn with_shared_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
        Self { sleeper }
    }

    /// Run a plan to completion with no external cancellation.
    pub async fn run(&self, plan: &VerificationPlan) -> VerificationOutcome {
        let token = CancellationToken::new();
        self.run_with_cancel(plan, &token).await
    }

    /// Run a plan, stopping early as `Cancelled` once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        plan: &VerificationPlan,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        let mut run = Run::new(plan);
        let max_attempts = plan.max_attempts();
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return run.fail(Termination::Cancelled, attempt - 1);
            }

            run.transition(VerifierState::Evaluating(attempt));
            match evaluate_attempt(plan, attempt, cancel).await {
                AttemptResult::AllHeld => return run.succeed(attempt),
                AttemptResult::Fatal { probe, detail } => {
                    run.last_failure = Some((probe, Some(detail)));
                    return run.fail(Termination::Fatal, attempt);
                }
                AttemptResult::Cancelled => {
                    return run.fail(Termination::Cancelled, attempt);
                }
                AttemptResult::NotYet { probe, detail } => {
                    run.last_failure = Some((probe, detail));
                }
            }

            if attempt >= max_attempts {
                return run.fail(Termination::Exhausted, attempt);
            }

            let delay = apply_jitter(plan.backoff().delay_for(attempt), plan.jitter());
            run.transition(VerifierState::Retrying(attempt));
            debug!(
                "Verification '{}' attempt {}/{} not yet consistent, retrying in {:?}",
                plan.name(),
                attempt,
                max_attempts,
                delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return run.fail(Termination::Cancelled, attempt);
                }
                _ = self.sleeper.sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

/// Evaluate probes in declared order, stopping at the first that does not hold.
async fn evaluate_attempt(
    plan: &VerificationPlan,
    attempt: u32,
    cancel: &CancellationToken,
) -> AttemptResult {
    for probe in plan.probes() {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return AttemptResult::Cancelled,
            r = evaluate_bounded(probe.as_ref(), plan.attempt_timeout()) => r,
        };

        match result {
            Ok(true) => {
                trace!(plan = plan.name(), attempt, probe = probe.name(), "probe held");
            }
            Ok(false) => {
                debug!(plan = plan.name(), attempt, probe = probe.name(), "probe not satisfied");
                return AttemptResult::NotYet {
                    probe: probe.name().to_string(),
                    detail: None,
                };
            }
            Err(ProbeError::Transient(msg)) => {
                debug!(plan = plan.name(), attempt, probe = probe.name(), "probe transient: {}", msg);
                return AttemptResult::NotYet {
                    probe: probe.name().to_string(),
                    detail: Some(format!("transient: {}", msg)),
                };
            }
            Err(ProbeError::Fatal(msg)) => {
                return AttemptResult::Fatal {
                    probe: probe.name().to_string(),
                    detail: format!("fatal: {}", msg),
                };
            }
        }
    }

    AttemptResult::AllHeld
}

async fn evaluate_bounded(probe: &dyn ConditionProbe, limit: Option<Duration>) -> ProbeResult {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, probe.evaluate()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Transient(format!(
                "evaluation exceeded {:?}",
                limit
            ))),
        },
        None => probe.evaluate().await,
    }
}
