//! Bankflow Verification Engine
//!
//! Polls transient UI state until it reflects a just-submitted action.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RetryVerifier                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  run(plan) / run_with_cancel(plan, token)                    │
//! │    attempt 1..=max_attempts                                  │
//! │      ├── evaluate probes in declared order                   │
//! │      │     ├── Ok(true)        -> next probe                 │
//! │      │     ├── Ok(false)       -> stop attempt, retry        │
//! │      │     ├── Err(Transient)  -> stop attempt, retry        │
//! │      │     └── Err(Fatal)      -> abort run                  │
//! │      └── sleeper.sleep(backoff.delay_for(attempt))           │
//! │  -> VerificationOutcome { termination, attempts_used,        │
//! │                           failed_probe, elapsed }            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod backoff;
pub mod error;
pub mod outcome;
pub mod plan;
pub mod policy;
pub mod probe;
pub mod sleeper;
pub mod verifier;

pub use backoff::Backoff;
pub use error::{PlanInvalid, Result, VerifyError};
pub use outcome::{Termination, VerificationOutcome};
pub use plan::{PlanBuilder, VerificationPlan};
pub use policy::{BackoffKind, RetryPolicy};
pub use probe::{probe, ConditionProbe, FnProbe, ProbeError, ProbeResult};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
pub use verifier::{RetryVerifier, VerifierState};

/// Re-exported so callers do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
