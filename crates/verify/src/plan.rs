//! Verification plans
//!
//! A plan is the ordered set of probes plus the retry budget and timing that
//! define what "eventually consistent" means for one verification call.
//! Probes should be declared from coarse precondition to fine postcondition
//! so the first failing probe names the most actionable cause.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::error::PlanInvalid;
use crate::probe::ConditionProbe;

/// Immutable, validated verification plan.
pub struct VerificationPlan {
    name: String,
    probes: Vec<Box<dyn ConditionProbe>>,
    max_attempts: u32,
    backoff: Backoff,
    jitter: f64,
    attempt_timeout: Option<Duration>,
}

impl fmt::Debug for VerificationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationPlan")
            .field("name", &self.name)
            .field("probes", &self.probe_names())
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl VerificationPlan {
    pub fn builder(name: impl Into<String>) -> PlanBuilder {
        PlanBuilder::new(name)
    }

    /// Plan label used in logs and reports
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probes(&self) -> &[Box<dyn ConditionProbe>] {
        &self.probes
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }
}

/// Builder for [`VerificationPlan`]. Validation happens in [`build`](Self::build).
pub struct PlanBuilder {
    name: String,
    probes: Vec<Box<dyn ConditionProbe>>,
    max_attempts: u32,
    backoff: Backoff,
    jitter: f64,
    attempt_timeout: Option<Duration>,
}

impl PlanBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probes: Vec::new(),
            max_attempts: 8,
            backoff: Backoff::default(),
            jitter: 0.0,
            attempt_timeout: None,
        }
    }

    /// Append a probe. Probes are evaluated in the order they are added.
    pub fn probe<P>(mut self, probe: P) -> Self
    where
        P: ConditionProbe + 'static,
    {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn boxed_probe(mut self, probe: Box<dyn ConditionProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn probes<I>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn ConditionProbe>>,
    {
        self.probes.extend(probes);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Shorthand for a fixed inter-attempt delay
    pub fn delay(mut self, delay: Duration) -> Self {
        self.backoff = Backoff::Fixed(delay);
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Randomly shorten each delay by up to `fraction` (0.0..=1.0).
    pub fn jitter(mut self, fraction: f64) -> Self {
        self.jitter = fraction;
        self
    }

    /// Bound a single probe evaluation; exceeding it counts as transient.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<VerificationPlan, PlanInvalid> {
        if self.probes.is_empty() {
            return Err(PlanInvalid::NoProbes);
        }
        if self.max_attempts == 0 {
            return Err(PlanInvalid::ZeroAttempts(self.max_attempts));
        }

        let mut seen = HashSet::new();
        for (i, p) in self.probes.iter().enumerate() {
            if p.name().is_empty() {
                return Err(PlanInvalid::EmptyProbeName(i));
            }
            if !seen.insert(p.name()) {
                return Err(PlanInvalid::DuplicateProbe(p.name().to_string()));
            }
        }

        self.backoff.validate()?;
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(PlanInvalid::InvalidJitter(self.jitter));
        }
        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(PlanInvalid::ZeroAttemptTimeout);
        }

        Ok(VerificationPlan {
            name: self.name,
            probes: self.probes,
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            jitter: self.jitter,
            attempt_timeout: self.attempt_timeout,
        })
    }
}
