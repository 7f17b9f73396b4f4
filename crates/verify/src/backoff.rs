//! Delay schedules between verification attempts

use rand::Rng;
use std::time::Duration;

use crate::error::PlanInvalid;

/// Delay applied after a failed attempt, before the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay after every attempt
    Fixed(Duration),

    /// `initial + step * (attempt - 1)`, optionally capped
    Linear {
        initial: Duration,
        step: Duration,
        max: Option<Duration>,
    },

    /// `initial * multiplier^(attempt - 1)`, optionally capped
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Option<Duration>,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_secs(1))
    }
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed(delay)
    }

    pub fn linear(initial: Duration, step: Duration) -> Self {
        Backoff::Linear {
            initial,
            step,
            max: None,
        }
    }

    pub fn exponential(initial: Duration, multiplier: f64) -> Self {
        Backoff::Exponential {
            initial,
            multiplier,
            max: None,
        }
    }

    /// Cap the delay. Has no effect on `Fixed`.
    pub fn with_max(self, cap: Duration) -> Self {
        match self {
            Backoff::Fixed(d) => Backoff::Fixed(d),
            Backoff::Linear { initial, step, .. } => Backoff::Linear {
                initial,
                step,
                max: Some(cap),
            },
            Backoff::Exponential {
                initial,
                multiplier,
                ..
            } => Backoff::Exponential {
                initial,
                multiplier,
                max: Some(cap),
            },
        }
    }

    /// Delay to sleep after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let n = attempt.max(1) - 1;
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Linear { initial, step, max } => {
                let d = initial.saturating_add(step.saturating_mul(n));
                cap(d, *max)
            }
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let factor = multiplier.powi(n.min(i32::MAX as u32) as i32);
                let nanos = initial.as_nanos() as f64 * factor;
                let d = if nanos.is_finite() && nanos < u64::MAX as f64 {
                    Duration::from_nanos(nanos as u64)
                } else {
                    Duration::MAX
                };
                cap(d, *max)
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PlanInvalid> {
        if let Backoff::Exponential { multiplier, .. } = self {
            if !multiplier.is_finite() || *multiplier < 1.0 {
                return Err(PlanInvalid::InvalidMultiplier(*multiplier));
            }
        }
        Ok(())
    }
}

fn cap(d: Duration, max: Option<Duration>) -> Duration {
    match max {
        Some(m) => d.min(m),
        None => d,
    }
}

/// Randomize a delay downwards by up to `fraction` of its length.
///
/// `fraction` of 0.0 returns the delay unchanged.
pub(crate) fn apply_jitter(delay: Duration, fraction: f64) -> Duration {
    if fraction <= 0.0 || delay.is_zero() {
        return delay;
    }
    let mut rng = rand::thread_rng();
    let cut = rng.gen_range(0.0..=fraction);
    delay.mul_f64(1.0 - cut)
}
