use std::time::Duration;

use rand::Rng;

/// Delay schedule applied between failed attempts of one task.
///
/// The default is [`BackoffPolicy::none`], which retries immediately.
/// Fixed and exponential schedules add a bounded pause, optionally
/// jittered to avoid thundering-herd retries.
///
/// Delays never extend a task's deadline: a pause that would outlive the
/// task budget is cut short and the task reports a timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
  initial_interval: Duration,
  max_interval: Duration,
  coefficient: f64,
  jitter: f64,
}

impl BackoffPolicy {
  /// No pause between attempts.
  pub fn none() -> Self {
    Self {
      initial_interval: Duration::ZERO,
      max_interval: Duration::ZERO,
      coefficient: 1.0,
      jitter: 0.0,
    }
  }

  /// The same pause before every retry.
  pub fn fixed(interval: Duration) -> Self {
    Self {
      initial_interval: interval,
      max_interval: interval,
      coefficient: 1.0,
      jitter: 0.0,
    }
  }

  /// Doubling pauses starting at `initial_interval`, capped at 60s, with
  /// 10% jitter.
  pub fn exponential(initial_interval: Duration) -> Self {
    Self {
      initial_interval,
      max_interval: Duration::from_secs(60),
      coefficient: 2.0,
      jitter: 0.1,
    }
  }

  /// Caps the pause between any two attempts.
  pub fn with_max_interval(mut self, interval: Duration) -> Self {
    self.max_interval = interval;
    self
  }

  /// Sets the multiplier applied per retry.
  pub fn with_coefficient(mut self, coefficient: f64) -> Self {
    self.coefficient = coefficient.max(1.0);
    self
  }

  /// Sets the jitter factor (0.0-1.0). A value of 0.1 means the computed
  /// pause varies by up to plus or minus 10%.
  pub fn with_jitter(mut self, jitter: f64) -> Self {
    self.jitter = jitter.clamp(0.0, 1.0);
    self
  }

  /// Pause to take before attempt `next_attempt` (1-based). Attempt 1 is
  /// the initial try and never waits.
  pub fn delay_for_retry(&self, next_attempt: u32) -> Duration {
    if next_attempt <= 1 || self.initial_interval.is_zero() {
      return Duration::ZERO;
    }

    let retry_number = next_attempt - 1;
    let base = self.initial_interval.as_secs_f64() * self.coefficient.powi(retry_number as i32 - 1);
    let capped = base.min(self.max_interval.as_secs_f64());

    let jittered = if self.jitter > 0.0 && capped > 0.0 {
      let spread = capped * self.jitter;
      let offset = rand::thread_rng().gen_range(-spread..=spread);
      (capped + offset).max(0.0)
    } else {
      capped
    };

    Duration::from_secs_f64(jittered)
  }
}
