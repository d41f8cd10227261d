use crate::error::PoolError;
use crate::retry::BackoffPolicy;

use std::time::Duration;

/// Pool-wide tunables, immutable once a pool is constructed from them.
///
/// Every field has a documented default; override the ones that matter with
/// the `with_*` refiners.
#[derive(Debug, Clone)]
pub struct PoolConfig {
  /// Number of concurrent workers. Must be at least 1. Default 5.
  pub worker_count: usize,
  /// Unconsumed tasks buffered before `submit` rejects with `QueueFull`.
  /// Default 100. A configured 0 is treated as 1.
  pub task_queue_capacity: usize,
  /// Wall-clock budget for one task, shared by all of its attempts and the
  /// pauses between them. Default 30s. A zero budget times every task out
  /// before its first attempt.
  pub task_timeout: Duration,
  /// Additional attempts after the first failure. Default 3.
  pub max_retries: u32,
  /// Unread results buffered before workers block publishing (or, under
  /// shutdown, drop). Default 50. A configured 0 is treated as 1.
  pub result_queue_capacity: usize,
  /// Pause schedule between failed attempts. Default none.
  pub retry_backoff: BackoffPolicy,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      worker_count: 5,
      task_queue_capacity: 100,
      task_timeout: Duration::from_secs(30),
      max_retries: 3,
      result_queue_capacity: 50,
      retry_backoff: BackoffPolicy::none(),
    }
  }
}

impl PoolConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_worker_count(mut self, worker_count: usize) -> Self {
    self.worker_count = worker_count;
    self
  }

  pub fn with_task_queue_capacity(mut self, capacity: usize) -> Self {
    self.task_queue_capacity = capacity;
    self
  }

  pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
    self.task_timeout = timeout;
    self
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn with_result_queue_capacity(mut self, capacity: usize) -> Self {
    self.result_queue_capacity = capacity;
    self
  }

  pub fn with_retry_backoff(mut self, backoff: BackoffPolicy) -> Self {
    self.retry_backoff = backoff;
    self
  }

  pub(crate) fn validate(&self) -> Result<(), PoolError> {
    if self.worker_count == 0 {
      return Err(PoolError::InvalidConfig(
        "worker_count must be at least 1".to_string(),
      ));
    }
    Ok(())
  }
}
