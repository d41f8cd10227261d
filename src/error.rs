use crate::pool::PoolState;
use crate::task::ActionError;

use std::time::Duration;

use thiserror::Error;

/// Errors returned synchronously by the pool's lifecycle and submission API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  #[error("invalid pool configuration: {0}")]
  InvalidConfig(String),

  #[error("operation requires a {expected:?} pool, but the pool is {actual:?}")]
  InvalidState {
    expected: PoolState,
    actual: PoolState,
  },

  #[error("pool is shutting down or stopped, cannot accept tasks")]
  PoolNotRunning,

  #[error("task queue is at capacity, submission rejected")]
  QueueFull,

  #[error("result stream was already taken from this pool")]
  ResultsAlreadyTaken,
}

/// Failure modes a task outcome can carry.
///
/// The pool never interprets or rewraps an action's own error; it only adds
/// the three failure kinds it can introduce itself.
#[derive(Error, Debug)]
pub enum TaskError {
  #[error("task deadline of {budget:?} exceeded")]
  Timeout { budget: Duration },

  #[error("task interrupted by pool shutdown")]
  Cancelled,

  #[error("task action panicked")]
  Panicked,

  #[error("task action failed: {0}")]
  Action(ActionError),
}

impl TaskError {
  pub fn is_timeout(&self) -> bool {
    matches!(self, TaskError::Timeout { .. })
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, TaskError::Cancelled)
  }
}
