use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

/// Caller-supplied task identifier. Uniqueness is the caller's
/// responsibility; the pool does not deduplicate.
pub type TaskId = String;

/// The opaque error type a task action may fail with.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The shape of a task body: a repeatable, zero-argument capability
/// producing a value or a failure. Each retry attempt invokes it again for
/// a fresh future.
pub type TaskAction<R> = Arc<dyn Fn() -> BoxFuture<'static, Result<R, ActionError>> + Send + Sync>;

/// An immutable unit of work: an identifier plus the action that performs it.
#[derive(Clone)]
pub struct Task<R: Send + 'static> {
  pub(crate) id: TaskId,
  pub(crate) action: TaskAction<R>,
}

impl<R: Send + 'static> Task<R> {
  /// Builds a task from a closure returning a future per invocation.
  ///
  /// The closure must be re-invocable: with a retrying pool it runs up to
  /// `max_retries + 1` times.
  pub fn new<F, Fut>(id: impl Into<TaskId>, action: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
  {
    Self {
      id: id.into(),
      action: Arc::new(move || -> BoxFuture<'static, Result<R, ActionError>> {
        Box::pin(action())
      }),
    }
  }

  /// Builds a task from an already-boxed action.
  pub fn from_action(id: impl Into<TaskId>, action: TaskAction<R>) -> Self {
    Self {
      id: id.into(),
      action,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }
}

impl<R: Send + 'static> fmt::Debug for Task<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task").field("id", &self.id).finish_non_exhaustive()
  }
}

/// The reported outcome of one task: exactly one of these is eventually
/// published per successfully submitted task, barring pool shutdown.
#[derive(Debug)]
pub struct TaskResult<R> {
  pub task_id: TaskId,
  pub outcome: Result<R, TaskError>,
  /// How many times the action was actually invoked. Zero when the task was
  /// cut off before its first attempt (expired budget or shutdown).
  pub attempts: u32,
}

impl<R> TaskResult<R> {
  pub fn is_ok(&self) -> bool {
    self.outcome.is_ok()
  }
}
