use crate::error::TaskError;
use crate::retry::BackoffPolicy;
use crate::task::{Task, TaskResult};

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Everything one worker needs, cloned out of the pool at spawn time.
/// Workers never hold the pool itself, so dropping the pool still reaches
/// its implicit-shutdown path while workers are running.
pub(crate) struct WorkerContext<R: Send + 'static> {
  pub(crate) task_rx: async_channel::Receiver<Task<R>>,
  pub(crate) result_tx: mpsc::Sender<TaskResult<R>>,
  pub(crate) shutdown: CancellationToken,
  pub(crate) busy: Arc<AtomicUsize>,
  pub(crate) task_timeout: Duration,
  pub(crate) max_retries: u32,
  pub(crate) backoff: BackoffPolicy,
}

/// One worker: pull, execute, publish, until shutdown fires or the queue is
/// closed and drained. Tasks still queued when shutdown fires are never
/// picked up.
pub(crate) async fn run<R: Send + 'static>(ctx: WorkerContext<R>) {
  debug!("worker started");

  loop {
    tokio::select! {
      biased;

      _ = ctx.shutdown.cancelled() => {
        debug!("shutdown signal received, worker exiting");
        break;
      }

      recv_result = ctx.task_rx.recv() => {
        match recv_result {
          Ok(task) => {
            ctx.busy.fetch_add(1, Ordering::SeqCst);
            let result = execute(&ctx, task).await;
            ctx.busy.fetch_sub(1, Ordering::SeqCst);
            publish(&ctx, result).await;
          }
          Err(_) => {
            debug!("task queue closed and drained, worker exiting");
            break;
          }
        }
      }
    }
  }
}

/// Runs one task to a single reported outcome: up to `max_retries + 1`
/// attempts under one deadline, stopping early on the first success.
///
/// The deadline spans attempts and backoff pauses alike, and pool shutdown
/// short-circuits both: an in-flight attempt is dropped at its next await
/// point and reported as `Cancelled`.
async fn execute<R: Send + 'static>(ctx: &WorkerContext<R>, task: Task<R>) -> TaskResult<R> {
  let deadline = Instant::now() + ctx.task_timeout;
  let max_attempts = ctx.max_retries.saturating_add(1);
  let mut attempts = 0u32;
  let mut failure = TaskError::Timeout {
    budget: ctx.task_timeout,
  };

  trace!(task_id = %task.id(), "task dequeued");

  while attempts < max_attempts {
    if ctx.shutdown.is_cancelled() {
      failure = TaskError::Cancelled;
      break;
    }
    if Instant::now() >= deadline {
      failure = TaskError::Timeout {
        budget: ctx.task_timeout,
      };
      break;
    }

    attempts += 1;
    let action = task.action.clone();

    let attempt_result = tokio::select! {
      biased;

      _ = ctx.shutdown.cancelled() => Err(TaskError::Cancelled),

      _ = tokio::time::sleep_until(deadline) => Err(TaskError::Timeout {
        budget: ctx.task_timeout,
      }),

      unwind = AssertUnwindSafe(async move { action().await }).catch_unwind() => {
        match unwind {
          Ok(Ok(value)) => Ok(value),
          Ok(Err(source)) => Err(TaskError::Action(source)),
          Err(_panic) => Err(TaskError::Panicked),
        }
      }
    };

    match attempt_result {
      Ok(value) => {
        trace!(task_id = %task.id(), attempts, "task succeeded");
        return TaskResult {
          task_id: task.id,
          outcome: Ok(value),
          attempts,
        };
      }
      Err(interrupt @ (TaskError::Cancelled | TaskError::Timeout { .. })) => {
        failure = interrupt;
        break;
      }
      Err(attempt_failure) => {
        debug!(
          task_id = %task.id(),
          attempt = attempts,
          error = %attempt_failure,
          "task attempt failed"
        );
        failure = attempt_failure;
        if attempts < max_attempts {
          if let Err(interrupt) = pause_before_retry(ctx, attempts, deadline).await {
            failure = interrupt;
            break;
          }
        }
      }
    }
  }

  debug!(task_id = %task.id(), attempts, error = %failure, "task failed");
  TaskResult {
    task_id: task.id,
    outcome: Err(failure),
    attempts,
  }
}

/// Sleeps the configured backoff before the next attempt. The task deadline
/// and the shutdown signal both cut the pause short.
async fn pause_before_retry<R: Send + 'static>(
  ctx: &WorkerContext<R>,
  completed_attempts: u32,
  deadline: Instant,
) -> Result<(), TaskError> {
  let delay = ctx.backoff.delay_for_retry(completed_attempts + 1);
  if delay.is_zero() {
    return Ok(());
  }

  trace!(delay_ms = delay.as_millis() as u64, "pausing before retry");
  tokio::select! {
    biased;

    _ = ctx.shutdown.cancelled() => Err(TaskError::Cancelled),

    _ = tokio::time::sleep_until(deadline) => Err(TaskError::Timeout {
      budget: ctx.task_timeout,
    }),

    _ = tokio::time::sleep(delay) => Ok(()),
  }
}

/// Publishes a result, preferring the non-blocking path. When the result
/// queue is full the worker waits for space, unless shutdown fires first,
/// in which case the result is dropped. That drop is the documented
/// data-loss boundary of pool shutdown.
async fn publish<R: Send + 'static>(ctx: &WorkerContext<R>, result: TaskResult<R>) {
  let task_id = result.task_id.clone();

  match ctx.result_tx.try_send(result) {
    Ok(()) => {}
    Err(mpsc::error::TrySendError::Full(result)) => {
      tokio::select! {
        biased;

        _ = ctx.shutdown.cancelled() => {
          warn!(task_id = %task_id, "result queue full during shutdown, dropping result");
        }

        sent = ctx.result_tx.send(result) => {
          if sent.is_err() {
            warn!(task_id = %task_id, "result consumer dropped, discarding result");
          }
        }
      }
    }
    Err(mpsc::error::TrySendError::Closed(_)) => {
      warn!(task_id = %task_id, "result consumer dropped, discarding result");
    }
  }
}
