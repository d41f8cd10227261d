use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::task::{Task, TaskResult};
use crate::worker::{self, WorkerContext};

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lifecycle state of a [`WorkerPool`].
///
/// `Created` -(start)-> `Running` -(stop)-> `Stopping` -(workers exited)->
/// `Stopped`. Only a `Running` pool accepts submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
  Created,
  Running,
  Stopping,
  Stopped,
}

/// A bounded pool of concurrent workers executing fallible tasks.
///
/// The pool owns a bounded task queue, a bounded result queue, and a single
/// one-shot cancellation signal. `worker_count` workers pull tasks in FIFO
/// order; completion order across workers is unordered. Every successfully
/// submitted task produces exactly one [`TaskResult`], except tasks still
/// queued (never started) when [`stop`](WorkerPool::stop) fires, which are
/// dropped without a result, and finished tasks whose publish races a
/// shutdown against a full result queue.
pub struct WorkerPool<R: Send + 'static> {
  pool_name: Arc<String>,
  config: PoolConfig,
  tokio_handle: TokioHandle,
  state: Mutex<PoolState>,
  task_tx: async_channel::Sender<Task<R>>,
  task_rx: async_channel::Receiver<Task<R>>,
  result_tx: Mutex<Option<mpsc::Sender<TaskResult<R>>>>,
  result_rx: Mutex<Option<mpsc::Receiver<TaskResult<R>>>>,
  shutdown_token: CancellationToken,
  busy_workers: Arc<AtomicUsize>,
  worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<R: Send + 'static> WorkerPool<R> {
  /// Constructs a pool in the `Created` state. No workers run until
  /// [`start`](WorkerPool::start).
  pub fn new(
    config: PoolConfig,
    tokio_handle: TokioHandle,
    pool_name: &str,
  ) -> Result<Self, PoolError> {
    config.validate()?;

    let (task_tx, task_rx) = async_channel::bounded(config.task_queue_capacity.max(1));
    let (result_tx, result_rx) = mpsc::channel(config.result_queue_capacity.max(1));

    Ok(Self {
      pool_name: Arc::new(pool_name.to_string()),
      config,
      tokio_handle,
      state: Mutex::new(PoolState::Created),
      task_tx,
      task_rx,
      result_tx: Mutex::new(Some(result_tx)),
      result_rx: Mutex::new(Some(result_rx)),
      shutdown_token: CancellationToken::new(),
      busy_workers: Arc::new(AtomicUsize::new(0)),
      worker_handles: Mutex::new(Vec::new()),
    })
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  /// Point-in-time lifecycle state; valid to query in any state.
  pub fn state(&self) -> PoolState {
    *self.state.lock()
  }

  /// Number of workers currently executing a task. Diagnostic only.
  pub fn active_workers(&self) -> usize {
    self.busy_workers.load(Ordering::SeqCst)
  }

  /// Number of submitted tasks not yet picked up by a worker. Diagnostic
  /// only.
  pub fn pending_tasks(&self) -> usize {
    self.task_tx.len()
  }

  /// Spawns exactly `worker_count` workers and moves the pool to `Running`.
  ///
  /// Valid once, on a `Created` pool.
  pub fn start(&self) -> Result<(), PoolError> {
    let mut state = self.state.lock();
    if *state != PoolState::Created {
      warn!(pool = %self.pool_name, state = ?*state, "start rejected");
      return Err(PoolError::InvalidState {
        expected: PoolState::Created,
        actual: *state,
      });
    }

    let Some(result_tx) = self.result_tx.lock().take() else {
      return Err(PoolError::InvalidState {
        expected: PoolState::Created,
        actual: *state,
      });
    };

    let mut handles = self.worker_handles.lock();
    for worker_id in 0..self.config.worker_count {
      let ctx = WorkerContext {
        task_rx: self.task_rx.clone(),
        result_tx: result_tx.clone(),
        shutdown: self.shutdown_token.clone(),
        busy: self.busy_workers.clone(),
        task_timeout: self.config.task_timeout,
        max_retries: self.config.max_retries,
        backoff: self.config.retry_backoff.clone(),
      };
      let span = info_span!("pool_worker", pool = %self.pool_name, worker = worker_id);
      handles.push(self.tokio_handle.spawn(worker::run(ctx).instrument(span)));
    }
    // The pool's own sender clone drops here, so the result stream ends
    // exactly when the last worker exits and the buffer drains.
    drop(result_tx);

    *state = PoolState::Running;
    info!(pool = %self.pool_name, workers = self.config.worker_count, "pool started");
    Ok(())
  }

  /// Enqueues a task without blocking.
  ///
  /// Backpressure is surfaced, not absorbed: a full queue rejects with
  /// [`PoolError::QueueFull`] and the caller applies its own retry or
  /// backoff. On success the task is owned by the pool and will be picked
  /// up in FIFO order.
  pub fn submit(&self, task: Task<R>) -> Result<(), PoolError> {
    {
      let state = self.state.lock();
      match *state {
        PoolState::Created => {
          return Err(PoolError::InvalidState {
            expected: PoolState::Running,
            actual: *state,
          });
        }
        PoolState::Stopping | PoolState::Stopped => return Err(PoolError::PoolNotRunning),
        PoolState::Running => {}
      }
    }
    if self.shutdown_token.is_cancelled() {
      return Err(PoolError::PoolNotRunning);
    }

    match self.task_tx.try_send(task) {
      Ok(()) => Ok(()),
      Err(async_channel::TrySendError::Full(task)) => {
        debug!(pool = %self.pool_name, task_id = %task.id(), "task queue full, rejecting");
        Err(PoolError::QueueFull)
      }
      Err(async_channel::TrySendError::Closed(_)) => Err(PoolError::PoolNotRunning),
    }
  }

  /// Takes the single consumer end of the result queue.
  ///
  /// Results arrive in completion order, not submission order. The stream
  /// is exhausted (yields `None`) only after [`stop`](WorkerPool::stop)
  /// has completed and every surviving result has been drained. Consumers
  /// that stop draining eventually block the workers once the result
  /// buffer fills.
  pub fn results(&self) -> Result<ResultStream<R>, PoolError> {
    match self.result_rx.lock().take() {
      Some(receiver) => Ok(ResultStream { receiver }),
      None => Err(PoolError::ResultsAlreadyTaken),
    }
  }

  /// Shuts the pool down and waits for every worker to exit.
  ///
  /// In order: the cancellation signal fires, the task queue closes, the
  /// caller blocks until all workers have exited. Tasks still queued when
  /// the signal fires are never executed and produce no result; callers
  /// needing stronger delivery must track submitted ids and treat missing
  /// results as failures. In-flight tasks resolve promptly (reported as
  /// cancelled if their attempt was cut off) and still publish.
  ///
  /// Idempotent: later calls return immediately without waiting.
  pub async fn stop(&self) {
    {
      let mut state = self.state.lock();
      match *state {
        PoolState::Created => {
          *state = PoolState::Stopped;
          self.shutdown_token.cancel();
          self.task_tx.close();
          self.result_tx.lock().take();
          info!(pool = %self.pool_name, "pool stopped before start");
          return;
        }
        PoolState::Running => {
          *state = PoolState::Stopping;
        }
        PoolState::Stopping | PoolState::Stopped => {
          debug!(pool = %self.pool_name, "stop: shutdown already in progress or complete");
          return;
        }
      }
    }

    info!(
      pool = %self.pool_name,
      pending = self.pending_tasks(),
      "initiating pool shutdown"
    );
    self.shutdown_token.cancel();
    self.task_tx.close();

    let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.worker_handles.lock());
    for handle in handles {
      if let Err(join_error) = handle.await {
        error!(pool = %self.pool_name, "worker failed to join cleanly: {:?}", join_error);
      }
    }

    *self.state.lock() = PoolState::Stopped;
    info!(pool = %self.pool_name, "pool shutdown complete");
  }
}

impl<R: Send + 'static> Drop for WorkerPool<R> {
  fn drop(&mut self) {
    // Implicit, non-blocking shutdown: signal and close, let workers wind
    // down on their own. An explicit `stop` beforehand makes this a no-op.
    if !self.shutdown_token.is_cancelled() {
      info!(pool = %self.pool_name, "pool dropped without stop, signalling workers");
      self.shutdown_token.cancel();
      self.task_tx.close();
    }
  }
}

/// The consumable sequence of task results, in completion order.
#[derive(Debug)]
pub struct ResultStream<R> {
  receiver: mpsc::Receiver<TaskResult<R>>,
}

impl<R: Send + 'static> ResultStream<R> {
  /// Receives the next completed result. Returns `None` once the pool has
  /// stopped and every surviving result has been drained.
  pub async fn recv(&mut self) -> Option<TaskResult<R>> {
    self.receiver.recv().await
  }
}

impl<R: Send + 'static> Stream for ResultStream<R> {
  type Item = TaskResult<R>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.receiver.poll_recv(cx)
  }
}
