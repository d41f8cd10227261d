use std::time::Duration;

use tokio::runtime::Handle;
use tracing::info;
use worker_ensemble::{PoolConfig, Task, WorkerPool};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Shutdown Example ---");

  let pool = WorkerPool::<String>::new(
    PoolConfig::default()
      .with_worker_count(2)
      .with_task_queue_capacity(10)
      .with_max_retries(0),
    Handle::current(),
    "shutdown_pool",
  )
  .expect("pool configuration is valid");
  pool.start().expect("pool starts once");

  // Submit 5 tasks of 2 seconds each. With two workers, tasks 0 and 1
  // start; tasks 2, 3, 4 wait in the queue.
  for i in 0..5 {
    let task = Task::new(format!("task-{i}"), move || async move {
      info!("task-{i} starting (2s of work)");
      tokio::time::sleep(Duration::from_secs(2)).await;
      Ok(format!("task-{i} finished"))
    });
    pool.submit(task).expect("queue has room");
  }
  info!(
    "5 tasks submitted. queued: {}, active: {}",
    pool.pending_tasks(),
    pool.active_workers()
  );

  tokio::time::sleep(Duration::from_millis(100)).await;

  info!("Stopping the pool: in-flight tasks report as cancelled, queued tasks are dropped.");
  let mut results = pool.results().expect("first and only take");
  pool.stop().await;

  // Submitting after shutdown is rejected.
  let late = Task::new("late", || async { Ok("too late".to_string()) });
  match pool.submit(late) {
    Ok(()) => tracing::error!("late submission unexpectedly accepted"),
    Err(e) => info!("late submission correctly rejected: {e}"),
  }

  while let Some(result) = results.recv().await {
    match result.outcome {
      Ok(value) => info!("{} completed: {}", result.task_id, value),
      Err(e) => info!("{} did not complete: {}", result.task_id, e),
    }
  }
  info!("Result stream exhausted; queued tasks produced no results.");

  info!("--- Shutdown Example End ---");
}
