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

  info!("--- Basic Usage Example ---");

  let pool = WorkerPool::<String>::new(
    PoolConfig::default()
      .with_worker_count(2)
      .with_task_queue_capacity(10),
    Handle::current(),
    "basic_pool",
  )
  .expect("pool configuration is valid");
  pool.start().expect("pool starts once");

  for i in 0..5 {
    // Alternate sleep times for variety
    let sleep_ms: u64 = 200 + (i as u64 % 3) * 150;
    let task = Task::new(format!("task-{i}"), move || async move {
      info!("task {} starting, will sleep for {}ms", i, sleep_ms);
      tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
      Ok(format!("task {i} finished after {sleep_ms}ms"))
    });
    match pool.submit(task) {
      Ok(()) => info!("submitted task-{i}"),
      Err(e) => tracing::error!("failed to submit task-{i}: {e}"),
    }
  }

  info!("All tasks submitted. Draining results...");

  let mut results = pool.results().expect("first and only take");
  for _ in 0..5 {
    match results.recv().await {
      Some(result) => match result.outcome {
        Ok(value) => info!("result for {}: {}", result.task_id, value),
        Err(e) => info!("error for {}: {}", result.task_id, e),
      },
      None => break,
    }
  }

  info!("All task results processed. Shutting down pool.");
  pool.stop().await;
  info!("--- Basic Usage Example End ---");
}
