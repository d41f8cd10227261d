use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::info;
use worker_ensemble::{BackoffPolicy, PoolConfig, Task, WorkerPool};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Retry and Timeout Example ---");

  let pool = WorkerPool::<String>::new(
    PoolConfig::default()
      .with_worker_count(2)
      .with_max_retries(3)
      .with_task_timeout(Duration::from_secs(1))
      .with_retry_backoff(BackoffPolicy::exponential(Duration::from_millis(50))),
    Handle::current(),
    "retry_pool",
  )
  .expect("pool configuration is valid");
  pool.start().expect("pool starts once");

  // Fails twice, then succeeds on the third attempt.
  let attempts_seen = Arc::new(AtomicUsize::new(0));
  let flaky_counter = attempts_seen.clone();
  let flaky = Task::new("flaky_fetch", move || {
    let counter = flaky_counter.clone();
    async move {
      let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
      if attempt < 3 {
        info!("flaky_fetch attempt {attempt} failing");
        Err(format!("transient failure on attempt {attempt}").into())
      } else {
        Ok(format!("flaky_fetch succeeded on attempt {attempt}"))
      }
    }
  });
  pool.submit(flaky).expect("queue has room");

  // Sleeps past the 1s budget and is reported as a timeout.
  let slow = Task::new("slow_scan", || async {
    tokio::time::sleep(Duration::from_secs(10)).await;
    Ok("never returned".to_string())
  });
  pool.submit(slow).expect("queue has room");

  let mut results = pool.results().expect("first and only take");
  for _ in 0..2 {
    if let Some(result) = results.recv().await {
      match result.outcome {
        Ok(value) => info!("{} ok after {} attempts: {}", result.task_id, result.attempts, value),
        Err(e) => info!("{} failed after {} attempts: {}", result.task_id, result.attempts, e),
      }
    }
  }

  pool.stop().await;
  info!("--- Retry and Timeout Example End ---");
}
