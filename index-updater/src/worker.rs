use crate::executor::UpdateExecutor;
use crate::queue::UpdateQueue;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Background consumer that drains the update queue one task at a time.
///
/// A single worker keeps index writes serialized; search reads proceed
/// concurrently through the store locks. Shutdown is cooperative: the
/// worker finishes the task in flight before exiting.
pub struct UpdateWorker {
    queue: Arc<UpdateQueue>,
    executor: Arc<UpdateExecutor>,
    poll_interval: Duration,
}

impl UpdateWorker {
    pub fn new(queue: Arc<UpdateQueue>, executor: Arc<UpdateExecutor>) -> Self {
        Self {
            queue,
            executor,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start the worker loop. Send `true` on the returned channel to
    /// request shutdown.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!("Update worker started");
            loop {
                if *shutdown_rx.borrow_and_update() {
                    break;
                }

                // Bounded wait so the shutdown flag is rechecked even
                // when the queue stays empty.
                let Some(task) = self.queue.dequeue(self.poll_interval).await else {
                    continue;
                };

                debug!(
                    "Worker picked up {} (priority {})",
                    task.file_path, task.priority
                );
                let result = self.executor.execute(&task, None).await;
                if result.success {
                    self.queue.mark_completed(&task.file_path, result).await;
                } else {
                    let reason = result
                        .error
                        .unwrap_or_else(|| "unknown failure".to_string());
                    self.queue.mark_failed(&task.file_path, reason).await;
                }
            }
            info!("Update worker stopped");
        });

        (handle, shutdown_tx)
    }
}
