use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::executor::UpdateResult;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

/// Kind of file-system change behind an update task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Priority inputs supplied by the event source alongside a change.
#[derive(Debug, Clone, Default)]
pub struct PriorityHints {
    pub last_queried_at: Option<DateTime<Utc>>,
    pub in_active_session: bool,
    pub user_requested: bool,
    pub file_size_bytes: Option<u64>,
    pub change_ratio: Option<f32>,
}

/// A pending document update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTask {
    /// Scheduling priority in [0, 1000], higher first
    pub priority: u32,
    pub file_path: String,
    pub change_kind: ChangeKind,
    pub enqueued_at: DateTime<Utc>,
    pub last_queried_at: Option<DateTime<Utc>>,
    pub in_active_session: bool,
    pub user_requested: bool,
    pub file_size_bytes: Option<u64>,
    /// Estimated change ratio when known ahead of the diff
    pub change_ratio: Option<f32>,
}

impl UpdateTask {
    /// Task with priority computed from its fields. The builder methods
    /// below recompute it; call `with_priority` last to override.
    pub fn new(file_path: impl Into<String>, change_kind: ChangeKind) -> Self {
        let mut task = Self {
            priority: 0,
            file_path: file_path.into(),
            change_kind,
            enqueued_at: Utc::now(),
            last_queried_at: None,
            in_active_session: false,
            user_requested: false,
            file_size_bytes: None,
            change_ratio: None,
        };
        task.priority = task.computed_priority();
        task
    }

    pub fn with_hints(mut self, hints: PriorityHints) -> Self {
        self.last_queried_at = hints.last_queried_at;
        self.in_active_session = hints.in_active_session;
        self.user_requested = hints.user_requested;
        self.file_size_bytes = hints.file_size_bytes;
        self.change_ratio = hints.change_ratio;
        self.priority = self.computed_priority();
        self
    }

    pub fn user_requested(mut self) -> Self {
        self.user_requested = true;
        self.priority = self.computed_priority();
        self
    }

    pub fn in_active_session(mut self) -> Self {
        self.in_active_session = true;
        self.priority = self.computed_priority();
        self
    }

    pub fn with_last_queried_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_queried_at = Some(at);
        self.priority = self.computed_priority();
        self
    }

    pub fn with_file_size_bytes(mut self, bytes: u64) -> Self {
        self.file_size_bytes = Some(bytes);
        self.priority = self.computed_priority();
        self
    }

    pub fn with_change_ratio(mut self, ratio: f32) -> Self {
        self.change_ratio = Some(ratio);
        self.priority = self.computed_priority();
        self
    }

    /// Explicit priority override.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority.min(1000);
        self
    }

    /// Priority from task fields: user requests jump the whole queue;
    /// otherwise active-session, recency, size, and change-ratio bonuses
    /// accumulate and clamp into [0, 1000].
    pub fn computed_priority(&self) -> u32 {
        if self.user_requested {
            return 1000;
        }

        let mut score = 0.0f64;
        if self.in_active_session {
            score += 200.0;
        }
        if let Some(at) = self.last_queried_at {
            let hours = (Utc::now() - at).num_seconds().max(0) as f64 / 3600.0;
            score += (400.0 - 10.0 * hours).max(0.0);
        }
        if let Some(bytes) = self.file_size_bytes {
            let size_mb = bytes as f64 / (1024.0 * 1024.0);
            score += (200.0 - 2.0 * size_mb).max(0.0);
        }
        let ratio = f64::from(self.change_ratio.unwrap_or(1.0)).clamp(0.0, 1.0);
        score += (1.0 - ratio) * 200.0;

        score.clamp(0.0, 1000.0).round() as u32
    }
}

/// A failed update, kept in the bounded failure history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUpdate {
    pub file_path: String,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Queue observability snapshot. Computed without scanning pending tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending_count: usize,
    pub processing_count: usize,
    pub completed_count: u64,
    pub failed_count: u64,
    pub active_paths: Vec<String>,
}

/// Scheduling key: higher task priority first, FIFO among equals via a
/// monotonic sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SchedulingKey {
    priority: u32,
    seq: Reverse<u64>,
}

#[derive(Default)]
struct QueueInner {
    pending: PriorityQueue<u64, SchedulingKey>,
    tasks: HashMap<u64, UpdateTask>,
    active: HashMap<String, UpdateTask>,
    completed: VecDeque<UpdateResult>,
    failed: VecDeque<FailedUpdate>,
    completed_total: u64,
    failed_total: u64,
    next_seq: u64,
}

/// Priority-ordered, concurrency-safe queue of pending document updates.
///
/// Many producers may enqueue and read status concurrently; a single
/// worker drains it. A path with an active (currently being processed)
/// task rejects new enqueues until the task is marked completed or
/// failed; pending duplicates for the same path are allowed.
pub struct UpdateQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
    completed_capacity: usize,
    failed_capacity: usize,
}

impl UpdateQueue {
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        config.validate().map_err(UpdateError::InvalidConfig)?;
        Ok(Self {
            inner: Mutex::new(QueueInner::default()),
            notify: Notify::new(),
            capacity: config.queue_capacity,
            completed_capacity: config.completed_history,
            failed_capacity: config.failed_history,
        })
    }

    /// Entry point for the file-change event source.
    pub async fn enqueue_update(
        &self,
        file_path: impl Into<String>,
        change_kind: ChangeKind,
        hints: PriorityHints,
    ) -> bool {
        self.enqueue(UpdateTask::new(file_path, change_kind).with_hints(hints))
            .await
    }

    /// Add a task. Returns false, with no side effect, when the queue is
    /// full or the task's path is currently being processed.
    pub async fn enqueue(&self, task: UpdateTask) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.pending.len() >= self.capacity {
            warn!(
                "Update queue at capacity ({}), rejecting {}",
                self.capacity, task.file_path
            );
            return false;
        }

        if inner.active.contains_key(&task.file_path) {
            debug!(
                "Path {} has an active task, rejecting enqueue",
                task.file_path
            );
            return false;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let key = SchedulingKey {
            priority: task.priority,
            seq: Reverse(seq),
        };
        debug!(
            "Enqueued {} (priority {}, seq {seq})",
            task.file_path, task.priority
        );
        inner.tasks.insert(seq, task);
        inner.pending.push(seq, key);
        drop(inner);

        self.notify.notify_one();
        true
    }

    /// Take the highest-priority task, blocking up to `timeout`. The
    /// returned task enters the active set; callers must eventually call
    /// `mark_completed` or `mark_failed` for its path.
    pub async fn dequeue(&self, timeout: Duration) -> Option<UpdateTask> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some((seq, _)) = inner.pending.pop() {
                    if let Some(task) = inner.tasks.remove(&seq) {
                        inner.active.insert(task.file_path.clone(), task.clone());
                        return Some(task);
                    }
                }
            }

            let remaining = deadline.checked_duration_since(Instant::now())?;
            if tokio::time::timeout(remaining, self.notify.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// Record a finished task and release its path for new active work.
    pub async fn mark_completed(&self, file_path: &str, result: UpdateResult) {
        let mut inner = self.inner.lock().await;
        if inner.active.remove(file_path).is_none() {
            warn!("mark_completed for {file_path} which was not active");
        }
        if inner.completed.len() >= self.completed_capacity {
            inner.completed.pop_front();
        }
        inner.completed.push_back(result);
        inner.completed_total += 1;
    }

    /// Record a failed task and release its path for new active work.
    pub async fn mark_failed(&self, file_path: &str, reason: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        if inner.active.remove(file_path).is_none() {
            warn!("mark_failed for {file_path} which was not active");
        }
        if inner.failed.len() >= self.failed_capacity {
            inner.failed.pop_front();
        }
        inner.failed.push_back(FailedUpdate {
            file_path: file_path.to_string(),
            reason: reason.into(),
            failed_at: Utc::now(),
        });
        inner.failed_total += 1;
    }

    /// Observability snapshot; O(active set), never scans pending tasks.
    pub async fn status(&self) -> QueueStatus {
        let inner = self.inner.lock().await;
        QueueStatus {
            pending_count: inner.pending.len(),
            processing_count: inner.active.len(),
            completed_count: inner.completed_total,
            failed_count: inner.failed_total,
            active_paths: inner.active.keys().cloned().collect(),
        }
    }

    /// Most recent completed results, oldest first.
    pub async fn recent_completed(&self) -> Vec<UpdateResult> {
        let inner = self.inner.lock().await;
        inner.completed.iter().cloned().collect()
    }

    /// Most recent failures, oldest first.
    pub async fn recent_failures(&self) -> Vec<FailedUpdate> {
        let inner = self.inner.lock().await;
        inner.failed.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queue_with_capacity(capacity: usize) -> UpdateQueue {
        UpdateQueue::new(&UpdaterConfig {
            queue_capacity: capacity,
            ..Default::default()
        })
        .expect("queue")
    }

    fn task(path: &str, priority: u32) -> UpdateTask {
        UpdateTask::new(path, ChangeKind::Modified).with_priority(priority)
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let queue = queue_with_capacity(10);
        assert!(queue.enqueue(task("low.pdf", 10)).await);
        assert!(queue.enqueue(task("high.pdf", 900)).await);
        assert!(queue.enqueue(task("mid.pdf", 500)).await);

        let order: Vec<u32> = [
            queue.dequeue(Duration::from_millis(10)).await,
            queue.dequeue(Duration::from_millis(10)).await,
            queue.dequeue(Duration::from_millis(10)).await,
        ]
        .into_iter()
        .map(|t| t.expect("task").priority)
        .collect();

        assert_eq!(order, vec![900, 500, 10]);
    }

    #[tokio::test]
    async fn test_fifo_among_equal_priority() {
        let queue = queue_with_capacity(10);
        queue.enqueue(task("first.pdf", 100)).await;
        queue.enqueue(task("second.pdf", 100)).await;

        let first = queue.dequeue(Duration::from_millis(10)).await.expect("task");
        let second = queue.dequeue(Duration::from_millis(10)).await.expect("task");
        assert_eq!(first.file_path, "first.pdf");
        assert_eq!(second.file_path, "second.pdf");
    }

    #[tokio::test]
    async fn test_capacity_rejection() {
        let queue = queue_with_capacity(2);
        assert!(queue.enqueue(task("a.pdf", 1)).await);
        assert!(queue.enqueue(task("b.pdf", 1)).await);
        assert!(!queue.enqueue(task("c.pdf", 1)).await);

        let status = queue.status().await;
        assert_eq!(status.pending_count, 2);
    }

    #[tokio::test]
    async fn test_active_path_deduplication() {
        let queue = queue_with_capacity(10);
        queue.enqueue(task("a.pdf", 100)).await;

        // Pending duplicates are allowed before the path goes active.
        assert!(queue.enqueue(task("a.pdf", 100)).await);

        let active = queue.dequeue(Duration::from_millis(10)).await.expect("task");
        assert_eq!(active.file_path, "a.pdf");

        // Now the path is active, new enqueues are rejected.
        assert!(!queue.enqueue(task("a.pdf", 100)).await);

        queue
            .mark_failed(&active.file_path, "test failure")
            .await;
        assert!(queue.enqueue(task("a.pdf", 100)).await);
    }

    #[tokio::test]
    async fn test_dequeue_times_out_on_empty() {
        let queue = queue_with_capacity(10);
        let start = std::time::Instant::now();
        let result = queue.dequeue(Duration::from_millis(20)).await;
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_enqueue() {
        let queue = std::sync::Arc::new(queue_with_capacity(10));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.enqueue(task("a.pdf", 1)).await;

        let dequeued = consumer.await.expect("join").expect("task");
        assert_eq!(dequeued.file_path, "a.pdf");
    }

    #[tokio::test]
    async fn test_status_counters_and_history() {
        let queue = queue_with_capacity(10);
        queue.enqueue(task("a.pdf", 1)).await;
        let dequeued = queue.dequeue(Duration::from_millis(10)).await.expect("task");

        let status = queue.status().await;
        assert_eq!(status.processing_count, 1);
        assert_eq!(status.active_paths, vec!["a.pdf".to_string()]);

        queue.mark_failed(&dequeued.file_path, "boom").await;
        let status = queue.status().await;
        assert_eq!(status.processing_count, 0);
        assert_eq!(status.failed_count, 1);

        let failures = queue.recent_failures().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason, "boom");
    }

    #[tokio::test]
    async fn test_failure_history_is_bounded() {
        let queue = UpdateQueue::new(&UpdaterConfig {
            failed_history: 3,
            ..Default::default()
        })
        .expect("queue");

        for i in 0..5 {
            let path = format!("f{i}.pdf");
            queue.enqueue(task(&path, 1)).await;
            queue.dequeue(Duration::from_millis(10)).await.expect("task");
            queue.mark_failed(&path, "boom").await;
        }

        let failures = queue.recent_failures().await;
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].file_path, "f2.pdf");
        assert_eq!(queue.status().await.failed_count, 5);
    }

    #[test]
    fn test_zero_capacity_config_rejected() {
        let config = UpdaterConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            UpdateQueue::new(&config),
            Err(UpdateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_user_requested_short_circuits_priority() {
        let task = UpdateTask::new("a.pdf", ChangeKind::Modified)
            .with_file_size_bytes(500 * 1024 * 1024)
            .user_requested();
        assert_eq!(task.priority, 1000);
    }

    #[test]
    fn test_priority_terms_accumulate() {
        let task = UpdateTask::new("a.pdf", ChangeKind::Modified)
            .in_active_session()
            .with_last_queried_at(Utc::now())
            .with_file_size_bytes(0)
            .with_change_ratio(0.0);
        // 200 session + 400 recency + 200 size + 200 change = 1000
        assert_eq!(task.priority, 1000);

        let stale = UpdateTask::new("b.pdf", ChangeKind::Modified)
            .with_last_queried_at(Utc::now() - chrono::Duration::hours(50));
        // Recency bonus fully decayed, unknown ratio contributes nothing.
        assert_eq!(stale.priority, 0);
    }

    #[test]
    fn test_default_priority_is_zero() {
        let task = UpdateTask::new("a.pdf", ChangeKind::Created);
        assert_eq!(task.priority, 0);
    }
}
