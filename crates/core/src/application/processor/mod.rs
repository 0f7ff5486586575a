//! Queue Processor - single-flight drain of pending scans
//!
//! Each pass snapshots the pending items at its start and resolves them
//! strictly one at a time, in enqueue order, with a throttle delay after
//! each item. At most one pass runs at any time; a pass attempted while
//! another holds the guard is a no-op. Items appended during a pass are
//! left for the next one, which `schedule` runs once the current pass
//! releases the guard.

mod flight_guard;
mod resolve;

pub use flight_guard::FlightGuard;
pub use resolve::{resolve_attendance, resolve_isolated};

use crate::application::queue::ScanQueue;
use crate::domain::{ScanItemId, ScanOutcome};
use crate::port::AttendanceRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a single call to `run_pass` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReport {
    /// Nothing pending; guard not touched
    Idle,
    /// Another pass holds the guard
    Busy,
    /// Pass ran; `processed` items reached a terminal state
    Completed { processed: usize },
}

/// Drains the scan queue against the attendance repository
#[derive(Clone)]
pub struct QueueProcessor {
    queue: Arc<RwLock<ScanQueue>>,
    repo: Arc<dyn AttendanceRepository>,
    throttle: Duration,
    running: Arc<AtomicBool>,
}

impl QueueProcessor {
    pub fn new(
        queue: Arc<RwLock<ScanQueue>>,
        repo: Arc<dyn AttendanceRepository>,
        throttle: Duration,
    ) -> Self {
        Self {
            queue,
            repo,
            throttle,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a pass holds the guard
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn a drain on the runtime (called after every enqueue)
    pub fn schedule(&self) -> JoinHandle<usize> {
        let processor = self.clone();
        tokio::spawn(async move { processor.drain().await })
    }

    /// Run passes until nothing is left that this caller can process.
    ///
    /// Returns the number of items this call brought to a terminal state.
    pub async fn drain(&self) -> usize {
        let mut total = 0;
        loop {
            match self.run_pass().await {
                PassReport::Completed { processed } => {
                    total += processed;
                    // Guard is already released here; anything appended while
                    // we held it was dropped by its own trigger and is ours now.
                    if !self.queue.read().await.has_pending() {
                        break;
                    }
                }
                PassReport::Idle | PassReport::Busy => break,
            }
        }
        total
    }

    /// Run one processing pass over a snapshot of pending items
    pub async fn run_pass(&self) -> PassReport {
        let snapshot = self.queue.read().await.pending_ids();
        if snapshot.is_empty() {
            return PassReport::Idle;
        }

        let Some(_guard) = FlightGuard::acquire(&self.running) else {
            debug!(pending = snapshot.len(), "Processing pass already active, trigger dropped");
            return PassReport::Busy;
        };

        info!(items = snapshot.len(), "Processing pass started");

        let mut processed = 0;
        for item_id in &snapshot {
            let Some(identifier) = self.begin_item(item_id).await else {
                continue;
            };

            let outcome = resolve_isolated(Arc::clone(&self.repo), identifier.clone()).await;
            log_outcome(item_id, &identifier, &outcome);
            self.finish_item(item_id, &outcome).await;
            processed += 1;

            tokio::time::sleep(self.throttle).await;
        }

        info!(processed = processed, "Processing pass finished");
        PassReport::Completed { processed }
    }

    /// Pending -> Processing; `None` if the item is gone or no longer pending
    async fn begin_item(&self, item_id: &ScanItemId) -> Option<String> {
        let mut queue = self.queue.write().await;
        let Some(item) = queue.get_mut(item_id) else {
            debug!(item_id = %item_id, "Item cleared before processing, skipping");
            return None;
        };
        match item.start() {
            Ok(()) => Some(item.identifier.clone()),
            Err(e) => {
                debug!(item_id = %item_id, error = %e, "Item no longer pending, skipping");
                None
            }
        }
    }

    async fn finish_item(&self, item_id: &ScanItemId, outcome: &ScanOutcome) {
        let mut queue = self.queue.write().await;
        match queue.get_mut(item_id) {
            Some(item) => {
                if let Err(e) = item.finish(outcome) {
                    debug!(item_id = %item_id, error = %e, "Item replaced while processing, result dropped");
                }
            }
            None => {
                debug!(item_id = %item_id, "Item cleared while processing, result dropped");
            }
        }
    }
}

fn log_outcome(item_id: &str, identifier: &str, outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Recorded(a) => {
            info!(item_id = %item_id, identifier = %identifier, name = %a.name, chapter = %a.chapter, "Attendance marked")
        }
        ScanOutcome::AlreadyMarked(a) => {
            info!(item_id = %item_id, identifier = %identifier, name = %a.name, "Attendance already marked")
        }
        ScanOutcome::NotFound => {
            info!(item_id = %item_id, identifier = %identifier, "No missionary for scanned identifier")
        }
        ScanOutcome::ProcessingError(e) => {
            warn!(item_id = %item_id, identifier = %identifier, error = %e, "Repository error while processing scan")
        }
        ScanOutcome::SystemError(e) => {
            warn!(item_id = %item_id, identifier = %identifier, error = %e, "System error while processing scan")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{decode, ScanStatus};
    use crate::port::attendance_repository::mocks::{InsertBehavior, MockAttendanceRepository};

    const FAST: Duration = Duration::from_millis(1);

    fn setup(repo: MockAttendanceRepository) -> (QueueProcessor, Arc<RwLock<ScanQueue>>, Arc<MockAttendanceRepository>) {
        let repo = Arc::new(repo);
        let queue = Arc::new(RwLock::new(ScanQueue::new()));
        let processor = QueueProcessor::new(queue.clone(), repo.clone(), FAST);
        (processor, queue, repo)
    }

    fn three_missionaries() -> MockAttendanceRepository {
        MockAttendanceRepository::new()
            .with_missionary("X", "Xavier", "North")
            .with_missionary("Y", "Yolanda", "South")
            .with_missionary("Z", "Zed", "East")
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_queue_is_idle() {
        let (processor, _queue, repo) = setup(MockAttendanceRepository::new());
        assert_eq!(processor.run_pass().await, PassReport::Idle);
        assert!(!processor.is_running());
        assert!(repo.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_resolve_in_enqueue_order_despite_latency() {
        let (processor, queue, repo) = setup(three_missionaries());
        // X is the slowest to look up; it must still finish first
        repo.set_latency("X", Duration::from_millis(40));
        repo.set_latency("Y", Duration::from_millis(5));

        {
            let mut q = queue.write().await;
            q.enqueue(decode("X"), 1);
            q.enqueue(decode("Y"), 2);
            q.enqueue(decode("Z"), 3);
        }

        assert_eq!(processor.run_pass().await, PassReport::Completed { processed: 3 });

        assert_eq!(
            repo.calls(),
            vec!["lookup:X", "insert:X", "lookup:Y", "insert:Y", "lookup:Z", "insert:Z"]
        );
        assert_eq!(repo.max_concurrent_calls(), 1);

        let q = queue.read().await;
        assert!(q.items().iter().all(|i| i.status == ScanStatus::Success));
        assert_eq!(q.items()[1].name.as_deref(), Some("Yolanda"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_trigger_is_dropped() {
        let (processor, queue, repo) = setup(three_missionaries());
        repo.set_latency("X", Duration::from_millis(50));
        {
            let mut q = queue.write().await;
            q.enqueue(decode("X"), 1);
            q.enqueue(decode("Y"), 2);
        }

        let first = processor.schedule();
        // Let the first pass acquire the guard and block on the lookup of X
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(processor.is_running());
        // Y is still pending, but the guard is held
        assert_eq!(processor.run_pass().await, PassReport::Busy);

        assert_eq!(first.await.unwrap(), 2);
        assert_eq!(repo.calls(), vec!["lookup:X", "insert:X", "lookup:Y", "insert:Y"]);
        assert_eq!(repo.max_concurrent_calls(), 1);
        assert!(!processor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_appended_mid_pass_are_deferred_then_drained() {
        let (processor, queue, repo) = setup(three_missionaries());
        repo.set_latency("X", Duration::from_millis(40));
        queue.write().await.enqueue(decode("X"), 1);

        let first = processor.schedule();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Appended while X is in flight: not part of the running snapshot
        queue.write().await.enqueue(decode("Y"), 2);
        let second = processor.schedule();
        assert_eq!(second.await.unwrap(), 0);
        assert_eq!(queue.read().await.items()[1].status, ScanStatus::Pending);

        // First drain picks Y up in a follow-up pass
        assert_eq!(first.await.unwrap(), 2);
        let q = queue.read().await;
        assert_eq!(q.items()[1].status, ScanStatus::Success);
        assert_eq!(repo.calls(), vec!["lookup:X", "insert:X", "lookup:Y", "insert:Y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_does_not_abort_pass() {
        let (processor, queue, _repo) = setup(three_missionaries());
        {
            let mut q = queue.write().await;
            q.enqueue(decode("12345"), 1);
            q.enqueue(decode("Z"), 2);
        }

        processor.drain().await;

        let q = queue.read().await;
        assert_eq!(q.items()[0].status, ScanStatus::Error);
        assert_eq!(q.items()[0].error.as_deref(), Some("Not found"));
        assert_eq!(q.items()[1].status, ScanStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_distinct_from_processing_error() {
        let (processor, queue, repo) = setup(three_missionaries());
        repo.mark_attended("X");
        queue.write().await.enqueue(decode("X"), 1);
        processor.drain().await;

        repo.set_insert_behavior(InsertBehavior::Fail("boom".into()));
        queue.write().await.enqueue(decode("Y"), 2);
        processor.drain().await;

        let q = queue.read().await;
        assert_eq!(q.items()[0].error.as_deref(), Some("Already marked"));
        assert_eq!(q.items()[0].name.as_deref(), Some("Xavier"));
        assert_eq!(q.items()[1].error.as_deref(), Some("Processing error"));
        assert_eq!(q.items()[1].name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_in_repository_marks_system_error_and_releases_guard() {
        let (processor, queue, repo) = setup(three_missionaries());
        repo.set_insert_behavior(InsertBehavior::Panic("driver exploded".into()));
        queue.write().await.enqueue(decode("X"), 1);

        processor.drain().await;

        assert!(!processor.is_running());
        let q = queue.read().await;
        assert_eq!(q.items()[0].error.as_deref(), Some("System error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_mid_pass_keeps_finished_status() {
        let (processor, queue, repo) = setup(three_missionaries());
        repo.set_latency("Y", Duration::from_millis(40));
        {
            let mut q = queue.write().await;
            q.enqueue(decode("X"), 1);
            q.enqueue(decode("Y"), 2);
            q.enqueue(decode("Z"), 3);
        }

        let handle = processor.schedule();
        // X is done, Y is in flight
        tokio::time::sleep(Duration::from_millis(20)).await;
        let finished_before_clear = queue.read().await.items()[0].clone();
        assert_eq!(finished_before_clear.status, ScanStatus::Success);

        queue.write().await.clear();
        handle.await.unwrap();

        assert_eq!(finished_before_clear.status, ScanStatus::Success);
        assert_eq!(finished_before_clear.name.as_deref(), Some("Xavier"));
        assert!(queue.read().await.is_empty());
        // Y completed against the repository, Z never started
        assert_eq!(
            repo.calls(),
            vec!["lookup:X", "insert:X", "lookup:Y", "insert:Y"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_never_reprocesses() {
        let (processor, queue, repo) = setup(three_missionaries());
        let id = queue.write().await.enqueue(decode("X"), 1);
        processor.drain().await;

        // A second pass over the same (now terminal) item does nothing
        assert_eq!(processor.run_pass().await, PassReport::Idle);
        assert!(processor.begin_item(&id).await.is_none());
        assert_eq!(repo.calls().len(), 2);
    }
}
