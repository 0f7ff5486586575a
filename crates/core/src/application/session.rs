//! Scanner session - the surface the scan source and display talk to.
//!
//! Every raw scan goes decode -> checksum policy -> dedup gate, then either
//! into the queue (batch mode, processor scheduled explicitly) or through the
//! direct flow. Batch and direct are mutually exclusive by construction.

use crate::application::config::{ChecksumPolicy, ScannerConfig, IDLE_POLL_INTERVAL};
use crate::application::dedup::DedupGate;
use crate::application::direct::{DirectFlow, DirectState};
use crate::application::processor::QueueProcessor;
use crate::application::queue::{ScanQueue, StatusCounts};
use crate::domain::{decode, DecodedPayload, QueueItem, ScanItemId, ScanOutcome};
use crate::port::{AttendanceRepository, IdProvider, TimeProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// What happened to one submitted scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Payload decoded to an empty identifier
    Empty,
    /// Checksum mismatch under `ChecksumPolicy::Reject`
    ChecksumRejected(DecodedPayload),
    /// Repeat of the last scan inside the cooldown
    Duplicate,
    /// Batch mode: appended to the queue
    Queued(ScanItemId),
    /// Direct mode: resolved inline
    Direct(ScanOutcome),
    /// Direct mode: previous scan still in flight or confirming
    Busy,
}

pub struct ScannerSession {
    config: ScannerConfig,
    session_id: Mutex<String>,
    dedup: Mutex<DedupGate>,
    batch_mode: AtomicBool,
    queue: Arc<RwLock<ScanQueue>>,
    processor: QueueProcessor,
    direct: DirectFlow,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl ScannerSession {
    /// Create a session in direct mode
    pub fn new(
        config: ScannerConfig,
        repo: Arc<dyn AttendanceRepository>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        let queue = Arc::new(RwLock::new(ScanQueue::new()));
        let processor =
            QueueProcessor::new(Arc::clone(&queue), Arc::clone(&repo), config.throttle_delay);
        let direct = DirectFlow::new(repo, config.confirmation_hold);
        let session_id = id_provider.generate_id();

        info!(
            session_id = %session_id,
            cooldown_ms = config.dedup_cooldown_ms,
            checksum_policy = %config.checksum_policy,
            "Scanner session created"
        );

        Self {
            dedup: Mutex::new(DedupGate::new(config.dedup_cooldown_ms)),
            config,
            session_id: Mutex::new(session_id),
            batch_mode: AtomicBool::new(false),
            queue,
            processor,
            direct,
            time_provider,
            id_provider,
        }
    }

    /// Begin a new scanning session: fresh id, dedup state forgotten
    pub async fn start_session(&self) -> String {
        let session_id = self.id_provider.generate_id();
        *self.session_id.lock().await = session_id.clone();
        self.dedup.lock().await.reset();
        info!(session_id = %session_id, "Scanning session started");
        session_id
    }

    pub async fn session_id(&self) -> String {
        self.session_id.lock().await.clone()
    }

    pub fn is_batch_mode(&self) -> bool {
        self.batch_mode.load(Ordering::SeqCst)
    }

    pub async fn enable_batch_mode(&self) {
        if !self.batch_mode.swap(true, Ordering::SeqCst) {
            self.dedup.lock().await.reset();
            info!("Batch mode enabled");
        }
    }

    /// Leave batch mode, discarding the whole queue
    pub async fn disable_batch_mode(&self) {
        if self.batch_mode.swap(false, Ordering::SeqCst) {
            let dropped = self.queue.write().await.clear();
            self.dedup.lock().await.reset();
            info!(dropped = dropped, "Batch mode disabled, queue discarded");
        }
    }

    /// Drop every queued item. An item already in flight finishes against the
    /// repository but its result is not written back.
    pub async fn clear_queue(&self) -> usize {
        let dropped = self.queue.write().await.clear();
        info!(dropped = dropped, "Scan queue cleared");
        dropped
    }

    /// Entry point for the scan source
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        let payload = decode(raw);
        if payload.identifier.is_empty() {
            debug!("Empty scan payload ignored");
            return SubmitOutcome::Empty;
        }

        if payload.checksum_mismatch() && self.config.checksum_policy == ChecksumPolicy::Reject {
            warn!(
                identifier = %payload.identifier,
                checksum = payload.checksum.as_deref().unwrap_or_default(),
                "Checksum mismatch, scan rejected"
            );
            return SubmitOutcome::ChecksumRejected(payload);
        }

        let now = self.time_provider.now_millis();
        if !self.dedup.lock().await.admit(&payload.identifier, now) {
            return SubmitOutcome::Duplicate;
        }

        if payload.checksum_mismatch() {
            warn!(
                identifier = %payload.identifier,
                checksum = payload.checksum.as_deref().unwrap_or_default(),
                "Checksum mismatch, processing anyway"
            );
        }

        if self.is_batch_mode() {
            let item_id = self.queue.write().await.enqueue(payload, now);
            debug!(item_id = %item_id, "Scan queued");
            self.processor.schedule();
            SubmitOutcome::Queued(item_id)
        } else {
            match self.direct.handle(&payload).await {
                Some(outcome) => SubmitOutcome::Direct(outcome),
                None => SubmitOutcome::Busy,
            }
        }
    }

    /// Ordered snapshot of the queue
    pub async fn items(&self) -> Vec<QueueItem> {
        self.queue.read().await.items().to_vec()
    }

    pub async fn counts(&self) -> StatusCounts {
        self.queue.read().await.counts()
    }

    pub async fn direct_state(&self) -> DirectState {
        self.direct.state().await
    }

    /// Wait until no item is pending and no pass is running
    pub async fn wait_idle(&self) {
        loop {
            let pending = self.queue.read().await.has_pending();
            if !pending && !self.processor.is_running() {
                return;
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}
