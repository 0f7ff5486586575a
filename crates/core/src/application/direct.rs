// Direct (non-batch) flow - one scan at a time, resolved inline

use crate::application::processor::{resolve_isolated, FlightGuard};
use crate::domain::{Attendee, DecodedPayload, ScanOutcome};
use crate::port::AttendanceRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Confirmation shown after a scan resolved to a missionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub identifier: String,
    pub attendee: Attendee,
    pub already_marked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectState {
    /// Ready for the next scan
    Idle,
    /// A scan is being resolved
    Busy,
    /// Showing a confirmation; new scans are rejected until it clears
    Confirming(Confirmation),
}

#[derive(Clone)]
pub struct DirectFlow {
    repo: Arc<dyn AttendanceRepository>,
    in_flight: Arc<AtomicBool>,
    confirmation: Arc<RwLock<Option<Confirmation>>>,
    hold: Duration,
}

impl DirectFlow {
    pub fn new(repo: Arc<dyn AttendanceRepository>, hold: Duration) -> Self {
        Self {
            repo,
            in_flight: Arc::new(AtomicBool::new(false)),
            confirmation: Arc::new(RwLock::new(None)),
            hold,
        }
    }

    /// Resolve one scan. `None` if a previous scan is still in flight or confirming.
    ///
    /// Success and duplicate keep the flow armed-off for the confirmation hold;
    /// not-found and errors re-arm immediately.
    pub async fn handle(&self, payload: &DecodedPayload) -> Option<ScanOutcome> {
        let Some(guard) = FlightGuard::acquire(&self.in_flight) else {
            debug!(identifier = %payload.identifier, "Direct scan rejected, previous scan in flight");
            return None;
        };

        let outcome = resolve_isolated(Arc::clone(&self.repo), payload.identifier.clone()).await;

        match &outcome {
            ScanOutcome::Recorded(attendee) | ScanOutcome::AlreadyMarked(attendee) => {
                let already_marked = matches!(outcome, ScanOutcome::AlreadyMarked(_));
                info!(
                    identifier = %payload.identifier,
                    name = %attendee.name,
                    chapter = %attendee.chapter,
                    already_marked = already_marked,
                    "Direct scan resolved"
                );
                *self.confirmation.write().await = Some(Confirmation {
                    identifier: payload.identifier.clone(),
                    attendee: attendee.clone(),
                    already_marked,
                });

                let confirmation = Arc::clone(&self.confirmation);
                let hold = self.hold;
                tokio::spawn(async move {
                    tokio::time::sleep(hold).await;
                    *confirmation.write().await = None;
                    drop(guard);
                });
            }
            other => {
                warn!(
                    identifier = %payload.identifier,
                    notice = other.message().unwrap_or_default(),
                    "Direct scan not recorded"
                );
                drop(guard);
            }
        }

        Some(outcome)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> DirectState {
        if let Some(confirmation) = self.confirmation.read().await.clone() {
            return DirectState::Confirming(confirmation);
        }
        if self.is_busy() {
            DirectState::Busy
        } else {
            DirectState::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decode;
    use crate::port::attendance_repository::mocks::MockAttendanceRepository;

    const HOLD: Duration = Duration::from_millis(40);

    fn flow() -> (DirectFlow, Arc<MockAttendanceRepository>) {
        let repo = Arc::new(
            MockAttendanceRepository::new()
                .with_missionary("M-1", "Jane Doe", "North")
                .with_missionary("M-2", "John Roe", "South"),
        );
        (DirectFlow::new(repo.clone(), HOLD), repo)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_shows_confirmation_then_rearms() {
        let (flow, _repo) = flow();

        let outcome = flow.handle(&decode("M-1")).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Recorded(_)));

        match flow.state().await {
            DirectState::Confirming(c) => {
                assert_eq!(c.attendee.name, "Jane Doe");
                assert!(!c.already_marked);
            }
            other => panic!("expected confirmation, got {:?}", other),
        }

        // Rejected while confirming
        assert!(flow.handle(&decode("M-2")).await.is_none());

        tokio::time::sleep(HOLD * 3).await;
        assert_eq!(flow.state().await, DirectState::Idle);
        assert!(flow.handle(&decode("M-2")).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_also_confirms() {
        let (flow, repo) = flow();
        repo.mark_attended("M-1");

        let outcome = flow.handle(&decode("M-1")).await.unwrap();
        assert_eq!(outcome.message(), Some("Already marked"));
        assert!(matches!(
            flow.state().await,
            DirectState::Confirming(Confirmation { already_marked: true, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_rearms_immediately() {
        let (flow, repo) = flow();

        let outcome = flow.handle(&decode("12345")).await.unwrap();
        assert_eq!(outcome, ScanOutcome::NotFound);
        assert_eq!(flow.state().await, DirectState::Idle);

        assert!(flow.handle(&decode("M-1")).await.is_some());
        assert_eq!(repo.records().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_scan_blocks_second() {
        let (flow, repo) = flow();
        repo.set_latency("M-1", Duration::from_millis(30));

        let background = flow.clone();
        let first = tokio::spawn(async move { background.handle(&decode("M-1")).await });
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(flow.state().await, DirectState::Busy);
        assert!(flow.handle(&decode("M-2")).await.is_none());

        assert!(first.await.unwrap().is_some());
        assert_eq!(repo.calls(), vec!["lookup:M-1", "insert:M-1"]);
    }
}
