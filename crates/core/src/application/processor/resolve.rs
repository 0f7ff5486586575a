// Scan resolution: lookup then insert-with-uniqueness, classified

use crate::domain::{Attendee, NewAttendance, ScanOutcome};
use crate::error::AppError;
use crate::port::AttendanceRepository;
use std::sync::Arc;
use tracing::{debug, error};

/// Resolve `identifier` and record attendance, classifying every result
pub async fn resolve_attendance(repo: &dyn AttendanceRepository, identifier: &str) -> ScanOutcome {
    let missionary = match repo.find_by_id_number(identifier).await {
        Ok(Some(m)) => m,
        Ok(None) => return ScanOutcome::NotFound,
        Err(e) => return classify_error(e),
    };

    let attendee = Attendee {
        name: missionary.name.clone(),
        chapter: missionary.chapter.clone(),
    };

    match repo.insert_attendance(&NewAttendance::from(&missionary)).await {
        Ok(record) => {
            debug!(record_id = %record.id, identifier = %identifier, "Attendance recorded");
            ScanOutcome::Recorded(attendee)
        }
        Err(AppError::Conflict(_)) => ScanOutcome::AlreadyMarked(attendee),
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: AppError) -> ScanOutcome {
    if e.is_system() {
        ScanOutcome::SystemError(e.to_string())
    } else {
        ScanOutcome::ProcessingError(e.to_string())
    }
}

/// Run resolution on its own task so a panicking repository cannot take the caller down
pub async fn resolve_isolated(repo: Arc<dyn AttendanceRepository>, identifier: String) -> ScanOutcome {
    let handle =
        tokio::task::spawn(async move { resolve_attendance(repo.as_ref(), &identifier).await });

    match handle.await {
        Ok(outcome) => outcome,
        Err(join_err) => {
            if join_err.is_panic() {
                error!("Scan resolution panicked: {:?}", join_err);
            } else {
                error!("Scan resolution cancelled: {:?}", join_err);
            }
            ScanOutcome::SystemError(join_err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scan::{
        ALREADY_MARKED_MESSAGE, NOT_FOUND_MESSAGE, PROCESSING_ERROR_MESSAGE, SYSTEM_ERROR_MESSAGE,
    };
    use crate::port::attendance_repository::mocks::{InsertBehavior, MockAttendanceRepository};

    fn repo() -> Arc<MockAttendanceRepository> {
        Arc::new(MockAttendanceRepository::new().with_missionary("M-1", "Jane Doe", "North"))
    }

    #[tokio::test]
    async fn test_recorded() {
        let repo = repo();
        let outcome = resolve_attendance(repo.as_ref(), "M-1").await;
        assert_eq!(
            outcome,
            ScanOutcome::Recorded(Attendee {
                name: "Jane Doe".into(),
                chapter: "North".into()
            })
        );
        assert_eq!(repo.records().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_skips_insert() {
        let repo = repo();
        let outcome = resolve_attendance(repo.as_ref(), "12345").await;
        assert_eq!(outcome.message(), Some(NOT_FOUND_MESSAGE));
        assert_eq!(repo.calls(), vec!["lookup:12345"]);
    }

    #[tokio::test]
    async fn test_conflict_is_already_marked() {
        let repo = repo();
        repo.mark_attended("M-1");
        let outcome = resolve_attendance(repo.as_ref(), "M-1").await;
        assert_eq!(outcome.message(), Some(ALREADY_MARKED_MESSAGE));
        assert_eq!(outcome.attendee().unwrap().name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_repository_error_is_processing_error() {
        let repo = repo();
        repo.set_insert_behavior(InsertBehavior::Fail("disk full".into()));
        let outcome = resolve_attendance(repo.as_ref(), "M-1").await;
        assert_eq!(outcome.message(), Some(PROCESSING_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_lookup_error_is_processing_error() {
        let repo = repo();
        repo.set_lookup_failure(Some("connection reset".into()));
        let outcome = resolve_attendance(repo.as_ref(), "M-1").await;
        assert!(matches!(outcome, ScanOutcome::ProcessingError(ref m) if m.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_internal_error_is_system_error() {
        let repo = repo();
        repo.set_insert_behavior(InsertBehavior::Internal("invariant broken".into()));
        let outcome = resolve_attendance(repo.as_ref(), "M-1").await;
        assert_eq!(outcome.message(), Some(SYSTEM_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_panic_is_contained_as_system_error() {
        let repo = repo();
        repo.set_insert_behavior(InsertBehavior::Panic("driver exploded".into()));
        let outcome = resolve_isolated(repo.clone(), "M-1".to_string()).await;
        assert_eq!(outcome.message(), Some(SYSTEM_ERROR_MESSAGE));
    }
}
