//! Single-flight and ordering properties of the queue processor

use std::sync::Arc;
use std::time::Duration;

use rollcall_core::application::{
    PassReport, QueueProcessor, ScanQueue, ScannerConfig, ScannerSession, SubmitOutcome,
};
use rollcall_core::domain::{decode, ScanStatus};
use rollcall_core::port::attendance_repository::mocks::MockAttendanceRepository;
use rollcall_core::port::id_provider::mocks::SequentialIdProvider;
use rollcall_core::port::time_provider::mocks::MockTimeProvider;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

fn roster() -> MockAttendanceRepository {
    (1..=20).fold(MockAttendanceRepository::new(), |repo, i| {
        repo.with_missionary(&format!("M-{}", i), &format!("Member {}", i), "North")
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_triggers_never_overlap() {
    let repo = Arc::new(roster());
    for i in (1..=20).step_by(3) {
        repo.set_latency(&format!("M-{}", i), Duration::from_millis(5));
    }
    let queue = Arc::new(RwLock::new(ScanQueue::new()));
    let processor = QueueProcessor::new(queue.clone(), repo.clone(), Duration::from_millis(1));

    {
        let mut q = queue.write().await;
        for i in 1..=20 {
            q.enqueue(decode(&format!("M-{}", i)), i);
        }
    }

    let mut set = JoinSet::new();
    for _ in 0..10 {
        let p = processor.clone();
        set.spawn(async move { p.drain().await });
    }
    let mut total = 0;
    while let Some(res) = set.join_next().await {
        total += res.unwrap();
    }

    // Every item processed exactly once, by whichever drain held the guard
    assert_eq!(total, 20);
    assert_eq!(repo.max_concurrent_calls(), 1);
    assert_eq!(repo.records().len(), 20);

    let lookups: Vec<_> = repo
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("lookup:"))
        .collect();
    let expected: Vec<_> = (1..=20).map(|i| format!("lookup:M-{}", i)).collect();
    assert_eq!(lookups, expected);

    assert!(queue
        .read()
        .await
        .items()
        .iter()
        .all(|i| i.status == ScanStatus::Success));
    assert_eq!(processor.run_pass().await, PassReport::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_submissions_drain_in_order() {
    let repo = Arc::new(roster());
    repo.set_latency("M-1", Duration::from_millis(30));
    let clock = Arc::new(MockTimeProvider::new(0));
    let session = ScannerSession::new(
        ScannerConfig {
            throttle_delay: Duration::from_millis(1),
            ..ScannerConfig::default()
        },
        repo.clone(),
        clock.clone(),
        Arc::new(SequentialIdProvider::new("session")),
    );
    session.enable_batch_mode().await;

    // Camera-style burst: each code repeated on several frames
    for i in 1..=5 {
        for _ in 0..4 {
            session.submit(&format!("M-{}", i)).await;
            clock.advance(30);
        }
    }
    session.wait_idle().await;

    let items = session.items().await;
    let identifiers: Vec<_> = items.iter().map(|i| i.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["M-1", "M-2", "M-3", "M-4", "M-5"]);
    assert!(items.iter().all(|i| i.status == ScanStatus::Success));
    assert_eq!(repo.max_concurrent_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_queue_mid_pass() {
    let repo = Arc::new(roster());
    repo.set_latency("M-2", Duration::from_millis(40));
    let clock = Arc::new(MockTimeProvider::new(0));
    let session = ScannerSession::new(
        ScannerConfig {
            throttle_delay: Duration::from_millis(1),
            ..ScannerConfig::default()
        },
        repo.clone(),
        clock.clone(),
        Arc::new(SequentialIdProvider::new("session")),
    );
    session.enable_batch_mode().await;

    for i in 1..=3 {
        assert!(matches!(
            session.submit(&format!("M-{}", i)).await,
            SubmitOutcome::Queued(_)
        ));
    }
    tokio::time::sleep(Duration::from_millis(15)).await;

    let snapshot = session.items().await;
    assert_eq!(snapshot[0].status, ScanStatus::Success);
    assert_eq!(snapshot[1].status, ScanStatus::Processing);

    assert_eq!(session.clear_queue().await, 3);
    session.wait_idle().await;

    // The copy taken before the clear is untouched; the queue stays empty
    assert_eq!(snapshot[0].status, ScanStatus::Success);
    assert!(session.items().await.is_empty());
    // M-2 finished against the repository, M-3 never started
    assert_eq!(repo.records().len(), 2);
    assert!(!repo.calls().iter().any(|c| c.ends_with("M-3")));
}
