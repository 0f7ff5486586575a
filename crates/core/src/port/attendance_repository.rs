// Attendance Repository Ports (Interfaces)

use crate::domain::{AttendanceRecord, Missionary, NewAttendance, NewMissionary, RosterEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Lookup + attendance insert used by scan resolution
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Find the missionary whose scan identifier is `id_number`
    async fn find_by_id_number(&self, id_number: &str) -> Result<Option<Missionary>>;

    /// Record attendance for the current period.
    ///
    /// # Errors
    /// - `AppError::Conflict` if the missionary already has a record for the period
    /// - any other `AppError` for repository failures
    async fn insert_attendance(&self, attendance: &NewAttendance) -> Result<AttendanceRecord>;
}

/// Registration and listing (used by the CLI, not by scan resolution)
#[async_trait]
pub trait MissionaryRegistry: Send + Sync {
    /// Register a new missionary (`AppError::Conflict` on duplicate id number)
    async fn register(&self, missionary: &NewMissionary) -> Result<Missionary>;

    /// Attendance records, newest first, optionally restricted to one chapter
    async fn list_attendance(&self, chapter: Option<&str>) -> Result<Vec<AttendanceRecord>>;

    /// Registered missionaries ordered by name, each with their attendance
    /// for the current period
    async fn list_missionaries(&self, chapter: Option<&str>) -> Result<Vec<RosterEntry>>;

    /// Remove a missionary and their attendance history.
    ///
    /// # Errors
    /// - `AppError::NotFound` if no missionary has `id_number`
    async fn delete_missionary(&self, id_number: &str) -> Result<Missionary>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::ATTENDANCE_STATUS_PRESENT;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// How `insert_attendance` behaves for missionaries not yet attended
    #[derive(Debug, Clone)]
    pub enum InsertBehavior {
        /// Record attendance (conflict on second insert for the same missionary)
        Normal,
        /// Return a repository error
        Fail(String),
        /// Return an internal (system-level) error
        Internal(String),
        /// Panic inside the call
        Panic(String),
    }

    /// In-memory repository with call recording
    pub struct MockAttendanceRepository {
        missionaries: Mutex<HashMap<String, Missionary>>,
        attended: Mutex<HashSet<String>>,
        records: Mutex<Vec<AttendanceRecord>>,
        insert_behavior: Mutex<InsertBehavior>,
        lookup_failure: Mutex<Option<String>>,
        latency: Mutex<HashMap<String, Duration>>,
        calls: Mutex<Vec<String>>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: AtomicUsize,
    }

    struct InFlight(Arc<AtomicUsize>);

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Default for MockAttendanceRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockAttendanceRepository {
        pub fn new() -> Self {
            Self {
                missionaries: Mutex::new(HashMap::new()),
                attended: Mutex::new(HashSet::new()),
                records: Mutex::new(Vec::new()),
                insert_behavior: Mutex::new(InsertBehavior::Normal),
                lookup_failure: Mutex::new(None),
                latency: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                in_flight: Arc::new(AtomicUsize::new(0)),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        /// Builder: add a missionary whose scan identifier is `id_number`
        pub fn with_missionary(self, id_number: &str, name: &str, chapter: &str) -> Self {
            let missionary = Missionary {
                id: format!("m-{}", id_number),
                name: name.to_string(),
                age: 20,
                chapter: chapter.to_string(),
                id_number: id_number.to_string(),
                created_at: 0,
            };
            self.missionaries
                .lock()
                .unwrap()
                .insert(id_number.to_string(), missionary);
            self
        }

        /// Pretend `id_number` already has attendance for the period
        pub fn mark_attended(&self, id_number: &str) {
            self.attended
                .lock()
                .unwrap()
                .insert(format!("m-{}", id_number));
        }

        pub fn set_insert_behavior(&self, behavior: InsertBehavior) {
            *self.insert_behavior.lock().unwrap() = behavior;
        }

        pub fn set_lookup_failure(&self, message: Option<String>) {
            *self.lookup_failure.lock().unwrap() = message;
        }

        /// Delay every lookup of `identifier` by `delay`
        pub fn set_latency(&self, identifier: &str, delay: Duration) {
            self.latency
                .lock()
                .unwrap()
                .insert(identifier.to_string(), delay);
        }

        /// Calls in arrival order: `"lookup:<id>"` / `"insert:<id>"`
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn records(&self) -> Vec<AttendanceRecord> {
            self.records.lock().unwrap().clone()
        }

        /// Highest number of repository calls observed running at once
        pub fn max_concurrent_calls(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        fn enter(&self, call: String) -> InFlight {
            self.calls.lock().unwrap().push(call);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            InFlight(Arc::clone(&self.in_flight))
        }
    }

    #[async_trait]
    impl AttendanceRepository for MockAttendanceRepository {
        async fn find_by_id_number(&self, id_number: &str) -> Result<Option<Missionary>> {
            let _guard = self.enter(format!("lookup:{}", id_number));

            let delay = self.latency.lock().unwrap().get(id_number).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(message) = self.lookup_failure.lock().unwrap().clone() {
                return Err(AppError::Database(message));
            }
            Ok(self.missionaries.lock().unwrap().get(id_number).cloned())
        }

        async fn insert_attendance(&self, attendance: &NewAttendance) -> Result<AttendanceRecord> {
            let id_number = attendance
                .missionary_id
                .strip_prefix("m-")
                .unwrap_or(&attendance.missionary_id)
                .to_string();
            let _guard = self.enter(format!("insert:{}", id_number));

            if self
                .attended
                .lock()
                .unwrap()
                .contains(&attendance.missionary_id)
            {
                return Err(AppError::Conflict(format!(
                    "attendance already recorded for {}",
                    attendance.missionary_id
                )));
            }

            let behavior = self.insert_behavior.lock().unwrap().clone();
            match behavior {
                InsertBehavior::Normal => {}
                InsertBehavior::Fail(msg) => return Err(AppError::Database(msg)),
                InsertBehavior::Internal(msg) => return Err(AppError::Internal(msg)),
                InsertBehavior::Panic(msg) => panic!("{}", msg),
            }

            self.attended
                .lock()
                .unwrap()
                .insert(attendance.missionary_id.clone());
            let mut records = self.records.lock().unwrap();
            let record = AttendanceRecord {
                id: format!("a-{}", records.len() + 1),
                missionary_id: attendance.missionary_id.clone(),
                missionary_name: attendance.missionary_name.clone(),
                chapter: attendance.chapter.clone(),
                status: ATTENDANCE_STATUS_PRESENT.to_string(),
                scanned_at: 0,
                attendance_date: "1970-01-01".to_string(),
            };
            records.push(record.clone());
            Ok(record)
        }
    }

    #[async_trait]
    impl MissionaryRegistry for MockAttendanceRepository {
        async fn register(&self, missionary: &NewMissionary) -> Result<Missionary> {
            missionary.validate()?;
            let mut missionaries = self.missionaries.lock().unwrap();
            if missionaries.contains_key(&missionary.id_number) {
                return Err(AppError::Conflict(format!(
                    "id number already registered: {}",
                    missionary.id_number
                )));
            }
            let created = Missionary {
                id: format!("m-{}", missionary.id_number),
                name: missionary.name.clone(),
                age: missionary.age,
                chapter: missionary.chapter.clone(),
                id_number: missionary.id_number.clone(),
                created_at: 0,
            };
            missionaries.insert(missionary.id_number.clone(), created.clone());
            Ok(created)
        }

        async fn list_attendance(&self, chapter: Option<&str>) -> Result<Vec<AttendanceRecord>> {
            let mut records: Vec<_> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| chapter.map_or(true, |c| r.chapter == c))
                .cloned()
                .collect();
            records.reverse();
            Ok(records)
        }

        async fn list_missionaries(&self, chapter: Option<&str>) -> Result<Vec<RosterEntry>> {
            let records = self.records.lock().unwrap().clone();
            let mut roster: Vec<_> = self
                .missionaries
                .lock()
                .unwrap()
                .values()
                .filter(|m| chapter.map_or(true, |c| m.chapter == c))
                .map(|m| RosterEntry {
                    missionary: m.clone(),
                    attendance: records
                        .iter()
                        .rev()
                        .find(|r| r.missionary_id == m.id)
                        .cloned(),
                })
                .collect();
            roster.sort_by(|a, b| a.missionary.name.cmp(&b.missionary.name));
            Ok(roster)
        }

        async fn delete_missionary(&self, id_number: &str) -> Result<Missionary> {
            let removed = self
                .missionaries
                .lock()
                .unwrap()
                .remove(id_number)
                .ok_or_else(|| AppError::NotFound(format!("missionary {}", id_number)))?;
            self.attended.lock().unwrap().remove(&removed.id);
            self.records
                .lock()
                .unwrap()
                .retain(|r| r.missionary_id != removed.id);
            Ok(removed)
        }
    }
}
