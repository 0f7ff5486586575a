// Attendance Domain Model

use serde::{Deserialize, Serialize};

/// Status written on every scanned attendance record
pub const ATTENDANCE_STATUS_PRESENT: &str = "Present";

/// Roster status for a missionary with no record in the period
pub const ATTENDANCE_STATUS_ABSENT: &str = "Absent";

/// A registered scan target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Missionary {
    pub id: String,
    pub name: String,
    pub age: i32,
    pub chapter: String,
    /// Scan identifier printed into the QR code
    pub id_number: String,
    pub created_at: i64, // epoch ms
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMissionary {
    pub name: String,
    pub age: i32,
    pub chapter: String,
    pub id_number: String,
}

impl NewMissionary {
    pub fn validate(&self) -> crate::domain::error::Result<()> {
        use crate::domain::error::DomainError;

        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError("name cannot be empty".into()));
        }
        if self.chapter.trim().is_empty() {
            return Err(DomainError::ValidationError("chapter cannot be empty".into()));
        }
        if self.id_number.trim().is_empty() {
            return Err(DomainError::ValidationError("id number cannot be empty".into()));
        }
        if !(0..=150).contains(&self.age) {
            return Err(DomainError::ValidationError(format!(
                "age out of range: {}",
                self.age
            )));
        }
        Ok(())
    }
}

/// Attendance insert request for a resolved missionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub missionary_id: String,
    pub missionary_name: String,
    pub chapter: String,
}

impl From<&Missionary> for NewAttendance {
    fn from(m: &Missionary) -> Self {
        Self {
            missionary_id: m.id.clone(),
            missionary_name: m.name.clone(),
            chapter: m.chapter.clone(),
        }
    }
}

/// Stored attendance record (one per missionary per day)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub missionary_id: String,
    pub missionary_name: String,
    pub chapter: String,
    pub status: String,
    pub scanned_at: i64,          // epoch ms
    pub attendance_date: String, // YYYY-MM-DD (UTC)
}

/// A missionary with their attendance for the current period, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub missionary: Missionary,
    pub attendance: Option<AttendanceRecord>,
}

impl RosterEntry {
    pub fn is_present(&self) -> bool {
        self.attendance.is_some()
    }

    /// Display status: the record's status, or `"Absent"`
    pub fn status(&self) -> &str {
        self.attendance
            .as_ref()
            .map_or(ATTENDANCE_STATUS_ABSENT, |a| a.status.as_str())
    }
}
