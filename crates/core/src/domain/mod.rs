// Domain Layer - Pure business logic and entities

pub mod attendance;
pub mod error;
pub mod payload;
pub mod scan;

// Re-exports
pub use attendance::{
    AttendanceRecord, Missionary, NewAttendance, NewMissionary, RosterEntry,
    ATTENDANCE_STATUS_ABSENT, ATTENDANCE_STATUS_PRESENT,
};
pub use error::DomainError;
pub use payload::{compute_checksum, decode, encode, DecodedPayload};
pub use scan::{Attendee, QueueItem, ScanItemId, ScanOutcome, ScanStatus};
