// Scan Queue Item Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::payload::DecodedPayload;
use serde::{Deserialize, Serialize};

/// Queue item key, unique within one queue instance
pub type ScanItemId = String;

pub const NOT_FOUND_MESSAGE: &str = "Not found";
pub const ALREADY_MARKED_MESSAGE: &str = "Already marked";
pub const PROCESSING_ERROR_MESSAGE: &str = "Processing error";
pub const SYSTEM_ERROR_MESSAGE: &str = "System error";

/// Scan lifecycle: Pending -> Processing -> {Success, Error}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Success | ScanStatus::Error)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Processing => write!(f, "processing"),
            ScanStatus::Success => write!(f, "success"),
            ScanStatus::Error => write!(f, "error"),
        }
    }
}

/// Who a scan resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
    pub chapter: String,
}

/// Classification of one lookup + attendance attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Attendance recorded
    Recorded(Attendee),
    /// No missionary with this identifier
    NotFound,
    /// Attendance already exists for the current period (expected, not a fault)
    AlreadyMarked(Attendee),
    /// Repository reported a non-conflict error
    ProcessingError(String),
    /// Unexpected failure while attempting the operation
    SystemError(String),
}

impl ScanOutcome {
    pub fn status(&self) -> ScanStatus {
        match self {
            ScanOutcome::Recorded(_) => ScanStatus::Success,
            _ => ScanStatus::Error,
        }
    }

    /// User-visible error message (None on success)
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ScanOutcome::Recorded(_) => None,
            ScanOutcome::NotFound => Some(NOT_FOUND_MESSAGE),
            ScanOutcome::AlreadyMarked(_) => Some(ALREADY_MARKED_MESSAGE),
            ScanOutcome::ProcessingError(_) => Some(PROCESSING_ERROR_MESSAGE),
            ScanOutcome::SystemError(_) => Some(SYSTEM_ERROR_MESSAGE),
        }
    }

    pub fn attendee(&self) -> Option<&Attendee> {
        match self {
            ScanOutcome::Recorded(a) | ScanOutcome::AlreadyMarked(a) => Some(a),
            _ => None,
        }
    }
}

/// One accepted scan waiting for, or having gone through, resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: ScanItemId,
    pub identifier: String,
    pub enqueued_at: i64, // epoch ms
    pub status: ScanStatus,
    pub name: Option<String>,
    pub chapter: Option<String>,
    pub error: Option<String>,
    pub checksum: Option<String>,
    pub verified: bool,
}

impl QueueItem {
    /// Create a pending item with an injected key and timestamp
    pub fn new(id: impl Into<String>, enqueued_at: i64, payload: DecodedPayload) -> Self {
        Self {
            id: id.into(),
            identifier: payload.identifier,
            enqueued_at,
            status: ScanStatus::Pending,
            name: None,
            chapter: None,
            error: None,
            checksum: payload.checksum,
            verified: payload.verified,
        }
    }

    /// Key derived from identifier and enqueue time
    pub fn derive_id(identifier: &str, enqueued_at: i64) -> ScanItemId {
        format!("{}-{}", identifier, enqueued_at)
    }

    /// Transition Pending -> Processing
    pub fn start(&mut self) -> Result<()> {
        if self.status != ScanStatus::Pending {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: ScanStatus::Processing.to_string(),
            });
        }
        self.status = ScanStatus::Processing;
        Ok(())
    }

    /// Transition Processing -> Success/Error according to `outcome`
    pub fn finish(&mut self, outcome: &ScanOutcome) -> Result<()> {
        let to = outcome.status();
        if self.status != ScanStatus::Processing {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        if let Some(attendee) = outcome.attendee() {
            self.name = Some(attendee.name.clone());
            self.chapter = Some(attendee.chapter.clone());
        }
        self.error = outcome.message().map(str::to_string);
        self.status = to;
        Ok(())
    }
}
