//! Dedup gate
//!
//! A live camera feed redelivers the same decoded value on many consecutive
//! frames. The gate turns that frame stream into discrete scan events by
//! dropping a repeat of the last accepted identifier inside the cooldown.

use tracing::debug;

#[derive(Debug, Clone)]
struct LastScan {
    identifier: String,
    at_millis: i64,
}

/// Suppresses re-acceptance of the same identifier within a cooldown window
#[derive(Debug, Clone)]
pub struct DedupGate {
    cooldown_ms: i64,
    last: Option<LastScan>,
}

impl DedupGate {
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            cooldown_ms,
            last: None,
        }
    }

    /// Returns true (and records the scan) if `identifier` is a new event at `now_millis`
    pub fn admit(&mut self, identifier: &str, now_millis: i64) -> bool {
        if let Some(last) = &self.last {
            let elapsed = now_millis - last.at_millis;
            if last.identifier == identifier && elapsed < self.cooldown_ms {
                debug!(
                    identifier = %identifier,
                    elapsed_ms = elapsed,
                    cooldown_ms = self.cooldown_ms,
                    "Repeat scan suppressed"
                );
                return false;
            }
        }

        self.last = Some(LastScan {
            identifier: identifier.to_string(),
            at_millis: now_millis,
        });
        true
    }

    /// Forget the last accepted scan (new session, mode toggle)
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_identifier(&self) -> Option<&str> {
        self.last.as_ref().map(|l| l.identifier.as_str())
    }
}
