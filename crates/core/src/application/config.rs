// Scanner configuration (no magic values)

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Same identifier inside this window counts as one physical scan (1s)
pub const DEDUP_COOLDOWN_MS: i64 = 1000;

/// Delay after each queue item, bounds request rate against the repository (300ms)
pub const THROTTLE_DELAY: Duration = Duration::from_millis(300);

/// How long a direct-mode confirmation stays up before new scans are accepted (3s)
pub const CONFIRMATION_HOLD: Duration = Duration::from_secs(3);

/// Poll interval used while waiting for the processor to go idle (25ms)
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// What to do with a payload whose checksum does not match its identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Log a warning and process normally
    #[default]
    Warn,
    /// Drop the scan before it reaches the dedup gate
    Reject,
}

impl FromStr for ChecksumPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(ChecksumPolicy::Warn),
            "reject" => Ok(ChecksumPolicy::Reject),
            other => Err(AppError::Config(format!(
                "unknown checksum policy '{}' (expected warn|reject)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ChecksumPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumPolicy::Warn => write!(f, "warn"),
            ChecksumPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Tunables for a scanner session
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub dedup_cooldown_ms: i64,
    pub throttle_delay: Duration,
    pub confirmation_hold: Duration,
    pub checksum_policy: ChecksumPolicy,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            dedup_cooldown_ms: DEDUP_COOLDOWN_MS,
            throttle_delay: THROTTLE_DELAY,
            confirmation_hold: CONFIRMATION_HOLD,
            checksum_policy: ChecksumPolicy::Warn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.dedup_cooldown_ms, 1000);
        assert_eq!(config.checksum_policy, ChecksumPolicy::Warn);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("Reject".parse::<ChecksumPolicy>().unwrap(), ChecksumPolicy::Reject);
        assert_eq!(" warn ".parse::<ChecksumPolicy>().unwrap(), ChecksumPolicy::Warn);
        let err = "block".parse::<ChecksumPolicy>().unwrap_err();
        assert!(err.to_string().contains("unknown checksum policy"));
    }
}
