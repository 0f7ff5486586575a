// Application Layer - Use Cases and Business Logic

pub mod config;
pub mod dedup;
pub mod direct;
pub mod processor;
pub mod queue;
pub mod session;

// Re-exports
pub use config::{ChecksumPolicy, ScannerConfig};
pub use dedup::DedupGate;
pub use direct::{Confirmation, DirectFlow, DirectState};
pub use processor::{PassReport, QueueProcessor};
pub use queue::{ScanQueue, StatusCounts};
pub use session::{ScannerSession, SubmitOutcome};
