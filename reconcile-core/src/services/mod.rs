//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod import;
pub mod logging;
pub mod migration;

pub use import::{
    CommitMode, CommitOutcome, DedupOutcome, DetectedFormat, ImportOptions, ImportReport,
    ImportService,
};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
