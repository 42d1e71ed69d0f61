//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod batch;
pub mod cell;
pub mod format;
pub mod movement;
pub mod result;
pub mod row;

pub use batch::{BatchTotals, ImportBatch};
pub use cell::{rows_from_grid, RawCell, RawRow};
pub use format::{ColumnMap, FormatKind, FormatSpec};
pub use movement::{DedupKey, ExistingMovement, LedgerMovement, MovementOrigin};
pub use row::{ParsedRow, RowIssue, TransactionType};
