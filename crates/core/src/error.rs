//! Error types for countytab.

use countytab_sheet::SheetError;
use thiserror::Error;

/// Result type for normalization operations.
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Errors that abort normalization of a source file.
///
/// Every variant means the export no longer looks the way the normalizer
/// expects; none of them are worth retrying.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Structural precondition violated (too few rows or columns).
    #[error("Malformed table: {reason}")]
    MalformedTable { reason: String },

    /// A header cell matched no recognized date encoding.
    #[error("Unrecognized header {value:?} at {cell}: {reason}")]
    HeaderParse {
        cell: String,
        value: String,
        reason: String,
    },

    /// Two header cells resolved to the same calendar date.
    #[error("Duplicate date {date} at {cell} (already in {first})")]
    DuplicateDate {
        date: String,
        cell: String,
        first: String,
    },

    /// A reference entity has no row in the source table.
    #[error("Entity {name:?} has no matching row")]
    MissingEntity { name: String },

    /// Two source rows normalize to the same reference entity.
    #[error("Duplicate row for entity {name:?} at {cell} (already in {first})")]
    DuplicateEntity {
        name: String,
        cell: String,
        first: String,
    },

    /// A value cell is neither numeric nor a known placeholder.
    #[error("Unrecognized value {value:?} for {entity} at {cell}")]
    InvalidValue {
        entity: String,
        cell: String,
        value: String,
    },

    /// The reference entity list is unusable.
    #[error("Invalid entity list: {0}")]
    EntityList(String),

    /// Reading the source sheet failed.
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// CSV error while reading an entity list.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NormalizeError {
    /// Create a malformed-table error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            reason: reason.into(),
        }
    }
}
