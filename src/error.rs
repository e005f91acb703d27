//! Error handling for roster import operations.
//!
//! Provides error types with context for schema discovery, typed field
//! marshaling, row building and session lifecycle failures.

use crate::schema::FieldType;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Finalization step that reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FinalizeStep {
    Compact,
    Save,
    Close,
}

impl fmt::Display for FinalizeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinalizeStep::Compact => "compact",
            FinalizeStep::Save => "save",
            FinalizeStep::Close => "close",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema query failed for table {table}: {reason}")]
    Schema { table: String, reason: String },

    #[error("Table {table} not present in roster file")]
    UnknownTable { table: String },

    #[error("Field {field} not present in table {table}")]
    UnknownField { table: String, field: String },

    #[error("Type mismatch on {table}.{field}: field is {declared}, value is {supplied}")]
    TypeMismatch {
        table: String,
        field: String,
        declared: FieldType,
        supplied: &'static str,
    },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Engine {operation} failed on {table}.{field} record {record}")]
    FieldAccess {
        operation: &'static str,
        table: String,
        field: String,
        record: i32,
    },

    #[error(
        "Write verification failed on {table}.{field} record {record}: wrote {written:?}, read back {read_back:?}"
    )]
    WriteVerification {
        table: String,
        field: String,
        record: i32,
        written: String,
        read_back: String,
    },

    #[error("Unrecognized position code {position:?}")]
    UnrecognizedPosition { position: String },

    #[error("Required attribute {attribute} is blank")]
    MissingAttribute { attribute: String },

    #[error("Engine refused to open roster file: {path}")]
    SessionOpen { path: PathBuf },

    #[error("Engine could not size table {table} to {capacity} records")]
    SessionSize { table: String, capacity: i32 },

    #[error("Finalize failed at {}", format_steps(.steps))]
    Finalize { steps: Vec<FinalizeStep> },

    #[error("Session is {actual}, operation requires {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn format_steps(steps: &[FinalizeStep]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl RosterError {
    /// Whether the error only affects the current row and the batch may continue
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            RosterError::UnknownField { .. }
                | RosterError::TypeMismatch { .. }
                | RosterError::InvalidValue { .. }
                | RosterError::FieldAccess { .. }
                | RosterError::WriteVerification { .. }
                | RosterError::UnrecognizedPosition { .. }
                | RosterError::MissingAttribute { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
