//! Error taxonomy for the row pipeline.
//!
//! Only range and schema errors are run-fatal. Generation and write failures
//! are scoped to a single row; enrichment never fails at all.
use crate::pipeline::RunState;
use thiserror::Error;

/// Failure reported by a spreadsheet store call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SheetError {
    /// Remote hiccup (rate limit, 5xx, transport); the call may be retried.
    #[error("transient sheet error: {0}")]
    Transient(String),
    /// The call cannot succeed as issued.
    #[error("sheet error: {0}")]
    Permanent(String),
}

impl SheetError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SheetError::Transient(_))
    }
}

/// Requested bounds resolve to an empty or inverted range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid row range {start}..{end}: {reason}")]
pub struct InvalidRangeError {
    pub start: usize,
    pub end: usize,
    pub reason: &'static str,
}

/// The content generator could not produce a usable email for a row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("content generation unavailable: {0}")]
pub struct GenerationUnavailable(pub String);

/// A row's write-back failed after the retry budget was spent (or on a
/// permanent store error).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("write to row {row} failed at column {field:?} after {attempts} attempt(s): {source}")]
pub struct WriteError {
    pub row: usize,
    pub field: String,
    pub attempts: u32,
    #[source]
    pub source: SheetError,
}

/// The header row could not be read or written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("sheet header unavailable: {0}")]
pub struct SchemaError(#[source] pub SheetError);

/// Run-fatal errors surfaced by the controller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("read rows {start}..={end}: {source}")]
    Rows {
        start: usize,
        end: usize,
        #[source]
        source: SheetError,
    },
    #[error("cannot {action} a run that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: RunState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_sheet_errors_are_retryable() {
        assert!(SheetError::Transient("429".to_string()).is_retryable());
        assert!(!SheetError::Permanent("403".to_string()).is_retryable());
    }

    #[test]
    fn write_error_names_row_and_field() {
        let err = WriteError {
            row: 7,
            field: "Subject".to_string(),
            attempts: 5,
            source: SheetError::Transient("503".to_string()),
        };
        let text = err.to_string();
        assert!(text.contains("row 7"), "{text}");
        assert!(text.contains("\"Subject\""), "{text}");
        assert!(text.contains("5 attempt(s)"), "{text}");
    }
}
