//! Row range resolution.
//!
//! Sheet rows are 1-based and row 1 is the header. A resolved range keeps the
//! upper bound one past the last row to process: with `N` data rows in sheet
//! rows `2..=N+1`, the default range is `2..N+2`.
use crate::error::InvalidRangeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// First sheet row holding data.
pub const FIRST_DATA_ROW: usize = 2;

/// Validated `[start, end)` range of sheet rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    /// Number of rows the range covers.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last sheet row inside the range.
    pub fn last_row(&self) -> usize {
        self.end.saturating_sub(1)
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row < self.end
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Default and validate requested bounds against the sheet extent.
///
/// A missing start (or row 1) means the first data row. A missing end means
/// one past the last data row; an end past the sheet is clipped to it. Empty or
/// inverted results are rejected rather than treated as a no-op.
pub fn resolve_range(
    requested_start: Option<usize>,
    requested_end: Option<usize>,
    total_data_rows: usize,
) -> Result<RowRange, InvalidRangeError> {
    let sheet_end = total_data_rows + FIRST_DATA_ROW;
    let start = match requested_start {
        None | Some(1) => FIRST_DATA_ROW,
        Some(0) => {
            return Err(InvalidRangeError {
                start: 0,
                end: requested_end.unwrap_or(sheet_end),
                reason: "rows are numbered from 1",
            })
        }
        Some(start) => start,
    };
    let end = requested_end.map_or(sheet_end, |end| end.min(sheet_end));
    if end <= start {
        return Err(InvalidRangeError {
            start,
            end,
            reason: "end row must be greater than start row",
        });
    }
    Ok(RowRange { start, end })
}
