//! Row write-back with retry and exponential backoff.
//!
//! Cell updates for a row are not atomic: if a write fails for good partway
//! through, the cells written before it stay written. Readers checking a row
//! for completeness must look at every output column.
use super::columns::ColumnMap;
use crate::error::{SheetError, WriteError};
use crate::sheet::SheetStore;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry budget for one row's batch of cell updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Blocking wait between attempts; swapped out in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Persists a row's generated fields through the column map.
pub struct RowWriter {
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl RowWriter {
    pub fn new(policy: RetryPolicy, sleeper: Box<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Write `fields` into `row`, one cell per field that has a column.
    ///
    /// A transient failure waits and resumes at the cell that failed; the
    /// whole row shares one attempt budget. Permanent failures are not
    /// retried.
    pub fn write_row(
        &self,
        sheet: &mut dyn SheetStore,
        columns: &ColumnMap,
        row: usize,
        fields: &[(&str, String)],
    ) -> Result<(), WriteError> {
        let mut updates = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            match columns.get(name) {
                Some(col) => updates.push((*name, col, value.as_str())),
                None => tracing::debug!(row, field = name, "no column for field; skipped"),
            }
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut next = 0;
        let mut attempt = 0;
        loop {
            let Err((failed_at, err)) = write_cells(sheet, row, &updates[next..]) else {
                return Ok(());
            };
            next += failed_at;
            attempt += 1;
            let field = updates[next].0;
            if !err.is_retryable() || attempt >= max_attempts {
                tracing::error!(row, field, attempts = attempt, error = %err, "row write failed");
                return Err(WriteError {
                    row,
                    field: field.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }
            let wait = self.policy.delay_for(attempt - 1);
            tracing::warn!(
                row,
                field,
                attempt,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "retrying row write"
            );
            self.sleeper.sleep(wait);
        }
    }
}

/// Write cells in order; on failure report the offset of the failed cell.
fn write_cells(
    sheet: &mut dyn SheetStore,
    row: usize,
    updates: &[(&str, usize, &str)],
) -> Result<(), (usize, SheetError)> {
    for (offset, (_, col, value)) in updates.iter().enumerate() {
        sheet
            .set_cell(row, *col, value)
            .map_err(|err| (offset, err))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::MemorySheet;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        waits: Rc<RefCell<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.borrow_mut().push(duration);
        }
    }

    /// Lets `healthy` cell writes through, then fails the next `failures`.
    struct FlakySheet {
        inner: MemorySheet,
        healthy: usize,
        failures: usize,
        error: SheetError,
        set_cell_calls: usize,
    }

    impl FlakySheet {
        fn new(failures: usize, error: SheetError) -> Self {
            Self {
                inner: MemorySheet::default(),
                healthy: 0,
                failures,
                error,
                set_cell_calls: 0,
            }
        }
    }

    impl SheetStore for FlakySheet {
        fn header(&self) -> Result<Vec<String>, SheetError> {
            self.inner.header()
        }

        fn set_header(&mut self, header: &[String]) -> Result<(), SheetError> {
            self.inner.set_header(header)
        }

        fn data_row_count(&self) -> Result<usize, SheetError> {
            self.inner.data_row_count()
        }

        fn row_values(&self, start: usize, end: usize) -> Result<Vec<Vec<String>>, SheetError> {
            self.inner.row_values(start, end)
        }

        fn set_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
            self.set_cell_calls += 1;
            if self.healthy > 0 {
                self.healthy -= 1;
            } else if self.failures > 0 {
                self.failures -= 1;
                return Err(self.error.clone());
            }
            self.inner.set_cell(row, col, value)
        }
    }

    fn columns() -> ColumnMap {
        [("Subject".to_string(), 1), ("Generated Email".to_string(), 2)]
            .into_iter()
            .collect()
    }

    fn fields() -> Vec<(&'static str, String)> {
        vec![
            ("Subject", "S".to_string()),
            ("Generated Email", "B".to_string()),
            ("Unmapped", "ignored".to_string()),
        ]
    }

    fn writer(sleeper: &RecordingSleeper) -> RowWriter {
        RowWriter::new(
            RetryPolicy {
                max_attempts: 5,
                base_delay_ms: 1,
            },
            Box::new(sleeper.clone()),
        )
    }

    fn millis(waits: &[Duration]) -> Vec<u128> {
        waits.iter().map(Duration::as_millis).collect()
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn writes_each_mapped_field_once() {
        let sleeper = RecordingSleeper::default();
        let mut sheet = FlakySheet::new(0, SheetError::Transient("x".to_string()));
        writer(&sleeper)
            .write_row(&mut sheet, &columns(), 3, &fields())
            .expect("write row");
        assert_eq!(sheet.set_cell_calls, 2);
        assert_eq!(sheet.inner.cell(3, 1), Some("S"));
        assert_eq!(sheet.inner.cell(3, 2), Some("B"));
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn succeeds_on_fifth_attempt_after_four_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let mut sheet = FlakySheet::new(4, SheetError::Transient("503".to_string()));
        writer(&sleeper)
            .write_row(&mut sheet, &columns(), 2, &fields())
            .expect("write row");
        assert_eq!(millis(&sleeper.waits.borrow()), vec![1, 2, 4, 8]);
        assert_eq!(sleeper.waits.borrow().iter().sum::<Duration>().as_millis(), 15);
        assert_eq!(sheet.inner.cell(2, 1), Some("S"));
        assert_eq!(sheet.inner.cell(2, 2), Some("B"));
    }

    #[test]
    fn always_failing_store_gives_up_after_five_attempts() {
        let sleeper = RecordingSleeper::default();
        let mut sheet = FlakySheet::new(usize::MAX, SheetError::Transient("429".to_string()));
        let err = writer(&sleeper)
            .write_row(&mut sheet, &columns(), 2, &fields())
            .expect_err("write error");
        assert_eq!(err.attempts, 5);
        assert_eq!(err.row, 2);
        assert_eq!(err.field, "Subject");
        assert_eq!(sheet.set_cell_calls, 5);
        assert_eq!(millis(&sleeper.waits.borrow()), vec![1, 2, 4, 8]);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut sheet = FlakySheet::new(1, SheetError::Permanent("403".to_string()));
        let err = writer(&sleeper)
            .write_row(&mut sheet, &columns(), 2, &fields())
            .expect_err("write error");
        assert_eq!(err.attempts, 1);
        assert_eq!(sheet.set_cell_calls, 1);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn retry_resumes_at_the_failed_cell() {
        let sleeper = RecordingSleeper::default();
        let mut sheet = FlakySheet::new(1, SheetError::Transient("503".to_string()));
        sheet.healthy = 1;
        writer(&sleeper)
            .write_row(&mut sheet, &columns(), 2, &fields())
            .expect("write row");
        assert_eq!(sheet.set_cell_calls, 3);
        assert_eq!(sheet.inner.cell(2, 1), Some("S"));
        assert_eq!(sheet.inner.cell(2, 2), Some("B"));
        assert_eq!(millis(&sleeper.waits.borrow()), vec![1]);
    }
}
