//! Row-range processing pipeline.
//!
//! The controller walks a resolved range one row at a time: enrich, generate,
//! render, write back. Per-row failures are recorded and skipped; only range
//! and header problems stop a run.
mod columns;
mod company;
mod controller;
mod range;
mod writer;

pub use columns::{
    ensure_columns, ColumnMap, COMPANY_INFORMATION_COLUMN, FULL_EMAIL_COLUMN,
    GENERATED_EMAIL_COLUMN, GENERATED_EMAIL_HTML_COLUMN, REQUIRED_OUTPUT_COLUMNS, SUBJECT_COLUMN,
};
pub use company::{enrich, CompanyEnricher, HttpEnricher, DEFAULT_ENRICH_MIN_LENGTH};
pub use controller::{
    CancelToken, Pipeline, Progress, ProgressObserver, RowOutcome, RowStatus, RunCheckpoint,
    RunController, RunReport, RunState, SkipReason,
};
pub use range::{resolve_range, RowRange, FIRST_DATA_ROW};
pub use writer::{RetryPolicy, RowWriter, Sleeper, ThreadSleeper};
