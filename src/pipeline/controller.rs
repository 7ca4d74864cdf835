//! Run controller and progress tracking.
//!
//! State machine:
//!
//! ```text
//! Idle --start--> Running --+--> Completed
//!                    ^      +--> Failed
//!                    |      +--> Paused --reset--> Idle
//!                    +--resume-----+
//! ```
//!
//! Cancellation is cooperative: the flag is checked once per row boundary,
//! never in the middle of a row, so an in-flight generation or write always
//! finishes before a pause takes effect.
use super::columns::{
    ensure_columns, ColumnMap, COMPANY_INFORMATION_COLUMN, FULL_EMAIL_COLUMN,
    GENERATED_EMAIL_COLUMN, GENERATED_EMAIL_HTML_COLUMN, REQUIRED_OUTPUT_COLUMNS, SUBJECT_COLUMN,
};
use super::company::{enrich, CompanyEnricher};
use super::range::RowRange;
use super::writer::RowWriter;
use crate::error::{InvalidRangeError, RunError};
use crate::generate::{CampaignParams, ContentGenerator, HtmlRenderer};
use crate::sheet::{RowRecord, SheetStore};
use crate::util::truncate_string;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SUBJECT_LOG_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared stop-request flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to pause at the next row boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Read and clear the flag.
    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyRow,
    Generation,
    Render,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Written,
    Skipped { reason: SkipReason, detail: String },
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row: usize,
    #[serde(flatten)]
    pub status: RowStatus,
}

impl RowOutcome {
    fn written(row: usize) -> Self {
        Self {
            row,
            status: RowStatus::Written,
        }
    }

    fn skipped(row: usize, reason: SkipReason, detail: String) -> Self {
        Self {
            row,
            status: RowStatus::Skipped { reason, detail },
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self.status, RowStatus::Written)
    }
}

/// Position reported after every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Sheet row just handled.
    pub row: usize,
    /// Next unprocessed row.
    pub cursor: usize,
    pub completed: usize,
    pub total: usize,
}

pub trait ProgressObserver {
    fn on_row(&mut self, outcome: &RowOutcome, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&RowOutcome, Progress),
{
    fn on_row(&mut self, outcome: &RowOutcome, progress: Progress) {
        self(outcome, progress)
    }
}

/// Collaborators a run drives. Borrowed for the duration of one
/// `start`/`resume` call.
pub struct Pipeline<'a> {
    pub sheet: &'a mut dyn SheetStore,
    pub generator: &'a dyn ContentGenerator,
    pub renderer: &'a dyn HtmlRenderer,
    pub enricher: &'a dyn CompanyEnricher,
    pub writer: &'a RowWriter,
    pub campaign: &'a CampaignParams,
    pub enrich_min_length: usize,
    pub observer: &'a mut dyn ProgressObserver,
}

/// Resumable snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub range: RowRange,
    pub cursor: usize,
    pub state: RunState,
    #[serde(default)]
    pub outcomes: Vec<RowOutcome>,
}

/// Terminal (or paused) summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub state: RunState,
    pub range: RowRange,
    pub cursor: usize,
    pub written: usize,
    pub skipped: usize,
    pub outcomes: Vec<RowOutcome>,
}

pub struct RunController {
    range: RowRange,
    state: RunState,
    cursor: usize,
    columns: Option<ColumnMap>,
    outcomes: Vec<RowOutcome>,
    cancel: CancelToken,
}

impl RunController {
    pub fn new(range: RowRange, cancel: CancelToken) -> Self {
        Self {
            range,
            state: RunState::Idle,
            cursor: range.start,
            columns: None,
            outcomes: Vec::new(),
            cancel,
        }
    }

    /// Rebuild a paused run from a checkpoint. A checkpoint left in
    /// `Running` (the process died mid-run) resumes like a pause.
    pub fn from_checkpoint(checkpoint: RunCheckpoint, cancel: CancelToken) -> Result<Self, RunError> {
        if !matches!(checkpoint.state, RunState::Paused | RunState::Running) {
            return Err(RunError::InvalidTransition {
                action: "resume",
                state: checkpoint.state,
            });
        }
        let range = checkpoint.range;
        if checkpoint.cursor < range.start || checkpoint.cursor > range.end {
            return Err(InvalidRangeError {
                start: checkpoint.cursor,
                end: range.end,
                reason: "checkpoint cursor lies outside its range",
            }
            .into());
        }
        Ok(Self {
            range,
            state: RunState::Paused,
            cursor: checkpoint.cursor,
            columns: None,
            outcomes: checkpoint.outcomes,
            cancel,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Next unprocessed row.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn range(&self) -> RowRange {
        self.range
    }

    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    pub fn checkpoint(&self) -> RunCheckpoint {
        RunCheckpoint {
            range: self.range,
            cursor: self.cursor,
            state: self.state,
            outcomes: self.outcomes.clone(),
        }
    }

    pub fn report(&self) -> RunReport {
        let written = self.outcomes.iter().filter(|o| o.is_written()).count();
        RunReport {
            state: self.state,
            range: self.range,
            cursor: self.cursor,
            written,
            skipped: self.outcomes.len() - written,
            outcomes: self.outcomes.clone(),
        }
    }

    pub fn start(&mut self, pipeline: &mut Pipeline<'_>) -> Result<RunReport, RunError> {
        self.transition("start", RunState::Idle)?;
        tracing::info!(range = %self.range, rows = self.range.len(), "run started");
        self.run(pipeline)
    }

    pub fn resume(&mut self, pipeline: &mut Pipeline<'_>) -> Result<RunReport, RunError> {
        self.transition("resume", RunState::Paused)?;
        tracing::info!(range = %self.range, cursor = self.cursor, "run resumed");
        self.run(pipeline)
    }

    /// Discard the remaining range of a paused run and return to `Idle`.
    pub fn reset(&mut self) -> Result<(), RunError> {
        if self.state != RunState::Paused {
            return Err(RunError::InvalidTransition {
                action: "reset",
                state: self.state,
            });
        }
        self.state = RunState::Idle;
        self.cursor = self.range.start;
        self.columns = None;
        self.outcomes.clear();
        self.cancel.take();
        Ok(())
    }

    fn transition(&mut self, action: &'static str, from: RunState) -> Result<(), RunError> {
        if self.state != from {
            return Err(RunError::InvalidTransition {
                action,
                state: self.state,
            });
        }
        self.state = RunState::Running;
        Ok(())
    }

    fn run(&mut self, pipeline: &mut Pipeline<'_>) -> Result<RunReport, RunError> {
        let columns = match &self.columns {
            Some(columns) => columns.clone(),
            None => match ensure_columns(&mut *pipeline.sheet, &REQUIRED_OUTPUT_COLUMNS) {
                Ok(columns) => {
                    tracing::debug!(columns = columns.len(), "output columns ready");
                    self.columns = Some(columns.clone());
                    columns
                }
                Err(err) => {
                    self.state = RunState::Failed;
                    tracing::error!(error = %err, "run failed");
                    return Err(err.into());
                }
            },
        };

        let mut records = BTreeMap::new();
        if self.cursor < self.range.end {
            let last = self.range.last_row();
            match pipeline.sheet.rows(self.cursor, last) {
                Ok(rows) => records.extend(rows.into_iter().map(|row| (row.index, row))),
                Err(source) => {
                    self.state = RunState::Failed;
                    tracing::error!(error = %source, "run failed reading rows");
                    return Err(RunError::Rows {
                        start: self.cursor,
                        end: last,
                        source,
                    });
                }
            }
        }

        while self.cursor < self.range.end {
            if self.cancel.take() {
                self.state = RunState::Paused;
                tracing::info!(cursor = self.cursor, "run paused");
                return Ok(self.report());
            }
            let index = self.cursor;
            debug_assert!(self.range.contains(index));
            let row = records.remove(&index).unwrap_or_else(|| RowRecord {
                index,
                ..RowRecord::default()
            });
            let outcome = process_row(pipeline, &columns, &row);
            self.cursor += 1;
            let progress = Progress {
                row: index,
                cursor: self.cursor,
                completed: self.cursor - self.range.start,
                total: self.range.len(),
            };
            pipeline.observer.on_row(&outcome, progress);
            self.outcomes.push(outcome);
        }

        if self.cancel.take() {
            tracing::debug!("pause requested during the last row; range already finished");
        }
        self.state = RunState::Completed;
        let report = self.report();
        tracing::info!(
            written = report.written,
            skipped = report.skipped,
            "run completed"
        );
        Ok(report)
    }
}

fn process_row(pipeline: &mut Pipeline<'_>, columns: &ColumnMap, row: &RowRecord) -> RowOutcome {
    if row.is_blank() {
        tracing::warn!(row = row.index, "row has no input values; skipped");
        return RowOutcome::skipped(row.index, SkipReason::EmptyRow, "row is empty".to_string());
    }

    let company_info = enrich(row, pipeline.enrich_min_length, pipeline.enricher);

    let email = match pipeline
        .generator
        .generate(row, &company_info, pipeline.campaign)
    {
        Ok(email) => email,
        Err(err) => {
            tracing::error!(row = row.index, error = %err, "generation failed; row skipped");
            return RowOutcome::skipped(row.index, SkipReason::Generation, err.to_string());
        }
    };

    let html = match pipeline.renderer.render(&email.body) {
        Ok(html) => html,
        Err(err) => {
            tracing::error!(row = row.index, error = %err, "html rendering failed; row skipped");
            return RowOutcome::skipped(row.index, SkipReason::Render, err.to_string());
        }
    };

    let full_email = email.full_text();
    let fields = [
        (SUBJECT_COLUMN, email.subject.clone()),
        (GENERATED_EMAIL_HTML_COLUMN, html),
        (GENERATED_EMAIL_COLUMN, email.body.clone()),
        (COMPANY_INFORMATION_COLUMN, company_info),
        (FULL_EMAIL_COLUMN, full_email),
    ];
    match pipeline
        .writer
        .write_row(&mut *pipeline.sheet, columns, row.index, &fields)
    {
        Ok(()) => {
            tracing::info!(
                row = row.index,
                subject = %truncate_string(&email.subject, SUBJECT_LOG_CHARS),
                "row written"
            );
            RowOutcome::written(row.index)
        }
        Err(err) => RowOutcome::skipped(row.index, SkipReason::Write, err.to_string()),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
