use super::{CURSOR_SCHEMA_VERSION, HISTORY_SCHEMA_VERSION};
use crate::generate::{CampaignParams, DEFAULT_OPENAI_MODEL, OPENAI_API_BASE};
use crate::pipeline::{RetryPolicy, RunCheckpoint, RunReport, RunState, DEFAULT_ENRICH_MIN_LENGTH};
use crate::sheet::GOOGLE_SHEETS_API_BASE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_LM_COMMAND: &str = "claude -p";
pub const DEFAULT_WORKBOOK_PATH: &str = "leads.json";
pub const DEFAULT_ENRICH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

fn default_google_api_base() -> String {
    GOOGLE_SHEETS_API_BASE.to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    OPENAI_API_BASE.to_string()
}

fn default_enrich_min_length() -> usize {
    DEFAULT_ENRICH_MIN_LENGTH
}

fn default_enrich_timeout_secs() -> u64 {
    DEFAULT_ENRICH_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Where the leads live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetSource {
    /// JSON workbook file; relative paths resolve against the run directory.
    Workbook { path: PathBuf },
    Google {
        spreadsheet_id: String,
        worksheet: String,
        #[serde(default = "default_google_api_base")]
        api_base: String,
    },
}

/// Which backend writes the emails.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Command {
        command: String,
    },
    Openai {
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_base_url")]
        base_url: String,
    },
}

/// Run-directory owned configuration (`config.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunConfig {
    pub schema_version: u32,
    pub sheet: SheetSource,
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub campaign: CampaignParams,
    #[serde(default = "default_enrich_min_length")]
    pub enrich_min_length: usize,
    #[serde(default = "default_enrich_timeout_secs")]
    pub enrich_timeout_secs: u64,
    /// Timeout for model and spreadsheet API requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub write_retry: RetryPolicy,
}

/// Persisted run position (`cursor.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CursorFile {
    pub schema_version: u32,
    pub updated_at_epoch_ms: u64,
    #[serde(flatten)]
    pub checkpoint: RunCheckpoint,
}

impl CursorFile {
    pub fn new(checkpoint: RunCheckpoint, updated_at_epoch_ms: u64) -> Self {
        Self {
            schema_version: CURSOR_SCHEMA_VERSION,
            updated_at_epoch_ms,
            checkpoint,
        }
    }

    /// Only paused (or interrupted) runs can be picked up again.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self.checkpoint.state,
            RunState::Paused | RunState::Running
        )
    }
}

/// One `history.jsonl` line per finished or paused run leg.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunHistoryEntry {
    pub schema_version: u32,
    pub finished_at_epoch_ms: u64,
    /// `run` or `resume`.
    pub command: String,
    pub state: RunState,
    pub range: String,
    pub cursor: usize,
    pub written: usize,
    pub skipped: usize,
}

impl RunHistoryEntry {
    pub fn from_report(command: &str, report: &RunReport, finished_at_epoch_ms: u64) -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            finished_at_epoch_ms,
            command: command.to_string(),
            state: report.state,
            range: report.range.to_string(),
            cursor: report.cursor,
            written: report.written,
            skipped: report.skipped,
        }
    }
}
