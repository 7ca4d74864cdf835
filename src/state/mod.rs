//! Run-directory state: configuration, the persisted cursor, and run history.
//!
//! Everything lives as pretty-printed JSON under one directory so a paused
//! campaign can be inspected by hand and resumed from another process.
mod config;
mod cursor;
mod history;
mod paths;
mod types;

pub use config::{default_config, load_config, resolve_lm_command, validate_config, write_config};
pub use cursor::{clear_cursor, load_cursor, write_cursor};
pub use history::{append_history, load_report, write_report};
pub use paths::RunPaths;
pub use types::{
    CursorFile, GeneratorConfig, RunConfig, RunHistoryEntry, SheetSource, DEFAULT_LM_COMMAND,
    DEFAULT_WORKBOOK_PATH,
};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CURSOR_SCHEMA_VERSION: u32 = 1;
pub const HISTORY_SCHEMA_VERSION: u32 = 1;
