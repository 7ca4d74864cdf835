use crate::cli::StatusArgs;
use crate::pipeline::{CancelToken, RowRange, RunController, RunReport, RunState};
use crate::state::{clear_cursor, load_cursor, load_report, RunPaths};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Snapshot of a run directory for `status`.
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub run_dir: String,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RowRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<usize>,
    pub completed: usize,
    pub total: usize,
    pub resumable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_epoch_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<RunReport>,
}

pub fn status_summary(paths: &RunPaths) -> Result<StatusSummary> {
    let cursor = load_cursor(paths);
    let last_report = load_report(paths)?;
    let run_dir = paths.root().display().to_string();
    let summary = match cursor {
        Some(cursor) => {
            let checkpoint = &cursor.checkpoint;
            StatusSummary {
                run_dir,
                state: checkpoint.state,
                range: Some(checkpoint.range),
                cursor: Some(checkpoint.cursor),
                completed: checkpoint.cursor.saturating_sub(checkpoint.range.start),
                total: checkpoint.range.len(),
                resumable: cursor.is_resumable(),
                updated_at_epoch_ms: Some(cursor.updated_at_epoch_ms),
                last_report,
            }
        }
        None => StatusSummary {
            run_dir,
            state: RunState::Idle,
            range: None,
            cursor: None,
            completed: 0,
            total: 0,
            resumable: false,
            updated_at_epoch_ms: None,
            last_report,
        },
    };
    Ok(summary)
}

pub fn run_status(run_dir: &Path, args: &StatusArgs) -> Result<()> {
    let paths = RunPaths::new(run_dir.to_path_buf());
    let summary = status_summary(&paths)?;
    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize status")?;
        println!("{text}");
        return Ok(());
    }

    println!("run dir: {}", summary.run_dir);
    match (summary.range, summary.cursor) {
        (Some(range), Some(cursor)) => {
            println!("state: {}", summary.state);
            println!(
                "rows {range}: next row {cursor} ({}/{} done)",
                summary.completed, summary.total
            );
            if summary.resumable {
                println!("next: sheetmail resume");
            }
        }
        _ => println!("state: no run recorded"),
    }
    if let Some(report) = &summary.last_report {
        println!(
            "last report: {} ({} written, {} skipped)",
            report.state, report.written, report.skipped
        );
    }
    Ok(())
}

/// Discard a paused run so the next `run` starts fresh.
pub fn run_reset(run_dir: &Path) -> Result<()> {
    let paths = RunPaths::new(run_dir.to_path_buf());
    match load_cursor(&paths) {
        Some(cursor) if cursor.is_resumable() => {
            let mut controller = RunController::from_checkpoint(cursor.checkpoint, CancelToken::new())?;
            controller.reset()?;
            clear_cursor(&paths)?;
            println!(
                "reset run over rows {}; state is now {}",
                controller.range(),
                controller.state()
            );
        }
        _ => {
            clear_cursor(&paths)?;
            println!("no paused run");
        }
    }
    Ok(())
}
