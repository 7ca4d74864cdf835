//! `run` and `resume`: drive the pipeline and keep the run directory current.
use super::RunContext;
use crate::cli::{ResumeArgs, RunArgs};
use crate::generate::LocalHtmlRenderer;
use crate::pipeline::{
    resolve_range, CancelToken, Pipeline, Progress, RowOutcome, RowStatus, RunCheckpoint,
    RunController, RunReport, RunState,
};
use crate::sheet::SheetStore;
use crate::signal;
use crate::state::{
    append_history, clear_cursor, load_cursor, write_cursor, write_report, CursorFile,
    RunHistoryEntry,
};
use crate::util::now_epoch_ms;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Start a fresh run over the requested range.
pub fn run_run(run_dir: &Path, args: &RunArgs) -> Result<()> {
    let ctx = RunContext::load(run_dir)?;
    if let Some(existing) = load_cursor(&ctx.paths).filter(CursorFile::is_resumable) {
        if !args.restart {
            return Err(anyhow!(
                "a paused run over rows {} stopped at row {}; use `sheetmail resume` or `sheetmail run --restart`",
                existing.checkpoint.range,
                existing.checkpoint.cursor
            ));
        }
        clear_cursor(&ctx.paths)?;
        tracing::info!(
            range = %existing.checkpoint.range,
            cursor = existing.checkpoint.cursor,
            "discarded paused run"
        );
    }

    let mut sheet = ctx.open_sheet()?;
    let total = sheet.data_row_count().context("count data rows")?;
    let range = resolve_range(args.range.start, args.range.end, total)?;
    let cancel = CancelToken::new();
    signal::pause_on_interrupt(&cancel)?;
    let mut controller = RunController::new(range, cancel);
    drive(&ctx, sheet.as_mut(), &mut controller, args.lm.as_deref(), "run")
}

/// Continue the paused run recorded in `cursor.json`.
pub fn run_resume(run_dir: &Path, args: &ResumeArgs) -> Result<()> {
    let ctx = RunContext::load(run_dir)?;
    let cursor = load_cursor(&ctx.paths)
        .filter(CursorFile::is_resumable)
        .ok_or_else(|| anyhow!("no paused run in {}", ctx.paths.root().display()))?;
    let cancel = CancelToken::new();
    signal::pause_on_interrupt(&cancel)?;
    let mut controller = RunController::from_checkpoint(cursor.checkpoint, cancel)?;
    let mut sheet = ctx.open_sheet()?;
    drive(&ctx, sheet.as_mut(), &mut controller, args.lm.as_deref(), "resume")
}

fn drive(
    ctx: &RunContext,
    sheet: &mut dyn SheetStore,
    controller: &mut RunController,
    lm_override: Option<&str>,
    command: &str,
) -> Result<()> {
    let generator = ctx.build_generator(lm_override)?;
    let enricher = ctx.build_enricher();
    let writer = ctx.build_writer();
    let renderer = LocalHtmlRenderer;
    tracing::debug!(
        max_attempts = writer.policy().max_attempts,
        base_delay_ms = writer.policy().base_delay_ms,
        "write retry policy"
    );

    let range = controller.range();
    let mut outcomes = controller.outcomes().to_vec();
    let mut persist_cursor = |outcome: &RowOutcome, progress: Progress| {
        outcomes.push(outcome.clone());
        let checkpoint = RunCheckpoint {
            range,
            cursor: progress.cursor,
            state: RunState::Running,
            outcomes: outcomes.clone(),
        };
        if let Err(err) = write_cursor(&ctx.paths, &checkpoint) {
            tracing::warn!(error = %format!("{err:#}"), "failed to persist cursor");
        }
        tracing::debug!(
            completed = progress.completed,
            total = progress.total,
            "progress"
        );
    };
    let mut pipeline = Pipeline {
        sheet,
        generator: generator.as_ref(),
        renderer: &renderer,
        enricher: &enricher,
        writer: &writer,
        campaign: &ctx.config.campaign,
        enrich_min_length: ctx.config.enrich_min_length,
        observer: &mut persist_cursor,
    };
    let result = match controller.state() {
        RunState::Paused => controller.resume(&mut pipeline),
        _ => controller.start(&mut pipeline),
    };

    write_cursor(&ctx.paths, &controller.checkpoint())?;
    let report = controller.report();
    write_report(&ctx.paths, &report)?;
    append_history(
        &ctx.paths,
        &RunHistoryEntry::from_report(command, &report, now_epoch_ms()),
    )?;

    let report = result?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    for outcome in &report.outcomes {
        if let RowStatus::Skipped { reason, detail } = &outcome.status {
            println!("row {} skipped ({reason:?}): {detail}", outcome.row);
        }
    }
    match report.state {
        RunState::Paused => println!(
            "paused at row {} of {}: {} written, {} skipped (`sheetmail resume` continues)",
            report.cursor, report.range, report.written, report.skipped
        ),
        _ => println!(
            "{} rows {}: {} written, {} skipped",
            report.state, report.range, report.written, report.skipped
        ),
    }
}
