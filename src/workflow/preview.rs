use super::RunContext;
use crate::cli::PreviewArgs;
use crate::pipeline::{resolve_range, RowRange};
use crate::sheet::RowRecord;
use crate::util::truncate_string;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PreviewOutput {
    range: RowRange,
    rows: Vec<RowRecord>,
}

/// Print the rows a run over the same bounds would process.
pub fn run_preview(run_dir: &Path, args: &PreviewArgs) -> Result<()> {
    let ctx = RunContext::load(run_dir)?;
    let sheet = ctx.open_sheet()?;
    let total = sheet.data_row_count().context("count data rows")?;
    let range = resolve_range(args.range.start, args.range.end, total)?;
    let rows = sheet
        .rows(range.start, range.last_row())
        .with_context(|| format!("read rows {range}"))?;

    if args.json {
        let text = serde_json::to_string_pretty(&PreviewOutput { range, rows })
            .context("serialize preview")?;
        println!("{text}");
        return Ok(());
    }

    println!("rows {range} ({} of {total} data rows)", range.len());
    for row in &rows {
        println!(
            "{:>6}  {}  {}  {}",
            row.index,
            truncate_string(&row.company_name, 30),
            row.company_domain,
            truncate_string(&row.contact_name, 30)
        );
    }
    Ok(())
}
