//! Report snapshot and append-only run history.
use super::{RunHistoryEntry, RunPaths};
use crate::pipeline::RunReport;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;

/// Write the latest run report snapshot.
pub fn write_report(paths: &RunPaths, report: &RunReport) -> Result<()> {
    let path = paths.report_path();
    fs::create_dir_all(paths.root()).context("create run dir")?;
    let text = serde_json::to_string_pretty(report).context("serialize run report")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read the last report, if one was written.
pub fn load_report(paths: &RunPaths) -> Result<Option<RunReport>> {
    let path = paths.report_path();
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let report = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse run report {}", path.display()))?;
    Ok(Some(report))
}

/// Append a history entry as JSONL.
pub fn append_history(paths: &RunPaths, entry: &RunHistoryEntry) -> Result<()> {
    let path = paths.history_path();
    fs::create_dir_all(paths.root()).context("create run dir")?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize run history entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RowRange, RunState};

    fn report(state: RunState, written: usize) -> RunReport {
        RunReport {
            state,
            range: RowRange { start: 2, end: 5 },
            cursor: 5,
            written,
            skipped: 3 - written,
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn history_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RunPaths::new(dir.path().to_path_buf());
        for written in [1, 3] {
            let entry =
                RunHistoryEntry::from_report("run", &report(RunState::Completed, written), 7);
            append_history(&paths, &entry).expect("append");
        }
        let text = fs::read_to_string(paths.history_path()).expect("read history");
        let lines: Vec<RunHistoryEntry> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("parse line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].written, 1);
        assert_eq!(lines[1].written, 3);
        assert_eq!(lines[1].range, "2..5");
    }

    #[test]
    fn report_snapshot_is_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RunPaths::new(dir.path().to_path_buf());
        assert!(load_report(&paths).expect("load").is_none());
        write_report(&paths, &report(RunState::Paused, 1)).expect("write");
        write_report(&paths, &report(RunState::Completed, 2)).expect("write");
        let loaded = load_report(&paths).expect("load").expect("present");
        assert_eq!(loaded.state, RunState::Completed);
        assert_eq!(loaded.written, 2);
    }
}
