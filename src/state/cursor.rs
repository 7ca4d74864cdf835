//! Persisted run cursor.
//!
//! Rewritten after every row so an interrupted process can pick up at the next
//! unprocessed row. Missing, corrupt, or older-schema files read as "no run".
use super::{CursorFile, RunPaths, CURSOR_SCHEMA_VERSION};
use crate::pipeline::RunCheckpoint;
use crate::util::now_epoch_ms;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;

pub fn load_cursor(paths: &RunPaths) -> Option<CursorFile> {
    let path = paths.cursor_path();
    let bytes = fs::read(&path).ok()?;
    let parsed: CursorFile = match serde_json::from_slice(&bytes) {
        Ok(cursor) => cursor,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable cursor");
            return None;
        }
    };
    if parsed.schema_version != CURSOR_SCHEMA_VERSION {
        tracing::warn!(
            path = %path.display(),
            schema_version = parsed.schema_version,
            "ignoring cursor with unsupported schema"
        );
        return None;
    }
    Some(parsed)
}

/// Replace `cursor.json` atomically.
pub fn write_cursor(paths: &RunPaths, checkpoint: &RunCheckpoint) -> Result<()> {
    let cursor = CursorFile::new(checkpoint.clone(), now_epoch_ms());
    let text = serde_json::to_string_pretty(&cursor).context("serialize run cursor")?;
    let root = paths.root();
    fs::create_dir_all(root).with_context(|| format!("create run dir {}", root.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(root)
        .with_context(|| format!("create temp cursor in {}", root.display()))?;
    tmp.write_all(text.as_bytes()).context("write temp cursor")?;
    let path = paths.cursor_path();
    tmp.persist(&path)
        .with_context(|| format!("persist {}", path.display()))?;
    Ok(())
}

/// Remove `cursor.json`; a missing file is fine.
pub fn clear_cursor(paths: &RunPaths) -> Result<bool> {
    let path = paths.cursor_path();
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RowOutcome, RowRange, RowStatus, RunState, SkipReason};

    fn checkpoint() -> RunCheckpoint {
        RunCheckpoint {
            range: RowRange { start: 2, end: 5 },
            cursor: 4,
            state: RunState::Paused,
            outcomes: vec![
                RowOutcome {
                    row: 2,
                    status: RowStatus::Written,
                },
                RowOutcome {
                    row: 3,
                    status: RowStatus::Skipped {
                        reason: SkipReason::Write,
                        detail: "protected".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn cursor_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RunPaths::new(dir.path().to_path_buf());
        write_cursor(&paths, &checkpoint()).expect("write cursor");

        let loaded = load_cursor(&paths).expect("cursor present");
        assert_eq!(loaded.checkpoint, checkpoint());
        assert!(loaded.is_resumable());
        assert!(loaded.updated_at_epoch_ms > 0);
    }

    #[test]
    fn missing_or_corrupt_cursor_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RunPaths::new(dir.path().to_path_buf());
        assert!(load_cursor(&paths).is_none());

        fs::write(paths.cursor_path(), b"{not json").expect("write corrupt");
        assert!(load_cursor(&paths).is_none());
    }

    #[test]
    fn schema_mismatch_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RunPaths::new(dir.path().to_path_buf());
        write_cursor(&paths, &checkpoint()).expect("write cursor");
        let text = fs::read_to_string(paths.cursor_path()).expect("read cursor");
        let mut value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        value["schema_version"] = serde_json::json!(99);
        fs::write(paths.cursor_path(), value.to_string()).expect("rewrite");

        assert!(load_cursor(&paths).is_none());
    }

    #[test]
    fn clear_cursor_tolerates_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RunPaths::new(dir.path().to_path_buf());
        assert!(!clear_cursor(&paths).expect("clear missing"));
        write_cursor(&paths, &checkpoint()).expect("write cursor");
        assert!(clear_cursor(&paths).expect("clear"));
        assert!(load_cursor(&paths).is_none());
    }
}
