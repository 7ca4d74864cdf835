//! Typed paths into a run directory.
use std::path::{Path, PathBuf};

/// Locates the artifacts kept for one campaign run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    root: PathBuf,
}

impl RunPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `config.json` path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Return the `cursor.json` path.
    pub fn cursor_path(&self) -> PathBuf {
        self.root.join("cursor.json")
    }

    /// Return the `report.json` path.
    pub fn report_path(&self) -> PathBuf {
        self.root.join("report.json")
    }

    /// Return the `history.jsonl` path.
    pub fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }
}
