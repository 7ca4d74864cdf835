//! Local JSON workbook store.
//!
//! The file holds one worksheet as `{"rows": [[...], ...]}` with the header in
//! the first row. Every mutation rewrites the file through a temp file in the
//! same directory so a crash never leaves a half-written workbook behind.
use super::{MemorySheet, SheetStore};
use crate::error::SheetError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Serialize)]
struct WorkbookDocument {
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

/// Worksheet persisted as a JSON document on disk.
#[derive(Debug)]
pub struct WorkbookFile {
    path: PathBuf,
    sheet: MemorySheet,
}

impl WorkbookFile {
    /// Load an existing workbook file.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read workbook {}", path.display()))?;
        let document: WorkbookDocument = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse workbook JSON {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            sheet: MemorySheet::new(document.rows),
        })
    }

    /// Write a new workbook file holding `rows`.
    pub fn create(path: &Path, rows: Vec<Vec<String>>) -> Result<Self> {
        let workbook = Self {
            path: path.to_path_buf(),
            sheet: MemorySheet::new(rows),
        };
        workbook
            .persist()
            .with_context(|| format!("write workbook {}", path.display()))?;
        Ok(workbook)
    }

    fn persist(&self) -> Result<(), SheetError> {
        let document = WorkbookDocument {
            rows: self.sheet.grid().to_vec(),
        };
        let text = serde_json::to_string_pretty(&document)
            .map_err(|err| SheetError::Permanent(format!("serialize workbook: {err}")))?;
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|err| SheetError::Transient(format!("stage {}: {err}", dir.display())))?;
        staged
            .write_all(text.as_bytes())
            .map_err(|err| SheetError::Transient(format!("write staged workbook: {err}")))?;
        staged
            .persist(&self.path)
            .map_err(|err| SheetError::Transient(format!("replace {}: {err}", self.path.display())))?;
        Ok(())
    }
}

impl SheetStore for WorkbookFile {
    fn header(&self) -> Result<Vec<String>, SheetError> {
        self.sheet.header()
    }

    fn set_header(&mut self, header: &[String]) -> Result<(), SheetError> {
        self.sheet.set_header(header)?;
        self.persist()
    }

    fn data_row_count(&self) -> Result<usize, SheetError> {
        self.sheet.data_row_count()
    }

    fn row_values(&self, start: usize, end: usize) -> Result<Vec<Vec<String>>, SheetError> {
        self.sheet.row_values(start, end)
    }

    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        self.sheet.set_cell(row, col, value)?;
        self.persist()
    }
}
