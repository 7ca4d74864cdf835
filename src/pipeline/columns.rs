//! Output column provisioning.
//!
//! Missing output columns are appended to the header in one write before any
//! row is touched, so a run never leaves a header with only some of its
//! columns added.
use crate::error::SchemaError;
use crate::sheet::SheetStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SUBJECT_COLUMN: &str = "Subject";
pub const GENERATED_EMAIL_HTML_COLUMN: &str = "Generated Email HTML";
pub const GENERATED_EMAIL_COLUMN: &str = "Generated Email";
pub const COMPANY_INFORMATION_COLUMN: &str = "Company Information";
pub const FULL_EMAIL_COLUMN: &str = "Full Email";

/// Output columns every run writes, in the order they are appended.
pub const REQUIRED_OUTPUT_COLUMNS: [&str; 5] = [
    SUBJECT_COLUMN,
    GENERATED_EMAIL_HTML_COLUMN,
    GENERATED_EMAIL_COLUMN,
    COMPANY_INFORMATION_COLUMN,
    FULL_EMAIL_COLUMN,
];

/// Logical field name to 1-based column index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    columns: BTreeMap<String, usize>,
}

impl ColumnMap {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, usize)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Make sure every name in `required` has a header column and map each to its
/// position. Matching is exact and case-sensitive; a compliant header is left
/// untouched.
pub fn ensure_columns(
    sheet: &mut dyn SheetStore,
    required: &[&str],
) -> Result<ColumnMap, SchemaError> {
    let mut header = sheet.header().map_err(SchemaError)?;
    let mut added = Vec::new();
    for name in required {
        if !header.iter().any(|column| column == name) {
            header.push(name.to_string());
            added.push(*name);
        }
    }

    if !added.is_empty() {
        sheet.set_header(&header).map_err(SchemaError)?;
        tracing::info!(columns = ?added, "added missing output columns");
    }

    Ok(required
        .iter()
        .filter_map(|name| {
            header
                .iter()
                .position(|column| column == name)
                .map(|pos| (name.to_string(), pos + 1))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetError;
    use crate::sheet::MemorySheet;

    /// Counts header writes on top of an in-memory sheet.
    struct CountingSheet {
        inner: MemorySheet,
        header_writes: usize,
        fail_header_read: bool,
    }

    impl CountingSheet {
        fn with_header(header: &[&str]) -> Self {
            Self {
                inner: MemorySheet::new(vec![header.iter().map(|h| h.to_string()).collect()]),
                header_writes: 0,
                fail_header_read: false,
            }
        }
    }

    impl SheetStore for CountingSheet {
        fn header(&self) -> Result<Vec<String>, SheetError> {
            if self.fail_header_read {
                return Err(SheetError::Permanent("no access".to_string()));
            }
            self.inner.header()
        }

        fn set_header(&mut self, header: &[String]) -> Result<(), SheetError> {
            self.header_writes += 1;
            self.inner.set_header(header)
        }

        fn data_row_count(&self) -> Result<usize, SheetError> {
            self.inner.data_row_count()
        }

        fn row_values(&self, start: usize, end: usize) -> Result<Vec<Vec<String>>, SheetError> {
            self.inner.row_values(start, end)
        }

        fn set_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
            self.inner.set_cell(row, col, value)
        }
    }

    #[test]
    fn missing_columns_are_appended_in_one_write() {
        let mut sheet = CountingSheet::with_header(&["company_name", "Subject", "about"]);
        let map = ensure_columns(&mut sheet, &REQUIRED_OUTPUT_COLUMNS).expect("ensure columns");

        assert_eq!(sheet.header_writes, 1);
        assert_eq!(
            sheet.inner.header().expect("header"),
            vec![
                "company_name",
                "Subject",
                "about",
                "Generated Email HTML",
                "Generated Email",
                "Company Information",
                "Full Email",
            ]
        );
        assert_eq!(map.get(SUBJECT_COLUMN), Some(2));
        assert_eq!(map.get(GENERATED_EMAIL_HTML_COLUMN), Some(4));
        assert_eq!(map.get(FULL_EMAIL_COLUMN), Some(7));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn second_call_performs_no_writes() {
        let mut sheet = CountingSheet::with_header(&["company_name"]);
        let first = ensure_columns(&mut sheet, &REQUIRED_OUTPUT_COLUMNS).expect("first");
        let second = ensure_columns(&mut sheet, &REQUIRED_OUTPUT_COLUMNS).expect("second");
        assert_eq!(sheet.header_writes, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let mut sheet = CountingSheet::with_header(&["subject"]);
        let map = ensure_columns(&mut sheet, &[SUBJECT_COLUMN]).expect("ensure columns");
        assert_eq!(map.get(SUBJECT_COLUMN), Some(2));
        assert_eq!(sheet.header_writes, 1);
    }

    #[test]
    fn empty_header_gets_every_column() {
        let mut sheet = CountingSheet {
            inner: MemorySheet::default(),
            header_writes: 0,
            fail_header_read: false,
        };
        let map = ensure_columns(&mut sheet, &REQUIRED_OUTPUT_COLUMNS).expect("ensure columns");
        let positions: Vec<usize> = REQUIRED_OUTPUT_COLUMNS
            .iter()
            .filter_map(|name| map.get(name))
            .collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn unreadable_header_is_a_schema_error() {
        let mut sheet = CountingSheet::with_header(&[]);
        sheet.fail_header_read = true;
        let err = ensure_columns(&mut sheet, &REQUIRED_OUTPUT_COLUMNS).expect_err("schema error");
        assert_eq!(err, SchemaError(SheetError::Permanent("no access".to_string())));
        assert_eq!(sheet.header_writes, 0);
    }
}
