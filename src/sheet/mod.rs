//! Spreadsheet stores and the lead record read from them.
//!
//! Rows and columns are 1-based everywhere, matching the addresses a user sees
//! in the spreadsheet UI. Row 1 is always the header.
mod google;
mod memory;
mod workbook;

pub use google::{col_letter, GoogleSheet, GOOGLE_SHEETS_API_BASE};
pub use memory::MemorySheet;
pub use workbook::WorkbookFile;

use crate::error::SheetError;
use serde::Serialize;

/// Input column names expected in the header row.
pub const COMPANY_NAME_COLUMN: &str = "company_name";
pub const COMPANY_DOMAIN_COLUMN: &str = "company_domain";
pub const CONTACT_NAME_COLUMN: &str = "full_name";
pub const CONTACT_HEADLINE_COLUMN: &str = "headline";
pub const CONTACT_ABOUT_COLUMN: &str = "about";
pub const COMPANY_ABOUT_COLUMN: &str = "company_about";

pub const INPUT_COLUMNS: [&str; 6] = [
    COMPANY_NAME_COLUMN,
    COMPANY_DOMAIN_COLUMN,
    CONTACT_NAME_COLUMN,
    CONTACT_HEADLINE_COLUMN,
    CONTACT_ABOUT_COLUMN,
    COMPANY_ABOUT_COLUMN,
];

/// One lead, addressed by its sheet row.
///
/// Only the input fields are carried; output columns are write-only from the
/// pipeline's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowRecord {
    pub index: usize,
    pub company_name: String,
    pub company_domain: String,
    pub contact_name: String,
    pub contact_headline: String,
    pub contact_about: String,
    pub company_about: String,
}

impl RowRecord {
    /// Build a record from raw cells, looking columns up by header name.
    ///
    /// Missing columns and short rows read as empty text.
    pub fn from_cells(index: usize, header: &[String], cells: &[String]) -> Self {
        let field = |name: &str| -> String {
            header
                .iter()
                .position(|column| column == name)
                .and_then(|pos| cells.get(pos))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        Self {
            index,
            company_name: field(COMPANY_NAME_COLUMN),
            company_domain: field(COMPANY_DOMAIN_COLUMN),
            contact_name: field(CONTACT_NAME_COLUMN),
            contact_headline: field(CONTACT_HEADLINE_COLUMN),
            contact_about: field(CONTACT_ABOUT_COLUMN),
            company_about: field(COMPANY_ABOUT_COLUMN),
        }
    }

    /// True when every input field is empty.
    pub fn is_blank(&self) -> bool {
        [
            &self.company_name,
            &self.company_domain,
            &self.contact_name,
            &self.contact_headline,
            &self.contact_about,
            &self.company_about,
        ]
        .iter()
        .all(|value| value.is_empty())
    }
}

/// Row-oriented access to one worksheet.
pub trait SheetStore {
    /// Read the header row; an empty sheet yields an empty header.
    fn header(&self) -> Result<Vec<String>, SheetError>;

    /// Replace the whole header row in one call.
    fn set_header(&mut self, header: &[String]) -> Result<(), SheetError>;

    /// Number of data rows below the header.
    fn data_row_count(&self) -> Result<usize, SheetError>;

    /// Raw cell values for rows `start..=end`, clipped to the sheet extent.
    fn row_values(&self, start: usize, end: usize) -> Result<Vec<Vec<String>>, SheetError>;

    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError>;

    /// Lead records for rows `start..=end`.
    fn rows(&self, start: usize, end: usize) -> Result<Vec<RowRecord>, SheetError> {
        let header = self.header()?;
        let values = self.row_values(start, end)?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(offset, cells)| RowRecord::from_cells(start + offset, &header, cells))
            .collect())
    }
}
