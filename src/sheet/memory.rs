use super::SheetStore;
use crate::error::SheetError;

/// In-memory worksheet; `grid[0]` is the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySheet {
    grid: Vec<Vec<String>>,
}

impl MemorySheet {
    pub fn new(grid: Vec<Vec<String>>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &[Vec<String>] {
        &self.grid
    }

    /// Value at a 1-based address, if the cell exists.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if row == 0 || col == 0 {
            return None;
        }
        self.grid
            .get(row - 1)
            .and_then(|cells| cells.get(col - 1))
            .map(String::as_str)
    }
}

impl SheetStore for MemorySheet {
    fn header(&self) -> Result<Vec<String>, SheetError> {
        Ok(self.grid.first().cloned().unwrap_or_default())
    }

    fn set_header(&mut self, header: &[String]) -> Result<(), SheetError> {
        match self.grid.first_mut() {
            Some(first) => *first = header.to_vec(),
            None => self.grid.push(header.to_vec()),
        }
        Ok(())
    }

    fn data_row_count(&self) -> Result<usize, SheetError> {
        Ok(self.grid.len().saturating_sub(1))
    }

    fn row_values(&self, start: usize, end: usize) -> Result<Vec<Vec<String>>, SheetError> {
        if start == 0 || end < start {
            return Ok(Vec::new());
        }
        let last = end.min(self.grid.len());
        if start > last {
            return Ok(Vec::new());
        }
        Ok(self.grid[start - 1..last].to_vec())
    }

    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        if row == 0 || col == 0 {
            return Err(SheetError::Permanent(format!(
                "cell address ({row}, {col}) is not 1-based"
            )));
        }
        if self.grid.len() < row {
            self.grid.resize_with(row, Vec::new);
        }
        let cells = &mut self.grid[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
        Ok(())
    }
}
