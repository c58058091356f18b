use crate::a1_notation;
use crate::cell::CellValue;
use crate::error::{Result, SheetError};

static NULL_CELL: CellValue = CellValue::Null;

/// A sheet representing a 2D grid of cells (row-major storage)
///
/// Rows may be ragged; cells past the end of a short row read as
/// [`CellValue::Null`] through [`Sheet::cell`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    data: Vec<Vec<CellValue>>,
    origin_row: usize,
}

impl Sheet {
    /// Create a new empty sheet
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Sheet1")
    }

    /// Create a new empty sheet with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            data: Vec::new(),
            origin_row: 0,
        }
    }

    /// Create a sheet from a 2D vector of values
    #[must_use]
    pub fn from_data<T: Into<CellValue>>(data: Vec<Vec<T>>) -> Self {
        let converted: Vec<Vec<CellValue>> = data
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        Sheet {
            name: "Sheet1".to_string(),
            data: converted,
            origin_row: 0,
        }
    }

    /// Get the sheet name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Get the number of columns (width of the widest row)
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.data.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Check if the sheet is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of source rows dropped above row 0 when the sheet was loaded
    #[must_use]
    pub fn origin_row(&self) -> usize {
        self.origin_row
    }

    /// Drop `count` leading rows (title banners above the header row).
    ///
    /// The dropped rows are remembered so [`Sheet::cell_ref`] still points at
    /// the cell as it appears in the source file.
    pub fn skip_rows(&mut self, count: usize) {
        let count = count.min(self.data.len());
        self.data.drain(..count);
        self.origin_row += count;
    }

    /// Get a cell value, treating anything outside the grid as null
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL_CELL)
    }

    /// Set a cell value, growing the row with nulls if needed
    pub fn set<T: Into<CellValue>>(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let rows = self.row_count();
        let cols = self.col_count();
        let target = self
            .data
            .get_mut(row)
            .ok_or(SheetError::IndexOutOfBounds { row, col, rows, cols })?;
        if target.len() <= col {
            target.resize(col + 1, CellValue::Null);
        }
        target[col] = value.into();
        Ok(())
    }

    /// Append a row
    pub fn row_append<T: Into<CellValue>>(&mut self, data: Vec<T>) {
        self.data.push(data.into_iter().map(Into::into).collect());
    }

    /// A1-style reference of a cell in the source file
    #[must_use]
    pub fn cell_ref(&self, row: usize, col: usize) -> String {
        a1_notation::cell_ref(row + self.origin_row, col)
    }

    /// Get the underlying data
    #[must_use]
    pub fn data(&self) -> &Vec<Vec<CellValue>> {
        &self.data
    }

    /// Get mutable access to the underlying data
    pub fn data_mut(&mut self) -> &mut Vec<Vec<CellValue>> {
        &mut self.data
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}
