use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use calamine::{open_workbook_auto, Data, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_xlsxwriter::{Format, Workbook};
use std::io::{Read, Seek};
use std::path::Path;

/// Longest worksheet name Excel accepts
const MAX_SHEET_NAME: usize = 31;

/// Options for reading Excel files
#[derive(Debug, Clone, Default)]
pub struct XlsxReadOptions {
    /// Worksheet to read; the first sheet when unset
    pub sheet_name: Option<String>,
    /// Leading rows to drop before the header row
    pub skip_rows: usize,
}

impl XlsxReadOptions {
    /// Select a worksheet by name
    #[must_use]
    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    /// Set the number of leading rows to skip
    #[must_use]
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }
}

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(format!("#ERROR: {e:?}")),
    }
}

/// ODS files report dates as ISO strings rather than serial numbers
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Build a sheet from a calamine range.
///
/// calamine trims empty leading rows and columns from a range; they are
/// restored here so cell positions match the source file.
fn sheet_from_range(name: &str, range: &Range<Data>, skip_rows: usize) -> Sheet {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut data: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut row_data = vec![CellValue::Null; start_col as usize];
        row_data.extend(row.iter().map(data_to_cell_value));
        data.push(row_data);
    }

    let mut sheet = Sheet::with_name(name);
    *sheet.data_mut() = data;
    sheet.skip_rows(skip_rows);
    sheet
}

/// Pick the requested sheet name, defaulting to the first one
fn resolve_sheet_name(names: &[String], requested: Option<&str>, path: &str) -> Result<String> {
    match requested {
        Some(name) if names.iter().any(|n| n == name) => Ok(name.to_string()),
        Some(name) => Err(SheetError::SheetNotFound {
            name: name.to_string(),
        }),
        None => names.first().cloned().ok_or(SheetError::EmptyWorkbook {
            path: path.to_string(),
        }),
    }
}

impl Sheet {
    /// Load the first sheet of a workbook (xlsx, xlsm, xls, xlsb or ods)
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened or read.
    pub fn from_xlsx<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_xlsx_with_options(path, XlsxReadOptions::default())
    }

    /// Load a specific sheet from a workbook by name
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened, sheet not found, or read fails.
    pub fn from_xlsx_sheet<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Self> {
        Self::from_xlsx_with_options(path, XlsxReadOptions::default().with_sheet(sheet_name))
    }

    /// Load a sheet from a workbook with options
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened, sheet not found, or read fails.
    pub fn from_xlsx_with_options<P: AsRef<Path>>(path: P, options: XlsxReadOptions) -> Result<Self> {
        let display = path.as_ref().display().to_string();
        let mut workbook = open_workbook_auto(path.as_ref())?;

        let name = resolve_sheet_name(
            &workbook.sheet_names(),
            options.sheet_name.as_deref(),
            &display,
        )?;
        let range = workbook.worksheet_range(&name)?;

        Ok(sheet_from_range(&name, &range, options.skip_rows))
    }

    /// Load a sheet from an in-memory or streamed xlsx workbook
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid xlsx workbook or the sheet is missing.
    pub fn from_xlsx_reader<R: Read + Seek>(reader: R, options: XlsxReadOptions) -> Result<Self> {
        let mut workbook: Xlsx<R> = Xlsx::new(reader)?;

        let name = resolve_sheet_name(
            &workbook.sheet_names(),
            options.sheet_name.as_deref(),
            "<stream>",
        )?;
        let range = workbook.worksheet_range(&name)?;

        Ok(sheet_from_range(&name, &range, options.skip_rows))
    }

    /// Save the sheet to an Excel file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or written.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(worksheet_name(self.name()))?;

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

        for (row_idx, row) in self.data().iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let row_num = u32::try_from(row_idx)
                    .map_err(|_| SheetError::Workbook("Row index overflow".to_string()))?;
                let col_num = u16::try_from(col_idx)
                    .map_err(|_| SheetError::Workbook("Column index overflow".to_string()))?;

                match cell {
                    CellValue::Null => {} // Leave empty
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(row_num, col_num, *b)?;
                    }
                    CellValue::Int(i) => {
                        // Excel stores all numbers as f64
                        worksheet.write_number(row_num, col_num, *i as f64)?;
                    }
                    CellValue::Float(f) => {
                        worksheet.write_number(row_num, col_num, *f)?;
                    }
                    CellValue::DateTime(dt) => {
                        let format = if dt.time() == NaiveTime::MIN {
                            &date_format
                        } else {
                            &datetime_format
                        };
                        worksheet.write_datetime_with_format(row_num, col_num, dt, format)?;
                    }
                    CellValue::String(s) => {
                        worksheet.write_string(row_num, col_num, s)?;
                    }
                }
            }
        }

        workbook.save(path.as_ref())?;

        Ok(())
    }
}

/// Excel rejects long sheet names and a handful of punctuation characters
fn worksheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}
