use crate::csv::CsvOptions;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use crate::xlsx::XlsxReadOptions;
use std::path::Path;

/// Options for loading a sheet from a path of any supported format
#[derive(Debug, Clone, Default)]
pub struct FileLoadOptions {
    /// Worksheet name for workbook formats
    pub sheet_name: Option<String>,
    /// Leading rows to drop before the header row
    pub skip_rows: usize,
}

impl Sheet {
    /// Load a sheet, picking the reader from the file extension.
    ///
    /// `csv`/`txt` and `tsv` go through the CSV reader; `xlsx`, `xlsm`, `xlsb`,
    /// `xls` and `ods` through calamine.
    pub fn from_path<P: AsRef<Path>>(path: P, options: &FileLoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "txt" => Sheet::from_csv_with_options(
                path,
                CsvOptions::default().with_skip_rows(options.skip_rows),
            ),
            "tsv" => Sheet::from_csv_with_options(
                path,
                CsvOptions::tsv().with_skip_rows(options.skip_rows),
            ),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
                let mut xlsx_options = XlsxReadOptions::default().with_skip_rows(options.skip_rows);
                xlsx_options.sheet_name.clone_from(&options.sheet_name);
                Sheet::from_xlsx_with_options(path, xlsx_options)
            }
            _ => Err(SheetError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}
