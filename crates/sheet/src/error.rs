use thiserror::Error;

/// Errors that can occur while loading or writing sheets
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Index out of bounds: row {row}, col {col} (sheet has {rows} rows, {cols} cols)")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Workbook has no sheets: {path}")]
    EmptyWorkbook { path: String },

    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<calamine::Error> for SheetError {
    fn from(e: calamine::Error) -> Self {
        SheetError::Workbook(e.to_string())
    }
}

impl From<calamine::XlsxError> for SheetError {
    fn from(e: calamine::XlsxError) -> Self {
        SheetError::Workbook(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SheetError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        SheetError::Workbook(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
