//! Raw spreadsheet model for countytab
//!
//! A [`Sheet`] is the untouched cell grid of one worksheet: whatever the
//! agency export contains, title banners, footnotes and all. Sheets are
//! loaded from XLSX/XLS/ODS workbooks (via calamine) or CSV/TSV text and can
//! be written back out as CSV or XLSX.
//!
//! # Examples
//!
//! ```
//! use countytab_sheet::{CellValue, Sheet};
//!
//! let sheet = Sheet::from_data(vec![
//!     vec!["County", "Cases 08/10"],
//!     vec!["Harris", "100"],
//! ]);
//!
//! assert_eq!(sheet.row_count(), 2);
//! assert_eq!(sheet.cell(1, 0), &CellValue::from("Harris"));
//! assert_eq!(sheet.cell_ref(1, 1), "B2");
//! ```
//!
//! ```no_run
//! use countytab_sheet::{Sheet, XlsxReadOptions};
//!
//! // The DSHS workbooks carry a one-line title above the header row.
//! let options = XlsxReadOptions::default().with_skip_rows(1);
//! let sheet = Sheet::from_xlsx_with_options("TexasCOVID19DailyCountyCaseCountData.xlsx", options)?;
//! # Ok::<(), countytab_sheet::SheetError>(())
//! ```

pub mod a1_notation;
mod cell;
mod csv;
mod error;
mod load;
mod sheet;
mod xlsx;

/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export CSV options.
pub use csv::CsvOptions;
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export path-based load options.
pub use load::FileLoadOptions;
/// Re-export sheet type.
pub use sheet::Sheet;
/// Re-export workbook read options.
pub use xlsx::XlsxReadOptions;
