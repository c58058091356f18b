//! # countytab-core
//!
//! Normalization of public health spreadsheet exports into a canonical
//! entity x date table.
//!
//! This crate provides:
//! - Header matchers resolving the many column header encodings to dates
//! - Reference entity lists used to filter and order rows
//! - The normalizer and its options
//! - The canonical table and derived series (totals, daily changes)
//!
//! ```
//! use countytab_core::{normalize, EntityList, NormalizeOptions};
//! use countytab_sheet::{CellValue, Sheet};
//!
//! let raw = Sheet::from_data(vec![
//!     vec![CellValue::from("County"), CellValue::from("Cases\n08/10/2020")],
//!     vec![CellValue::from("HARRIS"), CellValue::Int(100)],
//! ]);
//! let entities = EntityList::new(["Harris"]).unwrap();
//!
//! let table = normalize(&raw, &entities, &NormalizeOptions::new(2020)).unwrap();
//! assert_eq!(table.date_labels(), ["2020-08-10"]);
//! ```

/// Reference entity lists.
pub mod entities;
/// Error types and result aliases.
pub mod error;
/// Column header classification.
pub mod header;
/// The normalization pipeline.
pub mod normalize;
/// Normalization settings.
pub mod options;
/// Derived date series.
pub mod series;
/// The canonical entity x date table.
pub mod table;

pub use entities::{normalize_label, EntityList};
pub use error::{NormalizeError, Result};
pub use header::{
    DateCellMatcher, HeaderContext, HeaderMatch, HeaderMatcher, HeaderParser, IsoDateMatcher,
    RangeMarkerMatcher, TrailingTokenMatcher,
};
pub use normalize::{normalize, normalize_with_report, NormalizeReport, Normalized, Normalizer};
pub use options::{EntityPolicy, NormalizeOptions};
pub use series::{Series, SummaryRow};
pub use table::{CanonicalTable, DATE_FORMAT, ENTITY_HEADER, MISSING_PLACEHOLDER};
