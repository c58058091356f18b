//! Spreadsheet normalization.
//!
//! Turns a raw agency export (row 0 headers, column 0 labels) into a
//! [`CanonicalTable`]:
//!
//! 1. trailing padding columns are trimmed and the shape is checked;
//! 2. every header is resolved to a date by the [`HeaderParser`];
//! 3. annotation rows and rows with blank cells are dropped;
//! 4. labels are re-cased and matched against the [`EntityList`];
//! 5. placeholder values become missing.

use crate::entities::{normalize_label, EntityList};
use crate::error::{NormalizeError, Result};
use crate::header::{HeaderContext, HeaderParser};
use crate::options::{EntityPolicy, NormalizeOptions};
use crate::table::CanonicalTable;
use chrono::NaiveDate;
use countytab_sheet::{CellValue, Sheet};
use std::collections::HashMap;

/// Counts of what normalization dropped or synthesized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Data rows in the source (excluding the header row)
    pub rows_read: usize,
    /// Rows dropped because their label is an annotation marker
    pub non_entity_rows: usize,
    /// Rows dropped because a label or value cell was blank
    pub incomplete_rows: usize,
    /// Complete rows whose label is not in the entity list
    pub unlisted_rows: usize,
    /// Trailing columns with neither header nor data
    pub padding_columns: usize,
    /// Reference entities left out under [`EntityPolicy::Skip`]
    pub skipped_entities: Vec<String>,
    /// Reference entities emitted as all-missing rows under [`EntityPolicy::Fill`]
    pub filled_entities: Vec<String>,
}

/// A canonical table together with its report.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub table: CanonicalTable,
    pub report: NormalizeReport,
}

/// Reusable normalizer: options plus a header matcher chain.
///
/// Holds no per-file state, so one instance can serve any number of files,
/// including from several threads at once.
#[derive(Debug)]
pub struct Normalizer {
    options: NormalizeOptions,
    parser: HeaderParser,
}

/// Normalize a raw sheet with the default header matchers.
///
/// # Errors
///
/// See [`NormalizeError`]; any error aborts the whole sheet.
pub fn normalize(
    sheet: &Sheet,
    entities: &EntityList,
    options: &NormalizeOptions,
) -> Result<CanonicalTable> {
    Normalizer::new(options.clone())
        .normalize(sheet, entities)
        .map(|normalized| normalized.table)
}

/// Like [`normalize`], also returning the [`NormalizeReport`].
///
/// # Errors
///
/// See [`NormalizeError`].
pub fn normalize_with_report(
    sheet: &Sheet,
    entities: &EntityList,
    options: &NormalizeOptions,
) -> Result<Normalized> {
    Normalizer::new(options.clone()).normalize(sheet, entities)
}

/// A complete data row that matched the entity list
struct MatchedRow {
    row: usize,
    values: Vec<Option<f64>>,
}

impl Normalizer {
    /// Create a normalizer with the default header matcher chain
    #[must_use]
    pub fn new(options: NormalizeOptions) -> Self {
        Normalizer {
            options,
            parser: HeaderParser::default(),
        }
    }

    /// Replace the header matcher chain
    #[must_use]
    pub fn with_parser(mut self, parser: HeaderParser) -> Self {
        self.parser = parser;
        self
    }

    /// The options in use
    #[must_use]
    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize a raw sheet into a canonical table.
    ///
    /// # Errors
    ///
    /// See [`NormalizeError`]; any error aborts the whole sheet.
    pub fn normalize(&self, sheet: &Sheet, entities: &EntityList) -> Result<Normalized> {
        let mut report = NormalizeReport::default();

        let columns = self.value_columns(sheet, &mut report)?;
        let dates = self.parse_headers(sheet, &columns)?;

        report.rows_read = sheet.row_count() - 1;
        let matched = self.match_rows(sheet, entities, &columns, &mut report)?;

        let mut rows = Vec::with_capacity(entities.len());
        for name in entities.iter() {
            if let Some(found) = matched.get(name) {
                rows.push((name.to_string(), found.values.clone()));
                continue;
            }
            match self.options.entity_policy {
                EntityPolicy::Strict => {
                    return Err(NormalizeError::MissingEntity {
                        name: name.to_string(),
                    })
                }
                EntityPolicy::Skip => report.skipped_entities.push(name.to_string()),
                EntityPolicy::Fill => {
                    rows.push((name.to_string(), vec![None; dates.len()]));
                    report.filled_entities.push(name.to_string());
                }
            }
        }

        if !report.skipped_entities.is_empty() || !report.filled_entities.is_empty() {
            tracing::warn!(
                sheet = sheet.name(),
                skipped = report.skipped_entities.len(),
                filled = report.filled_entities.len(),
                "reference entities missing from source: {}",
                report
                    .skipped_entities
                    .iter()
                    .chain(&report.filled_entities)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let table = CanonicalTable::from_rows(dates, rows)?;
        tracing::debug!(
            sheet = sheet.name(),
            entities = table.shape().0,
            dates = table.shape().1,
            non_entity_rows = report.non_entity_rows,
            incomplete_rows = report.incomplete_rows,
            unlisted_rows = report.unlisted_rows,
            "normalized sheet"
        );

        Ok(Normalized { table, report })
    }

    /// Indices of value columns, after trimming trailing columns that carry
    /// neither a header nor data. Checks the minimum table shape.
    fn value_columns(&self, sheet: &Sheet, report: &mut NormalizeReport) -> Result<Vec<usize>> {
        let mut width = sheet.col_count();
        while width > 1 && column_is_blank(sheet, width - 1) {
            width -= 1;
            report.padding_columns += 1;
        }

        if sheet.row_count() < 2 || width < 2 {
            return Err(NormalizeError::malformed(format!(
                "need at least 2 rows and 2 columns, found {} rows and {width} columns",
                sheet.row_count()
            )));
        }

        Ok((1..width).collect())
    }

    fn parse_headers(&self, sheet: &Sheet, columns: &[usize]) -> Result<Vec<NaiveDate>> {
        let ctx = HeaderContext {
            fallback_year: self.options.fallback_year,
            range_marker: &self.options.range_marker,
        };

        let mut seen: HashMap<NaiveDate, usize> = HashMap::new();
        let mut dates = Vec::with_capacity(columns.len());

        for &col in columns {
            let cell = sheet.cell(0, col);
            let date = if cell.is_blank() {
                Err("blank header above data".to_string())
            } else {
                self.parser.parse(cell, &ctx)
            }
            .map_err(|reason| NormalizeError::HeaderParse {
                cell: sheet.cell_ref(0, col),
                value: cell.to_string(),
                reason,
            })?;

            if let Some(&first) = seen.get(&date) {
                return Err(NormalizeError::DuplicateDate {
                    date: date.to_string(),
                    cell: sheet.cell_ref(0, col),
                    first: sheet.cell_ref(0, first),
                });
            }
            seen.insert(date, col);
            dates.push(date);
        }

        Ok(dates)
    }

    fn match_rows(
        &self,
        sheet: &Sheet,
        entities: &EntityList,
        columns: &[usize],
        report: &mut NormalizeReport,
    ) -> Result<HashMap<String, MatchedRow>> {
        let mut matched: HashMap<String, MatchedRow> = HashMap::new();

        for row in 1..sheet.row_count() {
            let label_cell = sheet.cell(row, 0);
            let label = label_cell.to_string();

            if self.options.is_non_entity(&label) {
                report.non_entity_rows += 1;
                continue;
            }

            if label_cell.is_blank()
                || columns.iter().any(|&c| sheet.cell(row, c).is_missing())
            {
                tracing::debug!(row = %sheet.cell_ref(row, 0), label = %label, "dropping incomplete row");
                report.incomplete_rows += 1;
                continue;
            }

            let name = normalize_label(&label);
            if !entities.contains(&name) {
                report.unlisted_rows += 1;
                continue;
            }

            if let Some(first) = matched.get(&name) {
                return Err(NormalizeError::DuplicateEntity {
                    name,
                    cell: sheet.cell_ref(row, 0),
                    first: sheet.cell_ref(first.row, 0),
                });
            }

            let values = columns
                .iter()
                .map(|&col| {
                    let cell = sheet.cell(row, col);
                    self.value_of(cell).ok_or_else(|| NormalizeError::InvalidValue {
                        entity: name.clone(),
                        cell: sheet.cell_ref(row, col),
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            matched.insert(name, MatchedRow { row, values });
        }

        Ok(matched)
    }

    /// `Some(None)` for placeholders and NaN, `Some(Some(v))` for finite
    /// numbers, `None` for anything unrecognized (infinities included)
    fn value_of(&self, cell: &CellValue) -> Option<Option<f64>> {
        match cell {
            CellValue::Int(i) => Some(Some(*i as f64)),
            CellValue::Float(f) => finite(*f),
            CellValue::String(s) if self.options.is_placeholder(s) => Some(None),
            CellValue::String(s) => s.trim().replace(',', "").parse::<f64>().ok().and_then(finite),
            CellValue::Null | CellValue::Bool(_) | CellValue::DateTime(_) => None,
        }
    }
}

fn finite(value: f64) -> Option<Option<f64>> {
    if value.is_nan() {
        Some(None)
    } else if value.is_infinite() {
        None
    } else {
        Some(Some(value))
    }
}

fn column_is_blank(sheet: &Sheet, col: usize) -> bool {
    (0..sheet.row_count()).all(|row| sheet.cell(row, col).is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> NormalizeOptions {
        NormalizeOptions::new(2020)
    }

    fn raw_export() -> Sheet {
        Sheet::from_data(vec![
            vec![
                CellValue::from("County"),
                CellValue::from("Cases\n08/10/2020"),
                CellValue::from("Cases\n08/11/2020"),
            ],
            vec![CellValue::from("Harris"), CellValue::Int(100), CellValue::Int(120)],
            vec![CellValue::from("Travis"), CellValue::Int(50), CellValue::Int(60)],
            vec![
                CellValue::from("Notes"),
                CellValue::Float(f64::NAN),
                CellValue::Float(f64::NAN),
            ],
        ])
    }

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    #[test]
    fn test_missing_reference_entity_is_fatal_by_default() {
        let entities = EntityList::new(["Harris", "Travis", "Bexar"]).unwrap();
        let err = normalize(&raw_export(), &entities, &options()).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingEntity { ref name } if name == "Bexar"));
    }

    #[test]
    fn test_skip_policy() {
        let entities = EntityList::new(["Harris", "Travis", "Bexar"]).unwrap();
        let opts = options().with_entity_policy(EntityPolicy::Skip);
        let normalized = normalize_with_report(&raw_export(), &entities, &opts).unwrap();

        let table = &normalized.table;
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(table.entities(), ["Harris", "Travis"]);
        assert_eq!(table.dates(), [ymd(8, 10), ymd(8, 11)]);
        assert_eq!(table.get("Harris", ymd(8, 10)), Some(100.0));
        assert_eq!(table.get("Travis", ymd(8, 11)), Some(60.0));

        assert_eq!(normalized.report.rows_read, 3);
        assert_eq!(normalized.report.non_entity_rows, 1);
        assert_eq!(normalized.report.skipped_entities, ["Bexar"]);
    }

    #[test]
    fn test_fill_policy() {
        let entities = EntityList::new(["Bexar", "Harris", "Travis"]).unwrap();
        let opts = options().with_entity_policy(EntityPolicy::Fill);
        let normalized = Normalizer::new(opts).normalize(&raw_export(), &entities).unwrap();

        assert_eq!(normalized.table.entities(), ["Bexar", "Harris", "Travis"]);
        assert_eq!(normalized.table.row("Bexar").unwrap(), [None, None]);
        assert_eq!(normalized.report.filled_entities, ["Bexar"]);
    }

    #[test]
    fn test_labels_recased_and_filtered() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("Fatalities 08/15")],
            vec![CellValue::from("  HARRIS "), CellValue::Int(7)],
            vec![CellValue::from("Total"), CellValue::Int(9)],
            vec![CellValue::from("Travis"), CellValue::Null],
            vec![CellValue::Null, CellValue::Int(3)],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();

        let normalized = Normalizer::new(options()).normalize(&sheet, &entities).unwrap();
        assert_eq!(normalized.table.get("Harris", ymd(8, 15)), Some(7.0));
        assert_eq!(normalized.report.unlisted_rows, 1);
        assert_eq!(normalized.report.incomplete_rows, 2);
    }

    #[test]
    fn test_placeholders_are_missing_not_zero() {
        let sheet = Sheet::from_data(vec![
            vec![
                CellValue::from("County"),
                CellValue::from("Cases 08/01"),
                CellValue::from("Cases 08/02"),
                CellValue::from("Cases 08/03"),
            ],
            vec![
                CellValue::from("Loving"),
                CellValue::from("--"),
                CellValue::from("-"),
                CellValue::Int(0),
            ],
        ]);
        let entities = EntityList::new(["Loving"]).unwrap();

        let table = normalize(&sheet, &entities, &options()).unwrap();
        assert_eq!(table.row("Loving").unwrap(), [None, None, Some(0.0)]);
    }

    #[test]
    fn test_invalid_value_names_cell() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("Cases 08/01")],
            vec![CellValue::from("Harris"), CellValue::from("lots")],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();

        let err = normalize(&sheet, &entities, &options()).unwrap_err();
        assert!(
            matches!(err, NormalizeError::InvalidValue { ref cell, .. } if cell == "B2"),
            "{err}"
        );
    }

    #[test]
    fn test_header_errors_name_cell() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("Cases 08/01"), CellValue::from("Cases")],
            vec![CellValue::from("Harris"), CellValue::Int(1), CellValue::Int(2)],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();

        let err = normalize(&sheet, &entities, &options()).unwrap_err();
        assert!(
            matches!(err, NormalizeError::HeaderParse { ref cell, .. } if cell == "C1"),
            "{err}"
        );
    }

    #[test]
    fn test_duplicate_dates_and_entities() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("Cases 08/01"), CellValue::from("Tests Through August 1")],
            vec![CellValue::from("Harris"), CellValue::Int(1), CellValue::Int(2)],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();
        let err = normalize(&sheet, &entities, &options()).unwrap_err();
        assert!(matches!(err, NormalizeError::DuplicateDate { .. }), "{err}");

        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("Cases 08/01")],
            vec![CellValue::from("Harris"), CellValue::Int(1)],
            vec![CellValue::from("HARRIS"), CellValue::Int(2)],
        ]);
        let err = normalize(&sheet, &entities, &options()).unwrap_err();
        assert!(
            matches!(err, NormalizeError::DuplicateEntity { ref cell, ref first, .. } if cell == "A3" && first == "A2"),
            "{err}"
        );
    }

    #[test]
    fn test_custom_header_chain() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("2020-08-10")],
            vec![CellValue::from("Harris"), CellValue::Int(5)],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();
        let parser = HeaderParser::new(vec![Box::new(crate::header::TrailingTokenMatcher)]);

        let err = Normalizer::new(options())
            .with_parser(parser)
            .normalize(&sheet, &entities)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::HeaderParse { .. }), "{err}");
    }

    #[test]
    fn test_renormalizing_output_is_identity() {
        let mut raw = raw_export();
        raw.row_append(vec![CellValue::from("LOVING"), CellValue::from("--"), CellValue::Int(1)]);
        let entities = EntityList::new(["Harris", "Travis", "Loving", "Bexar"]).unwrap();
        let opts = options().with_entity_policy(EntityPolicy::Fill);

        let table = normalize(&raw, &entities, &opts).unwrap();
        assert_eq!(table.row("Loving").unwrap(), [None, Some(1.0)]);
        assert_eq!(table.row("Bexar").unwrap(), [None, None]);

        let again = normalize(&table.to_sheet(), &entities, &options()).unwrap();
        assert_eq!(again, table);

        let opts = options().with_placeholders(["n/a"]);
        let again = normalize(&table.to_sheet_with_placeholder("n/a"), &entities, &opts).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn test_value_of() {
        let normalizer = Normalizer::new(options());
        assert_eq!(normalizer.value_of(&CellValue::Int(3)), Some(Some(3.0)));
        assert_eq!(normalizer.value_of(&CellValue::Float(f64::NAN)), Some(None));
        assert_eq!(normalizer.value_of(&CellValue::from("--")), Some(None));
        assert_eq!(normalizer.value_of(&CellValue::from(" - ")), Some(None));
        assert_eq!(normalizer.value_of(&CellValue::from("1,234")), Some(Some(1234.0)));
        assert_eq!(normalizer.value_of(&CellValue::from("0")), Some(Some(0.0)));
        assert_eq!(normalizer.value_of(&CellValue::from("n/a")), None);
        assert_eq!(normalizer.value_of(&CellValue::Bool(true)), None);
        assert_eq!(normalizer.value_of(&CellValue::from("NaN")), Some(None));
        assert_eq!(normalizer.value_of(&CellValue::from("inf")), None);
        assert_eq!(normalizer.value_of(&CellValue::Float(f64::NEG_INFINITY)), None);
    }

    #[test]
    fn test_nan_cells_make_row_incomplete() {
        let sheet = Sheet::from_data(vec![
            vec![
                CellValue::from("County"),
                CellValue::from("Cases\n08/10/2020"),
                CellValue::from("Cases\n08/11/2020"),
            ],
            vec![CellValue::from("Harris"), CellValue::Int(100), CellValue::Float(f64::NAN)],
            vec![CellValue::from("Travis"), CellValue::Int(50), CellValue::Int(60)],
        ]);
        let entities = EntityList::new(["Harris", "Travis"]).unwrap();
        let opts = options().with_entity_policy(EntityPolicy::Skip);

        let normalized = normalize_with_report(&sheet, &entities, &opts).unwrap();
        assert_eq!(normalized.table.entities(), ["Travis"]);
        assert_eq!(normalized.report.incomplete_rows, 1);
        assert_eq!(normalized.report.skipped_entities, ["Harris"]);
    }

    #[test]
    fn test_text_nan_is_missing_and_infinity_is_invalid() {
        let header = vec![CellValue::from("County"), CellValue::from("Cases 08/01")];
        let entities = EntityList::new(["Harris"]).unwrap();

        let sheet = Sheet::from_data(vec![
            header.clone(),
            vec![CellValue::from("Harris"), CellValue::from("NaN")],
        ]);
        let table = normalize(&sheet, &entities, &options()).unwrap();
        assert_eq!(table.row("Harris").unwrap(), [None]);

        let sheet = Sheet::from_data(vec![
            header,
            vec![CellValue::from("Harris"), CellValue::from("inf")],
        ]);
        let err = normalize(&sheet, &entities, &options()).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidValue { .. }), "{err}");
    }

    #[test]
    fn test_padding_columns_trimmed() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::from("2020-08-10"), CellValue::Null],
            vec![CellValue::from("Harris"), CellValue::Int(1), CellValue::from(" ")],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();

        let normalized = Normalizer::new(options()).normalize(&sheet, &entities).unwrap();
        assert_eq!(normalized.report.padding_columns, 1);
        assert_eq!(normalized.table.shape(), (1, 1));
    }

    #[test]
    fn test_shape_checked_after_trimming() {
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("County"), CellValue::Null],
            vec![CellValue::from("Harris"), CellValue::Null],
        ]);
        let entities = EntityList::new(["Harris"]).unwrap();

        let err = normalize(&sheet, &entities, &options()).unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedTable { .. }), "{err}");
    }
}
