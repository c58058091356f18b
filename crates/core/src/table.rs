//! The normalized county x date table.

use crate::error::{NormalizeError, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use chrono::NaiveDate;
use countytab_sheet::{CellValue, Sheet};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

/// Header of the entity column when a table is rendered back to a sheet
pub const ENTITY_HEADER: &str = "entity";

/// Format used for date column labels
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text written for missing values when a table is rendered back to a sheet
pub const MISSING_PLACEHOLDER: &str = "--";

/// Entity x date table of optional values.
///
/// Columns are always sorted ascending by date and unique; row labels are
/// unique. `None` marks a value the source did not report.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    entities: Vec<String>,
    dates: Vec<NaiveDate>,
    values: Vec<Vec<Option<f64>>>,
}

impl CanonicalTable {
    /// Build a table from dates and labelled rows.
    ///
    /// Columns are sorted by date; row order is kept.
    ///
    /// # Errors
    ///
    /// Fails with [`NormalizeError::MalformedTable`] when a row length does
    /// not match the number of dates, or dates or entities repeat.
    pub fn from_rows(dates: Vec<NaiveDate>, rows: Vec<(String, Vec<Option<f64>>)>) -> Result<Self> {
        let mut seen_dates = HashSet::new();
        if let Some(date) = dates.iter().find(|d| !seen_dates.insert(**d)) {
            return Err(NormalizeError::malformed(format!("date {date} appears twice")));
        }

        let mut seen_entities = HashSet::new();
        let mut entities = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (entity, row) in rows {
            if row.len() != dates.len() {
                return Err(NormalizeError::malformed(format!(
                    "row {entity:?} has {} values for {} dates",
                    row.len(),
                    dates.len()
                )));
            }
            if !seen_entities.insert(entity.clone()) {
                return Err(NormalizeError::malformed(format!(
                    "entity {entity:?} appears twice"
                )));
            }
            entities.push(entity);
            values.push(row);
        }

        let mut table = CanonicalTable {
            entities,
            dates,
            values,
        };
        table.sort_columns();
        Ok(table)
    }

    fn sort_columns(&mut self) {
        if self.dates.windows(2).all(|w| w[0] < w[1]) {
            return;
        }
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);

        self.dates = order.iter().map(|&i| self.dates[i]).collect();
        for row in &mut self.values {
            *row = order.iter().map(|&i| row[i]).collect();
        }
    }

    /// Row labels in order
    #[must_use]
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Column dates, ascending
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column labels as `YYYY-MM-DD` strings
    #[must_use]
    pub fn date_labels(&self) -> Vec<String> {
        self.dates
            .iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect()
    }

    /// Most recent date, if the table has any columns
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// (rows, columns)
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.entities.len(), self.dates.len())
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn entity_index(&self, entity: &str) -> Option<usize> {
        self.entities.iter().position(|e| e == entity)
    }

    fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Value for an entity on a date; `None` when either is absent or the
    /// value is missing
    #[must_use]
    pub fn get(&self, entity: &str, date: NaiveDate) -> Option<f64> {
        let row = self.entity_index(entity)?;
        let col = self.date_index(date)?;
        self.values[row][col]
    }

    /// All values of one entity, in date order
    #[must_use]
    pub fn row(&self, entity: &str) -> Option<&[Option<f64>]> {
        self.entity_index(entity).map(|i| self.values[i].as_slice())
    }

    /// All values on one date, in entity order
    #[must_use]
    pub fn column(&self, date: NaiveDate) -> Option<Vec<Option<f64>>> {
        let col = self.date_index(date)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }

    /// Iterate over (entity, values) pairs
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.entities
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Keep only columns on or before `cutoff`.
    ///
    /// Used to drop recent dates the agency flags as still incomplete.
    #[must_use]
    pub fn through(&self, cutoff: NaiveDate) -> CanonicalTable {
        let keep = self.dates.partition_point(|d| *d <= cutoff);
        CanonicalTable {
            entities: self.entities.clone(),
            dates: self.dates[..keep].to_vec(),
            values: self.values.iter().map(|row| row[..keep].to_vec()).collect(),
        }
    }

    /// Entities ranked by their value on `date`, largest first.
    ///
    /// Missing values sort last; ties keep table order. Returns `None` when
    /// the date is not a column.
    #[must_use]
    pub fn ranked_by(&self, date: NaiveDate) -> Option<Vec<(&str, Option<f64>)>> {
        let column = self.column(date)?;
        let mut ranked: Vec<(&str, Option<f64>)> = self
            .entities
            .iter()
            .map(String::as_str)
            .zip(column)
            .collect();
        ranked.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Some(ranked)
    }

    /// Render as a raw sheet: an `entity` header followed by ISO date
    /// labels, one row per entity, missing values as [`MISSING_PLACEHOLDER`].
    #[must_use]
    pub fn to_sheet(&self) -> Sheet {
        self.to_sheet_with_placeholder(MISSING_PLACEHOLDER)
    }

    /// Like [`CanonicalTable::to_sheet`], writing missing values as
    /// `placeholder`.
    ///
    /// The placeholder must be one the normalizer recognizes, or the output
    /// cannot be normalized again.
    #[must_use]
    pub fn to_sheet_with_placeholder(&self, placeholder: &str) -> Sheet {
        let mut sheet = Sheet::new();

        let mut header = vec![CellValue::from(ENTITY_HEADER)];
        header.extend(self.date_labels().into_iter().map(CellValue::from));
        sheet.row_append(header);

        for (entity, values) in self.rows() {
            let mut row = vec![CellValue::from(entity)];
            row.extend(values.iter().map(|v| match v {
                Some(v) => CellValue::Float(*v),
                None => CellValue::from(placeholder),
            }));
            sheet.row_append(row);
        }

        sheet
    }

    /// Nested map `entity -> (date label -> value)` in table order
    #[must_use]
    pub fn to_map(&self) -> IndexMap<String, IndexMap<String, Option<f64>>> {
        let labels = self.date_labels();
        self.rows()
            .map(|(entity, values)| {
                let row = labels.iter().cloned().zip(values.iter().copied()).collect();
                (entity.to_string(), row)
            })
            .collect()
    }

    /// Arrow batch with a non-null `entity` column and one nullable
    /// `Float64` column per date.
    pub fn to_record_batch(&self) -> std::result::Result<RecordBatch, ArrowError> {
        let mut fields = vec![Field::new(ENTITY_HEADER, DataType::Utf8, false)];
        fields.extend(
            self.date_labels()
                .into_iter()
                .map(|label| Field::new(label, DataType::Float64, true)),
        );
        let schema = Arc::new(Schema::new(fields));

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.dates.len() + 1);
        arrays.push(Arc::new(StringArray::from_iter_values(self.entities.iter())));
        for col in 0..self.dates.len() {
            let values: Vec<Option<f64>> = self.values.iter().map(|row| row[col]).collect();
            arrays.push(Arc::new(Float64Array::from(values)));
        }

        RecordBatch::try_new(schema, arrays)
    }
}

impl Serialize for CanonicalTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
