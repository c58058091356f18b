//! Date-indexed series derived from a canonical table: statewide totals,
//! daily changes and trailing averages.

use crate::table::{CanonicalTable, DATE_FORMAT};
use chrono::NaiveDate;
use serde::Serialize;

/// A date-ordered sequence of optional values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

/// One line of a cumulative/daily/average summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub cumulative: Option<f64>,
    pub daily: Option<f64>,
    pub rolling_average: Option<f64>,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

impl Series {
    /// Pair dates with values; extra entries on either side are dropped
    #[must_use]
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Self {
        let len = dates.len().min(values.len());
        let mut dates = dates;
        let mut values = values;
        dates.truncate(len);
        values.truncate(len);
        Series { dates, values }
    }

    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value on a date
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.dates.binary_search(&date).ok()?;
        self.values[idx]
    }

    /// Iterate over (date, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// `value[t] - value[t-1]`; the first sample, and any sample next to a
    /// missing one, has no delta.
    #[must_use]
    pub fn daily_deltas(&self) -> Series {
        let mut deltas = Vec::with_capacity(self.values.len());
        for (i, current) in self.values.iter().enumerate() {
            let previous = if i == 0 { None } else { self.values[i - 1] };
            deltas.push(match (previous, current) {
                (Some(p), Some(c)) => Some(c - p),
                _ => None,
            });
        }
        Series {
            dates: self.dates.clone(),
            values: deltas,
        }
    }

    /// Trailing mean over `window` samples.
    ///
    /// Undefined until `window` samples are available, and for any window
    /// containing a missing sample. A zero window yields no values.
    #[must_use]
    pub fn rolling_mean(&self, window: usize) -> Series {
        let values = (0..self.values.len())
            .map(|i| {
                if window == 0 || i + 1 < window {
                    return None;
                }
                let slice = &self.values[i + 1 - window..=i];
                let sum: Option<f64> = slice.iter().copied().sum();
                sum.map(|s| s / window as f64)
            })
            .collect();
        Series {
            dates: self.dates.clone(),
            values,
        }
    }

    /// Cumulative value, daily change and trailing average of the change
    /// for every date.
    #[must_use]
    pub fn summary(&self, window: usize) -> Vec<SummaryRow> {
        let daily = self.daily_deltas();
        let average = daily.rolling_mean(window);

        self.iter()
            .zip(daily.values.iter().zip(average.values.iter()))
            .map(|((date, cumulative), (daily, rolling_average))| SummaryRow {
                date,
                cumulative,
                daily: *daily,
                rolling_average: *rolling_average,
            })
            .collect()
    }
}

impl CanonicalTable {
    /// Per-date sum over all entities.
    ///
    /// Missing values are skipped. A date where every entity is missing has
    /// no total (`None`), not a zero total, so a fully unreported date shows
    /// up as a gap in `daily_deltas` and `rolling_mean` instead of a drop to 0.
    #[must_use]
    pub fn totals(&self) -> Series {
        let values = self
            .dates()
            .iter()
            .enumerate()
            .map(|(col, _)| {
                self.rows()
                    .filter_map(|(_, row)| row[col])
                    .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
            })
            .collect();
        Series::new(self.dates().to_vec(), values)
    }

    /// The values of one entity as a series
    #[must_use]
    pub fn series(&self, entity: &str) -> Option<Series> {
        self.row(entity)
            .map(|row| Series::new(self.dates().to_vec(), row.to_vec()))
    }
}
