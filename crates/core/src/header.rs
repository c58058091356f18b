//! Header classification.
//!
//! Column headers in the agency exports come in several encodings: real
//! date cells, `"Tests Through August 3*"`, `"Cases\n08/15/2020*"`,
//! `"Fatalities 08/15"`. Each encoding is handled by a [`HeaderMatcher`];
//! a [`HeaderParser`] tries its matchers in order and the first one that
//! claims a cell decides its date.

use chrono::NaiveDate;
use countytab_sheet::CellValue;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Settings a matcher may need to resolve a header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderContext<'a> {
    /// Year applied when the header carries only month and day
    pub fallback_year: i32,
    /// Marker introducing a range header ("Through")
    pub range_marker: &'a str,
}

/// Outcome of offering a header cell to one matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMatch {
    /// The matcher recognized the cell and resolved its date.
    Date(NaiveDate),
    /// Not this matcher's encoding; try the next one.
    Decline,
    /// The matcher recognized the encoding but the date is unusable.
    Invalid(String),
}

/// One header encoding.
pub trait HeaderMatcher: fmt::Debug + Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Try to resolve a header cell
    fn classify(&self, cell: &CellValue, ctx: &HeaderContext<'_>) -> HeaderMatch;
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").expect("valid regex"))
}

fn four_digit_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").expect("valid regex"))
}

/// Cells the workbook already stores as dates or date-times.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCellMatcher;

impl HeaderMatcher for DateCellMatcher {
    fn name(&self) -> &'static str {
        "date cell"
    }

    fn classify(&self, cell: &CellValue, _ctx: &HeaderContext<'_>) -> HeaderMatch {
        match cell.as_datetime() {
            Some(dt) => HeaderMatch::Date(dt.date()),
            None => HeaderMatch::Decline,
        }
    }
}

/// Text that is already an ISO `YYYY-MM-DD` date, as written by
/// [`crate::CanonicalTable::to_sheet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoDateMatcher;

impl HeaderMatcher for IsoDateMatcher {
    fn name(&self) -> &'static str {
        "ISO date"
    }

    fn classify(&self, cell: &CellValue, _ctx: &HeaderContext<'_>) -> HeaderMatch {
        let Some(text) = cell.as_text().map(str::trim) else {
            return HeaderMatch::Decline;
        };
        if !iso_date_re().is_match(text) {
            return HeaderMatch::Decline;
        }
        match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => HeaderMatch::Date(date),
            Err(e) => HeaderMatch::Invalid(format!("not a calendar date ({e})")),
        }
    }
}

/// Range headers such as `"Tests Through August 3*"`.
///
/// The text after the last range marker is read as `<Month> <Day>`; when it
/// carries no year of its own the fallback year is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeMarkerMatcher;

impl HeaderMatcher for RangeMarkerMatcher {
    fn name(&self) -> &'static str {
        "range marker"
    }

    fn classify(&self, cell: &CellValue, ctx: &HeaderContext<'_>) -> HeaderMatch {
        let Some(text) = cell.as_text() else {
            return HeaderMatch::Decline;
        };
        if ctx.range_marker.is_empty() {
            return HeaderMatch::Decline;
        }
        let Some((_, rest)) = text.rsplit_once(ctx.range_marker) else {
            return HeaderMatch::Decline;
        };

        let rest = rest.replace('*', "");
        let rest = rest.trim();
        if rest.is_empty() {
            return HeaderMatch::Invalid(format!("nothing follows {:?}", ctx.range_marker));
        }

        for format in ["%B %d, %Y", "%B %d %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(rest, format) {
                return HeaderMatch::Date(date);
            }
        }

        let with_year = format!("{rest} {}", ctx.fallback_year);
        match NaiveDate::parse_from_str(&with_year, "%B %d %Y") {
            Ok(date) => HeaderMatch::Date(date),
            Err(_) => HeaderMatch::Invalid(format!(
                "expected '<Month> <Day>' after {:?}, found {rest:?}",
                ctx.range_marker
            )),
        }
    }
}

/// Headers ending in a slash date, e.g. `"Cases\n08/15/2020*"` or
/// `"Fatalities 08/15"`.
///
/// Only the last whitespace-delimited token of the last line is considered.
/// A token with a four-digit year is read as `M/D/YYYY`; otherwise as `M/D`
/// in the fallback year.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingTokenMatcher;

impl HeaderMatcher for TrailingTokenMatcher {
    fn name(&self) -> &'static str {
        "trailing date token"
    }

    fn classify(&self, cell: &CellValue, ctx: &HeaderContext<'_>) -> HeaderMatch {
        let Some(text) = cell.as_text() else {
            return HeaderMatch::Decline;
        };
        let Some(token) = text
            .lines()
            .last()
            .and_then(|line| line.split_whitespace().last())
        else {
            return HeaderMatch::Decline;
        };

        let token = token.replace('*', "");
        if !token.contains('/') {
            return HeaderMatch::Decline;
        }

        let (candidate, expected) = if four_digit_year_re().is_match(&token) {
            (token.clone(), "M/D/YYYY")
        } else {
            (format!("{token}/{}", ctx.fallback_year), "M/D")
        };

        match NaiveDate::parse_from_str(&candidate, "%m/%d/%Y") {
            Ok(date) => HeaderMatch::Date(date),
            Err(_) => HeaderMatch::Invalid(format!("expected {expected}, found {token:?}")),
        }
    }
}

/// Ordered chain of header matchers; the first match wins.
#[derive(Debug)]
pub struct HeaderParser {
    matchers: Vec<Box<dyn HeaderMatcher>>,
}

impl HeaderParser {
    /// Build a parser from a custom matcher chain
    #[must_use]
    pub fn new(matchers: Vec<Box<dyn HeaderMatcher>>) -> Self {
        HeaderParser { matchers }
    }

    /// Names of the matchers, in the order they are tried
    pub fn matcher_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matchers.iter().map(|m| m.name())
    }

    /// Resolve a header cell to a date.
    ///
    /// # Errors
    ///
    /// Returns the reason when a matcher rejects the cell or none claims it.
    pub fn parse(&self, cell: &CellValue, ctx: &HeaderContext<'_>) -> Result<NaiveDate, String> {
        for matcher in &self.matchers {
            match matcher.classify(cell, ctx) {
                HeaderMatch::Date(date) => return Ok(date),
                HeaderMatch::Invalid(reason) => {
                    return Err(format!("{} header: {reason}", matcher.name()))
                }
                HeaderMatch::Decline => {}
            }
        }
        let tried: Vec<&str> = self.matcher_names().collect();
        Err(format!("no date encoding recognized (tried {})", tried.join(", ")))
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        HeaderParser::new(vec![
            Box::new(DateCellMatcher),
            Box::new(IsoDateMatcher),
            Box::new(RangeMarkerMatcher),
            Box::new(TrailingTokenMatcher),
        ])
    }
}
