//! Reference entity lists.

use crate::error::{NormalizeError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Canonical casing for entity labels: trimmed, lower-cased, first letter
/// upper-cased ("HARRIS" and "harris" both become "Harris").
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered set of valid entity names.
///
/// Acts both as the row filter and as the output row order of a
/// [`crate::CanonicalTable`]. Names are stored in canonical casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityList {
    names: Vec<String>,
    index: HashSet<String>,
}

impl EntityList {
    /// Build a list from names, normalizing their casing.
    ///
    /// # Errors
    ///
    /// Fails when the list is empty, a name is blank, or two names collide
    /// after normalization.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = EntityList {
            names: Vec::new(),
            index: HashSet::new(),
        };

        for (position, raw) in names.into_iter().enumerate() {
            let name = normalize_label(raw.as_ref());
            if name.is_empty() {
                return Err(NormalizeError::EntityList(format!(
                    "blank name at position {position}"
                )));
            }
            if list.index.contains(&name) {
                return Err(NormalizeError::EntityList(format!(
                    "duplicate name {name:?} at position {position}"
                )));
            }
            list.index.insert(name.clone());
            list.names.push(name);
        }

        if list.names.is_empty() {
            return Err(NormalizeError::EntityList("no names given".to_string()));
        }

        Ok(list)
    }

    /// Read a flat list with one name per line.
    ///
    /// Only the first comma-separated field of each line is used, so a
    /// single-column CSV works as well as plain text. Blank lines and lines
    /// starting with `#` are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut names = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            if let Some(field) = record.get(0) {
                if !field.trim().is_empty() {
                    names.push(field.to_string());
                }
            }
        }

        Self::new(names)
    }

    /// Read a flat list from a file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Whether a canonical-cased name is in the list
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Names in list order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate over names in list order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of names
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; an empty list cannot be constructed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
