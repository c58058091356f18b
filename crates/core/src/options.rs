//! Normalization settings.

/// What to do with a reference entity that has no row in the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityPolicy {
    /// Fail with [`crate::NormalizeError::MissingEntity`].
    #[default]
    Strict,
    /// Leave the entity out of the output.
    Skip,
    /// Emit a row of missing values for the entity.
    Fill,
}

/// Options controlling header parsing and row filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Year applied to headers that only carry a month and day
    pub fallback_year: i32,
    /// Handling of reference entities absent from the source
    pub entity_policy: EntityPolicy,
    /// Value tokens meaning "not reported" (compared after trimming)
    pub placeholders: Vec<String>,
    /// Row labels that are annotations rather than entities (case-insensitive)
    pub non_entity_labels: Vec<String>,
    /// Marker introducing a date range in a header, e.g. "Tests Through August 3"
    pub range_marker: String,
}

impl NormalizeOptions {
    /// Create options with the given fallback year and default markers
    #[must_use]
    pub fn new(fallback_year: i32) -> Self {
        NormalizeOptions {
            fallback_year,
            entity_policy: EntityPolicy::Strict,
            placeholders: vec!["--".to_string(), "-".to_string()],
            non_entity_labels: vec!["Notes".to_string()],
            range_marker: "Through".to_string(),
        }
    }

    /// Set the missing-entity policy
    #[must_use]
    pub fn with_entity_policy(mut self, policy: EntityPolicy) -> Self {
        self.entity_policy = policy;
        self
    }

    /// Replace the placeholder tokens
    #[must_use]
    pub fn with_placeholders<I, S>(mut self, placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.placeholders = placeholders.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the non-entity row labels
    #[must_use]
    pub fn with_non_entity_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_entity_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the range marker
    #[must_use]
    pub fn with_range_marker(mut self, marker: impl Into<String>) -> Self {
        self.range_marker = marker.into();
        self
    }

    /// Whether a value token is a "not reported" placeholder
    #[must_use]
    pub fn is_placeholder(&self, token: &str) -> bool {
        let token = token.trim();
        self.placeholders.iter().any(|p| p == token)
    }

    /// Whether a row label marks an annotation row
    #[must_use]
    pub fn is_non_entity(&self, label: &str) -> bool {
        let label = label.trim();
        self.non_entity_labels
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = NormalizeOptions::new(2021);
        assert_eq!(options.fallback_year, 2021);
        assert_eq!(options.entity_policy, EntityPolicy::Strict);
        assert!(options.is_placeholder("--"));
        assert!(options.is_placeholder(" - "));
        assert!(!options.is_placeholder("0"));
        assert!(options.is_non_entity("NOTES"));
        assert!(!options.is_non_entity("Total"));
    }

    #[test]
    fn test_builders() {
        let options = NormalizeOptions::new(2020)
            .with_entity_policy(EntityPolicy::Fill)
            .with_placeholders(["N/A"])
            .with_non_entity_labels(["Notes", "Total"])
            .with_range_marker("through");

        assert_eq!(options.entity_policy, EntityPolicy::Fill);
        assert!(options.is_placeholder("N/A"));
        assert!(!options.is_placeholder("--"));
        assert!(options.is_non_entity("total"));
        assert_eq!(options.range_marker, "through");
    }
}
