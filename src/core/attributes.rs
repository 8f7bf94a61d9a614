use crate::core::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Closed numeric interval an attribute's values are declared to lie in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Map a value on this scale onto 0-1
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.span()
    }

    /// Map a value from `other` onto the same relative position of this scale
    #[inline]
    pub fn project_from(&self, other: &Scale, value: f64) -> f64 {
        self.min + other.normalize(value) * self.span()
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// How a record's value turns into a contribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringMode {
    /// Higher values score higher.
    Magnitude,
    /// Values close to the requested target score higher. Targets are given
    /// on `target` and projected onto the record scale before comparing.
    Distance { target: Scale },
}

/// One scored attribute: its key, the dataset column it is read from, the
/// scale its record values live on, and how it is scored.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub key: String,
    pub column: String,
    pub scale: Scale,
    pub mode: ScoringMode,
}

impl AttributeSpec {
    pub fn magnitude(key: &str, column: &str, scale: Scale) -> Self {
        Self {
            key: key.to_string(),
            column: column.to_string(),
            scale,
            mode: ScoringMode::Magnitude,
        }
    }

    pub fn distance(key: &str, column: &str, scale: Scale, target: Scale) -> Self {
        Self {
            key: key.to_string(),
            column: column.to_string(),
            scale,
            mode: ScoringMode::Distance { target },
        }
    }

    pub fn is_distance(&self) -> bool {
        matches!(self.mode, ScoringMode::Distance { .. })
    }
}

/// Ordered, validated set of attribute declarations.
///
/// Every attribute is declared exactly once. Record values are validated
/// against these scales when a [`LocationTable`](crate::models::LocationTable)
/// is built.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCatalogue {
    specs: Vec<AttributeSpec>,
}

impl AttributeCatalogue {
    pub fn new(specs: Vec<AttributeSpec>) -> Result<Self, ConfigurationError> {
        if specs.is_empty() {
            return Err(ConfigurationError::EmptyCatalogue);
        }

        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|prev| prev.key == spec.key) {
                return Err(ConfigurationError::DuplicateAttribute(spec.key.clone()));
            }

            let scales = match spec.mode {
                ScoringMode::Magnitude => vec![spec.scale],
                ScoringMode::Distance { target } => vec![spec.scale, target],
            };
            if let Some(bad) = scales.iter().find(|s| !s.is_valid()) {
                return Err(ConfigurationError::InvalidScale {
                    attribute: spec.key.clone(),
                    min: bad.min,
                    max: bad.max,
                });
            }
        }

        Ok(Self { specs })
    }

    /// The eight city attributes on their standard dataset columns.
    ///
    /// Density and politics are stored on 0-100 but requested on the
    /// questionnaire's 0-4 (rural to urban) and 0-8 (conservative to liberal)
    /// scales.
    pub fn city_defaults() -> Self {
        let percent = Scale::new(0.0, 100.0);
        Self {
            specs: vec![
                AttributeSpec::magnitude("walkability", "walk_score", percent),
                AttributeSpec::magnitude("cost", "cost_score", percent),
                AttributeSpec::distance("density", "density_score", percent, Scale::new(0.0, 4.0)),
                AttributeSpec::magnitude("diversity", "diversity_score", percent),
                AttributeSpec::distance("politics", "politics_score", percent, Scale::new(0.0, 8.0)),
                AttributeSpec::magnitude("remote_work", "wfh_score", percent),
                AttributeSpec::magnitude("employment", "emp_score", percent),
                AttributeSpec::magnitude("safety", "safety_score", percent),
            ],
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeSpec> {
        self.specs.iter().find(|spec| spec.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for AttributeCatalogue {
    fn default() -> Self {
        Self::city_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_normalize_and_project() {
        let percent = Scale::new(0.0, 100.0);
        let density = Scale::new(0.0, 4.0);

        assert_eq!(percent.normalize(25.0), 0.25);
        assert_eq!(percent.project_from(&density, 3.0), 75.0);
        assert_eq!(percent.project_from(&percent, 42.0), 42.0);
    }

    #[test]
    fn test_city_defaults_valid() {
        let defaults = AttributeCatalogue::city_defaults();
        let rebuilt = AttributeCatalogue::new(defaults.iter().cloned().collect());

        assert_eq!(rebuilt.as_ref(), Ok(&defaults));
        assert_eq!(defaults.len(), 8);
        assert!(defaults.get("politics").is_some_and(AttributeSpec::is_distance));
        assert!(defaults.get("safety").is_some_and(|s| !s.is_distance()));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let percent = Scale::new(0.0, 100.0);
        let result = AttributeCatalogue::new(vec![
            AttributeSpec::magnitude("walkability", "walk_score", percent),
            AttributeSpec::magnitude("walkability", "walk_score_2", percent),
        ]);

        assert_eq!(
            result,
            Err(ConfigurationError::DuplicateAttribute("walkability".to_string()))
        );
    }

    #[test]
    fn test_inverted_scale_rejected() {
        let result = AttributeCatalogue::new(vec![AttributeSpec::distance(
            "density",
            "density_score",
            Scale::new(0.0, 100.0),
            Scale::new(4.0, 0.0),
        )]);

        assert!(matches!(result, Err(ConfigurationError::InvalidScale { .. })));
    }

    #[test]
    fn test_empty_catalogue_rejected() {
        assert_eq!(
            AttributeCatalogue::new(vec![]),
            Err(ConfigurationError::EmptyCatalogue)
        );
    }
}
