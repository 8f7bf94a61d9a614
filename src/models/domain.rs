use crate::core::attributes::AttributeCatalogue;
use crate::core::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One city in the reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// City name
    pub name: String,
    /// State
    pub region: String,
    /// County, when the dataset has one
    #[serde(default)]
    pub locality: Option<String>,
    /// Scored attribute values keyed by attribute key
    pub attributes: BTreeMap<String, f64>,
    #[serde(default)]
    pub positive: String,
    #[serde(default)]
    pub negative: String,
}

impl LocationRecord {
    pub fn new(name: &str, region: &str) -> Self {
        Self {
            name: name.to_string(),
            region: region.to_string(),
            locality: None,
            attributes: BTreeMap::new(),
            positive: String::new(),
            negative: String::new(),
        }
    }

    /// Builder-style helper to set one attribute value
    pub fn with_attribute(mut self, key: &str, value: f64) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).copied()
    }

    /// Display label used in logs and error messages, e.g. `Austin, TX`
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.region)
    }
}

/// Validated, immutable reference table.
///
/// Construction checks every record against the catalogue, so the ranking
/// engine can rely on each declared attribute being present, finite and
/// within its scale. Cloning is cheap; the rows are shared.
#[derive(Debug, Clone)]
pub struct LocationTable {
    records: Arc<[LocationRecord]>,
    catalogue: Arc<AttributeCatalogue>,
}

impl LocationTable {
    pub fn new(
        records: Vec<LocationRecord>,
        catalogue: Arc<AttributeCatalogue>,
    ) -> Result<Self, ConfigurationError> {
        if records.is_empty() {
            return Err(ConfigurationError::EmptyTable);
        }

        for record in &records {
            for spec in catalogue.iter() {
                let value = record.attribute(&spec.key).ok_or_else(|| {
                    ConfigurationError::MissingAttribute {
                        record: record.label(),
                        attribute: spec.key.clone(),
                    }
                })?;

                if !value.is_finite() {
                    return Err(ConfigurationError::NonNumeric {
                        record: record.label(),
                        attribute: spec.key.clone(),
                        raw: value.to_string(),
                    });
                }

                if !spec.scale.contains(value) {
                    return Err(ConfigurationError::OutOfRange {
                        record: record.label(),
                        attribute: spec.key.clone(),
                        value,
                        min: spec.scale.min,
                        max: spec.scale.max,
                    });
                }
            }
        }

        Ok(Self {
            records: records.into(),
            catalogue,
        })
    }

    pub fn records(&self) -> &[LocationRecord] {
        &self.records
    }

    pub fn catalogue(&self) -> &AttributeCatalogue {
        &self.catalogue
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One ranking request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceRequest {
    /// Importance per attribute key. Attributes left out do not contribute.
    pub importances: BTreeMap<String, f64>,
    /// Preferred point for distance-scored attributes, on their target scale
    pub target_values: BTreeMap<String, f64>,
    pub result_count: usize,
    pub include_avoid: bool,
}

impl PreferenceRequest {
    pub fn new(result_count: usize) -> Self {
        Self {
            result_count,
            ..Self::default()
        }
    }

    pub fn importance(mut self, key: &str, weight: f64) -> Self {
        self.importances.insert(key.to_string(), weight);
        self
    }

    pub fn target(mut self, key: &str, value: f64) -> Self {
        self.target_values.insert(key.to_string(), value);
        self
    }

    pub fn with_avoid(mut self, include_avoid: bool) -> Self {
        self.include_avoid = include_avoid;
        self
    }
}

/// A record paired with its score for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: LocationRecord,
    pub match_score: f64,
}
