use crate::config::DatasetSettings;
use crate::core::attributes::AttributeCatalogue;
use crate::core::error::ConfigurationError;
use crate::models::{LocationRecord, LocationTable};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading the reference table
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Dataset server returned status {0}")]
    Status(u16),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported dataset format: {0}")]
    UnknownFormat(String),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid dataset: {0}")]
    Integrity(#[from] ConfigurationError),
}

/// Where the table comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Url(String),
    Path(PathBuf),
}

impl DatasetSource {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            DatasetSource::Url(source.to_string())
        } else {
            DatasetSource::Path(PathBuf::from(source))
        }
    }

    fn extension(&self) -> Option<String> {
        let name = match self {
            // Ignore any query string when sniffing the extension
            DatasetSource::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            DatasetSource::Path(path) => path.to_string_lossy().into_owned(),
        };
        name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Json,
}

impl DatasetFormat {
    pub fn parse(name: &str) -> Result<Self, DatasetError> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Ok(DatasetFormat::Csv),
            "json" => Ok(DatasetFormat::Json),
            other => Err(DatasetError::UnknownFormat(other.to_string())),
        }
    }
}

/// Names of the display columns
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub city: String,
    pub state: String,
    pub county: String,
    pub positive: String,
    pub negative: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            city: "city".to_string(),
            state: "state".to_string(),
            county: "county".to_string(),
            positive: "positive".to_string(),
            negative: "negative".to_string(),
        }
    }
}

/// Loads the city table once at startup.
///
/// Attribute columns come from the catalogue; display columns from the
/// [`ColumnMap`]. The county column is optional, every other column is
/// required.
pub struct DatasetLoader {
    source: DatasetSource,
    format: DatasetFormat,
    columns: ColumnMap,
    catalogue: Arc<AttributeCatalogue>,
    client: Client,
}

impl DatasetLoader {
    pub fn new(
        source: DatasetSource,
        format: DatasetFormat,
        columns: ColumnMap,
        catalogue: Arc<AttributeCatalogue>,
        timeout: Duration,
    ) -> Result<Self, DatasetError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            source,
            format,
            columns,
            catalogue,
            client,
        })
    }

    pub fn from_settings(
        settings: &DatasetSettings,
        catalogue: Arc<AttributeCatalogue>,
    ) -> Result<Self, DatasetError> {
        let source = DatasetSource::parse(&settings.source);
        let format = match (&settings.format, source.extension()) {
            (Some(name), _) => DatasetFormat::parse(name)?,
            (None, Some(ext)) => DatasetFormat::parse(&ext)?,
            (None, None) => return Err(DatasetError::UnknownFormat(settings.source.clone())),
        };
        let columns = ColumnMap {
            city: settings.city_column.clone(),
            state: settings.state_column.clone(),
            county: settings.county_column.clone(),
            positive: settings.positive_column.clone(),
            negative: settings.negative_column.clone(),
        };

        Self::new(
            source,
            format,
            columns,
            catalogue,
            Duration::from_secs(settings.fetch_timeout_secs),
        )
    }

    /// Fetch, parse and validate the table
    pub async fn load(&self) -> Result<LocationTable, DatasetError> {
        let bytes = match &self.source {
            DatasetSource::Url(url) => {
                tracing::info!("Fetching dataset from {}", url);
                let response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(DatasetError::Status(response.status().as_u16()));
                }
                response.bytes().await?.to_vec()
            }
            DatasetSource::Path(path) => {
                tracing::info!("Reading dataset from {}", path.display());
                tokio::fs::read(path).await.map_err(|source| DatasetError::Io {
                    path: path.clone(),
                    source,
                })?
            }
        };

        let table = self.parse(&bytes)?;
        tracing::info!(
            "Loaded {} locations scored on {} attributes",
            table.len(),
            table.catalogue().len()
        );
        Ok(table)
    }

    /// Parse raw dataset bytes in the configured format
    pub fn parse(&self, bytes: &[u8]) -> Result<LocationTable, DatasetError> {
        let records = match self.format {
            DatasetFormat::Csv => self.parse_csv(bytes)?,
            DatasetFormat::Json => self.parse_json(bytes)?,
        };
        Ok(LocationTable::new(records, Arc::clone(&self.catalogue))?)
    }

    fn parse_csv(&self, bytes: &[u8]) -> Result<Vec<LocationRecord>, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        // Fail on a missing column once, not once per row
        for column in self.required_columns() {
            if !headers.contains_key(column) {
                return Err(ConfigurationError::MissingColumn {
                    column: column.to_string(),
                }
                .into());
            }
        }

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let line = result?;
            let cell = |column: &str| {
                headers
                    .get(column)
                    .and_then(|&i| line.get(i))
                    .map(str::to_string)
            };
            records.push(self.build_record(row, cell)?);
        }

        Ok(records)
    }

    fn parse_json(&self, bytes: &[u8]) -> Result<Vec<LocationRecord>, DatasetError> {
        let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(bytes)?;

        let records = rows
            .iter()
            .enumerate()
            .map(|(row, object)| {
                let cell = |column: &str| match object.get(column) {
                    Some(Value::String(s)) => Some(s.trim().to_string()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    Some(Value::Bool(b)) => Some(b.to_string()),
                    _ => None,
                };
                self.build_record(row, cell)
            })
            .collect::<Result<_, _>>()?;

        Ok(records)
    }

    fn required_columns(&self) -> impl Iterator<Item = &str> {
        [
            self.columns.city.as_str(),
            self.columns.state.as_str(),
            self.columns.positive.as_str(),
            self.columns.negative.as_str(),
        ]
        .into_iter()
        .chain(self.catalogue.iter().map(|spec| spec.column.as_str()))
    }

    fn build_record<F>(&self, row: usize, cell: F) -> Result<LocationRecord, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Rows are 1-based after the header line, as a spreadsheet shows them
        let row_label = format!("row {}", row + 2);
        let non_empty = |column: &str| cell(column).filter(|v| !v.is_empty());

        let required = |column: &str| {
            non_empty(column).ok_or_else(|| ConfigurationError::MissingAttribute {
                record: row_label.clone(),
                attribute: column.to_string(),
            })
        };

        let name = required(self.columns.city.as_str())?;
        let region = required(self.columns.state.as_str())?;
        let mut record = LocationRecord::new(&name, &region);
        record.locality = non_empty(self.columns.county.as_str());
        record.positive = cell(self.columns.positive.as_str()).unwrap_or_default();
        record.negative = cell(self.columns.negative.as_str()).unwrap_or_default();

        for spec in self.catalogue.iter() {
            let raw = non_empty(spec.column.as_str()).ok_or_else(|| ConfigurationError::MissingAttribute {
                record: record.label(),
                attribute: spec.key.clone(),
            })?;
            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ConfigurationError::NonNumeric {
                    record: record.label(),
                    attribute: spec.key.clone(),
                    raw: raw.clone(),
                })?;
            record.attributes.insert(spec.key.clone(), value);
        }

        Ok(record)
    }
}
