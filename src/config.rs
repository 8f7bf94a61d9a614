use crate::core::attributes::{AttributeCatalogue, AttributeSpec, Scale, ScoringMode};
use crate::core::error::ConfigurationError;
use crate::models::RequestLimits;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub describe: DescribeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSettings {
    /// Local path or http(s) URL of the city table
    #[serde(default = "default_dataset_source")]
    pub source: String,
    /// `csv` or `json`; inferred from the source extension when unset
    pub format: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_city_column")]
    pub city_column: String,
    #[serde(default = "default_state_column")]
    pub state_column: String,
    #[serde(default = "default_county_column")]
    pub county_column: String,
    #[serde(default = "default_positive_column")]
    pub positive_column: String,
    #[serde(default = "default_negative_column")]
    pub negative_column: String,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            source: default_dataset_source(),
            format: None,
            fetch_timeout_secs: default_fetch_timeout(),
            city_column: default_city_column(),
            state_column: default_state_column(),
            county_column: default_county_column(),
            positive_column: default_positive_column(),
            negative_column: default_negative_column(),
        }
    }
}

fn default_dataset_source() -> String { "data/cities.csv".to_string() }
fn default_fetch_timeout() -> u64 { 30 }
fn default_city_column() -> String { "city".to_string() }
fn default_state_column() -> String { "state".to_string() }
fn default_county_column() -> String { "county".to_string() }
fn default_positive_column() -> String { "positive".to_string() }
fn default_negative_column() -> String { "negative".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_importance_min")]
    pub importance_min: f64,
    #[serde(default = "default_importance_max")]
    pub importance_max: f64,
    #[serde(default = "default_result_count")]
    pub default_result_count: usize,
    #[serde(default = "default_max_result_count")]
    pub max_result_count: usize,
    #[serde(default = "default_attributes")]
    pub attributes: Vec<AttributeSettings>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            importance_min: default_importance_min(),
            importance_max: default_importance_max(),
            default_result_count: default_result_count(),
            max_result_count: default_max_result_count(),
            attributes: default_attributes(),
        }
    }
}

fn default_importance_min() -> f64 { 0.0 }
fn default_importance_max() -> f64 { 8.0 }
fn default_result_count() -> usize { 5 }
fn default_max_result_count() -> usize { 100 }

fn default_attributes() -> Vec<AttributeSettings> {
    AttributeCatalogue::city_defaults()
        .iter()
        .map(AttributeSettings::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeMode {
    Magnitude,
    Distance,
}

/// One attribute declaration as written in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSettings {
    pub key: String,
    pub column: String,
    pub min: f64,
    pub max: f64,
    pub mode: AttributeMode,
    /// Scale requests use for the target; defaults to the record scale
    pub target_min: Option<f64>,
    pub target_max: Option<f64>,
}

impl From<&AttributeSpec> for AttributeSettings {
    fn from(spec: &AttributeSpec) -> Self {
        let (mode, target) = match spec.mode {
            ScoringMode::Magnitude => (AttributeMode::Magnitude, None),
            ScoringMode::Distance { target } => (AttributeMode::Distance, Some(target)),
        };
        Self {
            key: spec.key.clone(),
            column: spec.column.clone(),
            min: spec.scale.min,
            max: spec.scale.max,
            mode,
            target_min: target.map(|t| t.min),
            target_max: target.map(|t| t.max),
        }
    }
}

impl AttributeSettings {
    fn to_spec(&self) -> Result<AttributeSpec, ConfigurationError> {
        let scale = Scale::new(self.min, self.max);
        let has_target = self.target_min.is_some() || self.target_max.is_some();

        match self.mode {
            AttributeMode::Magnitude if has_target => {
                Err(ConfigurationError::UnexpectedTargetScale(self.key.clone()))
            }
            AttributeMode::Magnitude => Ok(AttributeSpec::magnitude(&self.key, &self.column, scale)),
            AttributeMode::Distance => {
                let target = Scale::new(
                    self.target_min.unwrap_or(self.min),
                    self.target_max.unwrap_or(self.max),
                );
                Ok(AttributeSpec::distance(&self.key, &self.column, scale, target))
            }
        }
    }
}

impl ScoringSettings {
    /// Build and validate the attribute catalogue
    pub fn catalogue(&self) -> Result<AttributeCatalogue, ConfigurationError> {
        let specs = self
            .attributes
            .iter()
            .map(AttributeSettings::to_spec)
            .collect::<Result<Vec<_>, _>>()?;
        AttributeCatalogue::new(specs)
    }

    pub fn importance_scale(&self) -> Result<Scale, ConfigurationError> {
        let scale = Scale::new(self.importance_min, self.importance_max);
        if !(scale.min.is_finite() && scale.max.is_finite()) || scale.min < 0.0 || scale.min >= scale.max {
            return Err(ConfigurationError::InvalidScale {
                attribute: "importance".to_string(),
                min: scale.min,
                max: scale.max,
            });
        }
        Ok(scale)
    }

    pub fn limits(&self) -> Result<RequestLimits, ConfigurationError> {
        Ok(RequestLimits {
            importance_scale: self.importance_scale()?,
            default_result_count: self.default_result_count.max(1),
            max_result_count: self.max_result_count.max(1),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_describe_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_describe_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_describe_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for DescribeSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            endpoint: default_describe_endpoint(),
            api_key: String::new(),
            model: default_describe_model(),
            temperature: default_temperature(),
            timeout_secs: default_describe_timeout(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_true() -> bool { true }
fn default_describe_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_describe_model() -> String { "gpt-4".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_describe_timeout() -> u64 { 30 }
fn default_cache_size() -> u64 { 1000 }
fn default_cache_ttl() -> u64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with NEWLEAF__)
    /// 5. DATASET_URL and OPENAI_API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., NEWLEAF__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("NEWLEAF")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply the conventional unprefixed variables on top of loaded settings
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATASET_URL") {
        builder = builder.set_override("dataset.source", url)?;
    }
    if let Ok(api_key) = env::var("OPENAI_API_KEY") {
        builder = builder.set_override("describe.api_key", api_key)?;
    }

    builder.build()
}
