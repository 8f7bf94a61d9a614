use thiserror::Error;

/// Integrity faults in the reference table or the attribute catalogue.
///
/// These are never caused by a caller. A table that fails with one of these
/// must not be served.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("reference table is empty")]
    EmptyTable,

    #[error("attribute catalogue is empty")]
    EmptyCatalogue,

    #[error("attribute `{0}` is declared more than once")]
    DuplicateAttribute(String),

    #[error("attribute `{attribute}` has an invalid scale {min}..={max}")]
    InvalidScale { attribute: String, min: f64, max: f64 },

    #[error("magnitude attribute `{0}` cannot declare a target scale")]
    UnexpectedTargetScale(String),

    #[error("column `{column}` is missing from the dataset")]
    MissingColumn { column: String },

    #[error("record {record} has no value for attribute `{attribute}`")]
    MissingAttribute { record: String, attribute: String },

    #[error("record {record} has a non-numeric value {raw:?} for attribute `{attribute}`")]
    NonNumeric {
        record: String,
        attribute: String,
        raw: String,
    },

    #[error("record {record} has {value} for attribute `{attribute}`, outside {min}..={max}")]
    OutOfRange {
        record: String,
        attribute: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Caller mistakes in a single ranking request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no importances were supplied")]
    NoImportances,

    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    #[error("importance for `{attribute}` is {value}, expected {min}..={max}")]
    ImportanceOutOfRange {
        attribute: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("attribute `{0}` is weighted but has no target value")]
    MissingTarget(String),

    #[error("target for `{attribute}` is {value}, expected {min}..={max}")]
    TargetOutOfRange {
        attribute: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("attribute `{0}` is scored by magnitude and does not take a target value")]
    UnexpectedTarget(String),

    #[error("result count must be positive, got {0}")]
    InvalidResultCount(i64),

    #[error("malformed answers: {0}")]
    MalformedAnswers(String),
}

/// Which side of the error taxonomy an [`EngineError`] falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
}

/// Every failure the ranking engine can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Configuration(_) => ErrorKind::Configuration,
            EngineError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let config: EngineError = ConfigurationError::EmptyTable.into();
        let validation: EngineError = ValidationError::NoImportances.into();

        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert!(!config.is_recoverable());
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert!(validation.is_recoverable());
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = ValidationError::MissingTarget("density".to_string());
        assert!(err.to_string().contains("density"));

        let err = ConfigurationError::MissingAttribute {
            record: "Austin, TX".to_string(),
            attribute: "safety".to_string(),
        };
        assert!(err.to_string().contains("Austin, TX"));
        assert!(err.to_string().contains("safety"));
    }
}
