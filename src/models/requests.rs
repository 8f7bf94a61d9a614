use crate::core::attributes::Scale;
use crate::core::error::ValidationError;
use crate::models::domain::PreferenceRequest;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// Service-level bounds applied while decoding a match request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestLimits {
    pub importance_scale: Scale,
    pub default_result_count: usize,
    pub max_result_count: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            importance_scale: Scale::new(0.0, 8.0),
            default_result_count: 5,
            max_result_count: 100,
        }
    }
}

/// Body of `POST /match`, in either of the accepted shapes.
///
/// The shape is picked by key (`answers` or `importances`) so a bad field
/// reports its own error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MatchRequest {
    Structured(StructuredMatchRequest),
    Legacy(LegacyMatchRequest),
}

impl<'de> Deserialize<'de> for MatchRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = Value::deserialize(deserializer)?;

        let decoded = if body.get("answers").is_some() {
            serde_json::from_value(body).map(MatchRequest::Legacy)
        } else if body.get("importances").is_some() {
            serde_json::from_value(body).map(MatchRequest::Structured)
        } else {
            return Err(de::Error::custom(
                "expected an object with `importances` or `answers`",
            ));
        };

        decoded.map_err(de::Error::custom)
    }
}

/// Preferences keyed by attribute name
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StructuredMatchRequest {
    pub importances: BTreeMap<String, f64>,
    #[serde(default)]
    pub targets: BTreeMap<String, f64>,
    #[validate(range(min = 1))]
    #[serde(alias = "result_count", rename = "resultCount")]
    pub result_count: Option<i64>,
    #[serde(default)]
    #[serde(alias = "include_avoid", rename = "includeAvoid")]
    pub include_avoid: bool,
}

/// The questionnaire's positional answer list.
///
/// | index | meaning                          |
/// |-------|----------------------------------|
/// | 0     | walkability importance           |
/// | 1     | employment importance            |
/// | 2     | diversity importance             |
/// | 3     | cost importance                  |
/// | 4     | walkability importance (again)   |
/// | 5     | remote work importance           |
/// | 6     | density target (0-4)             |
/// | 7     | density importance               |
/// | 8     | politics target (0-8)            |
/// | 9     | politics importance              |
/// | 10    | result count (optional)          |
/// | 11    | include avoid list (optional)    |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyMatchRequest {
    pub answers: Vec<Value>,
}

const LEGACY_REQUIRED_ANSWERS: usize = 10;
const LEGACY_DEFAULT_RESULT_COUNT: usize = 5;

impl MatchRequest {
    /// Decode into an engine request, applying the service limits
    pub fn into_preferences(self, limits: &RequestLimits) -> Result<PreferenceRequest, ValidationError> {
        match self {
            MatchRequest::Structured(req) => req.into_preferences(limits),
            MatchRequest::Legacy(req) => req.into_preferences(limits),
        }
    }
}

impl StructuredMatchRequest {
    pub fn into_preferences(self, limits: &RequestLimits) -> Result<PreferenceRequest, ValidationError> {
        let result_count = match self.result_count {
            None => limits.default_result_count,
            Some(n) if n <= 0 => return Err(ValidationError::InvalidResultCount(n)),
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };

        Ok(PreferenceRequest {
            importances: self.importances,
            target_values: self.targets,
            result_count: result_count.min(limits.max_result_count),
            include_avoid: self.include_avoid,
        })
    }
}

impl LegacyMatchRequest {
    pub fn into_preferences(self, limits: &RequestLimits) -> Result<PreferenceRequest, ValidationError> {
        let answers = &self.answers;
        if answers.len() < LEGACY_REQUIRED_ANSWERS {
            return Err(ValidationError::MalformedAnswers(format!(
                "expected at least {} answers, got {}",
                LEGACY_REQUIRED_ANSWERS,
                answers.len()
            )));
        }

        let importance = |index: usize| -> Result<f64, ValidationError> {
            let value = answer_number(answers, index)?;
            if !limits.importance_scale.contains(value) {
                return Err(ValidationError::MalformedAnswers(format!(
                    "answer {} is {}, expected {}..={}",
                    index, value, limits.importance_scale.min, limits.importance_scale.max
                )));
            }
            // Walkability is asked twice and the two answers add up, so
            // every importance is halved to keep the sum on the importance
            // scale. Normalization makes the common factor irrelevant.
            Ok(value / 2.0)
        };

        let mut request = PreferenceRequest::new(limits.default_result_count)
            .importance("walkability", importance(0)? + importance(4)?)
            .importance("employment", importance(1)?)
            .importance("diversity", importance(2)?)
            .importance("cost", importance(3)?)
            .importance("remote_work", importance(5)?)
            .target("density", answer_number(answers, 6)?)
            .importance("density", importance(7)?)
            .target("politics", answer_number(answers, 8)?)
            .importance("politics", importance(9)?);

        request.result_count = match answers.get(10) {
            None | Some(Value::Null) => LEGACY_DEFAULT_RESULT_COUNT,
            Some(_) => {
                let count = answer_number(answers, 10)?;
                if count.fract() != 0.0 {
                    return Err(ValidationError::MalformedAnswers(format!(
                        "result count must be a whole number, got {}",
                        count
                    )));
                }
                if count <= 0.0 {
                    return Err(ValidationError::InvalidResultCount(count as i64));
                }
                count as usize
            }
        }
        .min(limits.max_result_count);

        request.include_avoid = answers.get(11).map(is_truthy).unwrap_or(false);

        Ok(request)
    }
}

/// Read a numeric answer, accepting numbers and numeric strings
fn answer_number(answers: &[Value], index: usize) -> Result<f64, ValidationError> {
    let parsed = match answers.get(index) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::MalformedAnswers(format!(
            "answer {} is not a number",
            index
        ))),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "y"
        ),
        _ => false,
    }
}

/// Body of `POST /describe`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DescribeRequest {
    #[validate(length(max = 4000))]
    #[serde(default)]
    pub description: String,
}
