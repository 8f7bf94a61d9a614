use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::core::RankResult;
use crate::models::domain::ScoredRecord;

/// A recommended city
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodMatch {
    pub city: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    pub positive: String,
    pub match_score: f64,
}

/// A city to steer clear of
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvoidMatch {
    pub city: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    pub negative: String,
    pub match_score: f64,
}

impl From<ScoredRecord> for GoodMatch {
    fn from(scored: ScoredRecord) -> Self {
        Self {
            city: scored.record.name,
            state: scored.record.region,
            county: scored.record.locality,
            positive: scored.record.positive,
            match_score: scored.match_score,
        }
    }
}

impl From<ScoredRecord> for AvoidMatch {
    fn from(scored: ScoredRecord) -> Self {
        Self {
            city: scored.record.name,
            state: scored.record.region,
            county: scored.record.locality,
            negative: scored.record.negative,
            match_score: scored.match_score,
        }
    }
}

/// Response for the match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub good_matches: Vec<GoodMatch>,
    pub bad_matches: Vec<AvoidMatch>,
}

impl From<RankResult> for MatchResponse {
    fn from(result: RankResult) -> Self {
        Self {
            good_matches: result.good.into_iter().map(GoodMatch::from).collect(),
            bad_matches: result.avoid.into_iter().map(AvoidMatch::from).collect(),
        }
    }
}

/// Response for the describe endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeResponse {
    /// Ratings in questionnaire order: safety, employment, diversity,
    /// affordability, walkability, remote work, density, politics
    pub scores: Vec<u8>,
    pub summary: String,
    /// The same ratings keyed by attribute
    pub attributes: BTreeMap<String, u8>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub locations: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
