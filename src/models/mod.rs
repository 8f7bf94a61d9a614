// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{LocationRecord, LocationTable, PreferenceRequest, ScoredRecord};
pub use requests::{DescribeRequest, LegacyMatchRequest, MatchRequest, RequestLimits, StructuredMatchRequest};
pub use responses::{AvoidMatch, DescribeResponse, ErrorResponse, GoodMatch, HealthResponse, MatchResponse};
