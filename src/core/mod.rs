// Core algorithm exports
pub mod attributes;
pub mod error;
pub mod ranker;
pub mod scoring;
pub mod validation;
pub mod weights;

pub use attributes::{AttributeCatalogue, AttributeSpec, Scale, ScoringMode};
pub use error::{ConfigurationError, EngineError, ErrorKind, ValidationError};
pub use ranker::{RankResult, Ranker};
pub use scoring::{calculate_match_score, distance_contribution, magnitude_contribution};
pub use validation::{resolve_request, ScoringTerm};
pub use weights::normalize_importances;
