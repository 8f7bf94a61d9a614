//! New Leaf - city matching service
//!
//! Scores every city in a reference table against a user's weighted
//! lifestyle preferences and returns the best and worst fits. The ranking
//! engine in [`core`] is a pure function of the table and the request; the
//! HTTP layer, dataset loader and LLM describer wrap it.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{AttributeCatalogue, EngineError, ErrorKind, RankResult, Ranker, Scale};
pub use models::{LocationRecord, LocationTable, PreferenceRequest, ScoredRecord, MatchRequest, MatchResponse};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let ranker = Ranker::default();
        assert_eq!(ranker.importance_scale(), Scale::new(0.0, 8.0));
        assert_eq!(AttributeCatalogue::default().len(), 8);
    }
}
