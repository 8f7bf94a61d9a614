use crate::core::attributes::Scale;
use crate::core::error::EngineError;
use crate::core::scoring::calculate_match_score;
use crate::core::validation::resolve_request;
use crate::models::{LocationTable, PreferenceRequest, ScoredRecord};

/// Result of ranking one request against the table
#[derive(Debug, Clone, PartialEq)]
pub struct RankResult {
    /// Best matches, highest score first
    pub good: Vec<ScoredRecord>,
    /// Worst matches, lowest score first. Empty unless requested.
    pub avoid: Vec<ScoredRecord>,
    pub total_records: usize,
}

/// Ranking engine - scores every location in a table against a request
///
/// # Pipeline Stages
/// 1. Request validation and weight normalization
/// 2. Per-record scoring
/// 3. Stable descending sort
/// 4. Good/avoid selection from the same ordering
///
/// The ranker holds no per-request state and never mutates the table, so
/// one instance can serve concurrent requests.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    importance_scale: Scale,
}

impl Ranker {
    /// Questionnaire importances run from 0 (not important) to 8
    pub const DEFAULT_IMPORTANCE_SCALE: Scale = Scale::new(0.0, 8.0);

    pub fn new(importance_scale: Scale) -> Self {
        Self { importance_scale }
    }

    pub fn importance_scale(&self) -> Scale {
        self.importance_scale
    }

    /// Rank every record in `table` for `request`.
    ///
    /// # Arguments
    /// * `table` - Validated reference table
    /// * `request` - The user's importances, targets and result count
    ///
    /// # Returns
    /// RankResult with `good` and, when requested, `avoid` slices. The result
    /// count is clamped to the table size.
    pub fn rank(
        &self,
        table: &LocationTable,
        request: &PreferenceRequest,
    ) -> Result<RankResult, EngineError> {
        let terms = resolve_request(table.catalogue(), request, &self.importance_scale)?;
        let records = table.records();

        let mut scored: Vec<(usize, f64)> = records
            .iter()
            .enumerate()
            .map(|(index, record)| -> Result<(usize, f64), EngineError> {
                Ok((index, calculate_match_score(record, &terms)?))
            })
            .collect::<Result<_, _>>()?;

        // sort_by is stable: equal scores keep table order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let count = request.result_count.min(records.len());
        let to_scored = |&(index, match_score): &(usize, f64)| ScoredRecord {
            record: records[index].clone(),
            match_score,
        };

        let good = scored[..count].iter().map(to_scored).collect();
        let avoid = if request.include_avoid {
            scored[scored.len() - count..].iter().rev().map(to_scored).collect()
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Ranked {} records on {} attributes, returning {} (avoid: {})",
            records.len(),
            terms.len(),
            count,
            request.include_avoid
        );

        Ok(RankResult {
            good,
            avoid,
            total_records: records.len(),
        })
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_IMPORTANCE_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attributes::{AttributeCatalogue, AttributeSpec};
    use crate::core::error::ErrorKind;
    use crate::models::LocationRecord;
    use std::sync::Arc;

    fn walk_only_catalogue() -> Arc<AttributeCatalogue> {
        Arc::new(
            AttributeCatalogue::new(vec![
                AttributeSpec::magnitude("walkability", "walk_score", Scale::new(0.0, 100.0)),
                AttributeSpec::magnitude("cost", "cost_score", Scale::new(0.0, 100.0)),
            ])
            .unwrap(),
        )
    }

    fn create_record(name: &str, walkability: f64, cost: f64) -> LocationRecord {
        LocationRecord::new(name, "WA")
            .with_attribute("walkability", walkability)
            .with_attribute("cost", cost)
    }

    fn names(records: &[ScoredRecord]) -> Vec<&str> {
        records.iter().map(|r| r.record.name.as_str()).collect()
    }

    #[test]
    fn test_good_and_avoid() {
        let table = LocationTable::new(
            vec![
                create_record("Tacoma", 10.0, 50.0),
                create_record("Seattle", 90.0, 50.0),
                create_record("Spokane", 50.0, 50.0),
            ],
            walk_only_catalogue(),
        )
        .unwrap();
        let request = PreferenceRequest::new(1)
            .importance("walkability", 1.0)
            .importance("cost", 0.0)
            .with_avoid(true);

        let result = Ranker::default().rank(&table, &request).unwrap();

        assert_eq!(names(&result.good), vec!["Seattle"]);
        assert_eq!(names(&result.avoid), vec!["Tacoma"]);
        assert_eq!(result.total_records, 3);
    }

    #[test]
    fn test_avoid_omitted_unless_requested() {
        let table = LocationTable::new(
            vec![create_record("Tacoma", 10.0, 50.0), create_record("Seattle", 90.0, 50.0)],
            walk_only_catalogue(),
        )
        .unwrap();
        let request = PreferenceRequest::new(1).importance("walkability", 4.0);

        let result = Ranker::default().rank(&table, &request).unwrap();

        assert!(result.avoid.is_empty());
    }

    #[test]
    fn test_ties_keep_table_order() {
        let table = LocationTable::new(
            vec![
                create_record("Olympia", 40.0, 50.0),
                create_record("Everett", 40.0, 50.0),
                create_record("Yakima", 40.0, 50.0),
            ],
            walk_only_catalogue(),
        )
        .unwrap();
        let request = PreferenceRequest::new(3)
            .importance("walkability", 2.0)
            .with_avoid(true);

        let result = Ranker::default().rank(&table, &request).unwrap();

        assert_eq!(names(&result.good), vec!["Olympia", "Everett", "Yakima"]);
        // Same ordering, read from the bottom up
        assert_eq!(names(&result.avoid), vec!["Yakima", "Everett", "Olympia"]);
    }

    #[test]
    fn test_result_count_clamped() {
        let table = LocationTable::new(
            vec![create_record("Tacoma", 10.0, 50.0), create_record("Seattle", 90.0, 50.0)],
            walk_only_catalogue(),
        )
        .unwrap();
        let request = PreferenceRequest::new(50).importance("walkability", 1.0);

        let result = Ranker::default().rank(&table, &request).unwrap();

        assert_eq!(names(&result.good), vec!["Seattle", "Tacoma"]);
    }

    #[test]
    fn test_invalid_request_is_validation_error() {
        let table =
            LocationTable::new(vec![create_record("Tacoma", 10.0, 50.0)], walk_only_catalogue())
                .unwrap();
        let request = PreferenceRequest::new(1).importance("walkability", -1.0);

        let err = Ranker::default().rank(&table, &request).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
