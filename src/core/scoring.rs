use crate::core::attributes::Scale;
use crate::core::error::ConfigurationError;
use crate::core::validation::ScoringTerm;
use crate::models::LocationRecord;

/// Calculate the match score for one record.
///
/// Scoring formula:
/// score = sum over weighted attributes of
///     weight * (value - min) / span                       # magnitude
///     weight * max(0, 1 - |value - target| / span)        # distance
///
/// Weights are normalized, so the score lies in 0-1 for in-scale values.
pub fn calculate_match_score(
    record: &LocationRecord,
    terms: &[ScoringTerm<'_>],
) -> Result<f64, ConfigurationError> {
    let mut total = 0.0;

    for term in terms {
        let value = record
            .attribute(term.key)
            .ok_or_else(|| ConfigurationError::MissingAttribute {
                record: record.label(),
                attribute: term.key.to_string(),
            })?;

        total += match term.target {
            None => magnitude_contribution(term.weight, value, &term.scale),
            Some(target) => distance_contribution(term.weight, value, target, &term.scale),
        };
    }

    Ok(total)
}

/// Weighted contribution of an attribute where more is better
#[inline]
pub fn magnitude_contribution(weight: f64, value: f64, scale: &Scale) -> f64 {
    weight * scale.normalize(value)
}

/// Weighted contribution of an attribute scored by closeness to `target`.
/// Decays linearly to zero across the full span of the scale.
#[inline]
pub fn distance_contribution(weight: f64, value: f64, target: f64, scale: &Scale) -> f64 {
    let closeness = 1.0 - (value - target).abs() / scale.span();
    weight * closeness.max(0.0)
}
