use crate::core::attributes::{AttributeCatalogue, Scale, ScoringMode};
use crate::core::error::ValidationError;
use crate::core::weights::normalize_importances;
use crate::models::PreferenceRequest;

/// One weighted attribute of a validated request
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringTerm<'a> {
    pub key: &'a str,
    pub weight: f64,
    pub scale: Scale,
    /// Requested target projected onto `scale`; `None` for magnitude terms
    pub target: Option<f64>,
}

/// Check a request against the catalogue and turn it into normalized
/// scoring terms, in catalogue order.
pub fn resolve_request<'a>(
    catalogue: &'a AttributeCatalogue,
    request: &PreferenceRequest,
    importance_scale: &Scale,
) -> Result<Vec<ScoringTerm<'a>>, ValidationError> {
    if request.result_count == 0 {
        return Err(ValidationError::InvalidResultCount(0));
    }

    if request.importances.is_empty() {
        return Err(ValidationError::NoImportances);
    }

    for (key, &weight) in &request.importances {
        if catalogue.get(key).is_none() {
            return Err(ValidationError::UnknownAttribute(key.clone()));
        }
        if !weight.is_finite() {
            return Err(ValidationError::NotFinite {
                field: format!("importances.{}", key),
            });
        }
        if !importance_scale.contains(weight) {
            return Err(ValidationError::ImportanceOutOfRange {
                attribute: key.clone(),
                value: weight,
                min: importance_scale.min,
                max: importance_scale.max,
            });
        }
    }

    for (key, &value) in &request.target_values {
        let spec = catalogue
            .get(key)
            .ok_or_else(|| ValidationError::UnknownAttribute(key.clone()))?;

        let ScoringMode::Distance { target } = spec.mode else {
            return Err(ValidationError::UnexpectedTarget(key.clone()));
        };

        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: format!("targets.{}", key),
            });
        }
        if !target.contains(value) {
            return Err(ValidationError::TargetOutOfRange {
                attribute: key.clone(),
                value,
                min: target.min,
                max: target.max,
            });
        }
    }

    // Importances are a BTreeMap; walk the catalogue instead so terms come
    // out in declaration order regardless of key spelling.
    let weighted: Vec<_> = catalogue
        .iter()
        .filter_map(|spec| request.importances.get(&spec.key).map(|&w| (spec, w)))
        .collect();
    let mut raw: Vec<f64> = weighted.iter().map(|(_, w)| *w).collect();
    if raw.iter().sum::<f64>() <= 0.0 {
        // Even fallback: spread only over terms that can be scored. A
        // distance term without a target gets nothing, and if no term is
        // scoreable every record ties at zero.
        raw = weighted
            .iter()
            .map(|(spec, _)| {
                let scoreable = match spec.mode {
                    ScoringMode::Magnitude => true,
                    ScoringMode::Distance { .. } => request.target_values.contains_key(&spec.key),
                };
                if scoreable { 1.0 } else { 0.0 }
            })
            .collect();
    }
    let normalized = if raw.iter().any(|&w| w > 0.0) {
        normalize_importances(&raw)
    } else {
        vec![0.0; raw.len()]
    };

    weighted
        .into_iter()
        .zip(normalized)
        .map(|((spec, _), weight)| {
            let target = match spec.mode {
                ScoringMode::Magnitude => None,
                ScoringMode::Distance { target } => {
                    match request.target_values.get(&spec.key) {
                        Some(&value) => Some(spec.scale.project_from(&target, value)),
                        None if weight > 0.0 => {
                            return Err(ValidationError::MissingTarget(spec.key.clone()))
                        }
                        // Zero weight: the term contributes nothing either way.
                        None => Some(spec.scale.min),
                    }
                }
            };

            Ok(ScoringTerm {
                key: &spec.key,
                weight,
                scale: spec.scale,
                target,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importance_scale() -> Scale {
        Scale::new(0.0, 8.0)
    }

    #[test]
    fn test_resolves_in_catalogue_order() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(5)
            .importance("safety", 2.0)
            .importance("walkability", 6.0)
            .importance("density", 0.0);

        let terms = resolve_request(&catalogue, &request, &importance_scale()).unwrap();

        let keys: Vec<_> = terms.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec!["walkability", "density", "safety"]);
        assert_eq!(terms[0].weight, 0.75);
        assert_eq!(terms[2].weight, 0.25);
    }

    #[test]
    fn test_target_is_projected_onto_record_scale() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(5)
            .importance("politics", 4.0)
            .target("politics", 6.0);

        let terms = resolve_request(&catalogue, &request, &importance_scale()).unwrap();

        assert_eq!(terms[0].target, Some(75.0));
    }

    #[test]
    fn test_zero_result_count_rejected() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(0).importance("cost", 1.0);

        assert_eq!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::InvalidResultCount(0))
        );
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3).importance("nightlife", 1.0);

        assert_eq!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::UnknownAttribute("nightlife".to_string()))
        );
    }

    #[test]
    fn test_importance_out_of_range_rejected() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3).importance("cost", 9.0);

        assert!(matches!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::ImportanceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_nan_importance_rejected() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3).importance("cost", f64::NAN);

        assert!(matches!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_target_on_magnitude_attribute_rejected() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3)
            .importance("cost", 1.0)
            .target("cost", 2.0);

        assert_eq!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::UnexpectedTarget("cost".to_string()))
        );
    }

    #[test]
    fn test_target_out_of_range_rejected() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3)
            .importance("density", 1.0)
            .target("density", 5.0);

        assert!(matches!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::TargetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_weighted_distance_attribute_needs_target() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3).importance("density", 3.0);

        assert_eq!(
            resolve_request(&catalogue, &request, &importance_scale()),
            Err(ValidationError::MissingTarget("density".to_string()))
        );
    }

    #[test]
    fn test_zero_weight_distance_attribute_may_omit_target() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3)
            .importance("density", 0.0)
            .importance("cost", 2.0);

        assert!(resolve_request(&catalogue, &request, &importance_scale()).is_ok());
    }

    #[test]
    fn test_all_zero_importances_skip_untargeted_distance_terms() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3)
            .importance("density", 0.0)
            .importance("cost", 0.0);

        let terms = resolve_request(&catalogue, &request, &importance_scale()).unwrap();

        let weights: Vec<_> = terms.iter().map(|t| (t.key, t.weight)).collect();
        assert_eq!(weights, vec![("cost", 1.0), ("density", 0.0)]);
    }

    #[test]
    fn test_all_zero_importances_share_with_targeted_distance_terms() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3)
            .importance("density", 0.0)
            .target("density", 2.0)
            .importance("cost", 0.0);

        let terms = resolve_request(&catalogue, &request, &importance_scale()).unwrap();

        assert!(terms.iter().all(|t| t.weight == 0.5));
    }

    #[test]
    fn test_all_zero_untargeted_distance_only_gives_zero_weights() {
        let catalogue = AttributeCatalogue::city_defaults();
        let request = PreferenceRequest::new(3)
            .importance("density", 0.0)
            .importance("politics", 0.0);

        let terms = resolve_request(&catalogue, &request, &importance_scale()).unwrap();

        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(|t| t.weight == 0.0));
    }
}
