//! Biomarker range scoring

use super::types::{CriterionValue, MarkerReference, Predicate, SubConfig, OUT_OF_RANGE};
use crate::error::ScoringError;
use crate::normalizer::{PatientInfo, PatientValue};
use crate::pillar::{PillarAggregator, PillarContribution, PillarReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Score of one measured marker value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerScore {
    pub marker_key: String,
    /// Display name from the reference
    pub marker: String,
    pub value: f64,
    /// Normalized score, 0-1
    pub score: f64,
    /// Best score the selected sub-config can award
    pub max_score: f64,
    pub range_label: String,
    /// Index of the sub-config that was used
    pub sub_config_index: usize,
    /// No sub-config matched the patient and the first one was used
    pub fallback: bool,
    /// Pillar name → contribution, for pillars with a positive weight
    pub pillar_contributions: BTreeMap<String, PillarContribution>,
}

/// Per-pillar totals plus the individual marker scores behind them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerReport {
    pub pillar_scores: PillarReport,
    pub marker_details: Vec<MarkerScore>,
    /// Input keys with no reference entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_markers: Vec<String>,
}

impl Predicate {
    /// Evaluate against normalized patient attributes.
    ///
    /// Age bounds fail when the patient has no numeric age. Equality passes when the
    /// patient does not carry the key.
    pub fn matches(&self, patient: &PatientInfo) -> bool {
        match self {
            Predicate::AgeAtLeast { bound, .. } => {
                patient.age().map(|age| age >= *bound).unwrap_or(false)
            }
            Predicate::AgeAtMost { bound, .. } => {
                patient.age().map(|age| age <= *bound).unwrap_or(false)
            }
            Predicate::Wildcard { .. } => true,
            Predicate::Equals { key, value } => match patient.get(key) {
                None => true,
                Some(actual) => criterion_equals(actual, value),
            },
        }
    }
}

fn criterion_equals(actual: &PatientValue, expected: &CriterionValue) -> bool {
    match (actual, expected) {
        (PatientValue::Text(a), CriterionValue::Text(e)) => a == e,
        (PatientValue::Number(a), CriterionValue::Number(e)) => a == e,
        (PatientValue::Flag(a), CriterionValue::Flag(e)) => a == e,
        _ => false,
    }
}

impl SubConfig {
    pub fn matches(&self, patient: &PatientInfo) -> bool {
        self.predicates.iter().all(|p| p.matches(patient))
    }
}

/// Scores marker values against an injected reference table.
///
/// Holds no state of its own; identical inputs always produce identical output.
#[derive(Debug, Clone, Copy)]
pub struct BiomarkerScorer<'a> {
    reference: &'a MarkerReference,
}

impl<'a> BiomarkerScorer<'a> {
    pub fn new(reference: &'a MarkerReference) -> Self {
        Self { reference }
    }

    /// Pick the sub-config for a patient: first full match, else the first one.
    ///
    /// Returns the index and whether the fallback was used.
    fn select_sub<'s>(
        marker_key: &str,
        subs: &'s [SubConfig],
        patient: Option<&PatientInfo>,
    ) -> Option<(usize, &'s SubConfig, bool)> {
        let first = subs.first()?;
        let patient = match patient {
            Some(p) if !p.is_empty() => p,
            _ => return Some((0, first, false)),
        };

        match subs.iter().position(|sub| sub.matches(patient)) {
            Some(index) => {
                debug!(marker = marker_key, sub_config = index, "selected sub-config");
                Some((index, &subs[index], false))
            }
            None => {
                warn!(
                    marker = marker_key,
                    "no sub-config matched patient; using first"
                );
                Some((0, first, true))
            }
        }
    }

    /// Score one marker value.
    ///
    /// Values outside every range score 0 with label `out_of_range`. Only a marker
    /// key missing from the reference is an error.
    pub fn score_value(
        &self,
        marker_key: &str,
        value: f64,
        patient: Option<&PatientInfo>,
    ) -> Result<MarkerScore, ScoringError> {
        let definition = self
            .reference
            .get(marker_key)
            .ok_or_else(|| ScoringError::UnknownMarker(marker_key.to_string()))?;

        let (sub_config_index, sub, fallback) =
            Self::select_sub(marker_key, &definition.subs, patient).ok_or_else(|| {
                ScoringError::invalid(format!("{marker_key} has no sub-configs"))
            })?;

        let (score, range_label) = match sub.range_for(value) {
            Some(range) => (range.score_for(value), range.label.clone()),
            None => (0.0, OUT_OF_RANGE.to_string()),
        };
        let max_score = sub.max_score();

        let pillar_contributions = definition
            .pillar_weights
            .iter()
            .filter(|(_, weight)| **weight > 0.0)
            .map(|(pillar, weight)| {
                (
                    pillar.clone(),
                    PillarContribution::new(score, max_score, *weight),
                )
            })
            .collect();

        Ok(MarkerScore {
            marker_key: marker_key.to_string(),
            marker: definition.name.clone(),
            value,
            score,
            max_score,
            range_label,
            sub_config_index,
            fallback,
            pillar_contributions,
        })
    }

    /// Score every marker for a patient and aggregate by pillar.
    ///
    /// Unknown markers are skipped and listed in the report.
    pub fn score_patient_biomarkers(
        &self,
        biomarkers: &BTreeMap<String, f64>,
        patient: Option<&PatientInfo>,
    ) -> BiomarkerReport {
        let mut aggregator = PillarAggregator::new();
        let mut marker_details = Vec::with_capacity(biomarkers.len());
        let mut unknown_markers = Vec::new();

        for (marker_key, value) in biomarkers {
            match self.score_value(marker_key, *value, patient) {
                Ok(score) => {
                    aggregator.add_marker(&score);
                    marker_details.push(score);
                }
                Err(err) => {
                    warn!(marker = %marker_key, error = %err, "skipping marker");
                    unknown_markers.push(marker_key.clone());
                }
            }
        }

        BiomarkerReport {
            pillar_scores: aggregator.finish(),
            marker_details,
            unknown_markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pillar::{CORE_CARE, HEALTHFUL_NUTRITION};
    use pretty_assertions::assert_eq;

    fn reference() -> MarkerReference {
        MarkerReference::from_json(
            r#"{
                "hdl": {
                    "name": "HDL Cholesterol",
                    "subs": [
                        {
                            "sex": "male",
                            "ranges": [
                                { "min": 0, "max": 40, "label": "Low", "score_type": "fixed", "score": 2 },
                                { "min": 40, "max": 60, "label": "Borderline", "score_type": "linear",
                                  "score_start": 5, "score_end": 10 },
                                { "min": 60, "max": 200, "label": "Optimal", "score_type": "fixed", "score": 10 }
                            ]
                        },
                        {
                            "sex": "female",
                            "ranges": [
                                { "min": 0, "max": 50, "label": "Low", "score_type": "fixed", "score": 2 },
                                { "min": 50, "max": 200, "label": "Optimal", "score_type": "fixed", "score": 10 }
                            ]
                        }
                    ],
                    "pillar_weights": { "Healthful Nutrition": 0.5, "Core Care": 1.0, "Restorative Sleep": 0 }
                },
                "vitamin_d": {
                    "name": "Vitamin D",
                    "subs": [
                        {
                            "age_low": 18, "age_high": 64, "sex": "all",
                            "ranges": [
                                { "min": 0, "max": 30, "label": "Deficient", "score_type": "fixed", "score": 3 },
                                { "min": 30, "max": 100, "label": "Sufficient", "score_type": "fixed", "score": 9 }
                            ]
                        },
                        {
                            "age_min": 65,
                            "ranges": [
                                { "min": 0, "max": 40, "label": "Deficient", "score_type": "fixed", "score": 3 },
                                { "min": 40, "max": 100, "label": "Sufficient", "score_type": "fixed", "score": 10 }
                            ]
                        }
                    ],
                    "pillar_weights": { "Core Care": 0.5 }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_score_value_is_idempotent() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);
        let patient = PatientInfo::new().with("sex", "Male").with("age", 41.0);

        let first = scorer.score_value("hdl", 47.5, Some(&patient)).unwrap();
        let second = scorer.score_value("hdl", 47.5, Some(&patient)).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_linear_range_endpoints() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);
        let male = PatientInfo::new().with("sex", "male");

        // Shared edge 40 goes to the first listed range
        assert_eq!(scorer.score_value("hdl", 40.0, Some(&male)).unwrap().score, 0.2);
        let top = scorer.score_value("hdl", 60.0, Some(&male)).unwrap();
        assert_eq!(top.score, 1.0);
        assert_eq!(top.range_label, "Borderline");
        let mid = scorer.score_value("hdl", 50.0, Some(&male)).unwrap();
        assert_eq!(mid.score, 0.75);
    }

    #[test]
    fn test_sex_selects_sub_config() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);
        let female = PatientInfo::new().with("SEX", "FEMALE");

        let score = scorer.score_value("hdl", 45.0, Some(&female)).unwrap();
        assert_eq!(score.sub_config_index, 1);
        assert_eq!(score.range_label, "Low");
        assert!(!score.fallback);
    }

    #[test]
    fn test_out_of_range_is_not_an_error() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);

        let score = scorer.score_value("hdl", 250.0, None).unwrap();
        assert_eq!(score.score, 0.0);
        assert_eq!(score.range_label, OUT_OF_RANGE);
        assert_eq!(score.max_score, 1.0);
    }

    #[test]
    fn test_age_predicates_and_fallback() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);

        let senior = PatientInfo::new().with("age", 70.0);
        let score = scorer.score_value("vitamin_d", 35.0, Some(&senior)).unwrap();
        assert_eq!(score.sub_config_index, 1);
        assert_eq!(score.range_label, "Deficient");

        // No age: both age-bounded sub-configs fail, first is the fallback
        let no_age = PatientInfo::new().with("sex", "female");
        let score = scorer.score_value("vitamin_d", 35.0, Some(&no_age)).unwrap();
        assert_eq!(score.sub_config_index, 0);
        assert!(score.fallback);
        assert_eq!(score.score, 0.9);

        let child = PatientInfo::new().with("age", 12.0);
        assert!(scorer.score_value("vitamin_d", 35.0, Some(&child)).unwrap().fallback);
    }

    #[test]
    fn test_unknown_marker() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);
        assert!(matches!(
            scorer.score_value("apob", 80.0, None),
            Err(ScoringError::UnknownMarker(key)) if key == "apob"
        ));
    }

    #[test]
    fn test_zero_weight_pillars_are_skipped() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);
        let score = scorer.score_value("hdl", 70.0, None).unwrap();

        let pillars: Vec<&str> = score.pillar_contributions.keys().map(String::as_str).collect();
        assert_eq!(pillars, vec![CORE_CARE, HEALTHFUL_NUTRITION]);
        assert_eq!(score.pillar_contributions[HEALTHFUL_NUTRITION].weighted_score, 0.5);
    }

    #[test]
    fn test_score_patient_biomarkers() {
        let reference = reference();
        let scorer = BiomarkerScorer::new(&reference);
        let patient = PatientInfo::new().with("sex", "male").with("age", 40.0);
        let biomarkers = BTreeMap::from([
            ("hdl".to_string(), 70.0),
            ("vitamin_d".to_string(), 20.0),
            ("apob".to_string(), 80.0),
        ]);

        let report = scorer.score_patient_biomarkers(&biomarkers, Some(&patient));
        assert_eq!(report.marker_details.len(), 2);
        assert_eq!(report.unknown_markers, vec!["apob".to_string()]);

        let core = report.pillar_scores.get(CORE_CARE).unwrap();
        // hdl 1.0 * 1.0 + vitamin_d 0.3 * 0.5 over 1.0 * 1.0 + 0.9 * 0.5
        assert!((core.total_weighted_score - 1.15).abs() < 1e-9);
        assert!((core.max_score - 1.45).abs() < 1e-9);
        assert!((core.percentage - 1.15 / 1.45 * 100.0).abs() < 1e-9);
        assert_eq!(
            core.contributing_markers,
            vec!["hdl".to_string(), "vitamin_d".to_string()]
        );
    }

    #[test]
    fn test_all_and_null_age_bounds_are_wildcards() {
        let reference = MarkerReference::from_json(
            r#"{
                "ferritin": {
                    "name": "Ferritin",
                    "subs": [
                        {
                            "age_low": "all", "age_high": null, "sex": "female",
                            "ranges": [
                                { "min": 0, "max": 30, "label": "Low", "score_type": "fixed",
                                  "score": 3 },
                                { "min": 30, "max": 300, "label": "Normal",
                                  "score_type": "fixed", "score": 10 }
                            ]
                        },
                        {
                            "age_low": 65,
                            "ranges": [
                                { "min": 0, "max": 500, "label": "Any", "score_type": "fixed",
                                  "score": 5 }
                            ]
                        }
                    ],
                    "pillar_weights": { "Core Care": 1.0 }
                }
            }"#,
        )
        .unwrap();
        let scorer = BiomarkerScorer::new(&reference);

        // No age on record, yet the wildcard bounds still match
        let female = PatientInfo::new().with("sex", "female");
        let score = scorer.score_value("ferritin", 45.0, Some(&female)).unwrap();
        assert_eq!(score.sub_config_index, 0);
        assert!(!score.fallback);
        assert_eq!(score.score, 1.0);

        let older_male = PatientInfo::new().with("sex", "male").with("age", 70.0);
        let score = scorer.score_value("ferritin", 45.0, Some(&older_male)).unwrap();
        assert_eq!(score.sub_config_index, 1);
        assert_eq!(score.score, 0.5);
    }

    #[test]
    fn test_reference_errors_are_configuration_errors() {
        let bad_bound = r#"{
            "ferritin": {
                "name": "Ferritin",
                "subs": [{ "age_low": "eighteen", "ranges": [
                    { "min": 0, "max": 30, "label": "Low", "score_type": "fixed", "score": 3 }
                ]}]
            }
        }"#;
        assert!(matches!(
            MarkerReference::from_json(bad_bound),
            Err(ScoringError::InvalidConfiguration(_))
        ));

        let missing_ranges = r#"{ "ferritin": { "name": "Ferritin", "subs": [{ "sex": "male" }] } }"#;
        assert!(matches!(
            MarkerReference::from_json(missing_ranges),
            Err(ScoringError::InvalidConfiguration(_))
        ));

        assert!(matches!(
            MarkerReference::from_json(r#"{ "ferritin": "#),
            Err(ScoringError::JsonError(_))
        ));
    }
}
