//! End-to-end scoring from JSON inputs through the public API

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use wellpath_scoring::types::ScoreDetails;
use wellpath_scoring::{
    evaluate, evaluate_document, evaluate_progress, AlgorithmConfig, AlgorithmType,
    BiomarkerScorer, CompositeWeights, ConfigDocument, DailyValueSeries, MarkerReference,
    PatientInfo, ScoringError,
};

const MARKER_REFERENCE: &str = r#"{
    "hba1c": {
        "name": "HbA1c",
        "subs": [
            {
                "ranges": [
                    { "min": 0, "max": 5.6, "label": "Optimal", "score_type": "fixed", "score": 10 },
                    { "min": 5.6, "max": 6.4, "label": "Prediabetic", "score_type": "linear",
                      "score_start": 6, "score_end": 2 },
                    { "min": 6.4, "max": 20, "label": "Diabetic", "score_type": "fixed", "score": 0 }
                ]
            }
        ],
        "pillar_weights": { "Healthful Nutrition": 0.6, "Movement + Exercise": 0.4 }
    },
    "resting_hr": {
        "name": "Resting Heart Rate",
        "subs": [
            {
                "sex": "female",
                "ranges": [
                    { "min": 30, "max": 65, "label": "Excellent", "score_type": "fixed", "score": 10 },
                    { "min": 65, "max": 220, "label": "Elevated", "score_type": "fixed", "score": 4 }
                ]
            },
            {
                "sex": "male",
                "ranges": [
                    { "min": 30, "max": 60, "label": "Excellent", "score_type": "fixed", "score": 10 },
                    { "min": 60, "max": 220, "label": "Elevated", "score_type": "fixed", "score": 4 }
                ]
            }
        ],
        "pillar_weights": { "Movement + Exercise": 1.0, "Restorative Sleep": 0.5 }
    }
}"#;

fn series(json: &str) -> DailyValueSeries {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_baseline_consistency_document_end_to_end() {
    let document = ConfigDocument::from_json(
        r#"{
            "config_id": "REC0011.1-BASELINE-CONSISTENCY",
            "algorithm_type": "BASELINE-CONSISTENCY",
            "config": {
                "unit": "minutes",
                "schema": {
                    "tracked_metrics": ["sleep_time"],
                    "baseline_day": 1,
                    "variance_threshold": 0,
                    "comparison_operator": "<=",
                    "daily_weight": 20,
                    "required_days": 7
                }
            }
        }"#,
    )
    .unwrap();

    let week = series("[100, 100, 100, 100, 100, 100, 100]");
    let result = evaluate_document(document, &week).unwrap();
    assert_eq!(result.algorithm, AlgorithmType::BaselineConsistency);
    assert_eq!(result.final_score, 140.0);
    assert_eq!(result.max_potential_score, 140.0);
}

#[test]
fn test_weekend_variance_end_to_end() {
    let config = ConfigDocument::from_json(
        r#"{
            "algorithm_type": "WEEKEND-VARIANCE",
            "config": {
                "unit": "minutes",
                "schema": { "variance_threshold": 90, "weekend_day_weight": 50 }
            }
        }"#,
    )
    .unwrap()
    .into_config()
    .unwrap();
    let week = series("[70, 70, 70, 70, 70, 70, 70]");

    let result = evaluate("WEEKEND-VARIANCE", &config, &week).unwrap();
    assert_eq!(result.final_score, 100.0);
    assert_eq!(result.max_potential_score, 100.0);

    let progress = evaluate_progress("WEEKEND-VARIANCE", &config, &week, 5).unwrap();
    assert_eq!(progress.progress_toward_goal, 0.0);
    assert_eq!(progress.max_potential_adherence, 100.0);
}

#[test]
fn test_missing_days_stay_distinct_from_zero() {
    let config = ConfigDocument::from_json(
        r#"{
            "algorithm_type": "PROPORTIONAL",
            "config": { "target": 8000, "unit": "steps" }
        }"#,
    )
    .unwrap()
    .into_config()
    .unwrap();

    let result = evaluate("PROPORTIONAL", &config, &series("[8000, null, 0, 4000]")).unwrap();
    match result.details {
        ScoreDetails::Proportional(details) => {
            assert_eq!(
                details.progressive_scores,
                vec![Some(100.0), None, Some(0.0), Some(50.0)]
            );
            assert_eq!(details.days_with_data, 3);
        }
        other => panic!("unexpected details: {other:?}"),
    }
    assert_eq!(result.final_score, 37.5);
}

#[test]
fn test_insufficient_data_carries_partial_result() {
    let config = ConfigDocument::from_json(
        r#"{
            "algorithm_type": "baseline_consistency",
            "config": { "schema": { "baseline_day": 3 } }
        }"#,
    )
    .unwrap()
    .into_config()
    .unwrap();

    let err = evaluate("BASELINE-CONSISTENCY", &config, &series("[90, 95]")).unwrap_err();
    let partial = err.partial_result().unwrap();
    assert_eq!(partial.final_score, 0.0);
    assert_eq!(partial.max_potential_score, 140.0);
    assert!(matches!(err, ScoringError::InsufficientData { required: 3, .. }));
}

#[test]
fn test_invalid_documents_are_rejected() {
    let capped_below_floor = ConfigDocument::from_json(
        r#"{
            "algorithm_type": "PROPORTIONAL",
            "config": { "target": 10, "unit": "g", "minimum_threshold": 50, "maximum_cap": 20 }
        }"#,
    )
    .unwrap();
    assert!(matches!(
        capped_below_floor.into_config(),
        Err(ScoringError::InvalidConfiguration(_))
    ));

    let unknown_field = ConfigDocument::from_json(
        r#"{
            "algorithm_type": "BINARY-THRESHOLD",
            "config": { "threshold": 1, "treshold_op": ">=" }
        }"#,
    )
    .unwrap();
    assert!(matches!(
        unknown_field.into_config(),
        Err(ScoringError::InvalidConfiguration(_))
    ));

    let missing_target = ConfigDocument::from_json(
        r#"{ "algorithm_type": "PROPORTIONAL", "config": { "unit": "steps" } }"#,
    )
    .unwrap();
    assert!(matches!(
        missing_target.into_config(),
        Err(ScoringError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_stacked_supplements_score_by_composite() {
    let config = ConfigDocument::from_json(
        r#"{
            "config_id": "REC0032.2-STACK",
            "algorithm_type": "STACK",
            "config": {
                "components": [
                    { "name": "Magnesium", "field_name": "magnesium_taken", "weight": 1,
                      "target": 1, "scoring_method": "binary" },
                    { "name": "Omega-3", "field_name": "omega3_taken", "weight": 1,
                      "target": 2, "scoring_method": "proportional" }
                ]
            }
        }"#,
    )
    .unwrap()
    .into_config()
    .unwrap();
    let AlgorithmConfig::CompositeWeighted(composite) = &config else {
        panic!("unexpected config: {config:?}");
    };

    let day = |magnesium: f64, omega3: f64| {
        Some(BTreeMap::from([
            ("magnesium_taken".to_string(), magnesium),
            ("omega3_taken".to_string(), omega3),
        ]))
    };
    // 100, 75, missing, 0
    let week = composite.composite_series(&[day(1.0, 2.0), day(1.0, 1.0), None, day(0.0, 0.0)]);

    let result = evaluate("COMPOSITE-WEIGHTED", &config, &week).unwrap();
    assert_eq!(result.algorithm, AlgorithmType::CompositeWeighted);
    assert_eq!(result.final_score, 43.75);
}

#[test]
fn test_biomarkers_to_composite_score() {
    let reference = MarkerReference::from_json(MARKER_REFERENCE).unwrap();
    let patient: PatientInfo = serde_json::from_str(r#"{ "Sex": "Male", "age": 52 }"#).unwrap();
    let values: BTreeMap<String, f64> =
        serde_json::from_str(r#"{ "hba1c": 5.2, "resting_hr": 72, "ferritin": 90 }"#).unwrap();

    let scorer = BiomarkerScorer::new(&reference);
    let report = scorer.score_patient_biomarkers(&values, Some(&patient));

    assert_eq!(report.unknown_markers, vec!["ferritin".to_string()]);
    let resting_hr = report
        .marker_details
        .iter()
        .find(|m| m.marker_key == "resting_hr")
        .unwrap();
    assert_eq!(resting_hr.sub_config_index, 1);
    assert_eq!(resting_hr.range_label, "Elevated");

    // hba1c 1.0 * 0.4 + resting_hr 0.4 * 1.0 over 1.0 * 0.4 + 1.0 * 1.0
    let movement = report.pillar_scores.get("Movement + Exercise").unwrap();
    assert!((movement.percentage - 0.8 / 1.4 * 100.0).abs() < 1e-9);
    assert_eq!(report.pillar_scores.percentage("Healthful Nutrition"), 100.0);

    let survey = BTreeMap::from([("Healthful Nutrition".to_string(), 50.0)]);
    let composite = CompositeWeights::default()
        .combine(&report.pillar_scores, &survey, &BTreeMap::new())
        .unwrap();
    assert_eq!(composite.pillar_scores["Healthful Nutrition"], 81.0);
    assert_eq!(composite.pillar_scores.len(), 7);
}

#[test]
fn test_unknown_marker_is_an_error_for_single_scoring() {
    let reference = MarkerReference::from_json(MARKER_REFERENCE).unwrap();
    let scorer = BiomarkerScorer::new(&reference);
    assert!(matches!(
        scorer.score_value("ferritin", 90.0, None),
        Err(ScoringError::UnknownMarker(_))
    ));
}
