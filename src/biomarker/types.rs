//! Marker reference data model
//!
//! A reference file maps each marker key to its display name, an ordered list of
//! demographic sub-configurations and the pillars it contributes to:
//!
//! ```json
//! {
//!   "hdl": {
//!     "name": "HDL",
//!     "subs": [
//!       { "sex": "male", "ranges": [ { "min": 0, "max": 40, "label": "Low",
//!                                      "score_type": "fixed", "score": 2 } ] }
//!     ],
//!     "pillar_weights": { "Healthful Nutrition": 0.3 }
//!   }
//! }
//! ```
//!
//! Every key on a sub-config other than `ranges` is a matching criterion.

use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Pillar name → weight for one marker
pub type PillarWeights = BTreeMap<String, f64>;

/// Marker key → pillar weights, across a whole reference
pub type PillarWeightMap = BTreeMap<String, PillarWeights>;

/// Label reported when a value falls outside every range
pub const OUT_OF_RANGE: &str = "out_of_range";

/// How a range turns a value into a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "score_type", rename_all = "snake_case")]
pub enum RangeScore {
    Fixed { score: f64 },
    Linear { score_start: f64, score_end: f64 },
}

impl RangeScore {
    /// Highest normalized score this range can yield
    pub fn max_normalized(&self) -> f64 {
        match self {
            RangeScore::Fixed { score } => score / 10.0,
            RangeScore::Linear {
                score_start,
                score_end,
            } => score_start.max(*score_end) / 10.0,
        }
    }
}

/// One value range in a sub-config, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDef {
    pub min: f64,
    pub max: f64,
    pub label: String,
    #[serde(flatten)]
    pub score: RangeScore,
}

impl RangeDef {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Normalized (0-1) score for a value inside this range
    pub fn score_for(&self, value: f64) -> f64 {
        match &self.score {
            RangeScore::Fixed { score } => score / 10.0,
            RangeScore::Linear {
                score_start,
                score_end,
            } => {
                let width = self.max - self.min;
                let position = if width == 0.0 {
                    0.0
                } else {
                    (value - self.min) / width
                };
                (score_start + (score_end - score_start) * position) / 10.0
            }
        }
    }
}

/// Attribute value a criterion compares against
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

/// A single demographic predicate on a sub-config
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `age >= bound`, from `age_low` / `age_min`
    AgeAtLeast { key: String, bound: f64 },
    /// `age <= bound`, from `age_high` / `age_max`
    AgeAtMost { key: String, bound: f64 },
    /// Patient attribute must equal the value when the patient carries the key
    Equals { key: String, value: CriterionValue },
    /// `all` or null
    Wildcard { key: String, raw: Value },
}

impl Predicate {
    fn parse(key: String, raw: Value) -> Result<Self, String> {
        if raw.is_null() || raw.as_str().is_some_and(|s| s.eq_ignore_ascii_case("all")) {
            return Ok(Predicate::Wildcard { key, raw });
        }

        let lowered = key.to_lowercase();
        if matches!(lowered.as_str(), "age_low" | "age_min" | "age_high" | "age_max") {
            let bound = raw
                .as_f64()
                .ok_or_else(|| format!("{key} must be numeric, \"all\" or null, got {raw}"))?;
            return if lowered.ends_with("_low") || lowered.ends_with("_min") {
                Ok(Predicate::AgeAtLeast { key, bound })
            } else {
                Ok(Predicate::AgeAtMost { key, bound })
            };
        }

        let value = match raw {
            Value::String(s) => CriterionValue::Text(s.to_lowercase()),
            Value::Bool(b) => CriterionValue::Flag(b),
            Value::Number(n) => CriterionValue::Number(
                n.as_f64()
                    .ok_or_else(|| format!("criterion {key} has a non-finite number"))?,
            ),
            other => {
                return Err(format!(
                    "criterion {key} must be a string, number, boolean, \"all\" or null, \
                     got {other}"
                ))
            }
        };
        Ok(Predicate::Equals {
            key: lowered,
            value,
        })
    }

    /// Criterion key as written in the reference file
    pub fn key(&self) -> &str {
        match self {
            Predicate::AgeAtLeast { key, .. }
            | Predicate::AgeAtMost { key, .. }
            | Predicate::Equals { key, .. }
            | Predicate::Wildcard { key, .. } => key,
        }
    }

    fn to_raw(&self) -> Value {
        match self {
            Predicate::AgeAtLeast { bound, .. } | Predicate::AgeAtMost { bound, .. } => {
                Value::from(*bound)
            }
            Predicate::Equals { value, .. } => match value {
                CriterionValue::Text(s) => Value::from(s.clone()),
                CriterionValue::Number(n) => Value::from(*n),
                CriterionValue::Flag(b) => Value::from(*b),
            },
            Predicate::Wildcard { raw, .. } => raw.clone(),
        }
    }
}

/// Sub-config as it appears in the reference file: `ranges` plus loose criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSubConfig {
    pub ranges: Vec<RangeDef>,
    #[serde(flatten)]
    pub criteria: BTreeMap<String, Value>,
}

/// Demographic-specific range table for one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSubConfig", into = "RawSubConfig")]
pub struct SubConfig {
    pub predicates: Vec<Predicate>,
    pub ranges: Vec<RangeDef>,
}

impl TryFrom<RawSubConfig> for SubConfig {
    type Error = String;

    fn try_from(raw: RawSubConfig) -> Result<Self, Self::Error> {
        let predicates = raw
            .criteria
            .into_iter()
            .map(|(key, value)| Predicate::parse(key, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SubConfig {
            predicates,
            ranges: raw.ranges,
        })
    }
}

impl From<SubConfig> for RawSubConfig {
    fn from(sub: SubConfig) -> Self {
        let criteria = sub
            .predicates
            .iter()
            .map(|p| (p.key().to_string(), p.to_raw()))
            .collect();
        RawSubConfig {
            ranges: sub.ranges,
            criteria,
        }
    }
}

impl SubConfig {
    /// First range containing the value
    pub fn range_for(&self, value: f64) -> Option<&RangeDef> {
        self.ranges.iter().find(|r| r.contains(value))
    }

    /// Highest normalized score any range in this sub-config can yield
    pub fn max_score(&self) -> f64 {
        self.ranges
            .iter()
            .map(|r| r.score.max_normalized())
            .fold(0.0, f64::max)
    }

    fn validate(&self, marker_key: &str, index: usize) -> Result<(), ScoringError> {
        if self.ranges.is_empty() {
            return Err(ScoringError::invalid(format!(
                "{marker_key} sub-config {index} has no ranges"
            )));
        }
        for range in &self.ranges {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(ScoringError::invalid(format!(
                    "{marker_key} range '{}' has invalid bounds [{}, {}]",
                    range.label, range.min, range.max
                )));
            }
        }

        let mut sorted: Vec<&RangeDef> = self.ranges.iter().collect();
        sorted.sort_by(|a, b| a.min.total_cmp(&b.min));
        for pair in sorted.windows(2) {
            // Shared edges are allowed; the first listed range wins
            if pair[0].max > pair[1].min {
                return Err(ScoringError::invalid(format!(
                    "{marker_key} sub-config {index}: ranges '{}' and '{}' overlap",
                    pair[0].label, pair[1].label
                )));
            }
        }
        Ok(())
    }
}

/// Reference entry for one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDefinition {
    pub name: String,
    pub subs: Vec<SubConfig>,
    #[serde(default)]
    pub pillar_weights: PillarWeights,
}

/// Immutable marker reference table, keyed by marker key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerReference {
    markers: BTreeMap<String, MarkerDefinition>,
}

impl MarkerReference {
    pub fn new(markers: BTreeMap<String, MarkerDefinition>) -> Self {
        Self { markers }
    }

    /// Parse and validate a reference file
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let value: Value = serde_json::from_str(json)?;
        let reference: MarkerReference =
            serde_json::from_value(value).map_err(ScoringError::from_schema)?;
        reference.validate()?;
        Ok(reference)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        for (key, marker) in &self.markers {
            if marker.subs.is_empty() {
                return Err(ScoringError::invalid(format!("{key} has no sub-configs")));
            }
            for (index, sub) in marker.subs.iter().enumerate() {
                sub.validate(key, index)?;
            }
            for (pillar, weight) in &marker.pillar_weights {
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(ScoringError::invalid(format!(
                        "{key} has an invalid weight {weight} for pillar {pillar}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, marker_key: &str) -> Option<&MarkerDefinition> {
        self.markers.get(marker_key)
    }

    pub fn contains(&self, marker_key: &str) -> bool {
        self.markers.contains_key(marker_key)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn marker_keys(&self) -> impl Iterator<Item = &str> {
        self.markers.keys().map(String::as_str)
    }

    /// Every (marker, pillar) weight in the reference
    pub fn pillar_weight_map(&self) -> PillarWeightMap {
        self.markers
            .iter()
            .map(|(key, marker)| (key.clone(), marker.pillar_weights.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_sub_config_criteria_become_predicates() {
        let sub: SubConfig = serde_json::from_value(json!({
            "sex": "Female",
            "age_low": 18,
            "age_max": 49,
            "condition": "all",
            "ranges": [
                { "min": 0, "max": 10, "label": "Low", "score_type": "fixed", "score": 4 }
            ]
        }))
        .unwrap();

        assert_eq!(
            sub.predicates,
            vec![
                Predicate::AgeAtLeast {
                    key: "age_low".to_string(),
                    bound: 18.0
                },
                Predicate::AgeAtMost {
                    key: "age_max".to_string(),
                    bound: 49.0
                },
                Predicate::Wildcard {
                    key: "condition".to_string(),
                    raw: json!("all")
                },
                Predicate::Equals {
                    key: "sex".to_string(),
                    value: CriterionValue::Text("female".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_non_numeric_age_bound_is_rejected() {
        let result: Result<SubConfig, _> = serde_json::from_value(json!({
            "age_low": "eighteen",
            "ranges": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_linear_endpoints() {
        let range: RangeDef = serde_json::from_value(json!({
            "min": 40, "max": 60, "label": "Rising",
            "score_type": "linear", "score_start": 5, "score_end": 10
        }))
        .unwrap();

        assert_eq!(range.score_for(40.0), 0.5);
        assert_eq!(range.score_for(60.0), 1.0);
        assert_eq!(range.score_for(50.0), 0.75);
        assert_eq!(range.score.max_normalized(), 1.0);
    }

    #[test]
    fn test_degenerate_linear_range_uses_start() {
        let range = RangeDef {
            min: 5.0,
            max: 5.0,
            label: "Point".to_string(),
            score: RangeScore::Linear {
                score_start: 3.0,
                score_end: 9.0,
            },
        };
        assert_eq!(range.score_for(5.0), 0.3);
    }

    #[test]
    fn test_reference_rejects_overlapping_ranges() {
        let json = r#"{
            "ldl": {
                "name": "LDL",
                "subs": [{ "ranges": [
                    { "min": 0, "max": 100, "label": "Optimal", "score_type": "fixed", "score": 10 },
                    { "min": 90, "max": 160, "label": "High", "score_type": "fixed", "score": 4 }
                ]}],
                "pillar_weights": { "Healthful Nutrition": 0.5 }
            }
        }"#;
        assert!(matches!(
            MarkerReference::from_json(json),
            Err(ScoringError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_reference_round_trips_sub_config_shape() {
        let json = r#"{
            "hdl": {
                "name": "HDL",
                "subs": [{ "sex": "male", "ranges": [
                    { "min": 0, "max": 40, "label": "Low", "score_type": "fixed", "score": 2 },
                    { "min": 40, "max": 100, "label": "Good", "score_type": "fixed", "score": 10 }
                ]}],
                "pillar_weights": { "Healthful Nutrition": 0.3, "Core Care": 0.0 }
            }
        }"#;
        let reference = MarkerReference::from_json(json).unwrap();
        let value = serde_json::to_value(&reference).unwrap();

        assert_eq!(value["hdl"]["subs"][0]["sex"], json!("male"));
        assert_eq!(value["hdl"]["subs"][0]["ranges"][1]["score_type"], json!("fixed"));
        assert_eq!(reference.pillar_weight_map()["hdl"]["Healthful Nutrition"], 0.3);
        assert_eq!(reference.get("hdl").unwrap().subs[0].max_score(), 1.0);
    }
}
