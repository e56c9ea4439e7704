//! Algorithm configuration model
//!
//! One strongly-typed parameter bundle per algorithm family. Bundles are parsed from
//! JSON with unknown fields rejected, and validated before any scoring happens; a
//! configuration is never corrected silently.

use crate::baseline::VarianceRule;
use crate::error::ScoringError;
use crate::types::{AlgorithmType, ComparisonOperator, EvaluationPeriod};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default days in a scoring window
pub const DEFAULT_WINDOW_DAYS: usize = 7;

/// JSON envelope for a stored recommendation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// Identifier of the stored config (e.g. "REC0001.1-PROPORTIONAL")
    #[serde(default)]
    pub config_id: Option<String>,
    /// Algorithm tag, resolved through the dispatcher's registry
    pub algorithm_type: String,
    /// Parameters for the selected algorithm
    pub config: serde_json::Value,
}

impl ConfigDocument {
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve the tag and parse the parameter block into a validated config
    pub fn into_config(self) -> Result<AlgorithmConfig, ScoringError> {
        let algorithm_type: AlgorithmType = self.algorithm_type.parse()?;
        let config = AlgorithmConfig::from_value(algorithm_type, self.config)?;
        config.validate()?;
        Ok(config)
    }
}

/// Parameter bundle for one algorithm, one variant per strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlgorithmConfig {
    Proportional(ProportionalConfig),
    BinaryThreshold(BinaryThresholdConfig),
    ZoneBased(ZoneBasedConfig),
    BaselineConsistency(BaselineConsistencyConfig),
    WeekendVariance(WeekendVarianceConfig),
    CompletionBased(CompletionBasedConfig),
    CompositeWeighted(CompositeWeightedConfig),
}

/// Missing, mistyped and unrecognized fields are configuration errors
fn parse_block<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ScoringError> {
    serde_json::from_value(value).map_err(ScoringError::from_schema)
}

impl AlgorithmConfig {
    /// Parse a parameter block for the given algorithm family
    pub fn from_value(
        algorithm_type: AlgorithmType,
        value: serde_json::Value,
    ) -> Result<Self, ScoringError> {
        let parsed = match algorithm_type {
            AlgorithmType::Proportional => AlgorithmConfig::Proportional(parse_block(value)?),
            AlgorithmType::BinaryThreshold => {
                AlgorithmConfig::BinaryThreshold(parse_block(value)?)
            }
            AlgorithmType::ZoneBased => AlgorithmConfig::ZoneBased(parse_block(value)?),
            AlgorithmType::BaselineConsistency => {
                AlgorithmConfig::BaselineConsistency(parse_block(value)?)
            }
            AlgorithmType::WeekendVariance => {
                AlgorithmConfig::WeekendVariance(parse_block(value)?)
            }
            AlgorithmType::CompletionBased => {
                AlgorithmConfig::CompletionBased(parse_block(value)?)
            }
            AlgorithmType::CompositeWeighted => {
                AlgorithmConfig::CompositeWeighted(parse_block(value)?)
            }
        };
        Ok(parsed)
    }

    pub fn algorithm_type(&self) -> AlgorithmType {
        match self {
            AlgorithmConfig::Proportional(_) => AlgorithmType::Proportional,
            AlgorithmConfig::BinaryThreshold(_) => AlgorithmType::BinaryThreshold,
            AlgorithmConfig::ZoneBased(_) => AlgorithmType::ZoneBased,
            AlgorithmConfig::BaselineConsistency(_) => AlgorithmType::BaselineConsistency,
            AlgorithmConfig::WeekendVariance(_) => AlgorithmType::WeekendVariance,
            AlgorithmConfig::CompletionBased(_) => AlgorithmType::CompletionBased,
            AlgorithmConfig::CompositeWeighted(_) => AlgorithmType::CompositeWeighted,
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        match self {
            AlgorithmConfig::Proportional(c) => c.validate(),
            AlgorithmConfig::BinaryThreshold(c) => c.validate(),
            AlgorithmConfig::ZoneBased(c) => c.validate(),
            AlgorithmConfig::BaselineConsistency(c) => c.validate(),
            AlgorithmConfig::WeekendVariance(c) => c.validate(),
            AlgorithmConfig::CompletionBased(c) => c.validate(),
            AlgorithmConfig::CompositeWeighted(c) => c.validate(),
        }
    }
}

fn default_maximum_cap() -> f64 {
    100.0
}

fn default_true() -> bool {
    true
}

fn default_success_value() -> f64 {
    100.0
}

fn default_threshold_operator() -> ComparisonOperator {
    ComparisonOperator::GreaterOrEqual
}

fn default_window_days() -> usize {
    DEFAULT_WINDOW_DAYS
}

fn ensure_positive(name: &str, value: f64) -> Result<(), ScoringError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ScoringError::invalid(format!(
            "{name} must be greater than 0, got {value}"
        )));
    }
    Ok(())
}

/// Proportional scoring: `(actual / target) * 100` with floor, cap and partial credit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProportionalConfig {
    /// Per-day target (daily mode) or window target (rolling mode)
    pub target: f64,
    pub unit: String,
    #[serde(default)]
    pub evaluation_period: EvaluationPeriod,
    #[serde(default)]
    pub minimum_threshold: f64,
    #[serde(default = "default_maximum_cap")]
    pub maximum_cap: f64,
    /// Return the floor instead of 0 when below `minimum_threshold`
    #[serde(default = "default_true")]
    pub partial_credit: bool,
    /// Most any single day may contribute
    #[serde(default)]
    pub daily_limit: Option<f64>,
    #[serde(default)]
    pub description: String,
}

impl ProportionalConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        ensure_positive("target", self.target)?;
        if !self.minimum_threshold.is_finite() || self.minimum_threshold < 0.0 {
            return Err(ScoringError::invalid(
                "minimum_threshold cannot be negative",
            ));
        }
        if !self.maximum_cap.is_finite() || self.maximum_cap < self.minimum_threshold {
            return Err(ScoringError::invalid(format!(
                "maximum_cap ({}) cannot be less than minimum_threshold ({})",
                self.maximum_cap, self.minimum_threshold
            )));
        }
        if let Some(limit) = self.daily_limit {
            ensure_positive("daily_limit", limit)?;
        }
        Ok(())
    }
}

/// Binary threshold scoring: success value when the comparison holds, failure otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryThresholdConfig {
    pub threshold: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_success_value")]
    pub success_value: f64,
    #[serde(default)]
    pub failure_value: f64,
    #[serde(default = "default_threshold_operator")]
    pub comparison_operator: ComparisonOperator,
    #[serde(default)]
    pub evaluation_period: EvaluationPeriod,
    #[serde(default)]
    pub description: String,
}

impl BinaryThresholdConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        ensure_positive("threshold", self.threshold)?;
        if !self.success_value.is_finite() || !self.failure_value.is_finite() {
            return Err(ScoringError::invalid(
                "success_value and failure_value must be finite",
            ));
        }
        if self.success_value < self.failure_value {
            return Err(ScoringError::invalid(format!(
                "success_value ({}) cannot be less than failure_value ({})",
                self.success_value, self.failure_value
            )));
        }
        Ok(())
    }
}

/// A scoring zone, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Zone {
    pub min: f64,
    pub max: f64,
    pub score: f64,
    pub label: String,
}

impl Zone {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// How values near zone edges are scored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryHandling {
    #[default]
    Strict,
    /// 95%..100% of the zone score across the zone's width
    Graduated,
}

/// Largest gap tolerated between adjacent zones
pub const ZONE_GAP_TOLERANCE: f64 = 0.1;

/// Zone-based scoring over a 3- or 5-tier zone table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneBasedConfig {
    pub zones: Vec<Zone>,
    pub unit: String,
    #[serde(default)]
    pub grace_range: bool,
    #[serde(default)]
    pub boundary_handling: BoundaryHandling,
    /// Days per window the optimal zone should be hit
    #[serde(default)]
    pub frequency_target: Option<u32>,
    #[serde(default)]
    pub evaluation_period: EvaluationPeriod,
    #[serde(default)]
    pub description: String,
}

impl ZoneBasedConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !matches!(self.zones.len(), 3 | 5) {
            return Err(ScoringError::invalid(format!(
                "zone-based scoring requires 3 or 5 zones, got {}",
                self.zones.len()
            )));
        }
        for zone in &self.zones {
            if !zone.min.is_finite() || !zone.max.is_finite() || zone.min > zone.max {
                return Err(ScoringError::invalid(format!(
                    "zone '{}' has an invalid range [{}, {}]",
                    zone.label, zone.min, zone.max
                )));
            }
            if !zone.score.is_finite() || zone.score < 0.0 {
                return Err(ScoringError::invalid(format!(
                    "zone '{}' has a negative score",
                    zone.label
                )));
            }
        }
        if self.optimal_score() <= 0.0 {
            return Err(ScoringError::invalid("at least one zone must score above 0"));
        }

        let sorted = self.sorted_zones();
        for pair in sorted.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if current.max > next.min {
                return Err(ScoringError::invalid(format!(
                    "overlap between zones: {} and {}",
                    current.label, next.label
                )));
            }
            if next.min - current.max >= ZONE_GAP_TOLERANCE {
                return Err(ScoringError::invalid(format!(
                    "gap between zones: {} and {}",
                    current.label, next.label
                )));
            }
        }

        if self.frequency_target == Some(0) {
            return Err(ScoringError::invalid("frequency_target must be at least 1"));
        }
        Ok(())
    }

    /// Zones ordered by lower bound
    pub fn sorted_zones(&self) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self.zones.iter().collect();
        zones.sort_by(|a, b| a.min.total_cmp(&b.min));
        zones
    }

    /// Highest score any zone awards
    pub fn optimal_score(&self) -> f64 {
        self.zones.iter().map(|z| z.score).fold(0.0, f64::max)
    }
}

/// Schema block for baseline consistency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineConsistencySchema {
    #[serde(default)]
    pub tracked_metrics: Vec<String>,
    /// 1-indexed day whose value becomes the baseline
    #[serde(default = "default_baseline_day")]
    pub baseline_day: usize,
    #[serde(default = "default_consistency_variance")]
    pub variance_threshold: f64,
    #[serde(default)]
    pub comparison_operator: ComparisonOperator,
    /// Evaluate days 1-5 only
    #[serde(default)]
    pub weekdays_only: bool,
    #[serde(default = "default_daily_weight")]
    pub daily_weight: f64,
    /// Defaults to 5 when weekdays-only, else 7
    #[serde(default)]
    pub required_days: Option<usize>,
    #[serde(default = "default_window_days")]
    pub total_days: usize,
}

fn default_baseline_day() -> usize {
    1
}

fn default_consistency_variance() -> f64 {
    60.0
}

fn default_daily_weight() -> f64 {
    20.0
}

impl Default for BaselineConsistencySchema {
    fn default() -> Self {
        Self {
            tracked_metrics: Vec::new(),
            baseline_day: default_baseline_day(),
            variance_threshold: default_consistency_variance(),
            comparison_operator: ComparisonOperator::default(),
            weekdays_only: false,
            daily_weight: default_daily_weight(),
            required_days: None,
            total_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl BaselineConsistencySchema {
    pub fn required_days(&self) -> usize {
        self.required_days
            .unwrap_or(if self.weekdays_only { 5 } else { 7 })
    }

    /// Last day that is ever evaluated
    pub fn last_evaluated_day(&self) -> usize {
        if self.weekdays_only {
            5.min(self.total_days)
        } else {
            self.total_days
        }
    }

    pub fn variance_rule(&self) -> VarianceRule {
        VarianceRule::new(self.variance_threshold, self.comparison_operator)
    }

    /// Cap on the final score
    pub fn max_potential(&self) -> f64 {
        self.daily_weight * self.required_days() as f64
    }
}

/// Baseline consistency: one day sets the baseline, other days must stay near it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineConsistencyConfig {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema: BaselineConsistencySchema,
}

impl BaselineConsistencyConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        let schema = &self.schema;
        if schema.total_days == 0 {
            return Err(ScoringError::invalid("total_days must be at least 1"));
        }
        if schema.baseline_day == 0 || schema.baseline_day > schema.last_evaluated_day() {
            return Err(ScoringError::invalid(format!(
                "baseline_day must be between 1 and {}, got {}",
                schema.last_evaluated_day(),
                schema.baseline_day
            )));
        }
        if schema.required_days() == 0 {
            return Err(ScoringError::invalid("required_days must be at least 1"));
        }
        ensure_positive("daily_weight", schema.daily_weight)?;
        schema.variance_rule().validate()
    }
}

/// Schema block for weekend variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeekendVarianceSchema {
    #[serde(default)]
    pub tracked_metrics: Vec<String>,
    #[serde(default)]
    pub calculated_metrics: Vec<String>,
    #[serde(default = "default_weekday_baseline_days")]
    pub weekday_baseline_days: usize,
    #[serde(default = "default_weekend_days")]
    pub weekend_days: usize,
    #[serde(default = "default_weekend_variance")]
    pub variance_threshold: f64,
    #[serde(default)]
    pub comparison_operator: ComparisonOperator,
    #[serde(default = "default_weekend_day_weight")]
    pub weekend_day_weight: f64,
    #[serde(default = "default_window_days")]
    pub total_days: usize,
}

fn default_weekday_baseline_days() -> usize {
    5
}

fn default_weekend_days() -> usize {
    2
}

fn default_weekend_variance() -> f64 {
    90.0
}

fn default_weekend_day_weight() -> f64 {
    50.0
}

impl Default for WeekendVarianceSchema {
    fn default() -> Self {
        Self {
            tracked_metrics: Vec::new(),
            calculated_metrics: Vec::new(),
            weekday_baseline_days: default_weekday_baseline_days(),
            weekend_days: default_weekend_days(),
            variance_threshold: default_weekend_variance(),
            comparison_operator: ComparisonOperator::default(),
            weekend_day_weight: default_weekend_day_weight(),
            total_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl WeekendVarianceSchema {
    pub fn variance_rule(&self) -> VarianceRule {
        VarianceRule::new(self.variance_threshold, self.comparison_operator)
    }
}

/// Weekend variance: weekday mean is the baseline, weekend days are scored against it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeekendVarianceConfig {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema: WeekendVarianceSchema,
}

impl WeekendVarianceConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        let schema = &self.schema;
        if schema.weekday_baseline_days == 0 {
            return Err(ScoringError::invalid(
                "weekday_baseline_days must be at least 1",
            ));
        }
        if schema.weekend_days == 0 {
            return Err(ScoringError::invalid("weekend_days must be at least 1"));
        }
        if schema.weekday_baseline_days + schema.weekend_days > schema.total_days {
            return Err(ScoringError::invalid(format!(
                "weekday_baseline_days + weekend_days ({}) exceeds total_days ({})",
                schema.weekday_baseline_days + schema.weekend_days,
                schema.total_days
            )));
        }
        ensure_positive("weekend_day_weight", schema.weekend_day_weight)?;
        schema.variance_rule().validate()
    }
}

/// Completion tracking for one-time tasks such as screenings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionBasedConfig {
    /// Compliance metric the daily statuses come from
    #[serde(default)]
    pub calculated_metric: Option<String>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

impl CompletionBasedConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self
            .calculated_metric
            .as_deref()
            .is_some_and(|metric| metric.trim().is_empty())
        {
            return Err(ScoringError::invalid("calculated_metric cannot be blank"));
        }
        Ok(())
    }
}

/// How a composite component turns its value into a 0-100 score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentMethod {
    #[default]
    Proportional,
    Binary,
    #[serde(alias = "zone_based", alias = "zone_based_5tier")]
    Zone,
}

fn default_component_weight() -> f64 {
    1.0
}

/// Zone inside a composite component; open-ended when a bound is omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentZone {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl ComponentZone {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| min <= value) && self.max.map_or(true, |max| value <= max)
    }

    fn is_inverted(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }
}

/// Method-specific parameters of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentParameters {
    #[serde(default)]
    pub minimum_threshold: f64,
    #[serde(default = "default_maximum_cap")]
    pub maximum_cap: f64,
    /// Binary threshold; the component target when omitted
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default = "default_success_value")]
    pub success_value: f64,
    #[serde(default)]
    pub failure_value: f64,
    #[serde(default = "default_threshold_operator")]
    pub comparison_operator: ComparisonOperator,
    #[serde(default)]
    pub zones: Vec<ComponentZone>,
}

impl Default for ComponentParameters {
    fn default() -> Self {
        Self {
            minimum_threshold: 0.0,
            maximum_cap: default_maximum_cap(),
            threshold: None,
            success_value: default_success_value(),
            failure_value: 0.0,
            comparison_operator: default_threshold_operator(),
            zones: Vec::new(),
        }
    }
}

/// One weighted input of a composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeComponent {
    pub name: String,
    /// Key of this component in a day's component values
    pub field_name: String,
    #[serde(default = "default_component_weight")]
    pub weight: f64,
    pub target: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub scoring_method: ComponentMethod,
    #[serde(default)]
    pub parameters: ComponentParameters,
}

impl CompositeComponent {
    fn validate(&self) -> Result<(), ScoringError> {
        let name = &self.name;
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ScoringError::invalid(format!(
                "component {name} has an invalid weight {}",
                self.weight
            )));
        }
        if !self.target.is_finite() {
            return Err(ScoringError::invalid(format!(
                "component {name} has a non-finite target"
            )));
        }
        let params = &self.parameters;
        match self.scoring_method {
            ComponentMethod::Proportional => {
                ensure_positive(&format!("component {name} target"), self.target)?;
                if params.maximum_cap < params.minimum_threshold {
                    return Err(ScoringError::invalid(format!(
                        "component {name} maximum_cap cannot be less than minimum_threshold"
                    )));
                }
            }
            ComponentMethod::Binary => {
                if params.success_value < params.failure_value {
                    return Err(ScoringError::invalid(format!(
                        "component {name} success_value cannot be less than failure_value"
                    )));
                }
            }
            ComponentMethod::Zone => {
                if params.zones.is_empty() {
                    return Err(ScoringError::invalid(format!(
                        "component {name} uses zone scoring without zones"
                    )));
                }
                if params.zones.iter().any(ComponentZone::is_inverted) {
                    return Err(ScoringError::invalid(format!(
                        "component {name} has a zone with min above max"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Weighted average of several component scores per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeWeightedConfig {
    pub components: Vec<CompositeComponent>,
    #[serde(default)]
    pub minimum_threshold: f64,
    #[serde(default = "default_maximum_cap")]
    pub maximum_cap: f64,
    #[serde(default)]
    pub description: String,
}

impl CompositeWeightedConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.components.is_empty() {
            return Err(ScoringError::invalid(
                "at least one component must be defined",
            ));
        }
        for component in &self.components {
            component.validate()?;
        }
        if self.total_weight() <= 0.0 {
            return Err(ScoringError::invalid(
                "total component weight must be greater than 0",
            ));
        }
        if !self.minimum_threshold.is_finite() || self.minimum_threshold < 0.0 {
            return Err(ScoringError::invalid(
                "minimum_threshold cannot be negative",
            ));
        }
        if !self.maximum_cap.is_finite() || self.maximum_cap < self.minimum_threshold {
            return Err(ScoringError::invalid(format!(
                "maximum_cap ({}) cannot be less than minimum_threshold ({})",
                self.maximum_cap, self.minimum_threshold
            )));
        }
        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.components.iter().map(|c| c.weight).sum()
    }
}
