//! Core types for the WellPath scoring engine
//!
//! This module defines the shapes that flow in and out of every algorithm: the daily
//! value window, evaluation periods, comparison operators, and the score records
//! returned to callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithm family identifier, one per registered strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum AlgorithmType {
    Proportional,
    BinaryThreshold,
    ZoneBased,
    BaselineConsistency,
    WeekendVariance,
    CompletionBased,
    CompositeWeighted,
}

impl AlgorithmType {
    /// Every registered strategy, in registration order
    pub const ALL: [AlgorithmType; 7] = [
        AlgorithmType::Proportional,
        AlgorithmType::BinaryThreshold,
        AlgorithmType::ZoneBased,
        AlgorithmType::BaselineConsistency,
        AlgorithmType::WeekendVariance,
        AlgorithmType::CompletionBased,
        AlgorithmType::CompositeWeighted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmType::Proportional => "PROPORTIONAL",
            AlgorithmType::BinaryThreshold => "BINARY-THRESHOLD",
            AlgorithmType::ZoneBased => "ZONE-BASED",
            AlgorithmType::BaselineConsistency => "BASELINE-CONSISTENCY",
            AlgorithmType::WeekendVariance => "WEEKEND-VARIANCE",
            AlgorithmType::CompletionBased => "COMPLETION-BASED",
            AlgorithmType::CompositeWeighted => "COMPOSITE-WEIGHTED",
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window an algorithm scores over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPeriod {
    /// Each day is scored against its own target
    #[default]
    #[serde(alias = "DAILY")]
    Daily,
    /// Values accumulate toward one target for the whole window
    #[serde(rename = "rolling_7_day", alias = "weekly", alias = "ROLLING_7_DAY")]
    Rolling7Day,
}

/// Comparison applied between a measured quantity and a threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "<=")]
    #[default]
    LessOrEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "=", alias = "==")]
    Equal,
}

impl ComparisonOperator {
    /// Evaluate `lhs <op> rhs`
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            ComparisonOperator::LessOrEqual => lhs <= rhs,
            ComparisonOperator::Less => lhs < rhs,
            ComparisonOperator::GreaterOrEqual => lhs >= rhs,
            ComparisonOperator::Greater => lhs > rhs,
            ComparisonOperator::Equal => lhs == rhs,
        }
    }

    /// `<` and `<=` describe a ceiling rather than a goal to reach
    pub fn is_upper_bound(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::LessOrEqual | ComparisonOperator::Less
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::Equal => "=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dated observation, before it is resolved into a day slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedReading {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered per-day observations for one tracked metric.
///
/// Days are 1-indexed. A missing day is `None`, which is distinct from a logged zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyValueSeries {
    values: Vec<Option<f64>>,
}

impl DailyValueSeries {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    /// Build a fully observed series
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            values: values.iter().copied().map(Some).collect(),
        }
    }

    /// Resolve dated readings into `days` slots starting at `window_start`.
    ///
    /// Readings on the same date are summed; readings outside the window are dropped.
    pub fn from_readings(window_start: NaiveDate, days: usize, readings: &[DatedReading]) -> Self {
        let mut values: Vec<Option<f64>> = vec![None; days];
        for reading in readings {
            let offset = (reading.date - window_start).num_days();
            if offset < 0 || offset as usize >= days {
                continue;
            }
            let slot = &mut values[offset as usize];
            *slot = Some(slot.unwrap_or(0.0) + reading.value);
        }
        Self { values }
    }

    /// Number of day slots, observed or not
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for a 1-indexed day; `None` when missing or outside the window
    pub fn day(&self, day: usize) -> Option<f64> {
        if day == 0 {
            return None;
        }
        self.values.get(day - 1).copied().flatten()
    }

    /// Number of days that carry an observation
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().copied()
    }

    pub fn as_slice(&self) -> &[Option<f64>] {
        &self.values
    }
}

impl From<Vec<Option<f64>>> for DailyValueSeries {
    fn from(values: Vec<Option<f64>>) -> Self {
        Self::new(values)
    }
}

/// Output of a full-window evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub algorithm: AlgorithmType,
    /// Final score, 0 up to the algorithm's cap
    pub final_score: f64,
    /// Upper bound achievable over the window
    pub max_potential_score: f64,
    /// Algorithm-specific audit trail
    pub details: ScoreDetails,
}

/// Progress so far and the best still reachable, for an in-progress window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualProgress {
    pub progress_toward_goal: f64,
    pub max_potential_adherence: f64,
    pub current_day: usize,
    pub remaining_days: usize,
    pub total_days: usize,
}

impl DualProgress {
    pub(crate) fn new(
        progress: f64,
        potential: f64,
        current_day: usize,
        total_days: usize,
    ) -> Self {
        Self {
            progress_toward_goal: progress,
            max_potential_adherence: potential,
            current_day,
            remaining_days: total_days.saturating_sub(current_day),
            total_days,
        }
    }
}

/// Algorithm-specific breakdown attached to a [`ScoreResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreDetails {
    Proportional(ProportionalDetails),
    BinaryThreshold(BinaryThresholdDetails),
    ZoneBased(ZoneBasedDetails),
    BaselineConsistency(BaselineConsistencyDetails),
    WeekendVariance(WeekendVarianceDetails),
    CompletionBased(CompletionBasedDetails),
    CompositeWeighted(CompositeWeightedDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProportionalDetails {
    pub evaluation_period: EvaluationPeriod,
    pub target: f64,
    pub unit: String,
    /// What the user sees on each day; `None` for days without data
    pub progressive_scores: Vec<Option<f64>>,
    /// Window total after daily limits (rolling mode only)
    pub window_total: Option<f64>,
    pub days_with_data: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryThresholdDetails {
    pub evaluation_period: EvaluationPeriod,
    pub threshold: f64,
    pub comparison_operator: ComparisonOperator,
    pub successful_days: usize,
    /// Summed window value (rolling mode only)
    pub window_total: Option<f64>,
    pub progressive_scores: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBasedDetails {
    pub unit: String,
    /// Zone label per day; `None` for days without data
    pub day_zones: Vec<Option<String>>,
    pub progressive_scores: Vec<Option<f64>>,
    pub optimal_zone_days: usize,
    pub frequency_target: Option<u32>,
}

/// One evaluated (or skipped) day of a baseline-driven algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayDetail {
    pub day: usize,
    pub value: Option<f64>,
    pub baseline: Option<f64>,
    pub variance: Option<f64>,
    pub within_threshold: Option<bool>,
    pub score_earned: f64,
    pub is_baseline_day: bool,
    pub missing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConsistencyDetails {
    pub baseline_day: usize,
    pub baseline_value: Option<f64>,
    pub variance_threshold: f64,
    pub comparison_operator: ComparisonOperator,
    pub weekdays_only: bool,
    pub daily_weight: f64,
    pub successful_days: usize,
    pub total_evaluated_days: usize,
    pub required_days: usize,
    pub earned_score: f64,
    pub day_details: Vec<DayDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekendVarianceDetails {
    pub baseline_value: Option<f64>,
    pub weekday_values: Vec<f64>,
    pub variance_threshold: f64,
    pub comparison_operator: ComparisonOperator,
    pub weekend_day_weight: f64,
    pub successful_weekend_days: usize,
    pub total_weekend_days: usize,
    pub available_weekend_days: usize,
    pub weekday_baseline_days: usize,
    pub progress_score: f64,
    pub day_details: Vec<DayDetail>,
}

/// Where a one-time task stands within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    /// Not done yet, and the cycle still has days left
    Pending,
    NotCompleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionBasedDetails {
    pub calculated_metric: Option<String>,
    pub completion_status: CompletionStatus,
    /// First day the task was reported done
    pub completed_on_day: Option<usize>,
    pub total_days_evaluated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeightedDetails {
    pub components: Vec<String>,
    /// Each day's composite score; `None` for days without data
    pub progressive_scores: Vec<Option<f64>>,
    pub window_total: f64,
    /// Total a perfect window would reach
    pub window_target: f64,
    pub days_with_data: usize,
}
