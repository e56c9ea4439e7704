//! Adherence scoring strategies
//!
//! Every algorithm family implements [`AdherenceAlgorithm`]: score a full window of
//! daily values, or report dual progress for a window that is still open.
//!
//! - **Proportional**: percentage of a per-day or per-window target
//! - **Binary threshold**: pass/fail against a threshold, or a weekly allowance
//! - **Zone-based**: score by which zone the value lands in
//! - **Baseline consistency**: stay within a band around a designated day
//! - **Weekend variance**: weekend days compared with the weekday mean
//! - **Completion-based**: one-time tasks, done or not within the cycle
//! - **Composite weighted**: weighted average of several scored components

pub mod baseline_consistency;
pub mod binary_threshold;
pub mod completion_based;
pub mod composite_weighted;
pub mod proportional;
pub mod weekend_variance;
pub mod zone_based;

use crate::config::AlgorithmConfig;
use crate::error::ScoringError;
use crate::types::{AlgorithmType, DailyValueSeries, DualProgress, ScoreResult};

/// Uniform contract shared by all scoring strategies
pub trait AdherenceAlgorithm {
    fn algorithm_type(&self) -> AlgorithmType;

    /// Score a complete window
    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError>;

    /// Progress achieved through `current_day` and the best still reachable.
    ///
    /// `current_day` beyond the window is clamped to the window length.
    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress;

    /// Human-readable formula for audit output
    fn formula(&self) -> String;
}

impl AlgorithmConfig {
    /// The strategy backing this configuration
    pub fn as_algorithm(&self) -> &dyn AdherenceAlgorithm {
        match self {
            AlgorithmConfig::Proportional(c) => c,
            AlgorithmConfig::BinaryThreshold(c) => c,
            AlgorithmConfig::ZoneBased(c) => c,
            AlgorithmConfig::BaselineConsistency(c) => c,
            AlgorithmConfig::WeekendVariance(c) => c,
            AlgorithmConfig::CompletionBased(c) => c,
            AlgorithmConfig::CompositeWeighted(c) => c,
        }
    }
}

/// Clamp a requested day into the window
pub(crate) fn clamp_day(series: &DailyValueSeries, current_day: usize) -> usize {
    current_day.min(series.len())
}

/// Error for an empty window, carrying a zero-progress result
pub(crate) fn empty_window(partial: ScoreResult) -> ScoringError {
    ScoringError::InsufficientData {
        required: 1,
        available: 0,
        partial: Box::new(partial),
    }
}
