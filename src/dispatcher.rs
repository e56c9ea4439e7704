//! Algorithm dispatch
//!
//! This module provides the public scoring API. It resolves an algorithm tag to one
//! of the registered strategies, checks the configuration against it and forwards
//! the daily series.

use crate::algorithms::AdherenceAlgorithm;
use crate::config::{AlgorithmConfig, ConfigDocument};
use crate::error::ScoringError;
use crate::types::{AlgorithmType, DailyValueSeries, DualProgress, ScoreResult};
use std::str::FromStr;
use tracing::{debug, warn};

impl FromStr for AlgorithmType {
    type Err = ScoringError;

    /// Tags match case-insensitively and accept `_` in place of `-`.
    ///
    /// `SINGLE` (one medication) and `STACK` (stacked supplements) are the
    /// recommendation kinds scored by completion and composite scoring.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "PROPORTIONAL" => Ok(AlgorithmType::Proportional),
            "BINARY-THRESHOLD" | "CONSTRAINED-WEEKLY-ALLOWANCE" => {
                Ok(AlgorithmType::BinaryThreshold)
            }
            "ZONE-BASED" | "ZONE-BASED-5TIER" => Ok(AlgorithmType::ZoneBased),
            "BASELINE-CONSISTENCY" => Ok(AlgorithmType::BaselineConsistency),
            "WEEKEND-VARIANCE" => Ok(AlgorithmType::WeekendVariance),
            "COMPLETION-BASED" | "SINGLE" => Ok(AlgorithmType::CompletionBased),
            "COMPOSITE-WEIGHTED" | "STACK" => Ok(AlgorithmType::CompositeWeighted),
            _ => Err(ScoringError::UnknownAlgorithmType(tag.to_string())),
        }
    }
}

/// Resolve a tag and make sure the configuration belongs to it and is valid
fn resolve<'a>(
    algorithm_type: &str,
    config: &'a AlgorithmConfig,
) -> Result<&'a dyn AdherenceAlgorithm, ScoringError> {
    let requested: AlgorithmType = algorithm_type
        .parse()
        .inspect_err(|_| warn!(algorithm_type, "no strategy registered for tag"))?;

    if requested != config.algorithm_type() {
        return Err(ScoringError::invalid(format!(
            "algorithm type {requested} does not match a {} configuration",
            config.algorithm_type()
        )));
    }
    config.validate()?;

    debug!(algorithm = %requested, "dispatching to strategy");
    Ok(config.as_algorithm())
}

/// Score a complete window of daily values.
///
/// # Arguments
/// * `algorithm_type` - Registered algorithm tag (e.g., "PROPORTIONAL")
/// * `config` - Parameters for that algorithm
/// * `series` - Daily values, day 1 first
///
/// # Errors
/// `UnknownAlgorithmType` for an unregistered tag, `InvalidConfiguration` when the
/// configuration is out of range or belongs to another algorithm, `InsufficientData`
/// (carrying a partial result) when the window cannot be scored.
///
/// # Example
/// ```ignore
/// let result = evaluate("PROPORTIONAL", &config, &series)?;
/// println!("{} / {}", result.final_score, result.max_potential_score);
/// ```
pub fn evaluate(
    algorithm_type: &str,
    config: &AlgorithmConfig,
    series: &DailyValueSeries,
) -> Result<ScoreResult, ScoringError> {
    let algorithm = resolve(algorithm_type, config)?;
    let result = algorithm.evaluate(series);
    if let Err(ScoringError::InsufficientData {
        required,
        available,
        ..
    }) = &result
    {
        warn!(
            algorithm = %algorithm.algorithm_type(),
            required,
            available,
            "insufficient data to score window"
        );
    }
    result
}

/// Dual progress for a window that is still open.
///
/// # Arguments
/// * `algorithm_type` - Registered algorithm tag
/// * `config` - Parameters for that algorithm
/// * `series` - Daily values known so far (may be padded to the full window)
/// * `current_day` - 1-indexed day reached; clamped to the series length
pub fn evaluate_progress(
    algorithm_type: &str,
    config: &AlgorithmConfig,
    series: &DailyValueSeries,
    current_day: usize,
) -> Result<DualProgress, ScoringError> {
    let algorithm = resolve(algorithm_type, config)?;
    Ok(algorithm.dual_progress(series, current_day))
}

/// Score a window using a stored configuration document
pub fn evaluate_document(
    document: ConfigDocument,
    series: &DailyValueSeries,
) -> Result<ScoreResult, ScoringError> {
    let tag = document.algorithm_type.clone();
    if let Some(config_id) = &document.config_id {
        debug!(config_id = %config_id, "evaluating stored configuration");
    }
    let config = document.into_config()?;
    evaluate(&tag, &config, series)
}

/// Human-readable formula for a configuration
pub fn describe(config: &AlgorithmConfig) -> String {
    config.as_algorithm().formula()
}
