//! WellPath Scoring - Adherence and biomarker scoring engine
//!
//! Turns a patient's daily behavior data and biomarker values into normalized scores
//! that roll up into pillar (category) scores. Every operation is a pure function of
//! its configuration and data inputs: reference tables and algorithm configurations are
//! passed in, never held in global state.
//!
//! ## Modules
//!
//! - **Configuration**: one typed, validated parameter bundle per algorithm family
//! - **Algorithms**: proportional, binary-threshold, zone-based, baseline-consistency,
//!   weekend-variance, completion-based and composite-weighted strategies behind one
//!   trait
//! - **Dispatcher**: resolves an algorithm tag and forwards config and data
//! - **Biomarker**: demographic-aware range scoring of marker values
//! - **Pillar**: aggregation of marker scores per pillar and composite blending

pub mod algorithms;
pub mod baseline;
pub mod biomarker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod normalizer;
pub mod pillar;
pub mod types;

pub use algorithms::AdherenceAlgorithm;
pub use biomarker::{BiomarkerReport, BiomarkerScorer, MarkerReference, MarkerScore};
pub use config::{AlgorithmConfig, ConfigDocument};
pub use dispatcher::{evaluate, evaluate_document, evaluate_progress};
pub use error::ScoringError;
pub use normalizer::{PatientInfo, PatientValue};
pub use pillar::{CompositeWeights, PillarAggregator, PillarReport, PillarScore};
pub use types::{AlgorithmType, DailyValueSeries, DualProgress, ScoreResult};

/// Engine version reported by the CLI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const ENGINE_NAME: &str = "wellpath-scoring";
