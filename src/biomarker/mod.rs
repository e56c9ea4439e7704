//! Biomarker range scoring
//!
//! Maps a measured value, plus optional patient context, through a marker's range
//! table to a normalized 0-1 score and a range label. Range tables can be
//! demographic-specific: each marker lists sub-configs guarded by predicates on age,
//! sex or other attributes, and the first sub-config whose predicates all hold is used.
//! When none hold, the first sub-config is the fallback.
//!
//! Scoring never fails on the value itself; a value outside every range scores 0 with
//! the label `out_of_range`.

mod scorer;
mod types;

pub use scorer::{BiomarkerReport, BiomarkerScorer, MarkerScore};
pub use types::{
    CriterionValue, MarkerDefinition, MarkerReference, PillarWeightMap, PillarWeights,
    Predicate, RangeDef, RangeScore, RawSubConfig, SubConfig, OUT_OF_RANGE,
};
