//! Patient context normalization
//!
//! Demographic attributes arrive as an open string-keyed map. Keys and text values are
//! lowercased on the way in so sub-config matching can compare them directly. Null
//! attributes are dropped.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single demographic attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatientValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl PatientValue {
    /// Numeric reading of the value; numeric text parses, flags do not
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PatientValue::Number(n) => Some(*n),
            PatientValue::Text(s) => s.trim().parse().ok(),
            PatientValue::Flag(_) => None,
        }
    }

    fn normalized(self) -> Self {
        match self {
            PatientValue::Text(s) => PatientValue::Text(s.to_lowercase()),
            other => other,
        }
    }
}

impl fmt::Display for PatientValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientValue::Flag(b) => write!(f, "{b}"),
            PatientValue::Number(n) => write!(f, "{n}"),
            PatientValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PatientValue {
    fn from(value: &str) -> Self {
        PatientValue::Text(value.to_string())
    }
}

impl From<String> for PatientValue {
    fn from(value: String) -> Self {
        PatientValue::Text(value)
    }
}

impl From<f64> for PatientValue {
    fn from(value: f64) -> Self {
        PatientValue::Number(value)
    }
}

impl From<u32> for PatientValue {
    fn from(value: u32) -> Self {
        PatientValue::Number(f64::from(value))
    }
}

impl From<bool> for PatientValue {
    fn from(value: bool) -> Self {
        PatientValue::Flag(value)
    }
}

/// Normalized patient demographic context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<PatientValue>>",
    into = "BTreeMap<String, PatientValue>"
)]
pub struct PatientInfo {
    attributes: BTreeMap<String, PatientValue>,
}

impl PatientInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, normalizing key and text value
    pub fn with(mut self, key: &str, value: impl Into<PatientValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<PatientValue>) {
        self.attributes
            .insert(key.trim().to_lowercase(), value.into().normalized());
    }

    /// Set `age` in whole years as of `as_of`.
    ///
    /// A birth date after `as_of` yields age 0.
    pub fn with_age_on(self, birth_date: NaiveDate, as_of: NaiveDate) -> Self {
        let age = whole_years_between(birth_date, as_of);
        self.with("age", age)
    }

    /// Look up an attribute; `key` is matched case-insensitively
    pub fn get(&self, key: &str) -> Option<&PatientValue> {
        self.attributes.get(&key.to_lowercase())
    }

    /// Numeric age, if present and numeric
    pub fn age(&self) -> Option<f64> {
        self.get("age").and_then(PatientValue::as_number)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatientValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<BTreeMap<String, Option<PatientValue>>> for PatientInfo {
    fn from(raw: BTreeMap<String, Option<PatientValue>>) -> Self {
        let mut info = PatientInfo::new();
        for (key, value) in raw {
            if let Some(value) = value {
                info.insert(&key, value);
            }
        }
        info
    }
}

impl From<PatientInfo> for BTreeMap<String, PatientValue> {
    fn from(info: PatientInfo) -> Self {
        info.attributes
    }
}

fn whole_years_between(birth_date: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= birth_date {
        return 0;
    }
    let mut years = as_of.year() - birth_date.year();
    if (as_of.month(), as_of.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}
