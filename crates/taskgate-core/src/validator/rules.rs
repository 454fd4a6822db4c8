//! Deterministic acceptance rules over a JSON proposal payload.
//!
//! Fields are addressed by dotted paths (`"hint.price_cents"`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One band of a classification: values strictly below `below` get `label`.
/// The last band usually has no bound and catches everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBand {
    pub label: String,
    #[serde(default)]
    pub below: Option<f64>,
}

impl ClassBand {
    pub fn below(label: impl Into<String>, bound: f64) -> Self {
        Self {
            label: label.into(),
            below: Some(bound),
        }
    }

    pub fn rest(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            below: None,
        }
    }
}

/// A single validator rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Numeric field within inclusive bounds.
    Range {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// `field` must be within `tolerance_pct` percent of `source * factor`.
    Tolerance {
        field: String,
        source: String,
        factor: f64,
        tolerance_pct: f64,
    },
    /// Label field derived from a continuous source field. Disagreement is
    /// auto-corrected, never rejected.
    Classification {
        field: String,
        source: String,
        bands: Vec<ClassBand>,
    },
    /// Proposal confidence must be at least `min`.
    MinConfidence { min: f64 },
    /// Proposal reasoning must have at least `min_chars` non-whitespace-trimmed characters.
    MinRationale { min_chars: usize },
}

impl ValidationRule {
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::Classification { .. })
    }
}

/// A hard rule failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable machine-readable code, e.g. `above_max`.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(code: &str, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

/// An automatic correction applied to the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub field: String,
    pub from: Value,
    pub to: Value,
}

pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

/// Set `path`, creating intermediate objects. Fails if a non-object is in the way.
pub fn set_path(value: &mut Value, path: &str, new: Value) -> bool {
    let mut keys = path.split('.').peekable();
    let mut cursor = value;
    while let Some(key) = keys.next() {
        let obj = match cursor {
            Value::Object(obj) => obj,
            _ => return false,
        };
        if keys.peek().is_none() {
            obj.insert(key.to_string(), new);
            return true;
        }
        cursor = obj
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    false
}

/// Read a numeric field or produce the violation explaining why not.
pub(crate) fn number_at(payload: &Value, field: &str) -> Result<f64, Violation> {
    match get_path(payload, field) {
        None | Some(Value::Null) => Err(Violation::new(
            "missing_field",
            Some(field),
            format!("{field} is required"),
        )),
        Some(v) => v.as_f64().filter(|n| n.is_finite()).ok_or_else(|| {
            Violation::new("not_numeric", Some(field), format!("{field} must be a number"))
        }),
    }
}

/// Label the bands assign to `value`.
pub(crate) fn classify(bands: &[ClassBand], value: f64) -> Option<&str> {
    bands
        .iter()
        .find(|band| band.below.map_or(true, |bound| value < bound))
        .map(|band| band.label.as_str())
}
