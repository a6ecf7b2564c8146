//! Condition AST data structures.
//!
//! - `ConditionNode`: one flat node per operator; only the fields relevant to
//!   `op` are read, the rest stay `None`
//! - `Ref`: the comparand of comparison operators, a column or a literal
//!
//! Trees arrive as JSON arrays, e.g.
//! `[{"op":"above","col":"rsi_14","ref":{"value":30}}]`.

use crate::domain::error::ConditionError;
use serde::{Deserialize, Deserializer, Serialize};

/// `null` decodes like an absent field.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Ref {
    pub fn col(col: impl Into<String>) -> Self {
        Self {
            col: Some(col.into()),
            value: None,
        }
    }

    pub fn value(value: f64) -> Self {
        Self {
            col: None,
            value: Some(value),
        }
    }

    /// Column name, ignoring an empty string.
    pub fn column(&self) -> Option<&str> {
        self.col.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub op: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<Ref>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_atr_mult: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_col: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atr_mult: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_col: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionNode>,
}

/// Empty strings count as absent, matching how the editor UI clears a field.
fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

fn positive_int(v: Option<i64>) -> Option<usize> {
    v.filter(|v| *v > 0).map(|v| v as usize)
}

fn positive_float(v: Option<f64>) -> Option<f64> {
    v.filter(|v| *v > 0.0)
}

impl ConditionNode {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            ..Self::default()
        }
    }

    pub fn col(&self) -> Option<&str> {
        non_empty(&self.col)
    }

    pub fn level_col(&self) -> Option<&str> {
        non_empty(&self.level_col)
    }

    pub fn indicator_col(&self) -> Option<&str> {
        non_empty(&self.indicator_col)
    }

    pub fn pattern_col(&self) -> Option<&str> {
        non_empty(&self.pattern_col)
    }

    pub fn width_col(&self) -> Option<&str> {
        non_empty(&self.width_col)
    }

    pub fn ref_col(&self) -> Option<&str> {
        non_empty(&self.ref_col)
    }

    pub fn n(&self) -> Option<usize> {
        positive_int(self.n)
    }

    pub fn lookback(&self) -> Option<usize> {
        positive_int(self.lookback)
    }

    /// Lookback, or `default` when unset or non-positive.
    pub fn lookback_or(&self, default: usize) -> usize {
        self.lookback().unwrap_or(default)
    }

    pub fn pct(&self) -> Option<f64> {
        positive_float(self.pct)
    }

    pub fn factor(&self) -> Option<f64> {
        positive_float(self.factor)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.0)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier.unwrap_or(0.0)
    }

    pub fn atr_mult(&self) -> f64 {
        self.atr_mult.unwrap_or(0.0)
    }

    pub fn tolerance_atr_mult(&self) -> f64 {
        self.tolerance_atr_mult.unwrap_or(0.0)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon.unwrap_or(0.0)
    }
}

/// Parses a JSON condition array. Empty input and `null` are zero conditions.
pub fn parse_nodes(raw: &str) -> Result<Vec<ConditionNode>, ConditionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| ConditionError::MalformedJson(e.to_string()))
}
