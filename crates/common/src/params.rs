//! Training hyperparameters
//!
//! Callers send a free-form overlay map; every known key is resolved
//! independently against its documented default, so omitting one key never
//! changes another.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{EvalMetric, Objective, TreeMethod};

/// Deepest tree the engine will grow
pub const MAX_TREE_DEPTH: usize = 32;

/// Most boosting rounds a single training may request
pub const MAX_N_ESTIMATORS: usize = 10_000;

/// Wire keys understood by [`Hyperparameters::overlay`]
pub const KNOWN_KEYS: [&str; 12] = [
    "objective",
    "eval_metric",
    "max_depth",
    "eta",
    "subsample",
    "colsample_bytree",
    "min_child_weight",
    "lambda",
    "alpha",
    "seed",
    "tree_method",
    "n_estimators",
];

/// A caller-supplied value that could not be used
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid hyperparameter '{key}': {reason}")]
pub struct ParamError {
    /// Offending overlay key
    pub key: String,
    /// Why the value was rejected
    pub reason: String,
}

impl ParamError {
    fn new(key: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Effective hyperparameters for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Learning objective
    pub objective: Objective,

    /// Metric evaluated on the training set after fitting
    pub eval_metric: EvalMetric,

    /// Maximum tree depth
    pub max_depth: usize,

    /// Learning rate (shrinkage)
    pub eta: f64,

    /// Fraction of rows sampled per tree
    pub subsample: f64,

    /// Fraction of columns sampled per tree
    pub colsample_bytree: f64,

    /// Minimum Hessian sum required in a child
    pub min_child_weight: f64,

    /// L2 regularization on leaf weights
    #[serde(rename = "lambda")]
    pub reg_lambda: f64,

    /// L1 regularization on leaf weights
    #[serde(rename = "alpha")]
    pub reg_alpha: f64,

    /// Random seed for row/column sampling
    pub seed: u64,

    /// Split-finding strategy
    pub tree_method: TreeMethod,

    /// Number of boosting rounds
    pub n_estimators: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            objective: Objective::BinaryLogistic,
            eval_metric: EvalMetric::LogLoss,
            max_depth: 5,
            eta: 0.08,
            subsample: 0.9,
            colsample_bytree: 0.9,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            seed: 42,
            tree_method: TreeMethod::Hist,
            n_estimators: 300,
        }
    }
}

impl Hyperparameters {
    /// Resolves an overlay map against the defaults
    ///
    /// Numbers may be sent as JSON numbers or numeric strings. Keys not in
    /// [`KNOWN_KEYS`] are ignored.
    pub fn overlay(overrides: &Map<String, Value>) -> Result<Self, ParamError> {
        let mut params = Self::default();

        if let Some(v) = overrides.get("objective") {
            params.objective = as_str(v, "objective")?
                .parse()
                .map_err(|e: String| ParamError::new("objective", e))?;
        }
        if let Some(v) = overrides.get("eval_metric") {
            params.eval_metric = as_str(v, "eval_metric")?
                .parse()
                .map_err(|e: String| ParamError::new("eval_metric", e))?;
        }
        if let Some(v) = overrides.get("tree_method") {
            params.tree_method = as_str(v, "tree_method")?
                .parse()
                .map_err(|e: String| ParamError::new("tree_method", e))?;
        }
        if let Some(v) = overrides.get("max_depth") {
            let depth = as_int(v, "max_depth")?;
            if depth < 0 || depth as usize > MAX_TREE_DEPTH {
                return Err(ParamError::new(
                    "max_depth",
                    format!("must be between 0 and {}", MAX_TREE_DEPTH),
                ));
            }
            params.max_depth = depth as usize;
        }
        if let Some(v) = overrides.get("eta") {
            let eta = as_float(v, "eta")?;
            if eta <= 0.0 {
                return Err(ParamError::new("eta", "must be positive"));
            }
            params.eta = eta;
        }
        if let Some(v) = overrides.get("subsample") {
            params.subsample = as_fraction(v, "subsample")?;
        }
        if let Some(v) = overrides.get("colsample_bytree") {
            params.colsample_bytree = as_fraction(v, "colsample_bytree")?;
        }
        if let Some(v) = overrides.get("min_child_weight") {
            params.min_child_weight = as_non_negative(v, "min_child_weight")?;
        }
        if let Some(v) = overrides.get("lambda") {
            params.reg_lambda = as_non_negative(v, "lambda")?;
        }
        if let Some(v) = overrides.get("alpha") {
            params.reg_alpha = as_non_negative(v, "alpha")?;
        }
        if let Some(v) = overrides.get("seed") {
            let seed = as_int(v, "seed")?;
            if seed < 0 {
                return Err(ParamError::new("seed", "must not be negative"));
            }
            params.seed = seed as u64;
        }
        if let Some(v) = overrides.get("n_estimators") {
            let rounds = as_int(v, "n_estimators")?;
            if rounds < 1 || rounds > MAX_N_ESTIMATORS as i64 {
                return Err(ParamError::new(
                    "n_estimators",
                    format!("must be between 1 and {}", MAX_N_ESTIMATORS),
                ));
            }
            params.n_estimators = rounds as usize;
        }

        Ok(params)
    }

    /// Overlay keys that were not recognised
    pub fn ignored_keys(overrides: &Map<String, Value>) -> Vec<String> {
        overrides
            .keys()
            .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    /// Effective parameters as a JSON map, keyed by wire name
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn as_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, ParamError> {
    value
        .as_str()
        .ok_or_else(|| ParamError::new(key, format!("expected a string, got {}", value)))
}

fn as_float(value: &Value, key: &str) -> Result<f64, ParamError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ParamError::new(key, format!("expected a number, got {}", value))),
    }
}

// Floats are truncated toward zero; numeric strings must be integral.
fn as_int(value: &Value, key: &str) -> Result<i64, ParamError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParamError::new(key, format!("expected an integer, got {}", value)))
}

fn as_fraction(value: &Value, key: &str) -> Result<f64, ParamError> {
    let v = as_float(value, key)?;
    if v <= 0.0 || v > 1.0 {
        return Err(ParamError::new(key, "must be in (0, 1]"));
    }
    Ok(v)
}

fn as_non_negative(value: &Value, key: &str) -> Result<f64, ParamError> {
    let v = as_float(value, key)?;
    if v < 0.0 {
        return Err(ParamError::new(key, "must not be negative"));
    }
    Ok(v)
}
