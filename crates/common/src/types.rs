//! Common types for the model registry
//!
//! Enumerations shared between the hyperparameter layer and the boosting
//! engine. Each one round-trips through its wire spelling.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Learning objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Logistic loss on 0/1 labels, scores are probabilities
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::BinaryLogistic => write!(f, "binary:logistic"),
        }
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "binary:logistic" => Ok(Objective::BinaryLogistic),
            _ => Err(format!("unsupported objective: {}", s)),
        }
    }
}

/// Evaluation metric reported after training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalMetric {
    /// Negative log-likelihood
    #[serde(rename = "logloss")]
    LogLoss,
    /// Misclassification rate at a 0.5 threshold
    #[serde(rename = "error")]
    Error,
    /// Area under the ROC curve
    #[serde(rename = "auc")]
    Auc,
}

impl fmt::Display for EvalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalMetric::LogLoss => write!(f, "logloss"),
            EvalMetric::Error => write!(f, "error"),
            EvalMetric::Auc => write!(f, "auc"),
        }
    }
}

impl FromStr for EvalMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logloss" => Ok(EvalMetric::LogLoss),
            "error" => Ok(EvalMetric::Error),
            "auc" => Ok(EvalMetric::Auc),
            _ => Err(format!("unsupported eval metric: {}", s)),
        }
    }
}

/// Split-finding strategy used while growing trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeMethod {
    /// Quantile-binned candidate splits
    Hist,
    /// Every distinct value is a candidate split
    Exact,
    /// Treated as `Hist`
    Approx,
    /// Treated as `Hist`
    Auto,
}

impl TreeMethod {
    /// Returns true if splits are proposed from histogram bins
    pub fn is_binned(&self) -> bool {
        !matches!(self, TreeMethod::Exact)
    }
}

impl fmt::Display for TreeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeMethod::Hist => write!(f, "hist"),
            TreeMethod::Exact => write!(f, "exact"),
            TreeMethod::Approx => write!(f, "approx"),
            TreeMethod::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for TreeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hist" => Ok(TreeMethod::Hist),
            "exact" => Ok(TreeMethod::Exact),
            "approx" => Ok(TreeMethod::Approx),
            "auto" => Ok(TreeMethod::Auto),
            _ => Err(format!("unknown tree method: {}", s)),
        }
    }
}
