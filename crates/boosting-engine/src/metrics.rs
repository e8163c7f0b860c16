//! Evaluation metrics for binary probabilities

use common::types::EvalMetric;

const EPS: f64 = 1e-15;

/// Evaluates `metric`; `None` when it is undefined for the data
pub fn evaluate(metric: EvalMetric, probs: &[f64], labels: &[i32]) -> Option<f64> {
    if probs.is_empty() || probs.len() != labels.len() {
        return None;
    }
    match metric {
        EvalMetric::LogLoss => Some(log_loss(probs, labels)),
        EvalMetric::Error => Some(error_rate(probs, labels)),
        EvalMetric::Auc => auc(probs, labels),
    }
}

/// Mean negative log-likelihood
pub fn log_loss(probs: &[f64], labels: &[i32]) -> f64 {
    let total: f64 = probs
        .iter()
        .zip(labels)
        .map(|(&p, &y)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            if y == 1 { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    total / probs.len() as f64
}

/// Fraction misclassified at a 0.5 threshold
pub fn error_rate(probs: &[f64], labels: &[i32]) -> f64 {
    let wrong = probs
        .iter()
        .zip(labels)
        .filter(|(p, y)| (**p > 0.5) != (**y == 1))
        .count();
    wrong as f64 / probs.len() as f64
}

/// Rank-based ROC AUC with averaged ranks for ties; `None` for one class
pub fn auc(probs: &[f64], labels: &[i32]) -> Option<f64> {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[a].total_cmp(&probs[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block i..=j shares the mean rank.
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += order[i..=j].iter().filter(|&&k| labels[k] == 1).count() as f64 * mean_rank;
        i = j + 1;
    }

    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}
