//! Gradient-boosted regression stumps.
//!
//! Small, fully deterministic estimator for `(mark, year) -> percentile`.
//! Squared-error loss gives the central estimate; pinball loss at a given
//! `alpha` gives a conditional quantile. Quantile leaves take the
//! `alpha`-quantile of the residuals they cover, not the gradient mean.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FEATURES: usize = 2;

pub type FeatureRow = [f64; FEATURES];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("training cancelled")]
pub struct TrainingCancelled;

/// Shared abort flag checked between boosting rounds.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }

    pub fn check(&self) -> Result<(), TrainingCancelled> {
        if self.is_cancelled() {
            Err(TrainingCancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Loss {
    SquaredError,
    Quantile { alpha: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub rounds: usize,
    pub learning_rate: f64,
    /// Upper bound on split candidates per feature.
    pub max_bins: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            rounds: 200,
            learning_rate: 0.1,
            max_bins: 64,
            min_samples_leaf: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
}

impl Stump {
    fn value(&self, row: &FeatureRow) -> f64 {
        if row[self.feature] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    pub loss: Loss,
    pub baseline: f64,
    pub learning_rate: f64,
    pub stumps: Vec<Stump>,
}

impl BoostedModel {
    pub fn fit(
        features: &[FeatureRow],
        targets: &[f64],
        loss: Loss,
        params: &BoostingParams,
        cancel: &CancelToken,
    ) -> Result<Self, TrainingCancelled> {
        debug_assert_eq!(features.len(), targets.len());
        let baseline = match loss {
            Loss::SquaredError => mean(targets),
            Loss::Quantile { alpha } => quantile(targets, alpha),
        };
        let mut model = Self {
            loss,
            baseline,
            learning_rate: params.learning_rate,
            stumps: Vec::new(),
        };
        if targets.is_empty() {
            return Ok(model);
        }

        let candidates: Vec<Vec<f64>> = (0..FEATURES)
            .map(|f| split_candidates(features, f, params.max_bins))
            .collect();
        let mut current = vec![baseline; targets.len()];
        let min_leaf = params.min_samples_leaf.max(1);

        for _ in 0..params.rounds {
            cancel.check()?;

            let gradients: Vec<f64> = targets
                .iter()
                .zip(&current)
                .map(|(&y, &f)| match loss {
                    Loss::SquaredError => y - f,
                    Loss::Quantile { alpha } => {
                        if y > f {
                            alpha
                        } else {
                            alpha - 1.0
                        }
                    }
                })
                .collect();

            let Some((feature, threshold)) = best_split(features, &gradients, &candidates, min_leaf) else {
                break;
            };

            let goes_left = |row: &FeatureRow| row[feature] <= threshold;
            let leaf_value = |left: bool| -> f64 {
                let members = features.iter().enumerate().filter(|(_, row)| goes_left(row) == left);
                match loss {
                    Loss::SquaredError => {
                        let values: Vec<f64> = members.map(|(i, _)| gradients[i]).collect();
                        mean(&values)
                    }
                    Loss::Quantile { alpha } => {
                        let residuals: Vec<f64> = members.map(|(i, _)| targets[i] - current[i]).collect();
                        quantile(&residuals, alpha)
                    }
                }
            };
            let stump = Stump {
                feature,
                threshold,
                left: leaf_value(true),
                right: leaf_value(false),
            };

            for (row, value) in features.iter().zip(current.iter_mut()) {
                *value += params.learning_rate * stump.value(row);
            }
            model.stumps.push(stump);
        }
        Ok(model)
    }

    pub fn predict(&self, row: &FeatureRow) -> f64 {
        self.baseline + self.learning_rate * self.stumps.iter().map(|s| s.value(row)).sum::<f64>()
    }
}

/// Split with the largest reduction in gradient variance, or `None` when no
/// split separates anything. Earlier features and thresholds win ties.
fn best_split(
    features: &[FeatureRow],
    gradients: &[f64],
    candidates: &[Vec<f64>],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let n = gradients.len();
    let total: f64 = gradients.iter().sum();
    let base = total * total / n as f64;

    let mut best: Option<(f64, usize, f64)> = None;
    for (feature, thresholds) in candidates.iter().enumerate() {
        for &threshold in thresholds {
            let mut left_sum = 0.0;
            let mut left_n = 0usize;
            for (row, g) in features.iter().zip(gradients) {
                if row[feature] <= threshold {
                    left_sum += g;
                    left_n += 1;
                }
            }
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64 - base;
            if gain > 1e-12 && best.map_or(true, |(top, _, _)| gain > top) {
                best = Some((gain, feature, threshold));
            }
        }
    }
    best.map(|(_, feature, threshold)| (feature, threshold))
}

/// Midpoints between consecutive distinct values, thinned to `max_bins`.
fn split_candidates(features: &[FeatureRow], feature: usize, max_bins: usize) -> Vec<f64> {
    let mut values: Vec<f64> = features.iter().map(|row| row[feature]).collect();
    values.sort_by(f64::total_cmp);
    values.dedup();

    let midpoints: Vec<f64> = values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    if midpoints.len() <= max_bins || max_bins == 0 {
        return midpoints;
    }
    let step = midpoints.len() as f64 / max_bins as f64;
    (0..max_bins)
        .map(|k| midpoints[((k as f64 + 0.5) * step) as usize])
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Linear-interpolated quantile, `alpha` in [0, 1].
pub fn quantile(values: &[f64], alpha: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let pos = alpha.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> (Vec<FeatureRow>, Vec<f64>) {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for year in [2023.0, 2024.0] {
            for mark in (100..=200).step_by(5) {
                let mark = mark as f64;
                features.push([mark, year]);
                targets.push((mark - 100.0) * 0.99);
            }
        }
        (features, targets)
    }

    #[test]
    fn quantile_interpolates() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile(&[5.0], 0.95), 5.0);
    }

    #[test]
    fn squared_error_tracks_monotone_target() {
        let (features, targets) = grid();
        let model = BoostedModel::fit(
            &features,
            &targets,
            Loss::SquaredError,
            &BoostingParams::default(),
            &CancelToken::new(),
        )
        .unwrap();
        let low = model.predict(&[110.0, 2024.0]);
        let high = model.predict(&[190.0, 2024.0]);
        assert!(high > low);
        assert!((high - 89.1).abs() < 5.0, "got {high}");
    }

    #[test]
    fn cancelled_token_aborts_fit() {
        let (features, targets) = grid();
        let token = CancelToken::new();
        token.cancel();
        let result = BoostedModel::fit(&features, &targets, Loss::SquaredError, &BoostingParams::default(), &token);
        assert_eq!(result, Err(TrainingCancelled));
    }
}
