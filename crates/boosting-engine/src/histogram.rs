//! Quantile binning for histogram split finding
//!
//! Each feature gets at most [`MAX_BINS`] ascending cut points. A value
//! falls into the first bin whose cut is `>=` the value, so "bin <= b" and
//! "value <= cuts[b]" describe the same rows.

use ndarray::Array2;

/// Upper bound on bins per feature
pub const MAX_BINS: usize = 256;

/// Feature matrix pre-assigned to quantile bins
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    /// Ascending cut points per feature; the last one is the column maximum
    cuts: Vec<Vec<f32>>,

    /// Bin index per cell
    bins: Array2<u16>,
}

impl BinnedMatrix {
    /// Bins every column of `x` into at most `max_bins` bins
    pub fn build(x: &Array2<f32>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(1, MAX_BINS);
        let (rows, cols) = x.dim();

        let cuts: Vec<Vec<f32>> = (0..cols)
            .map(|f| quantile_cuts(x.column(f).iter().copied().collect(), max_bins))
            .collect();

        let mut bins = Array2::<u16>::zeros((rows, cols));
        for ((r, f), slot) in bins.indexed_iter_mut() {
            *slot = bin_of(&cuts[f], x[[r, f]]) as u16;
        }

        Self { cuts, bins }
    }

    /// Cut points of one feature
    pub fn cuts(&self, feature: usize) -> &[f32] {
        &self.cuts[feature]
    }

    /// Bin index of one cell
    pub fn bin(&self, row: usize, feature: usize) -> usize {
        self.bins[[row, feature]] as usize
    }
}

/// Index of the first cut `>= value`, clamped to the last bin
pub fn bin_of(cuts: &[f32], value: f32) -> usize {
    cuts.partition_point(|&c| c < value).min(cuts.len().saturating_sub(1))
}

fn quantile_cuts(mut values: Vec<f32>, max_bins: usize) -> Vec<f32> {
    values.sort_by(|a, b| a.total_cmp(b));

    let mut distinct = values.clone();
    distinct.dedup();
    if distinct.len() <= max_bins {
        return distinct;
    }

    let n = values.len();
    let mut cuts: Vec<f32> = (1..=max_bins)
        .map(|k| values[(k * n).div_ceil(max_bins) - 1])
        .collect();
    cuts.dedup();
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_few_distinct_values_get_own_bins() {
        let x = Array2::from_shape_vec((4, 1), vec![3.0, 1.0, 3.0, 2.0]).unwrap();
        let binned = BinnedMatrix::build(&x, MAX_BINS);
        assert_eq!(binned.cuts(0), &[1.0, 2.0, 3.0]);
        assert_eq!(binned.bin(0, 0), 2);
        assert_eq!(binned.bin(1, 0), 0);
        assert_eq!(binned.bin(3, 0), 1);
    }

    #[test]
    fn test_quantiles_respect_bin_budget() {
        let values: Vec<f32> = (0..1000).map(|v| v as f32).collect();
        let x = Array2::from_shape_vec((1000, 1), values).unwrap();
        let binned = BinnedMatrix::build(&x, 10);
        let cuts = binned.cuts(0);
        assert_eq!(cuts.len(), 10);
        assert_eq!(*cuts.last().unwrap(), 999.0);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
        for r in [0usize, 99, 100, 500, 999] {
            let b = binned.bin(r, 0);
            assert!(x[[r, 0]] <= cuts[b]);
            if b > 0 {
                assert!(x[[r, 0]] > cuts[b - 1]);
            }
        }
    }

    #[test]
    fn test_bin_of_clamps_to_last_bin() {
        let cuts = [1.0, 2.0];
        assert_eq!(bin_of(&cuts, 0.5), 0);
        assert_eq!(bin_of(&cuts, 2.0), 1);
        assert_eq!(bin_of(&cuts, 9.0), 1);
    }
}
