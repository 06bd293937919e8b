//! Adapted Rand error.
//!
//! Pairs of voxels are classified by whether they share a label in the
//! ground truth and in the prediction. With `n_ij` the table counts:
//!
//! | Quantity | Pairs |
//! |----------|-------|
//! | `s = Σ C(n_ij, 2)` | same label in both |
//! | `a = Σ C(n_i., 2)` | same ground truth label |
//! | `b = Σ C(n_.j, 2)` | same predicted label |
//!
//! Precision is `s / b`, recall is `s / a`, and the error is one minus their
//! harmonic mean, `1 - 2s / (a + b)`.

use serde::{Deserialize, Serialize};

use super::contingency::ContingencyTable;

/// Pair-counting agreement between two segmentations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandErrors {
    /// `1 - F`, in [0, 1]. Zero means identical partitions.
    pub adapted_rand_error: f64,
    /// Fraction of same-predicted-label pairs that share a ground truth label.
    pub precision: f64,
    /// Fraction of same-ground-truth-label pairs that share a predicted label.
    pub recall: f64,
    /// Fraction of all voxel pairs on which both segmentations agree.
    pub rand_index: f64,
}

impl Default for RandErrors {
    fn default() -> Self {
        Self {
            adapted_rand_error: 0.0,
            precision: 0.0,
            recall: 0.0,
            rand_index: 1.0,
        }
    }
}

impl RandErrors {
    /// Compute the Adapted Rand error and its components.
    ///
    /// Degenerate inputs resolve as follows:
    /// - a zero denominator makes precision or recall 0;
    /// - if no pair shares a label in either volume (`a + b == 0`), the
    ///   partitions agree trivially and the error is 0;
    /// - fewer than two voxels give a Rand index of 1.
    #[must_use]
    pub fn compute(table: &ContingencyTable) -> Self {
        let s: u128 = table.pairs().map(|(_, _, n)| pairs_of(n)).sum();
        let a: u128 = table.gt_marginals().values().map(|&n| pairs_of(n)).sum();
        let b: u128 = table.pred_marginals().values().map(|&n| pairs_of(n)).sum();
        let all = pairs_of(table.total());

        let precision = ratio(s, b);
        let recall = ratio(s, a);
        let adapted_rand_error = if a + b == 0 {
            0.0
        } else {
            (1.0 - (2 * s) as f64 / (a + b) as f64).clamp(0.0, 1.0)
        };
        let rand_index = if all == 0 {
            1.0
        } else {
            (all + 2 * s - a - b) as f64 / all as f64
        };

        log::trace!("rand pairs: same-both {s}, same-gt {a}, same-pred {b}, all {all}");

        Self {
            adapted_rand_error,
            precision,
            recall,
            rand_index,
        }
    }

    /// Harmonic mean of precision and recall.
    #[must_use]
    pub fn f_score(&self) -> f64 {
        1.0 - self.adapted_rand_error
    }
}

/// `C(n, 2)`.
fn pairs_of(n: u64) -> u128 {
    let n = u128::from(n);
    n * n.saturating_sub(1) / 2
}

fn ratio(num: u128, den: u128) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
