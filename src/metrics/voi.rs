//! Variation of Information split and merge errors.

use serde::{Deserialize, Serialize};

use super::contingency::ContingencyTable;

/// Conditional entropies between two segmentations, in bits.
///
/// `split` is H(pred | gt): how much a ground truth region is fragmented in
/// the prediction. `merge` is H(gt | pred): how much a predicted region
/// mixes ground truth regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiErrors {
    /// H(pred | gt).
    pub split: f64,
    /// H(gt | pred).
    pub merge: f64,
}

impl VoiErrors {
    /// Compute both conditional entropies from a contingency table.
    ///
    /// An empty table (every voxel excluded) yields zero for both terms.
    #[must_use]
    pub fn compute(table: &ContingencyTable) -> Self {
        if table.is_empty() {
            return Self::default();
        }

        let n = table.total() as f64;
        let gt = table.gt_marginals();
        let pred = table.pred_marginals();

        let mut split = 0.0;
        let mut merge = 0.0;
        for (g, p, count) in table.pairs() {
            let n_ij = count as f64;
            let p_ij = n_ij / n;
            split -= p_ij * (n_ij / gt[&g] as f64).log2();
            merge -= p_ij * (n_ij / pred[&p] as f64).log2();
        }

        Self {
            split: split.max(0.0),
            merge: merge.max(0.0),
        }
    }

    /// Total variation of information, `split + merge`.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.split + self.merge
    }
}
