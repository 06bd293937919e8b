//! Voxel co-occurrence counts between two label volumes.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::error::Result;
use crate::volume::{Label, LabelVolume, ensure_same_shape};

/// Number of voxels each worker scans before its partial table is merged.
const SCAN_CHUNK: usize = 1 << 16;

type Counts = HashMap<(Label, Label), u64>;

/// Voxel counts per (ground truth label, predicted label) pair.
///
/// Row and column marginals and the grand total are kept alongside the
/// pair counts. The sum of all pair counts equals [`total`](Self::total)
/// and each marginal equals the sum of its row or column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContingencyTable {
    pairs: BTreeMap<(Label, Label), u64>,
    gt_marginals: BTreeMap<Label, u64>,
    pred_marginals: BTreeMap<Label, u64>,
    total: u64,
}

impl ContingencyTable {
    /// Count label co-occurrences over two volumes of equal shape.
    ///
    /// Voxels whose ground truth label equals `excluded_gt_label` are
    /// skipped entirely. The scan is split into voxel ranges that are
    /// counted in parallel and merged by addition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`](crate::Error::ShapeMismatch) if the
    /// volumes differ in extent.
    pub fn build(
        ground_truth: &LabelVolume<'_>,
        prediction: &LabelVolume<'_>,
        excluded_gt_label: Option<Label>,
    ) -> Result<Self> {
        let shape = ensure_same_shape(ground_truth, prediction)?;

        let counts = ground_truth
            .labels()
            .par_chunks(SCAN_CHUNK)
            .zip(prediction.labels().par_chunks(SCAN_CHUNK))
            .fold(HashMap::new, |mut acc: Counts, (gt, pred)| {
                for (&g, &p) in gt.iter().zip(pred) {
                    if Some(g) == excluded_gt_label {
                        continue;
                    }
                    *acc.entry((g, p)).or_insert(0) += 1;
                }
                acc
            })
            .reduce(HashMap::new, merge_counts);

        let table = Self::from_counts(counts);
        log::debug!(
            "contingency table for {} volume: {} pairs, {} gt labels, {} pred labels, {} voxels",
            shape,
            table.len(),
            table.gt_marginals.len(),
            table.pred_marginals.len(),
            table.total
        );
        Ok(table)
    }

    /// Build a table from explicit pair counts.
    ///
    /// Repeated pairs are summed and zero counts are dropped.
    pub fn from_counts(counts: impl IntoIterator<Item = ((Label, Label), u64)>) -> Self {
        let mut table = Self::default();
        for ((g, p), n) in counts {
            if n == 0 {
                continue;
            }
            *table.pairs.entry((g, p)).or_insert(0) += n;
            *table.gt_marginals.entry(g).or_insert(0) += n;
            *table.pred_marginals.entry(p).or_insert(0) += n;
            table.total += n;
        }
        table
    }

    /// Voxels labeled `gt` in the ground truth and `pred` in the prediction.
    #[must_use]
    pub fn count(&self, gt: Label, pred: Label) -> u64 {
        self.pairs.get(&(gt, pred)).copied().unwrap_or(0)
    }

    /// Non-zero pair counts as (gt label, pred label, count), sorted.
    pub fn pairs(&self) -> impl Iterator<Item = (Label, Label, u64)> + '_ {
        self.pairs.iter().map(|(&(g, p), &n)| (g, p, n))
    }

    /// Voxel count per ground truth label.
    #[must_use]
    pub fn gt_marginals(&self) -> &BTreeMap<Label, u64> {
        &self.gt_marginals
    }

    /// Voxel count per predicted label.
    #[must_use]
    pub fn pred_marginals(&self) -> &BTreeMap<Label, u64> {
        &self.pred_marginals
    }

    /// Number of counted voxels.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of non-zero pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if no voxel was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The same table with the roles of ground truth and prediction swapped.
    #[must_use]
    pub fn transposed(&self) -> Self {
        Self {
            pairs: self.pairs.iter().map(|(&(g, p), &n)| ((p, g), n)).collect(),
            gt_marginals: self.pred_marginals.clone(),
            pred_marginals: self.gt_marginals.clone(),
            total: self.total,
        }
    }

    /// For each ground truth label, the predicted label it overlaps most.
    ///
    /// Predicted voxels labeled `pred_background` are not candidates. Ties
    /// go to the smaller label. Ground truth labels overlapping only
    /// background have no entry.
    #[must_use]
    pub fn dominant_pred_labels(&self, pred_background: Option<Label>) -> BTreeMap<Label, Label> {
        let mut best: BTreeMap<Label, (u64, Label)> = BTreeMap::new();
        for (&(g, p), &n) in &self.pairs {
            if Some(p) == pred_background {
                continue;
            }
            // Pairs arrive sorted by pred label within a row, so only a
            // strictly larger count replaces the current choice.
            let entry = best.entry(g).or_insert((n, p));
            if n > entry.0 {
                *entry = (n, p);
            }
        }
        best.into_iter().map(|(g, (_, p))| (g, p)).collect()
    }

    /// For each predicted label, the ground truth label it overlaps most.
    ///
    /// Mirror of [`dominant_pred_labels`](Self::dominant_pred_labels).
    #[must_use]
    pub fn dominant_gt_labels(&self, gt_background: Option<Label>) -> BTreeMap<Label, Label> {
        self.transposed().dominant_pred_labels(gt_background)
    }
}

fn merge_counts(mut a: Counts, mut b: Counts) -> Counts {
    if a.len() < b.len() {
        std::mem::swap(&mut a, &mut b);
    }
    for (key, n) in b {
        *a.entry(key).or_insert(0) += n;
    }
    a
}
