//! Tolerant Edit Distance results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::volume::Label;

/// Number of matched points between one ground truth and one predicted label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatch {
    /// Ground truth label.
    pub gt_label: Label,
    /// Predicted label.
    pub pred_label: Label,
    /// Ground truth points paired with a point of `pred_label`.
    pub points: usize,
}

/// Where a ground truth region is split between two predicted labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitError {
    /// The split ground truth region.
    pub gt_label: Label,
    /// Predicted label explaining most of the region.
    pub pred_label_1: Label,
    /// Predicted label explaining another part.
    pub pred_label_2: Label,
    /// Closest approach of the two parts, in physical units.
    pub distance: f64,
    /// Point of the second part nearest the first, in physical units (z, y, x).
    pub location: [f64; 3],
    /// Points explained by `pred_label_2`.
    pub size: usize,
}

/// Where a predicted region merges two ground truth labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeError {
    /// The merging predicted region.
    pub pred_label: Label,
    /// Ground truth label explaining most of the region.
    pub gt_label_1: Label,
    /// Ground truth label explaining another part.
    pub gt_label_2: Label,
    /// Closest approach of the two parts, in physical units.
    pub distance: f64,
    /// Point of the second part nearest the first, in physical units (z, y, x).
    pub location: [f64; 3],
    /// Points explained by `gt_label_2`.
    pub size: usize,
}

/// Edit operations needed to turn the prediction into the ground truth,
/// up to the distance tolerance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TedErrors {
    /// Extra predicted labels needed to cover ground truth regions.
    pub num_splits: usize,
    /// Extra ground truth labels needed to cover predicted regions.
    pub num_merges: usize,
    /// Predicted points with no ground truth point in range.
    pub num_false_positives: usize,
    /// Ground truth points with no predicted point in range.
    pub num_false_negatives: usize,
    /// Split ground truth labels and the predicted labels chosen to cover them.
    pub splits: BTreeMap<Label, Vec<Label>>,
    /// Merged predicted labels and the ground truth labels chosen to cover them.
    pub merges: BTreeMap<Label, Vec<Label>>,
    /// Matched point counts per label pair, sorted by (gt, pred).
    pub matches: Vec<LabelMatch>,
    /// Number of ground truth points considered.
    pub num_gt_points: usize,
    /// Number of predicted points considered.
    pub num_pred_points: usize,
    /// False if a cover search ran out of budget and a split or merge count
    /// may be overestimated.
    pub exact: bool,
    /// Labels of unpaired predicted points. `None` without a background
    /// label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_positive_labels: Option<Vec<Label>>,
    /// Labels of unpaired ground truth points. `None` without a background
    /// label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_negative_labels: Option<Vec<Label>>,
    /// One entry per split, when error locations are requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub split_errors: Vec<SplitError>,
    /// One entry per merge, when error locations are requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge_errors: Vec<MergeError>,
}

impl TedErrors {
    /// `splits + merges + false positives + false negatives`.
    #[must_use]
    pub fn edit_distance(&self) -> usize {
        self.num_splits + self.num_merges + self.num_false_positives + self.num_false_negatives
    }

    /// Number of ground truth regions covered by two or more predicted labels.
    #[must_use]
    pub fn split_regions(&self) -> usize {
        self.splits.len()
    }

    /// Number of predicted regions covering two or more ground truth labels.
    #[must_use]
    pub fn merged_regions(&self) -> usize {
        self.merges.len()
    }
}
