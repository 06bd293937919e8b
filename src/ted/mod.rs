//! Tolerant Edit Distance.
//!
//! TED counts the split, merge, false positive and false negative edits
//! needed to turn a predicted segmentation into the ground truth, while
//! tolerating boundary displacements up to a distance threshold.
//!
//! ## Pipeline
//!
//! 1. Optionally thin both volumes to curve skeletons ([`SkeletonExtractor`]).
//!    Otherwise every non-background voxel is a point.
//! 2. Derive which label pairs may match from region overlap
//!    ([`Correspondents`]).
//! 3. Pair points one-to-one within the threshold and count edits
//!    ([`TolerantMatcher`]), optionally locating every split and merge.
//!
//! Raising the threshold never increases the edit distance.

pub mod cover;
pub mod errors;
mod graph;
mod locate;
pub mod matcher;
pub mod skeleton;
pub mod topology;

pub use errors::{LabelMatch, MergeError, SplitError, TedErrors};
pub use matcher::{
    Correspondence, Correspondents, LabeledPoint, Matching, Partner, PointSet, TolerantMatcher,
};
pub use skeleton::{Skeleton, SkeletonExtractor};

use crate::error::Result;
use crate::metrics::ContingencyTable;
use crate::volume::{Label, LabelVolume, ensure_same_shape};

/// Settings for one TED computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TedParameters {
    /// Thin regions to skeletons before matching.
    pub from_skeleton: bool,
    /// Largest distance, in physical units, at which two points match.
    pub distance_threshold: f64,
    /// Physical size of a voxel as (z, y, x).
    pub voxel_size: [f64; 3],
    /// Ground truth label meaning "no object".
    pub gt_background_label: Label,
    /// Predicted label meaning "no object".
    pub pred_background_label: Label,
    /// When false no label is background: every voxel is a point and the
    /// false positive and false negative labels are not reported.
    pub have_background: bool,
    /// Report where every split and merge happens.
    pub locate_errors: bool,
}

impl Default for TedParameters {
    fn default() -> Self {
        Self {
            from_skeleton: false,
            distance_threshold: 10.0,
            voxel_size: [1.0; 3],
            gt_background_label: 0,
            pred_background_label: 0,
            have_background: true,
            locate_errors: false,
        }
    }
}

impl TedParameters {
    /// Ground truth background label, if there is one.
    #[must_use]
    pub fn gt_background(&self) -> Option<Label> {
        self.have_background.then_some(self.gt_background_label)
    }

    /// Predicted background label, if there is one.
    #[must_use]
    pub fn pred_background(&self) -> Option<Label> {
        self.have_background.then_some(self.pred_background_label)
    }
}

/// Computes [`TedErrors`] for a pair of volumes.
#[derive(Debug, Clone, Copy)]
pub struct TolerantEditDistance {
    parameters: TedParameters,
}

impl TolerantEditDistance {
    /// Create a calculator. Parameters are assumed to be validated.
    #[must_use]
    pub fn new(parameters: TedParameters) -> Self {
        Self { parameters }
    }

    /// Compute the edit counts.
    ///
    /// `table` must be the contingency table of the same two volumes. It
    /// decides which labels correspond.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`](crate::Error::ShapeMismatch) if the
    /// volumes differ in extent.
    pub fn compute(
        &self,
        ground_truth: &LabelVolume<'_>,
        prediction: &LabelVolume<'_>,
        table: &ContingencyTable,
    ) -> Result<TedErrors> {
        ensure_same_shape(ground_truth, prediction)?;
        let p = &self.parameters;
        let (gt_background, pred_background) = (p.gt_background(), p.pred_background());

        let (gt_points, pred_points) = if p.from_skeleton {
            let (gt, pred) = rayon::join(
                || SkeletonExtractor::new(gt_background).extract(ground_truth),
                || SkeletonExtractor::new(pred_background).extract(prediction),
            );
            (PointSet::from_skeletons(&gt), PointSet::from_skeletons(&pred))
        } else {
            (
                PointSet::from_volume(ground_truth, gt_background),
                PointSet::from_volume(prediction, pred_background),
            )
        };
        log::debug!(
            "ted on {} gt and {} pred points (skeleton: {}, threshold: {})",
            gt_points.len(),
            pred_points.len(),
            p.from_skeleton,
            p.distance_threshold
        );

        let correspondents = Correspondents::from_table(table, gt_background, pred_background);
        let mut errors = TolerantMatcher::new(p.distance_threshold, p.voxel_size)
            .with_error_locations(p.locate_errors)
            .compute(&gt_points, &pred_points, &correspondents);
        if !p.have_background {
            errors.false_positive_labels = None;
            errors.false_negative_labels = None;
        }
        if !errors.exact {
            log::warn!("ted split/merge counts are upper bounds: cover search was truncated");
        }
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Shape;

    fn ted(gt: &LabelVolume<'_>, pred: &LabelVolume<'_>, parameters: TedParameters) -> TedErrors {
        let table = ContingencyTable::build(gt, pred, None).unwrap();
        TolerantEditDistance::new(parameters).compute(gt, pred, &table).unwrap()
    }

    fn two_bars(split_at: usize) -> LabelVolume<'static> {
        LabelVolume::from_fn(Shape::new(5, 5, 20), move |z, y, x| {
            if (1..4).contains(&z) && (1..4).contains(&y) && (1..19).contains(&x) {
                if x < split_at { 1 } else { 2 }
            } else {
                0
            }
        })
    }

    #[test]
    fn test_identical_volumes() {
        let volume = two_bars(10);
        for from_skeleton in [false, true] {
            let errors = ted(
                &volume,
                &volume,
                TedParameters {
                    from_skeleton,
                    distance_threshold: 0.0,
                    ..TedParameters::default()
                },
            );
            assert_eq!(errors.edit_distance(), 0, "from_skeleton = {from_skeleton}");
        }
    }

    #[test]
    fn test_skeleton_split() {
        let gt = LabelVolume::from_fn(Shape::new(5, 5, 20), |z, y, x| {
            u64::from((1..4).contains(&z) && (1..4).contains(&y) && (1..19).contains(&x))
        });
        let pred = two_bars(10);
        let errors = ted(
            &gt,
            &pred,
            TedParameters {
                from_skeleton: true,
                distance_threshold: 2.0,
                ..TedParameters::default()
            },
        );
        assert_eq!(errors.num_splits, 1);
        assert_eq!(errors.num_merges, 0);
        assert_eq!(errors.splits[&1], vec![1, 2]);
        assert!(errors.exact);
    }

    #[test]
    fn test_background_labels_excluded() {
        let gt = LabelVolume::filled(Shape::cube(4), 0);
        let pred = LabelVolume::filled(Shape::cube(4), 7);
        let errors = ted(
            &gt,
            &pred,
            TedParameters {
                pred_background_label: 7,
                ..TedParameters::default()
            },
        );
        assert_eq!(errors.num_gt_points, 0);
        assert_eq!(errors.num_pred_points, 0);
        assert_eq!(errors.edit_distance(), 0);
    }

    #[test]
    fn test_shape_mismatch() {
        let gt = LabelVolume::filled(Shape::cube(3), 0);
        let pred = LabelVolume::filled(Shape::cube(4), 0);
        let table = ContingencyTable::default();
        let ted = TolerantEditDistance::new(TedParameters::default());
        let result = ted.compute(&gt, &pred, &table);
        assert!(matches!(result, Err(crate::Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_without_background_every_voxel_counts() {
        let gt = LabelVolume::filled(Shape::cube(4), 0);
        let pred = LabelVolume::from_fn(Shape::cube(4), |_, _, x| if x < 2 { 0 } else { 2 });

        let with_background = ted(&gt, &pred, TedParameters::default());
        assert_eq!(with_background.num_gt_points, 0);
        assert_eq!(with_background.num_false_positives, 32);
        assert_eq!(with_background.false_positive_labels, Some(vec![2]));

        let without = ted(
            &gt,
            &pred,
            TedParameters {
                have_background: false,
                ..TedParameters::default()
            },
        );
        assert_eq!(without.num_gt_points, 64);
        assert_eq!(without.num_pred_points, 64);
        assert_eq!(without.edit_distance(), 0);
        assert_eq!(without.false_positive_labels, None);
        assert_eq!(without.false_negative_labels, None);
    }

    #[test]
    fn test_split_location_on_skeletons() {
        let gt = LabelVolume::from_fn(Shape::new(5, 5, 20), |z, y, x| {
            u64::from((1..4).contains(&z) && (1..4).contains(&y) && (1..19).contains(&x))
        });
        let errors = ted(
            &gt,
            &two_bars(10),
            TedParameters {
                from_skeleton: true,
                distance_threshold: 2.0,
                locate_errors: true,
                ..TedParameters::default()
            },
        );
        assert_eq!(errors.split_errors.len(), errors.num_splits);
        let split = &errors.split_errors[0];
        assert_eq!(split.gt_label, 1);
        let mut labels = [split.pred_label_1, split.pred_label_2];
        labels.sort_unstable();
        assert_eq!(labels, [1, 2]);
        assert!(split.distance >= 1.0 && split.distance <= 2.0);
        assert!(split.size > 0);
    }
}
