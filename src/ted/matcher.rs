//! Distance-tolerant matching of ground truth and predicted points.
//!
//! A ground truth point of label `g` may only be paired with a predicted
//! point of label `j` when the two labels correspond: `j` is the predicted
//! label overlapping `g` most, or `g` is the ground truth label overlapping
//! `j` most. Pairs are one-to-one and never farther apart than the distance
//! threshold.
//!
//! Points sharing a location with a corresponding point agree and keep that
//! pair, the way a voxel labeled consistently is never relabeled. The
//! remaining points are paired by a maximum matching grown one distance at a
//! time: the pairs at each distinct distance are added in increasing order,
//! direct pairs are taken nearest first (then by smaller predicted label) and
//! augmenting paths then restore a maximum matching. A matched point stays
//! matched as the distance grows, so raising the threshold never loses a
//! pair.
//!
//! | Outcome | Counted as |
//! |---------|------------|
//! | gt point left unpaired | false negative |
//! | pred point left unpaired | false positive |
//! | gt label needing k > 1 pred labels to explain its paired points | k - 1 splits |
//! | pred label needing k > 1 gt labels to explain its paired points | k - 1 merges |
//!
//! A label explains a paired point when it corresponds to the point's label
//! and has a point within the threshold.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cover::minimum_cover;
use super::errors::{LabelMatch, MergeError, SplitError, TedErrors};
use super::graph::Augmenter;
use super::locate::locate_errors;
use super::skeleton::Skeleton;
use crate::metrics::ContingencyTable;
use crate::volume::{Label, LabelVolume, Location};

/// A lattice point tagged with the label of the region it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabeledPoint {
    /// Source region.
    pub label: Label,
    /// Voxel position.
    pub location: Location,
}

/// Points of one segmentation, sorted by label then location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointSet {
    points: Vec<LabeledPoint>,
}

impl PointSet {
    /// Every voxel not labeled `background`. Without a background label
    /// every voxel is a point.
    #[must_use]
    pub fn from_volume(volume: &LabelVolume<'_>, background: Option<Label>) -> Self {
        let shape = volume.shape();
        let points = volume
            .labels()
            .iter()
            .enumerate()
            .filter(|&(_, &label)| Some(label) != background)
            .map(|(index, &label)| LabeledPoint {
                label,
                location: shape.location(index),
            })
            .collect();
        Self::from_points(points)
    }

    /// All skeleton points.
    #[must_use]
    pub fn from_skeletons(skeletons: &BTreeMap<Label, Skeleton>) -> Self {
        let points = skeletons
            .values()
            .flat_map(|s| {
                s.points.iter().map(|&location| LabeledPoint {
                    label: s.label,
                    location,
                })
            })
            .collect();
        Self::from_points(points)
    }

    /// Wrap arbitrary points.
    #[must_use]
    pub fn from_points(mut points: Vec<LabeledPoint>) -> Self {
        points.sort_unstable();
        points.dedup();
        Self { points }
    }

    /// The points, sorted.
    #[must_use]
    pub fn points(&self) -> &[LabeledPoint] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Label pairs allowed to match, derived from region overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correspondents {
    gt_to_pred: BTreeMap<Label, Label>,
    pred_to_gt: BTreeMap<Label, Label>,
    pred_partners: BTreeMap<Label, Vec<Label>>,
    gt_partners: BTreeMap<Label, Vec<Label>>,
}

impl Correspondents {
    /// Dominant overlaps in both directions, ignoring the background labels.
    #[must_use]
    pub fn from_table(
        table: &ContingencyTable,
        gt_background: Option<Label>,
        pred_background: Option<Label>,
    ) -> Self {
        let mut gt_to_pred = table.dominant_pred_labels(pred_background);
        let mut pred_to_gt = table.dominant_gt_labels(gt_background);
        if let Some(label) = gt_background {
            gt_to_pred.remove(&label);
        }
        if let Some(label) = pred_background {
            pred_to_gt.remove(&label);
        }

        let mut pred_partners: BTreeMap<Label, BTreeSet<Label>> = BTreeMap::new();
        let mut gt_partners: BTreeMap<Label, BTreeSet<Label>> = BTreeMap::new();
        let pairs = gt_to_pred
            .iter()
            .map(|(&g, &p)| (g, p))
            .chain(pred_to_gt.iter().map(|(&p, &g)| (g, p)));
        for (g, p) in pairs {
            pred_partners.entry(g).or_default().insert(p);
            gt_partners.entry(p).or_default().insert(g);
        }

        Self {
            gt_to_pred,
            pred_to_gt,
            pred_partners: flatten(pred_partners),
            gt_partners: flatten(gt_partners),
        }
    }

    /// Predicted label overlapping ground truth label `gt` most.
    #[must_use]
    pub fn dominant_pred(&self, gt: Label) -> Option<Label> {
        self.gt_to_pred.get(&gt).copied()
    }

    /// Ground truth label overlapping predicted label `pred` most.
    #[must_use]
    pub fn dominant_gt(&self, pred: Label) -> Option<Label> {
        self.pred_to_gt.get(&pred).copied()
    }

    /// True if points of `gt` and `pred` may be matched.
    #[must_use]
    pub fn allows(&self, gt: Label, pred: Label) -> bool {
        self.dominant_pred(gt) == Some(pred) || self.dominant_gt(pred) == Some(gt)
    }

    /// Predicted labels that may match ground truth label `gt`, sorted.
    #[must_use]
    pub fn pred_partners(&self, gt: Label) -> &[Label] {
        match self.pred_partners.get(&gt) {
            Some(labels) => labels,
            None => &[],
        }
    }

    /// Ground truth labels that may match predicted label `pred`, sorted.
    #[must_use]
    pub fn gt_partners(&self, pred: Label) -> &[Label] {
        match self.gt_partners.get(&pred) {
            Some(labels) => labels,
            None => &[],
        }
    }
}

fn flatten(sets: BTreeMap<Label, BTreeSet<Label>>) -> BTreeMap<Label, Vec<Label>> {
    sets.into_iter()
        .map(|(label, set)| (label, set.into_iter().collect()))
        .collect()
}

/// The point a point was paired with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    /// Partner point.
    pub point: LabeledPoint,
    /// Euclidean distance in physical units, never above the threshold.
    pub distance: f64,
}

/// Matching outcome for one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Correspondence {
    /// The point being matched.
    pub point: LabeledPoint,
    /// Paired point on the other side, if any.
    pub partner: Option<Partner>,
    /// Labels explaining the point. Empty for unpaired points.
    pub candidates: BTreeSet<Label>,
}

/// Both sides of a one-to-one pairing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matching {
    /// One entry per ground truth point, in point order.
    pub gt: Vec<Correspondence>,
    /// One entry per predicted point, in point order.
    pub pred: Vec<Correspondence>,
}

impl Matching {
    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gt.iter().filter(|c| c.partner.is_some()).count()
    }

    /// True if nothing was paired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A point set with the physical position of every point.
struct Side<'a> {
    set: &'a PointSet,
    positions: Vec<[f64; 3]>,
}

/// Hash grid over physical point positions, bucketed by label.
struct LabelGrid<'a> {
    positions: &'a [[f64; 3]],
    cell_size: f64,
    cells: HashMap<(Label, [i64; 3]), Vec<usize>>,
}

impl<'a> LabelGrid<'a> {
    /// Index the points of `side` listed in `members`.
    fn new(side: &'a Side<'_>, cell_size: f64, members: impl Iterator<Item = usize>) -> Self {
        let mut cells: HashMap<(Label, [i64; 3]), Vec<usize>> = HashMap::new();
        for i in members {
            let key = (side.set.points()[i].label, cell_of(side.positions[i], cell_size));
            cells.entry(key).or_default().push(i);
        }
        Self {
            positions: &side.positions,
            cell_size,
            cells,
        }
    }

    /// Buckets of `label` that may hold points within `radius` of `center`,
    /// the bucket holding `center` first.
    fn buckets(
        &self,
        label: Label,
        center: [f64; 3],
        radius: f64,
    ) -> impl Iterator<Item = &[usize]> + '_ {
        let home = cell_of(center, self.cell_size);
        let lo = cell_of(center.map(|c| c - radius), self.cell_size);
        let hi = cell_of(center.map(|c| c + radius), self.cell_size);
        let around = (lo[0]..=hi[0])
            .flat_map(move |cz| {
                (lo[1]..=hi[1]).flat_map(move |cy| (lo[2]..=hi[2]).map(move |cx| [cz, cy, cx]))
            })
            .filter(move |&cell| cell != home);
        std::iter::once(home)
            .chain(around)
            .filter_map(move |cell| self.cells.get(&(label, cell)).map(Vec::as_slice))
    }

    /// Append (squared distance, index) of the points of `label` within
    /// `radius` of `center`.
    fn within(&self, label: Label, center: [f64; 3], radius: f64, found: &mut Vec<(f64, usize)>) {
        let radius2 = radius * radius;
        for bucket in self.buckets(label, center, radius) {
            for &i in bucket {
                let d2 = squared_distance(center, self.positions[i]);
                if d2 <= radius2 {
                    found.push((d2, i));
                }
            }
        }
    }

    /// True if a point of `label` lies within `radius` of `center`.
    fn any_within(&self, label: Label, center: [f64; 3], radius: f64) -> bool {
        let radius2 = radius * radius;
        self.buckets(label, center, radius).any(|bucket| {
            bucket.iter().any(|&i| squared_distance(center, self.positions[i]) <= radius2)
        })
    }
}

pub(crate) fn cell_of(position: [f64; 3], cell_size: f64) -> [i64; 3] {
    position.map(|c| (c / cell_size).floor() as i64)
}

pub(crate) fn squared_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    (0..3).map(|k| (a[k] - b[k]).powi(2)).sum()
}

/// An allowed pair of unpaired points: (squared distance, gt index, pred index).
type Edge = (f64, usize, usize);

/// Counts tolerant edit operations between two point sets.
#[derive(Debug, Clone, Copy)]
pub struct TolerantMatcher {
    distance_threshold: f64,
    voxel_size: [f64; 3],
    locate_errors: bool,
}

impl TolerantMatcher {
    /// Create a matcher. `voxel_size` is (z, y, x) in physical units.
    #[must_use]
    pub fn new(distance_threshold: f64, voxel_size: [f64; 3]) -> Self {
        Self {
            distance_threshold,
            voxel_size,
            locate_errors: false,
        }
    }

    /// Also report where each split and merge happens.
    #[must_use]
    pub fn with_error_locations(mut self, on: bool) -> Self {
        self.locate_errors = on;
        self
    }

    fn min_voxel_size(&self) -> f64 {
        self.voxel_size.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn side<'a>(&self, set: &'a PointSet) -> Side<'a> {
        Side {
            set,
            positions: set
                .points()
                .iter()
                .map(|p| p.location.scaled(self.voxel_size))
                .collect(),
        }
    }

    /// Pair ground truth and predicted points one-to-one.
    ///
    /// Points at the same location with corresponding labels are paired
    /// first. Among the rest, as many pairs as possible are formed from
    /// corresponding labels within the threshold, preferring nearer pairs,
    /// then smaller predicted points, then smaller ground truth points.
    #[must_use]
    pub fn pair(
        &self,
        gt: &PointSet,
        pred: &PointSet,
        correspondents: &Correspondents,
    ) -> Matching {
        let gt_side = self.side(gt);
        let pred_side = self.side(pred);
        let mut graph = Augmenter::new(gt.len(), pred.len());

        let mut at_location: HashMap<Location, Vec<usize>> = HashMap::new();
        for (k, point) in pred.points().iter().enumerate() {
            at_location.entry(point.location).or_default().push(k);
        }
        let coincident: Vec<(usize, usize)> = gt
            .points()
            .iter()
            .enumerate()
            .flat_map(|(i, point)| {
                at_location
                    .get(&point.location)
                    .into_iter()
                    .flatten()
                    .filter(move |&&k| correspondents.allows(point.label, pred.points()[k].label))
                    .map(move |&k| (i, k))
            })
            .collect();
        graph.add_level(coincident.iter().copied());
        graph.clear_edges();

        let gt_open: Vec<bool> = (0..gt.len()).map(|i| graph.left_mate(i).is_none()).collect();
        let pred_open: Vec<bool> =
            (0..pred.len()).map(|k| graph.right_mate(k).is_none()).collect();
        let edges = self.open_edges(&gt_side, &gt_open, &pred_side, &pred_open, correspondents);
        log::debug!(
            "{} coincident candidate pairs, {} pairs within {} among the rest",
            coincident.len(),
            edges.len(),
            self.distance_threshold
        );
        for level in edges.chunk_by(|a, b| a.0 == b.0) {
            graph.add_level(level.iter().map(|&(_, i, k)| (i, k)));
        }

        let (gt_mates, pred_mates) = graph.into_mates();
        let cell_size = (self.distance_threshold / 3f64.sqrt()).max(self.min_voxel_size());
        let gt_grid = LabelGrid::new(&gt_side, cell_size, 0..gt.len());
        let pred_grid = LabelGrid::new(&pred_side, cell_size, 0..pred.len());
        let (gt_outcomes, pred_outcomes) = rayon::join(
            || {
                self.outcomes(
                    &gt_side,
                    &gt_mates,
                    &pred_side,
                    &pred_grid,
                    |label| correspondents.pred_partners(label),
                )
            },
            || {
                self.outcomes(
                    &pred_side,
                    &pred_mates,
                    &gt_side,
                    &gt_grid,
                    |label| correspondents.gt_partners(label),
                )
            },
        );
        Matching {
            gt: gt_outcomes,
            pred: pred_outcomes,
        }
    }

    /// Allowed pairs among the points not paired at their own location,
    /// sorted by distance, then predicted point, then ground truth point.
    fn open_edges(
        &self,
        gt: &Side<'_>,
        gt_open: &[bool],
        pred: &Side<'_>,
        pred_open: &[bool],
        correspondents: &Correspondents,
    ) -> Vec<Edge> {
        if !gt_open.contains(&true) || !pred_open.contains(&true) {
            return Vec::new();
        }
        let cell_size = self.distance_threshold.max(self.min_voxel_size());
        let members = (0..pred.set.len()).filter(|&k| pred_open[k]);
        let grid = LabelGrid::new(pred, cell_size, members);
        let mut edges: Vec<Edge> = (0..gt.set.len())
            .into_par_iter()
            .filter(|&i| gt_open[i])
            .flat_map_iter(|i| {
                let mut found = Vec::new();
                for &label in correspondents.pred_partners(gt.set.points()[i].label) {
                    grid.within(label, gt.positions[i], self.distance_threshold, &mut found);
                }
                found.into_iter().map(move |(d2, k)| (d2, i, k))
            })
            .collect();
        edges.par_sort_unstable_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.2.cmp(&b.2))
                .then(a.1.cmp(&b.1))
        });
        edges
    }

    /// Partner and explaining labels of every point of `from`.
    fn outcomes<'c>(
        &self,
        from: &Side<'_>,
        mates: &[Option<usize>],
        to: &Side<'_>,
        grid: &LabelGrid<'_>,
        partners: impl Fn(Label) -> &'c [Label] + Sync,
    ) -> Vec<Correspondence> {
        from.set
            .points()
            .par_iter()
            .zip(&from.positions)
            .zip(mates)
            .map(|((&point, &position), &mate)| {
                let Some(k) = mate else {
                    return Correspondence {
                        point,
                        partner: None,
                        candidates: BTreeSet::new(),
                    };
                };
                let partner = Partner {
                    point: to.set.points()[k],
                    distance: squared_distance(position, to.positions[k]).sqrt(),
                };
                let candidates = partners(point.label)
                    .iter()
                    .copied()
                    .filter(|&label| {
                        label == partner.point.label
                            || grid.any_within(label, position, self.distance_threshold)
                    })
                    .collect();
                Correspondence {
                    point,
                    partner: Some(partner),
                    candidates,
                }
            })
            .collect()
    }

    /// Pair both sides and count split, merge, false positive and false
    /// negative operations.
    #[must_use]
    pub fn compute(
        &self,
        gt: &PointSet,
        pred: &PointSet,
        correspondents: &Correspondents,
    ) -> TedErrors {
        let matching = self.pair(gt, pred, correspondents);

        let (num_splits, splits, splits_exact) = extra_labels(&matching.gt);
        let (num_merges, merges, merges_exact) = extra_labels(&matching.pred);
        let num_false_negatives = matching.gt.iter().filter(|c| c.partner.is_none()).count();
        let num_false_positives = matching.pred.iter().filter(|c| c.partner.is_none()).count();

        let mut pair_counts: BTreeMap<(Label, Label), usize> = BTreeMap::new();
        for c in &matching.gt {
            if let Some(partner) = c.partner {
                *pair_counts.entry((c.point.label, partner.point.label)).or_insert(0) += 1;
            }
        }
        let matches = pair_counts
            .into_iter()
            .map(|((gt_label, pred_label), points)| LabelMatch {
                gt_label,
                pred_label,
                points,
            })
            .collect();

        let (split_errors, merge_errors) = if self.locate_errors {
            rayon::join(
                || locate_errors(&matching.gt, &splits, self.voxel_size),
                || locate_errors(&matching.pred, &merges, self.voxel_size),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        log::debug!(
            "paired {} of {} gt points and {} of {} pred points within {}",
            gt.len() - num_false_negatives,
            gt.len(),
            pred.len() - num_false_positives,
            pred.len(),
            self.distance_threshold
        );

        TedErrors {
            num_splits,
            num_merges,
            num_false_positives,
            num_false_negatives,
            splits,
            merges,
            matches,
            num_gt_points: gt.len(),
            num_pred_points: pred.len(),
            exact: splits_exact && merges_exact,
            false_positive_labels: Some(unpaired_labels(&matching.pred)),
            false_negative_labels: Some(unpaired_labels(&matching.gt)),
            split_errors: split_errors.into_iter().map(SplitError::from).collect(),
            merge_errors: merge_errors.into_iter().map(MergeError::from).collect(),
        }
    }
}

/// For every source label, the fewest partner labels explaining its paired
/// points. Returns the total surplus, the labels needing more than one
/// partner with their cover, and whether every cover is exact.
fn extra_labels(side: &[Correspondence]) -> (usize, BTreeMap<Label, Vec<Label>>, bool) {
    let mut by_label: BTreeMap<Label, Vec<&BTreeSet<Label>>> = BTreeMap::new();
    for c in side {
        if c.partner.is_some() {
            by_label.entry(c.point.label).or_default().push(&c.candidates);
        }
    }

    let mut surplus = 0;
    let mut exact = true;
    let mut covered = BTreeMap::new();
    for (label, sets) in by_label {
        let cover = minimum_cover(sets);
        exact &= cover.exact;
        if cover.len() > 1 {
            log::trace!("label {label} needs {} partner labels: {:?}", cover.len(), cover.labels);
            surplus += cover.len() - 1;
            covered.insert(label, cover.labels);
        }
    }
    (surplus, covered, exact)
}

/// Distinct labels of unpaired points, sorted.
fn unpaired_labels(side: &[Correspondence]) -> Vec<Label> {
    let labels: BTreeSet<Label> = side
        .iter()
        .filter(|c| c.partner.is_none())
        .map(|c| c.point.label)
        .collect();
    labels.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: Label, z: usize, y: usize, x: usize) -> LabeledPoint {
        LabeledPoint {
            label,
            location: Location::new(z, y, x),
        }
    }

    fn line(label: Label, y: usize, xs: std::ops::Range<usize>) -> Vec<LabeledPoint> {
        xs.map(|x| point(label, 0, y, x)).collect()
    }

    fn correspondents(counts: &[((Label, Label), u64)]) -> Correspondents {
        let table = ContingencyTable::from_counts(counts.iter().copied());
        Correspondents::from_table(&table, Some(0), Some(0))
    }

    #[test]
    fn test_point_set_sorted_and_deduplicated() {
        let set =
            PointSet::from_points(vec![point(2, 0, 0, 1), point(1, 0, 0, 3), point(2, 0, 0, 1)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.points()[0].label, 1);
    }

    #[test]
    fn test_from_volume_skips_background() {
        let volume =
            LabelVolume::from_fn(crate::Shape::new(1, 2, 2), |_, y, x| (y * 2 + x) as Label);
        let set = PointSet::from_volume(&volume, Some(0));
        assert_eq!(set.len(), 3);
        assert!(set.points().iter().all(|p| p.label != 0));

        assert_eq!(PointSet::from_volume(&volume, None).len(), 4);
    }

    #[test]
    fn test_nearest_partner_with_ties() {
        let matcher = TolerantMatcher::new(2.0, [1.0; 3]);
        let gt = PointSet::from_points(vec![point(1, 0, 0, 5)]);
        let pred = PointSet::from_points(vec![
            point(8, 0, 0, 4),
            point(7, 0, 0, 6),
            point(9, 0, 0, 5),
        ]);
        let c = correspondents(&[((1, 9), 3), ((1, 7), 1), ((1, 8), 1)]);
        let matching = matcher.pair(&gt, &pred, &c);
        let partner = matching.gt[0].partner.unwrap();
        assert_eq!(partner.point, point(9, 0, 0, 5));
        assert_eq!(partner.distance, 0.0);
        assert_eq!(matching.gt[0].candidates, BTreeSet::from([7, 8, 9]));
        assert_eq!(matching.len(), 1);

        // Equal distances resolve to the smaller predicted point.
        let pred = PointSet::from_points(vec![point(8, 0, 0, 4), point(7, 0, 0, 6)]);
        let c = correspondents(&[((1, 7), 1), ((1, 8), 1)]);
        let matching = matcher.pair(&gt, &pred, &c);
        assert_eq!(matching.gt[0].partner.unwrap().point.label, 7);
        assert!(matching.pred[1].partner.is_none());
        assert!(matching.pred[1].candidates.is_empty());
    }

    #[test]
    fn test_threshold_and_voxel_size() {
        let gt = PointSet::from_points(vec![point(1, 0, 0, 0)]);
        let pred = PointSet::from_points(vec![point(2, 1, 0, 0)]);
        let c = correspondents(&[((1, 2), 1)]);

        let near = TolerantMatcher::new(1.0, [1.0; 3]).pair(&gt, &pred, &c);
        assert!(near.gt[0].partner.is_some());

        // One section apart is 4 units when sections are 4 units thick.
        let far = TolerantMatcher::new(3.0, [4.0, 1.0, 1.0]).pair(&gt, &pred, &c);
        assert!(far.is_empty());
        let reach = TolerantMatcher::new(4.0, [4.0, 1.0, 1.0]).pair(&gt, &pred, &c);
        assert_eq!(reach.gt[0].partner.unwrap().distance, 4.0);
    }

    #[test]
    fn test_disallowed_labels_never_match() {
        let matcher = TolerantMatcher::new(5.0, [1.0; 3]);
        let gt = PointSet::from_points(vec![point(1, 0, 0, 0)]);
        let pred = PointSet::from_points(vec![point(2, 0, 0, 0), point(3, 0, 0, 3)]);
        // 2 belongs to gt 4, so gt 1 may only pair with 3.
        let c = correspondents(&[((1, 3), 5), ((4, 2), 5)]);
        assert!(!c.allows(1, 2));
        let matching = matcher.pair(&gt, &pred, &c);
        assert_eq!(matching.gt[0].partner.unwrap().point.label, 3);
        assert_eq!(matching.gt[0].candidates, BTreeSet::from([3]));
        assert!(matching.pred[0].partner.is_none());
    }

    #[test]
    fn test_correspondents_from_overlap() {
        let c = correspondents(&[
            ((1, 5), 10),
            ((1, 6), 3),
            ((2, 6), 2),
            ((0, 6), 50),
            ((2, 0), 9),
        ]);
        assert_eq!(c.dominant_pred(1), Some(5));
        assert_eq!(c.dominant_pred(2), Some(6));
        assert_eq!(c.dominant_gt(6), Some(1));
        assert!(c.allows(1, 5));
        assert!(c.allows(1, 6));
        assert!(c.allows(2, 6));
        assert!(!c.allows(2, 5));
        assert_eq!(c.dominant_pred(0), None);
        assert_eq!(c.pred_partners(1), &[5, 6]);
        assert_eq!(c.pred_partners(2), &[6]);
        assert_eq!(c.gt_partners(6), &[1, 2]);
        assert!(c.gt_partners(0).is_empty());
    }

    #[test]
    fn test_correspondents_without_background() {
        let table = ContingencyTable::from_counts([((1, 5), 10), ((2, 0), 9), ((0, 6), 50)]);
        let c = Correspondents::from_table(&table, None, None);
        assert_eq!(c.dominant_pred(2), Some(0));
        assert_eq!(c.dominant_pred(0), Some(6));
        assert_eq!(c.dominant_gt(6), Some(0));
        assert!(c.allows(0, 6));
    }

    #[test]
    fn test_identical_sets_have_no_errors() {
        let points: Vec<LabeledPoint> =
            line(1, 0, 0..10).into_iter().chain(line(2, 5, 0..10)).collect();
        let set = PointSet::from_points(points);
        let c = correspondents(&[((1, 1), 10), ((2, 2), 10)]);
        let errors = TolerantMatcher::new(0.0, [1.0; 3]).compute(&set, &set, &c);
        assert_eq!(errors.edit_distance(), 0);
        assert!(errors.exact);
        assert_eq!(
            errors.matches,
            vec![
                LabelMatch {
                    gt_label: 1,
                    pred_label: 1,
                    points: 10,
                },
                LabelMatch {
                    gt_label: 2,
                    pred_label: 2,
                    points: 10,
                },
            ]
        );
        assert_eq!(errors.false_positive_labels, Some(vec![]));
        assert_eq!(errors.false_negative_labels, Some(vec![]));
    }

    #[test]
    fn test_one_point_pairs_only_once() {
        // Ten gt points share one predicted point within range.
        let gt = PointSet::from_points(line(1, 0, 0..10));
        let pred = PointSet::from_points(vec![point(1, 0, 0, 5)]);
        let c = correspondents(&[((1, 1), 1)]);

        let errors = TolerantMatcher::new(10.0, [1.0; 3]).compute(&gt, &pred, &c);
        assert_eq!(errors.num_false_negatives, 9);
        assert_eq!(errors.num_false_positives, 0);
        assert_eq!(errors.edit_distance(), 9);
        let single = LabelMatch {
            gt_label: 1,
            pred_label: 1,
            points: 1,
        };
        assert_eq!(errors.matches, vec![single]);
        assert_eq!(errors.false_negative_labels, Some(vec![1]));
    }

    #[test]
    fn test_augmenting_pairs_everything_greedy_would_miss() {
        // Taking the nearest pair for the gt point at 4 first would leave the
        // gt point at 6 without a partner.
        let gt = PointSet::from_points(vec![point(1, 0, 0, 4), point(1, 0, 0, 6)]);
        let pred = PointSet::from_points(vec![point(1, 0, 0, 5), point(2, 0, 0, 3)]);
        let c = correspondents(&[((1, 1), 2), ((1, 2), 1)]);

        let matcher = TolerantMatcher::new(1.0, [1.0; 3]);
        let matching = matcher.pair(&gt, &pred, &c);
        assert_eq!(matching.len(), 2);
        assert_eq!(matching.gt[0].partner.unwrap().point, point(2, 0, 0, 3));
        assert_eq!(matching.gt[1].partner.unwrap().point, point(1, 0, 0, 5));

        let errors = matcher.compute(&gt, &pred, &c);
        assert_eq!(errors.edit_distance(), 0);
    }

    #[test]
    fn test_coincident_pairs_are_kept() {
        // The gt point at 1 keeps its coincident partner even though moving
        // it would let the gt point at 0 pair as well.
        let gt = PointSet::from_points(vec![point(1, 0, 0, 0), point(1, 0, 0, 1)]);
        let pred = PointSet::from_points(vec![point(1, 0, 0, 1), point(1, 0, 0, 3)]);
        let c = correspondents(&[((1, 1), 2)]);
        let matching = TolerantMatcher::new(2.0, [1.0; 3]).pair(&gt, &pred, &c);
        assert_eq!(matching.gt[1].partner.unwrap().distance, 0.0);
        assert!(matching.gt[0].partner.is_none());
        assert!(matching.pred[1].partner.is_none());
    }

    #[test]
    fn test_split_counted_once_per_extra_label() {
        // One gt line, predicted as two halves with different labels.
        let gt = PointSet::from_points(line(1, 0, 0..10));
        let pred =
            PointSet::from_points(line(5, 0, 0..5).into_iter().chain(line(6, 0, 5..10)).collect());
        let c = correspondents(&[((1, 5), 5), ((1, 6), 5)]);

        let errors = TolerantMatcher::new(1.0, [1.0; 3]).compute(&gt, &pred, &c);
        assert_eq!(errors.num_splits, 1);
        assert_eq!(errors.splits[&1], vec![5, 6]);
        assert_eq!(errors.num_merges, 0);
        assert_eq!(errors.num_false_positives, 0);
        assert_eq!(errors.num_false_negatives, 0);
        assert!(errors.split_errors.is_empty());
    }

    #[test]
    fn test_split_location() {
        let gt = PointSet::from_points(line(1, 0, 0..10));
        let pred =
            PointSet::from_points(line(5, 0, 0..5).into_iter().chain(line(6, 0, 5..10)).collect());
        let c = correspondents(&[((1, 5), 5), ((1, 6), 5)]);

        let errors = TolerantMatcher::new(1.0, [1.0; 3])
            .with_error_locations(true)
            .compute(&gt, &pred, &c);
        assert_eq!(
            errors.split_errors,
            vec![SplitError {
                gt_label: 1,
                pred_label_1: 5,
                pred_label_2: 6,
                distance: 1.0,
                location: [0.0, 0.0, 5.0],
                size: 5,
            }]
        );
        assert!(errors.merge_errors.is_empty());
    }

    #[test]
    fn test_merge_counted_once_per_extra_label() {
        let gt =
            PointSet::from_points(line(1, 0, 0..5).into_iter().chain(line(2, 0, 5..10)).collect());
        let pred = PointSet::from_points(line(9, 0, 0..10));
        let c = correspondents(&[((1, 9), 5), ((2, 9), 5)]);

        let errors = TolerantMatcher::new(0.0, [1.0; 3])
            .with_error_locations(true)
            .compute(&gt, &pred, &c);
        assert_eq!(errors.num_merges, 1);
        assert_eq!(errors.merges[&9], vec![1, 2]);
        assert_eq!(errors.num_splits, 0);
        assert_eq!(errors.edit_distance(), 1);
        assert_eq!(
            errors.merge_errors,
            vec![MergeError {
                pred_label: 9,
                gt_label_1: 1,
                gt_label_2: 2,
                distance: 1.0,
                location: [0.0, 0.0, 5.0],
                size: 5,
            }]
        );
    }

    #[test]
    fn test_displacement_within_tolerance() {
        // Prediction shifted by two rows: missed at tolerance 1, matched at 2.
        let gt = PointSet::from_points(line(1, 0, 0..6));
        let pred = PointSet::from_points(line(4, 2, 0..6));
        let c = correspondents(&[((1, 4), 1)]);

        let strict = TolerantMatcher::new(1.0, [1.0; 3]).compute(&gt, &pred, &c);
        assert_eq!(strict.num_false_negatives, 6);
        assert_eq!(strict.num_false_positives, 6);
        assert_eq!(strict.edit_distance(), 12);
        assert_eq!(strict.false_positive_labels, Some(vec![4]));

        let tolerant = TolerantMatcher::new(2.0, [1.0; 3]).compute(&gt, &pred, &c);
        assert_eq!(tolerant.edit_distance(), 0);
    }

    #[test]
    fn test_empty_prediction_is_all_false_negatives() {
        let gt = PointSet::from_points(line(1, 0, 0..4));
        let errors = TolerantMatcher::new(10.0, [1.0; 3]).compute(
            &gt,
            &PointSet::default(),
            &Correspondents::default(),
        );
        assert_eq!(errors.num_false_negatives, 4);
        assert_eq!(errors.num_false_positives, 0);
        assert_eq!(errors.edit_distance(), 4);
        assert_eq!(errors.false_negative_labels, Some(vec![1]));
        assert_eq!(errors.false_positive_labels, Some(vec![]));
    }
}
