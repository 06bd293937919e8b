//! Curve skeletons by directional topological thinning.
//!
//! Each labeled region is copied into its own padded binary grid and eroded
//! one face direction at a time (-z, +z, -y, +y, -x, +x). In every
//! direction the border voxels that are simple and not curve end points are
//! collected first, then re-checked and deleted one by one in storage order.
//! Passes repeat until a full round deletes nothing. Regions are independent
//! and are thinned in parallel.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::topology::{FACE_DIRECTIONS, OFFSETS, is_border, is_endpoint, is_simple};
use crate::volume::{Label, LabelVolume, Location, Shape};

/// Medial curve points of one labeled region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Label of the source region.
    pub label: Label,
    /// Skeleton points in volume coordinates, sorted.
    pub points: Vec<Location>,
}

impl Skeleton {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the skeleton has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Extracts one skeleton per non-background label of a volume.
#[derive(Debug, Clone, Copy)]
pub struct SkeletonExtractor {
    background: Option<Label>,
}

impl SkeletonExtractor {
    /// Create an extractor that ignores voxels labeled `background`. With
    /// `None` every label is thinned.
    #[must_use]
    pub fn new(background: Option<Label>) -> Self {
        Self { background }
    }

    /// Thin every non-background region of `volume`.
    ///
    /// Returns one entry per label present in the volume. Every point lies
    /// inside its own region, and a non-empty region always keeps at least
    /// one point per connected component.
    #[must_use]
    pub fn extract(&self, volume: &LabelVolume<'_>) -> BTreeMap<Label, Skeleton> {
        let shape = volume.shape();
        let mut regions: HashMap<Label, Vec<usize>> = HashMap::new();
        for (index, &label) in volume.labels().iter().enumerate() {
            if Some(label) != self.background {
                regions.entry(label).or_default().push(index);
            }
        }

        let skeletons: BTreeMap<Label, Skeleton> = regions
            .into_par_iter()
            .map(|(label, voxels)| {
                let points = RegionGrid::new(shape, &voxels).thin();
                log::trace!(
                    "label {label}: {} voxels thinned to {} points",
                    voxels.len(),
                    points.len()
                );
                (label, Skeleton { label, points })
            })
            .collect();

        log::debug!(
            "extracted {} skeletons with {} points from {} volume",
            skeletons.len(),
            skeletons.values().map(Skeleton::len).sum::<usize>(),
            shape
        );
        skeletons
    }
}

/// Binary grid covering one region's bounding box plus a one-voxel margin.
struct RegionGrid {
    /// Volume coordinates of grid cell (1, 1, 1).
    origin: [usize; 3],
    dims: [usize; 3],
    cells: Vec<bool>,
    neighbor_offsets: [isize; 27],
}

impl RegionGrid {
    fn new(shape: Shape, voxels: &[usize]) -> Self {
        let mut lo = [usize::MAX; 3];
        let mut hi = [0; 3];
        for &index in voxels {
            let Location { z, y, x } = shape.location(index);
            for (axis, v) in [z, y, x].into_iter().enumerate() {
                lo[axis] = lo[axis].min(v);
                hi[axis] = hi[axis].max(v);
            }
        }

        let dims = [0, 1, 2].map(|axis| hi[axis].saturating_sub(lo[axis]) + 3);
        let mut cells = vec![false; dims[0] * dims[1] * dims[2]];
        let stride_z = (dims[1] * dims[2]) as isize;
        let stride_y = dims[2] as isize;
        let neighbor_offsets = OFFSETS.map(|[dz, dy, dx]| dz * stride_z + dy * stride_y + dx);

        for &index in voxels {
            let Location { z, y, x } = shape.location(index);
            let cell = ((z - lo[0] + 1) * dims[1] + (y - lo[1] + 1)) * dims[2] + (x - lo[2] + 1);
            cells[cell] = true;
        }

        Self {
            origin: lo,
            dims,
            cells,
            neighbor_offsets,
        }
    }

    fn location(&self, cell: usize) -> Location {
        let x = cell % self.dims[2];
        let y = (cell / self.dims[2]) % self.dims[1];
        let z = cell / (self.dims[1] * self.dims[2]);
        Location::new(z + self.origin[0] - 1, y + self.origin[1] - 1, x + self.origin[2] - 1)
    }

    /// 27-bit occupancy mask around a foreground cell.
    ///
    /// Foreground cells never touch the grid margin, so every neighbor
    /// offset stays in bounds.
    fn neighborhood(&self, cell: usize) -> u32 {
        let mut mask = 0u32;
        for (bit, &offset) in self.neighbor_offsets.iter().enumerate() {
            if self.cells[cell.wrapping_add_signed(offset)] {
                mask |= 1u32 << bit;
            }
        }
        mask
    }

    fn is_deletable(&self, cell: usize, direction: usize) -> bool {
        let mask = self.neighborhood(cell);
        is_border(mask, direction) && !is_endpoint(mask) && is_simple(mask)
    }

    /// Thin the region in place and return the remaining points, sorted.
    fn thin(mut self) -> Vec<Location> {
        // Worklist: foreground cells that have a background face neighbor.
        let mut queued = vec![false; self.cells.len()];
        let mut active: Vec<usize> = Vec::new();
        for cell in 0..self.cells.len() {
            if self.cells[cell] && self.touches_background(cell) {
                queued[cell] = true;
                active.push(cell);
            }
        }

        let mut rounds = 0usize;
        loop {
            let mut deleted_this_round = 0usize;
            for direction in 0..FACE_DIRECTIONS.len() {
                let candidates: Vec<usize> = active
                    .iter()
                    .copied()
                    .filter(|&cell| self.is_deletable(cell, direction))
                    .collect();

                let mut deleted = Vec::new();
                for cell in candidates {
                    if self.is_deletable(cell, direction) {
                        self.cells[cell] = false;
                        deleted.push(cell);
                    }
                }
                if deleted.is_empty() {
                    continue;
                }
                deleted_this_round += deleted.len();

                active.retain(|&cell| self.cells[cell]);
                for cell in deleted {
                    queued[cell] = false;
                    for &offset in &self.neighbor_offsets {
                        let neighbor = cell.wrapping_add_signed(offset);
                        if self.cells[neighbor] && !queued[neighbor] {
                            queued[neighbor] = true;
                            active.push(neighbor);
                        }
                    }
                }
                active.sort_unstable();
            }
            rounds += 1;
            if deleted_this_round == 0 {
                break;
            }
        }
        log::trace!("thinning converged after {rounds} rounds");

        let mut points: Vec<Location> = (0..self.cells.len())
            .filter(|&cell| self.cells[cell])
            .map(|cell| self.location(cell))
            .collect();
        points.sort_unstable();
        points
    }

    fn touches_background(&self, cell: usize) -> bool {
        FACE_DIRECTIONS
            .iter()
            .any(|&bit| !self.cells[cell.wrapping_add_signed(self.neighbor_offsets[bit])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_connected26(points: &[Location]) -> bool {
        if points.is_empty() {
            return true;
        }
        let mut seen = vec![false; points.len()];
        let mut stack = vec![0];
        seen[0] = true;
        while let Some(i) = stack.pop() {
            for j in 0..points.len() {
                if seen[j] {
                    continue;
                }
                let (a, b) = (points[i], points[j]);
                if a.z.abs_diff(b.z) <= 1 && a.y.abs_diff(b.y) <= 1 && a.x.abs_diff(b.x) <= 1 {
                    seen[j] = true;
                    stack.push(j);
                }
            }
        }
        seen.into_iter().all(|s| s)
    }

    #[test]
    fn test_single_voxel_survives() {
        let volume = LabelVolume::from_fn(Shape::cube(3), |z, y, x| {
            if (z, y, x) == (1, 1, 1) { 4 } else { 0 }
        });
        let skeletons = SkeletonExtractor::new(Some(0)).extract(&volume);
        assert_eq!(skeletons.len(), 1);
        assert_eq!(skeletons[&4].points, vec![Location::new(1, 1, 1)]);
    }

    #[test]
    fn test_thin_line_is_unchanged() {
        let volume = LabelVolume::from_fn(Shape::new(3, 3, 8), |z, y, _| {
            if z == 1 && y == 1 { 2 } else { 0 }
        });
        let skeletons = SkeletonExtractor::new(Some(0)).extract(&volume);
        let expected: Vec<Location> = (0..8).map(|x| Location::new(1, 1, x)).collect();
        assert_eq!(skeletons[&2].points, expected);
    }

    #[test]
    fn test_square_bar_thins_to_centerline() {
        let volume = LabelVolume::from_fn(Shape::new(5, 5, 12), |z, y, x| {
            if (1..4).contains(&z) && (1..4).contains(&y) && (1..11).contains(&x) { 7 } else { 0 }
        });
        let skeletons = SkeletonExtractor::new(Some(0)).extract(&volume);
        let expected: Vec<Location> = (1..11).map(|x| Location::new(2, 2, x)).collect();
        assert_eq!(skeletons[&7].points, expected);
    }

    #[test]
    fn test_points_stay_inside_region_and_connected() {
        let volume = LabelVolume::from_fn(Shape::new(6, 9, 9), |z, y, x| {
            let dy = y as i64 - 4;
            let dx = x as i64 - 4;
            if z < 5 && dy * dy + dx * dx <= 9 { 3 } else { 1 }
        });
        let skeletons = SkeletonExtractor::new(Some(1)).extract(&volume);
        let skeleton = &skeletons[&3];
        assert!(!skeleton.is_empty());
        assert!(skeleton.len() < 5 * 29);
        for &point in &skeleton.points {
            assert_eq!(volume.at(point), 3);
        }
        assert!(is_connected26(&skeleton.points));
        assert!(!skeletons.contains_key(&1));
    }

    #[test]
    fn test_disjoint_components_each_keep_points() {
        let volume = LabelVolume::from_fn(Shape::new(4, 4, 11), |_, _, x| {
            if x < 4 || x > 6 { 5 } else { 0 }
        });
        let skeletons = SkeletonExtractor::new(Some(0)).extract(&volume);
        let points = &skeletons[&5].points;
        assert!(points.iter().any(|p| p.x < 4));
        assert!(points.iter().any(|p| p.x > 6));
    }

    #[test]
    fn test_regions_touching_volume_border() {
        let volume = LabelVolume::from_fn(Shape::new(2, 2, 6), |_, _, x| if x < 3 { 1 } else { 2 });
        let skeletons = SkeletonExtractor::new(Some(0)).extract(&volume);
        assert_eq!(skeletons.len(), 2);
        for skeleton in skeletons.values() {
            assert!(!skeleton.is_empty());
            for &point in &skeleton.points {
                assert_eq!(volume.at(point), skeleton.label);
            }
        }
    }

    #[test]
    fn test_all_background_gives_nothing() {
        let volume = LabelVolume::filled(Shape::cube(4), 0);
        assert!(SkeletonExtractor::new(Some(0)).extract(&volume).is_empty());
    }

    #[test]
    fn test_without_background_every_label_is_thinned() {
        let volume = LabelVolume::from_fn(Shape::new(2, 2, 6), |_, _, x| if x < 3 { 0 } else { 2 });
        let skeletons = SkeletonExtractor::new(None).extract(&volume);
        let labels: Vec<Label> = skeletons.keys().copied().collect();
        assert_eq!(labels, vec![0, 2]);
        assert!(skeletons.values().all(|s| !s.is_empty()));
    }
}
