//! Where split and merge errors happen.
//!
//! The matched points of a region explained by several labels are grouped
//! by the label explaining them: the partner's label when it is part of the
//! region's cover, otherwise the first cover label among the point's
//! candidates. The largest group is the main part. Every other cover label
//! is reported at the point of its group closest to the main part.

use std::collections::{BTreeMap, HashMap};

use super::errors::{MergeError, SplitError};
use super::matcher::{Correspondence, cell_of, squared_distance};
use crate::volume::Label;

/// One extra label of a region, with where it comes closest to the rest.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ErrorSite {
    pub region: Label,
    pub main: Label,
    pub extra: Label,
    pub distance: f64,
    pub location: [f64; 3],
    pub size: usize,
}

impl From<ErrorSite> for SplitError {
    fn from(site: ErrorSite) -> Self {
        Self {
            gt_label: site.region,
            pred_label_1: site.main,
            pred_label_2: site.extra,
            distance: site.distance,
            location: site.location,
            size: site.size,
        }
    }
}

impl From<ErrorSite> for MergeError {
    fn from(site: ErrorSite) -> Self {
        Self {
            pred_label: site.region,
            gt_label_1: site.main,
            gt_label_2: site.extra,
            distance: site.distance,
            location: site.location,
            size: site.size,
        }
    }
}

/// One site per extra cover label of every region in `covers`.
pub(crate) fn locate_errors(
    side: &[Correspondence],
    covers: &BTreeMap<Label, Vec<Label>>,
    voxel_size: [f64; 3],
) -> Vec<ErrorSite> {
    let mut regions: BTreeMap<Label, BTreeMap<Label, Vec<[f64; 3]>>> = BTreeMap::new();
    for c in side {
        let (Some(partner), Some(cover)) = (c.partner, covers.get(&c.point.label)) else {
            continue;
        };
        let group = if cover.contains(&partner.point.label) {
            Some(partner.point.label)
        } else {
            cover.iter().copied().find(|label| c.candidates.contains(label))
        };
        if let Some(group) = group {
            regions
                .entry(c.point.label)
                .or_default()
                .entry(group)
                .or_default()
                .push(c.point.location.scaled(voxel_size));
        }
    }

    let spacing = voxel_size.iter().copied().fold(f64::INFINITY, f64::min);
    let mut sites = Vec::new();
    for (region, groups) in regions {
        // Largest group, ties to the smaller label.
        let Some((&main, main_points)) = groups
            .iter()
            .max_by(|a, b| a.1.len().cmp(&b.1.len()).then(b.0.cmp(a.0)))
        else {
            continue;
        };
        for (&extra, points) in &groups {
            if extra == main {
                continue;
            }
            if let Some((index, distance)) = closest_approach(main_points, points, spacing) {
                log::trace!("label {region}: {extra} meets {main} at distance {distance}");
                sites.push(ErrorSite {
                    region,
                    main,
                    extra,
                    distance,
                    location: points[index],
                    size: points.len(),
                });
            }
        }
    }
    sites
}

/// The point of `to` nearest to any point of `from`, and that distance.
///
/// No two points are closer than `spacing`, so a pair at that distance ends
/// the search.
fn closest_approach(from: &[[f64; 3]], to: &[[f64; 3]], spacing: f64) -> Option<(usize, f64)> {
    if from.is_empty() || to.is_empty() {
        return None;
    }
    let cell_size = 2.0 * spacing;
    let mut cells: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    let mut lo = [i64::MAX; 3];
    let mut hi = [i64::MIN; 3];
    for (i, &position) in from.iter().enumerate() {
        let cell = cell_of(position, cell_size);
        for axis in 0..3 {
            lo[axis] = lo[axis].min(cell[axis]);
            hi[axis] = hi[axis].max(cell[axis]);
        }
        cells.entry(cell).or_default().push(i);
    }

    let mut best: Option<(usize, f64)> = None;
    for (j, &position) in to.iter().enumerate() {
        let home = cell_of(position, cell_size);
        let reach = (0..3)
            .map(|axis| (home[axis] - lo[axis]).abs().max((hi[axis] - home[axis]).abs()))
            .max()
            .unwrap_or(0);
        for ring in 0..=reach {
            // Cells of ring r are at least r - 1 cells away.
            let bound = best.map_or(f64::INFINITY, |(_, d)| d);
            if ring > 0 && (ring - 1) as f64 * cell_size >= bound {
                break;
            }
            for cell in ring_cells(home, ring) {
                for &i in cells.get(&cell).into_iter().flatten() {
                    let d = squared_distance(from[i], position).sqrt();
                    if best.is_none_or(|(_, b)| d < b) {
                        best = Some((j, d));
                    }
                }
            }
        }
        if best.is_some_and(|(_, d)| d <= spacing) {
            break;
        }
    }
    best
}

/// Cells at Chebyshev distance exactly `ring` from `home`.
fn ring_cells(home: [i64; 3], ring: i64) -> impl Iterator<Item = [i64; 3]> {
    (-ring..=ring)
        .flat_map(move |dz| {
            (-ring..=ring).flat_map(move |dy| (-ring..=ring).map(move |dx| [dz, dy, dx]))
        })
        .filter(move |offset| offset.iter().map(|d| d.abs()).max() == Some(ring))
        .map(move |[dz, dy, dx]| [home[0] + dz, home[1] + dy, home[2] + dx])
}
