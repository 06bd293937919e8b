//! Seedable synthetic label volumes.
//!
//! Used by tests and property checks to build reproducible inputs: random
//! block partitions, label noise, and label permutations.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::volume::{Label, LabelVolume, Shape};

/// Axis along which a volume is cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Sections.
    Z,
    /// Rows.
    Y,
    /// Columns.
    X,
}

/// Two labels, one on each side of the middle of `axis`.
#[must_use]
pub fn half_split(shape: Shape, axis: Axis, low: Label, high: Label) -> LabelVolume<'static> {
    let [depth, height, width] = shape.dims();
    LabelVolume::from_fn(shape, |z, y, x| {
        let below = match axis {
            Axis::Z => z < depth / 2,
            Axis::Y => y < height / 2,
            Axis::X => x < width / 2,
        };
        if below { low } else { high }
    })
}

/// Reproducible random volume generator.
#[derive(Debug, Clone)]
pub struct VolumeGenerator {
    rng: StdRng,
}

impl VolumeGenerator {
    /// Generator with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Every voxel drawn uniformly from `0..num_labels`.
    #[must_use]
    pub fn random_labels(&mut self, shape: Shape, num_labels: Label) -> LabelVolume<'static> {
        let num_labels = num_labels.max(1);
        LabelVolume::from_fn(shape, |_, _, _| self.rng.random_range(0..num_labels))
    }

    /// Piecewise-constant volume: the extent is tiled with `block`-sized
    /// boxes, each getting one label drawn from `0..num_labels`.
    #[must_use]
    pub fn blocks(
        &mut self,
        shape: Shape,
        block: [usize; 3],
        num_labels: Label,
    ) -> LabelVolume<'static> {
        let num_labels = num_labels.max(1);
        let block = block.map(|b| b.max(1));
        let mut tiles: BTreeMap<[usize; 3], Label> = BTreeMap::new();
        LabelVolume::from_fn(shape, |z, y, x| {
            let tile = [z / block[0], y / block[1], x / block[2]];
            *tiles
                .entry(tile)
                .or_insert_with(|| self.rng.random_range(0..num_labels))
        })
    }

    /// Copy of `volume` where each voxel is replaced, with probability
    /// `probability`, by a label drawn from `0..num_labels`.
    #[must_use]
    pub fn with_noise(
        &mut self,
        volume: &LabelVolume<'_>,
        probability: f64,
        num_labels: Label,
    ) -> LabelVolume<'static> {
        let probability = probability.clamp(0.0, 1.0);
        let num_labels = num_labels.max(1);
        volume.map_labels(|label| {
            if self.rng.random_bool(probability) {
                self.rng.random_range(0..num_labels)
            } else {
                label
            }
        })
    }

    /// Copy of `volume` with its distinct labels shuffled bijectively.
    #[must_use]
    pub fn permute_labels(&mut self, volume: &LabelVolume<'_>) -> LabelVolume<'static> {
        let labels: Vec<Label> = volume.distinct_labels().into_iter().collect();
        let mut shuffled = labels.clone();
        shuffled.shuffle(&mut self.rng);
        let mapping: BTreeMap<Label, Label> = labels.into_iter().zip(shuffled).collect();
        volume.map_labels(|label| mapping[&label])
    }
}
