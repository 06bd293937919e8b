//! Label volumes.
//!
//! A [`LabelVolume`] is a dense 3D array of unsigned labels stored in
//! row-major (z, y, x) order, x varying fastest. It either borrows the
//! caller's buffer or owns one; the evaluation engine only ever reads it.

use std::borrow::Cow;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Label value stored in a volume.
pub type Label = u64;

/// Extent of a volume in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Number of sections (z).
    pub depth: usize,
    /// Number of rows per section (y).
    pub height: usize,
    /// Number of voxels per row (x).
    pub width: usize,
}

impl Shape {
    /// Create a shape from (depth, height, width).
    #[must_use]
    pub const fn new(depth: usize, height: usize, width: usize) -> Self {
        Self {
            depth,
            height,
            width,
        }
    }

    /// A cube with the given edge length.
    #[must_use]
    pub const fn cube(edge: usize) -> Self {
        Self::new(edge, edge, edge)
    }

    /// Total number of voxels.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.depth * self.height * self.width
    }

    /// True if the shape contains no voxels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of voxel (z, y, x).
    #[inline]
    #[must_use]
    pub const fn index(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    /// Location of the voxel at a linear index.
    #[inline]
    #[must_use]
    pub const fn location(&self, index: usize) -> Location {
        let x = index % self.width;
        let y = (index / self.width) % self.height;
        let z = index / (self.width * self.height);
        Location::new(z, y, x)
    }

    /// (depth, height, width) as an array.
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        [self.depth, self.height, self.width]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.depth, self.height, self.width)
    }
}

/// Integer lattice position of a voxel.
///
/// Ordered by z, then y, then x, which is the storage order of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Section index.
    pub z: usize,
    /// Row index.
    pub y: usize,
    /// Column index.
    pub x: usize,
}

impl Location {
    /// Create a location from (z, y, x).
    #[must_use]
    pub const fn new(z: usize, y: usize, x: usize) -> Self {
        Self { z, y, x }
    }

    /// Position in physical units for the given voxel size (z, y, x).
    #[must_use]
    pub fn scaled(&self, voxel_size: [f64; 3]) -> [f64; 3] {
        [
            self.z as f64 * voxel_size[0],
            self.y as f64 * voxel_size[1],
            self.x as f64 * voxel_size[2],
        ]
    }
}

/// A dense 3D label array, borrowed or owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVolume<'a> {
    labels: Cow<'a, [Label]>,
    shape: Shape,
}

impl<'a> LabelVolume<'a> {
    /// View the caller's label buffer as a volume.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferLength`] if `labels.len()` does not match the
    /// number of voxels in `shape`.
    pub fn new(labels: &'a [Label], shape: Shape) -> Result<Self> {
        check_length(labels.len(), shape)?;
        Ok(Self {
            labels: Cow::Borrowed(labels),
            shape,
        })
    }

    /// Take ownership of a label buffer.
    pub fn from_vec(labels: Vec<Label>, shape: Shape) -> Result<LabelVolume<'static>> {
        check_length(labels.len(), shape)?;
        Ok(LabelVolume {
            labels: Cow::Owned(labels),
            shape,
        })
    }

    /// A volume where every voxel has the same label.
    #[must_use]
    pub fn filled(shape: Shape, label: Label) -> LabelVolume<'static> {
        LabelVolume {
            labels: Cow::Owned(vec![label; shape.len()]),
            shape,
        }
    }

    /// Build a volume by evaluating `f(z, y, x)` at every voxel.
    #[must_use]
    pub fn from_fn(
        shape: Shape,
        mut f: impl FnMut(usize, usize, usize) -> Label,
    ) -> LabelVolume<'static> {
        let mut labels = Vec::with_capacity(shape.len());
        for z in 0..shape.depth {
            for y in 0..shape.height {
                for x in 0..shape.width {
                    labels.push(f(z, y, x));
                }
            }
        }
        LabelVolume {
            labels: Cow::Owned(labels),
            shape,
        }
    }

    /// Extent of the volume.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Labels in storage order.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the volume has no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at (z, y, x).
    ///
    /// # Panics
    ///
    /// Panics if the location is outside the volume.
    #[must_use]
    pub fn get(&self, z: usize, y: usize, x: usize) -> Label {
        self.labels[self.shape.index(z, y, x)]
    }

    /// Label at a location.
    #[must_use]
    pub fn at(&self, location: Location) -> Label {
        self.get(location.z, location.y, location.x)
    }

    /// All distinct labels, sorted.
    #[must_use]
    pub fn distinct_labels(&self) -> BTreeSet<Label> {
        self.labels.iter().copied().collect()
    }

    /// True if every voxel carries `background`.
    #[must_use]
    pub fn is_uniform(&self, background: Label) -> bool {
        self.labels.iter().all(|&l| l == background)
    }

    /// Apply `f` to every label, producing an owned volume.
    #[must_use]
    pub fn map_labels(&self, mut f: impl FnMut(Label) -> Label) -> LabelVolume<'static> {
        LabelVolume {
            labels: Cow::Owned(self.labels.iter().map(|&l| f(l)).collect()),
            shape: self.shape,
        }
    }

    /// Detach from any borrowed buffer.
    #[must_use]
    pub fn into_owned(self) -> LabelVolume<'static> {
        LabelVolume {
            labels: Cow::Owned(self.labels.into_owned()),
            shape: self.shape,
        }
    }

    /// Give every 6-connected region of equal, non-background label its own id.
    ///
    /// Background voxels become 0 and regions are numbered from 1 in storage
    /// order of their first voxel. This turns a foreground/background mask
    /// into a region labeling.
    #[must_use]
    pub fn connected_components(&self, background: Label) -> LabelVolume<'static> {
        const UNVISITED: Label = Label::MAX;

        let shape = self.shape;
        let mut out = vec![UNVISITED; shape.len()];
        let mut next_id: Label = 1;
        let mut queue = VecDeque::new();

        for start in 0..shape.len() {
            if out[start] != UNVISITED {
                continue;
            }
            let label = self.labels[start];
            if label == background {
                out[start] = 0;
                continue;
            }

            out[start] = next_id;
            queue.push_back(start);
            while let Some(index) = queue.pop_front() {
                for neighbor in face_neighbors(shape, index) {
                    if out[neighbor] == UNVISITED && self.labels[neighbor] == label {
                        out[neighbor] = next_id;
                        queue.push_back(neighbor);
                    }
                }
            }
            next_id += 1;
        }

        log::debug!("found {} connected components in {} volume", next_id - 1, shape);

        LabelVolume {
            labels: Cow::Owned(out),
            shape,
        }
    }

    /// Fill `background` voxels with the nearest label of their section.
    ///
    /// Labels spread breadth-first along 4-connected paths within each z
    /// section, so a background voxel takes the label of the labeled voxel
    /// reached first. Sections without any label stay background. Sections
    /// are grown in parallel.
    #[must_use]
    pub fn grow_slices(&self, background: Label) -> LabelVolume<'static> {
        let shape = self.shape;
        let plane = shape.height * shape.width;
        let mut labels = self.labels.to_vec();
        if plane > 0 {
            labels
                .par_chunks_mut(plane)
                .for_each(|section| grow_section(section, shape.width, background));
        }
        LabelVolume {
            labels: Cow::Owned(labels),
            shape,
        }
    }
}

/// Multi-source breadth-first growth over one row-major section.
fn grow_section(section: &mut [Label], width: usize, background: Label) {
    let mut queue: VecDeque<usize> =
        (0..section.len()).filter(|&i| section[i] != background).collect();
    while let Some(index) = queue.pop_front() {
        let label = section[index];
        let x = index % width;
        let neighbors = [
            index.checked_sub(width),
            Some(index + width).filter(|&n| n < section.len()),
            (x > 0).then(|| index - 1),
            (x + 1 < width).then(|| index + 1),
        ];
        for neighbor in neighbors.into_iter().flatten() {
            if section[neighbor] == background {
                section[neighbor] = label;
                queue.push_back(neighbor);
            }
        }
    }
}

/// Fail with [`Error::ShapeMismatch`] unless both volumes have the same extent.
pub fn ensure_same_shape(
    ground_truth: &LabelVolume<'_>,
    prediction: &LabelVolume<'_>,
) -> Result<Shape> {
    if ground_truth.shape() != prediction.shape() {
        return Err(Error::ShapeMismatch {
            expected: ground_truth.shape().dims(),
            actual: prediction.shape().dims(),
        });
    }
    Ok(ground_truth.shape())
}

fn check_length(len: usize, shape: Shape) -> Result<()> {
    if len != shape.len() {
        return Err(Error::BufferLength {
            shape: shape.dims(),
            expected: shape.len(),
            actual: len,
        });
    }
    Ok(())
}

/// Linear indices of the in-bounds face neighbors of a voxel.
fn face_neighbors(shape: Shape, index: usize) -> impl Iterator<Item = usize> {
    let Location { z, y, x } = shape.location(index);
    let plane = shape.width * shape.height;
    [
        (z > 0).then(|| index - plane),
        (z + 1 < shape.depth).then(|| index + plane),
        (y > 0).then(|| index - shape.width),
        (y + 1 < shape.height).then(|| index + shape.width),
        (x > 0).then(|| index - 1),
        (x + 1 < shape.width).then(|| index + 1),
    ]
    .into_iter()
    .flatten()
}
