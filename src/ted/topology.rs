//! Local topology of a voxel in its 3x3x3 neighborhood.
//!
//! A neighborhood is packed into a 27-bit mask, bit `(dz+1)*9 + (dy+1)*3 +
//! (dx+1)` set when the voxel at that offset belongs to the object. The
//! object uses 26-connectivity and the background 6-connectivity.

/// Bit index of the center voxel.
pub const CENTER: usize = 13;

/// All 27 offsets in bit order.
pub const OFFSETS: [[isize; 3]; 27] = offsets();

/// Bit of the face neighbor in each thinning direction: -z, +z, -y, +y, -x, +x.
pub const FACE_DIRECTIONS: [usize; 6] = [4, 22, 10, 16, 12, 14];

const FACES: u32 = (1 << 4) | (1 << 22) | (1 << 10) | (1 << 16) | (1 << 12) | (1 << 14);
const N26: u32 = ((1 << 27) - 1) & !(1 << CENTER);
const N18: u32 = n18();
const ADJ26: [u32; 27] = adjacency(3);
const ADJ6: [u32; 27] = adjacency(1);

const fn offsets() -> [[isize; 3]; 27] {
    let mut out = [[0; 3]; 27];
    let mut i = 0;
    while i < 27 {
        out[i] = [(i / 9) as isize - 1, ((i / 3) % 3) as isize - 1, (i % 3) as isize - 1];
        i += 1;
    }
    out
}

const fn n18() -> u32 {
    let offsets = offsets();
    let mut mask = 0;
    let mut i = 0;
    while i < 27 {
        let o = offsets[i];
        let l1 = o[0].unsigned_abs() + o[1].unsigned_abs() + o[2].unsigned_abs();
        if l1 == 1 || l1 == 2 {
            mask |= 1u32 << i;
        }
        i += 1;
    }
    mask
}

/// Neighbor masks within the 3x3x3 block. `max_l1` 3 gives 26-adjacency,
/// 1 gives 6-adjacency.
const fn adjacency(max_l1: usize) -> [u32; 27] {
    let offsets = offsets();
    let mut table = [0; 27];
    let mut i = 0;
    while i < 27 {
        let mut j = 0;
        while j < 27 {
            if i != j {
                let dz = (offsets[i][0] - offsets[j][0]).unsigned_abs();
                let dy = (offsets[i][1] - offsets[j][1]).unsigned_abs();
                let dx = (offsets[i][2] - offsets[j][2]).unsigned_abs();
                if dz <= 1 && dy <= 1 && dx <= 1 && dz + dy + dx <= max_l1 {
                    table[i] |= 1u32 << j;
                }
            }
            j += 1;
        }
        i += 1;
    }
    table
}

/// Number of connected components of `set` that contain at least one bit of
/// `seeds`.
fn count_components(set: u32, seeds: u32, adjacency: &[u32; 27]) -> u32 {
    let mut remaining = set;
    let mut count = 0;
    loop {
        let seed = remaining & seeds;
        if seed == 0 {
            return count;
        }
        let mut component = 1u32 << seed.trailing_zeros();
        let mut frontier = component;
        while frontier != 0 {
            let i = frontier.trailing_zeros() as usize;
            frontier &= frontier - 1;
            let grown = adjacency[i] & remaining & !component;
            component |= grown;
            frontier |= grown;
        }
        remaining &= !component;
        count += 1;
    }
}

/// True if removing the center voxel preserves the topology of both the
/// object and the background.
///
/// The object neighbors must form exactly one 26-connected component, and
/// the background voxels of the 18-neighborhood must form exactly one
/// 6-connected component touching a face of the center.
#[must_use]
pub fn is_simple(mask: u32) -> bool {
    let object = mask & N26;
    if count_components(object, object, &ADJ26) != 1 {
        return false;
    }
    let background = !mask & N18;
    count_components(background, background & FACES, &ADJ6) == 1
}

/// True if the center voxel has exactly one object neighbor.
#[must_use]
pub fn is_endpoint(mask: u32) -> bool {
    (mask & N26).count_ones() == 1
}

/// True if the face neighbor in thinning direction `direction` is background.
#[must_use]
pub fn is_border(mask: u32, direction: usize) -> bool {
    mask & (1u32 << FACE_DIRECTIONS[direction]) == 0
}
