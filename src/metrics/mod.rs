//! Region-overlap metrics for comparing two segmentations.
//!
//! Both metrics are derived from a [`ContingencyTable`], built in one
//! parallel pass over the two volumes:
//!
//! - **VOI**: Variation of Information split and merge conditional
//!   entropies, in bits (lower is better, 0 = identical)
//! - **Adapted Rand**: one minus the pair-counting F-score (lower is better,
//!   0 = identical, at most 1)
//!
//! ## Reading the numbers
//!
//! | Symptom | voi_split | voi_merge | adapted_rand_error |
//! |---------|-----------|-----------|--------------------|
//! | Identical partitions | 0 | 0 | 0 |
//! | Objects cut into pieces | high | low | high |
//! | Objects glued together | low | high | high |
//! | Labels renamed only | 0 | 0 | 0 |

pub mod contingency;
pub mod rand_index;
pub mod voi;

pub use contingency::ContingencyTable;
pub use rand_index::RandErrors;
pub use voi::VoiErrors;
