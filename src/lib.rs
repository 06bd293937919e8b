//! # seg-eval
//!
//! Evaluation of 3D segmentations against a ground truth label volume.
//!
//! Given two label volumes of the same extent, the library reports:
//!
//! - **VOI** split and merge: conditional entropies of the two partitions
//! - **Adapted Rand error**: one minus the pair-counting F-score
//! - **TED** (Tolerant Edit Distance): split, merge, false positive and false
//!   negative edits, tolerating boundary shifts up to a distance threshold,
//!   optionally computed on curve skeletons
//!
//! ## Quick Start
//!
//! ```rust
//! use seg_eval::{LabelVolume, Parameters, ReportKey, Shape, create_report};
//!
//! let shape = Shape::new(4, 32, 32);
//! let gt = LabelVolume::from_fn(shape, |_, _, x| if x < 16 { 1 } else { 2 });
//! let pred = LabelVolume::filled(shape, 7);
//!
//! let parameters = Parameters::builder().distance_threshold(2.0).build();
//! let report = create_report(&gt, &pred, &parameters)?;
//!
//! assert_eq!(report.get(ReportKey::VoiSplit), Some(0.0));
//! assert!(report.get(ReportKey::VoiMerge).unwrap() > 0.0);
//! # Ok::<(), seg_eval::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`volume`]: Label volumes, shapes and connected components
//! - [`metrics`]: Contingency table, VOI and Adapted Rand
//! - [`ted`]: Skeletonization and tolerant matching
//! - [`eval`]: Parameters, reports and batch sessions
//! - [`stats`]: Summary statistics across a batch
//! - [`synth`]: Seedable synthetic volumes

pub mod error;
pub mod eval;
pub mod metrics;
pub mod stats;
pub mod synth;
pub mod ted;
pub mod volume;

// Re-export commonly used types
pub use error::{Error, Result};
pub use eval::{
    BatchReport, EvalConfig, EvalSession, Parameters, ParametersBuilder, Report, ReportKey,
    VolumePair, VolumeReport, create_report,
};
pub use metrics::{ContingencyTable, RandErrors, VoiErrors};
pub use stats::Summary;
pub use ted::{
    MergeError, Skeleton, SkeletonExtractor, SplitError, TedErrors, TedParameters,
    TolerantEditDistance, TolerantMatcher,
};
pub use volume::{Label, LabelVolume, Location, Shape};
