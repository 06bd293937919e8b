//! Comparison entry points, parameters and reports.
//!
//! - [`session::create_report`]: Compare one prediction against the ground truth
//! - [`parameters::Parameters`]: Which metrics to compute and how
//! - [`session::EvalSession`]: Batch evaluation and report writing
//! - [`report`]: Report types for evaluation results

pub mod parameters;
pub mod report;
pub mod session;

pub use parameters::{Parameters, ParametersBuilder};
pub use report::{BatchReport, Report, ReportKey, VolumeReport};
pub use session::{EvalConfig, EvalSession, VolumePair, create_report};
