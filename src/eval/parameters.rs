//! Evaluation parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::eval::report::ReportKey;
use crate::ted::TedParameters;
use crate::volume::Label;

/// Which metrics to compute and how.
///
/// Loaded from JSON with missing fields taking their defaults, or built with
/// [`Parameters::builder`]. Checked once by [`Parameters::validate`] when a
/// comparison starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Report Tolerant Edit Distance.
    pub report_ted: bool,
    /// Report Adapted Rand error.
    pub report_rand: bool,
    /// Report Variation of Information.
    pub report_voi: bool,
    /// Compute TED on curve skeletons instead of all voxels.
    pub from_skeleton: bool,
    /// TED matching tolerance in physical units.
    pub distance_threshold: f64,
    /// Ground truth label meaning "no object".
    pub gt_background_label: Label,
    /// Predicted label meaning "no object".
    pub rec_background_label: Label,
    /// Leave ground truth background voxels out of VOI and Rand.
    pub ignore_background: bool,
    /// Whether the background labels mean "no object". When false every
    /// voxel belongs to some object.
    pub have_background: bool,
    /// Report where every TED split and merge happens.
    pub report_ted_error_locations: bool,
    /// Grow predicted labels into predicted background, section by section,
    /// before computing VOI and Rand. TED always sees the prediction as is.
    pub grow_slices: bool,
    /// Physical voxel size as (z, y, x).
    pub voxel_size: [f64; 3],
    /// Worker threads for one comparison. `None` uses the global pool.
    pub num_threads: Option<usize>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            report_ted: true,
            report_rand: true,
            report_voi: true,
            from_skeleton: false,
            distance_threshold: 10.0,
            gt_background_label: 0,
            rec_background_label: 0,
            ignore_background: false,
            have_background: true,
            report_ted_error_locations: false,
            grow_slices: false,
            voxel_size: [1.0; 3],
            num_threads: None,
        }
    }
}

impl Parameters {
    /// Create a new parameters builder.
    #[must_use]
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Parse parameters from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every value is in range.
    ///
    /// TED settings are only checked when TED is requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(Error::invalid_parameter("num_threads", "must be at least 1"));
        }
        if !self.report_ted {
            return Ok(());
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(Error::invalid_parameter(
                "distance_threshold",
                format!("must be finite and non-negative, got {}", self.distance_threshold),
            ));
        }
        if let Some(size) = self.voxel_size.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(Error::invalid_parameter(
                "voxel_size",
                format!("entries must be finite and positive, got {size}"),
            ));
        }
        Ok(())
    }

    /// Ground truth label left out of the contingency table, if any.
    #[must_use]
    pub fn excluded_gt_label(&self) -> Option<Label> {
        (self.ignore_background && self.have_background).then_some(self.gt_background_label)
    }

    /// Predicted label to grow over before VOI and Rand, if growing applies.
    #[must_use]
    pub fn grown_background(&self) -> Option<Label> {
        (self.grow_slices && self.have_background && (self.report_voi || self.report_rand))
            .then_some(self.rec_background_label)
    }

    /// The TED subset of these parameters.
    #[must_use]
    pub fn ted_parameters(&self) -> TedParameters {
        TedParameters {
            from_skeleton: self.from_skeleton,
            distance_threshold: self.distance_threshold,
            voxel_size: self.voxel_size,
            gt_background_label: self.gt_background_label,
            pred_background_label: self.rec_background_label,
            have_background: self.have_background,
            locate_errors: self.report_ted_error_locations,
        }
    }

    /// Report keys produced under these parameters, in report order.
    #[must_use]
    pub fn requested_keys(&self) -> Vec<ReportKey> {
        ReportKey::ALL
            .into_iter()
            .filter(|key| match key {
                ReportKey::VoiSplit | ReportKey::VoiMerge => self.report_voi,
                ReportKey::AdaptedRandError => self.report_rand,
                _ => self.report_ted,
            })
            .collect()
    }
}

/// Builder for [`Parameters`].
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    parameters: Parameters,
}

impl ParametersBuilder {
    /// Whether to report Tolerant Edit Distance.
    #[must_use]
    pub fn report_ted(mut self, on: bool) -> Self {
        self.parameters.report_ted = on;
        self
    }

    /// Whether to report Adapted Rand error.
    #[must_use]
    pub fn report_rand(mut self, on: bool) -> Self {
        self.parameters.report_rand = on;
        self
    }

    /// Whether to report Variation of Information.
    #[must_use]
    pub fn report_voi(mut self, on: bool) -> Self {
        self.parameters.report_voi = on;
        self
    }

    /// Whether TED works on skeletons.
    #[must_use]
    pub fn from_skeleton(mut self, on: bool) -> Self {
        self.parameters.from_skeleton = on;
        self
    }

    /// Set the TED matching tolerance.
    #[must_use]
    pub fn distance_threshold(mut self, threshold: f64) -> Self {
        self.parameters.distance_threshold = threshold;
        self
    }

    /// Set the ground truth background label.
    #[must_use]
    pub fn gt_background_label(mut self, label: Label) -> Self {
        self.parameters.gt_background_label = label;
        self
    }

    /// Set the predicted background label.
    #[must_use]
    pub fn rec_background_label(mut self, label: Label) -> Self {
        self.parameters.rec_background_label = label;
        self
    }

    /// Whether to drop ground truth background voxels from VOI and Rand.
    #[must_use]
    pub fn ignore_background(mut self, on: bool) -> Self {
        self.parameters.ignore_background = on;
        self
    }

    /// Whether the background labels mean "no object".
    #[must_use]
    pub fn have_background(mut self, on: bool) -> Self {
        self.parameters.have_background = on;
        self
    }

    /// Whether to locate TED splits and merges.
    #[must_use]
    pub fn report_ted_error_locations(mut self, on: bool) -> Self {
        self.parameters.report_ted_error_locations = on;
        self
    }

    /// Whether to grow predicted labels into background before VOI and Rand.
    #[must_use]
    pub fn grow_slices(mut self, on: bool) -> Self {
        self.parameters.grow_slices = on;
        self
    }

    /// Set the physical voxel size as (z, y, x).
    #[must_use]
    pub fn voxel_size(mut self, size: [f64; 3]) -> Self {
        self.parameters.voxel_size = size;
        self
    }

    /// Run each comparison in a dedicated pool of `threads` workers.
    #[must_use]
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.parameters.num_threads = Some(threads);
        self
    }

    /// Build the parameters. Validation happens when they are used.
    #[must_use]
    pub fn build(self) -> Parameters {
        self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Parameters::default();
        assert!(p.report_ted && p.report_rand && p.report_voi);
        assert!(!p.from_skeleton);
        assert_eq!(p.distance_threshold, 10.0);
        assert_eq!(p.gt_background_label, 0);
        assert!(p.have_background);
        assert!(!p.report_ted_error_locations && !p.grow_slices);
        assert_eq!(p.grown_background(), None);
        assert!(p.validate().is_ok());
        assert_eq!(p.requested_keys().len(), ReportKey::ALL.len());
    }

    #[test]
    fn test_builder() {
        let p = Parameters::builder()
            .report_ted(false)
            .distance_threshold(2.5)
            .gt_background_label(3)
            .rec_background_label(4)
            .ignore_background(true)
            .voxel_size([40.0, 4.0, 4.0])
            .num_threads(2)
            .build();
        assert!(!p.report_ted);
        assert_eq!(p.excluded_gt_label(), Some(3));
        assert_eq!(p.num_threads, Some(2));
        let ted = p.ted_parameters();
        assert_eq!(ted.pred_background_label, 4);
        assert_eq!(ted.voxel_size, [40.0, 4.0, 4.0]);
        assert_eq!(
            p.requested_keys(),
            vec![ReportKey::VoiSplit, ReportKey::VoiMerge, ReportKey::AdaptedRandError]
        );
    }

    #[test]
    fn test_background_switches() {
        let p = Parameters::builder()
            .ignore_background(true)
            .grow_slices(true)
            .rec_background_label(9)
            .report_ted_error_locations(true)
            .build();
        assert_eq!(p.excluded_gt_label(), Some(0));
        assert_eq!(p.grown_background(), Some(9));
        let ted = p.ted_parameters();
        assert!(ted.locate_errors);
        assert_eq!(ted.pred_background(), Some(9));

        let p = Parameters::builder()
            .ignore_background(true)
            .grow_slices(true)
            .have_background(false)
            .build();
        assert_eq!(p.excluded_gt_label(), None);
        assert_eq!(p.grown_background(), None);
        assert_eq!(p.ted_parameters().gt_background(), None);

        let ted_only = Parameters::builder()
            .grow_slices(true)
            .report_voi(false)
            .report_rand(false)
            .build();
        assert_eq!(ted_only.grown_background(), None);
    }

    #[test]
    fn test_negative_threshold_rejected_only_with_ted() {
        let p = Parameters::builder().distance_threshold(-1.0).build();
        assert!(matches!(
            p.validate(),
            Err(Error::InvalidParameter {
                name: "distance_threshold",
                ..
            })
        ));

        let p = Parameters::builder().distance_threshold(-1.0).report_ted(false).build();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let p = Parameters::builder().distance_threshold(f64::NAN).build();
        assert!(p.validate().is_err());
        let p = Parameters::builder().voxel_size([1.0, 0.0, 1.0]).build();
        assert!(matches!(p.validate(), Err(Error::InvalidParameter { name: "voxel_size", .. })));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let p = Parameters::builder().num_threads(0).report_ted(false).build();
        assert!(matches!(p.validate(), Err(Error::InvalidParameter { name: "num_threads", .. })));
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{"from_skeleton": true, "distance_threshold": 3.0}"#;
        let p = Parameters::from_json(json).unwrap();
        assert!(p.from_skeleton);
        assert!(p.have_background);
        assert_eq!(p.distance_threshold, 3.0);
        assert!(p.report_voi);
        assert_eq!(p.voxel_size, [1.0; 3]);
    }

    #[test]
    fn test_json_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let p = Parameters::builder().ignore_background(true).num_threads(3).build();
        std::fs::write(&path, serde_json::to_string(&p).unwrap()).unwrap();
        assert_eq!(Parameters::from_json_file(&path).unwrap(), p);
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        assert!(matches!(
            Parameters::from_json(r#"{"distance_threshold": "far"}"#),
            Err(Error::Json(_))
        ));
    }
}
