//! Report types for evaluation results.
//!
//! This module defines the data structures for evaluation reports that can be
//! serialized to JSON or CSV.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::eval::parameters::Parameters;
use crate::metrics::{RandErrors, VoiErrors};
use crate::stats::Summary;
use crate::ted::TedErrors;
use crate::volume::Shape;

/// Name of a reported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKey {
    /// H(pred | gt) in bits.
    VoiSplit,
    /// H(gt | pred) in bits.
    VoiMerge,
    /// One minus the pair-counting F-score.
    AdaptedRandError,
    /// Extra predicted labels needed to cover ground truth regions.
    TedSplit,
    /// Extra ground truth labels needed to cover predicted regions.
    TedMerge,
    /// Predicted points with no ground truth point in range.
    TedFalsePositive,
    /// Ground truth points with no predicted point in range.
    TedFalseNegative,
    /// Sum of the four TED counts.
    TedEditDistance,
}

impl ReportKey {
    /// Every key, in report order.
    pub const ALL: [Self; 8] = [
        Self::VoiSplit,
        Self::VoiMerge,
        Self::AdaptedRandError,
        Self::TedSplit,
        Self::TedMerge,
        Self::TedFalsePositive,
        Self::TedFalseNegative,
        Self::TedEditDistance,
    ];

    /// The key as it appears in serialized reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::VoiSplit => "voi_split",
            Self::VoiMerge => "voi_merge",
            Self::AdaptedRandError => "adapted_rand_error",
            Self::TedSplit => "ted_split",
            Self::TedMerge => "ted_merge",
            Self::TedFalsePositive => "ted_false_positive",
            Self::TedFalseNegative => "ted_false_negative",
            Self::TedEditDistance => "ted_edit_distance",
        }
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metric values for one comparison, with optional details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Requested metrics only.
    pub metrics: BTreeMap<ReportKey, f64>,
    /// Precision, recall and Rand index behind the Adapted Rand error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rand: Option<RandErrors>,
    /// Split/merge covers and per-label matches behind the TED counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ted: Option<TedErrors>,
}

impl Report {
    /// Collect the requested metric outputs.
    ///
    /// A metric is copied only if its report flag is set in `parameters` and
    /// its result is present.
    #[must_use]
    pub fn assemble(
        parameters: &Parameters,
        voi: Option<VoiErrors>,
        rand: Option<RandErrors>,
        ted: Option<TedErrors>,
    ) -> Self {
        let mut report = Self::default();

        if let Some(voi) = voi.filter(|_| parameters.report_voi) {
            report.metrics.insert(ReportKey::VoiSplit, voi.split);
            report.metrics.insert(ReportKey::VoiMerge, voi.merge);
        }
        if let Some(rand) = rand.filter(|_| parameters.report_rand) {
            report.metrics.insert(ReportKey::AdaptedRandError, rand.adapted_rand_error);
            report.rand = Some(rand);
        }
        if let Some(ted) = ted.filter(|_| parameters.report_ted) {
            report.metrics.insert(ReportKey::TedSplit, ted.num_splits as f64);
            report.metrics.insert(ReportKey::TedMerge, ted.num_merges as f64);
            report.metrics.insert(ReportKey::TedFalsePositive, ted.num_false_positives as f64);
            report.metrics.insert(ReportKey::TedFalseNegative, ted.num_false_negatives as f64);
            report.metrics.insert(ReportKey::TedEditDistance, ted.edit_distance() as f64);
            report.ted = Some(ted);
        }

        report
    }

    /// Value of a metric, if it was requested.
    #[must_use]
    pub fn get(&self, key: ReportKey) -> Option<f64> {
        self.metrics.get(&key).copied()
    }

    /// True if the metric was requested.
    #[must_use]
    pub fn contains(&self, key: ReportKey) -> bool {
        self.metrics.contains_key(&key)
    }

    /// Metrics in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ReportKey, f64)> + '_ {
        self.metrics.iter().map(|(&k, &v)| (k, v))
    }

    /// Number of reported metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True if nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Report for one named volume pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeReport {
    /// Volume pair name or identifier.
    pub name: String,
    /// Extent as (depth, height, width).
    pub shape: Shape,
    /// Metric values.
    pub report: Report,
}

/// Report for a batch of volume pairs evaluated with one set of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Batch name or identifier.
    pub name: String,
    /// Parameters used for every pair.
    pub parameters: Parameters,
    /// Individual reports, in input order.
    pub volumes: Vec<VolumeReport>,
    /// Statistics per metric across the batch.
    pub summaries: BTreeMap<ReportKey, Summary>,
}

impl BatchReport {
    /// Create a batch report and summarize every metric.
    #[must_use]
    pub fn new(name: String, parameters: Parameters, volumes: Vec<VolumeReport>) -> Self {
        let mut summaries = BTreeMap::new();
        for key in ReportKey::ALL {
            let values: Vec<f64> = volumes.iter().filter_map(|v| v.report.get(key)).collect();
            if let Some(summary) = Summary::compute(&values) {
                summaries.insert(key, summary);
            }
        }
        Self {
            name,
            parameters,
            volumes,
            summaries,
        }
    }

    /// Summary of one metric across the batch.
    #[must_use]
    pub fn summary(&self, key: ReportKey) -> Option<&Summary> {
        self.summaries.get(&key)
    }
}
