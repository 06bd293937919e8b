//! Comparison entry points and batch evaluation.
//!
//! [`create_report`] compares one ground truth volume against one prediction.
//! [`EvalSession`] runs many comparisons with shared parameters and writes
//! the resulting reports as JSON and CSV.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::eval::parameters::Parameters;
use crate::eval::report::{BatchReport, Report, VolumeReport};
use crate::metrics::{ContingencyTable, RandErrors, VoiErrors};
use crate::ted::TolerantEditDistance;
use crate::volume::{LabelVolume, ensure_same_shape};

/// Compare a prediction against the ground truth.
///
/// # Arguments
///
/// * `ground_truth` - Reference label volume.
/// * `prediction` - Label volume to evaluate, same shape as `ground_truth`.
/// * `parameters` - Which metrics to compute and how.
///
/// # Returns
///
/// A [`Report`] holding exactly the requested metrics.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `parameters` fail validation and
/// [`Error::ShapeMismatch`] if the volumes differ in extent. Nothing is
/// computed in either case.
pub fn create_report(
    ground_truth: &LabelVolume<'_>,
    prediction: &LabelVolume<'_>,
    parameters: &Parameters,
) -> Result<Report> {
    parameters.validate()?;
    ensure_same_shape(ground_truth, prediction)?;

    match parameters.num_threads {
        Some(threads) => {
            let pool = build_pool(threads)?;
            pool.install(|| compute_report(ground_truth, prediction, parameters))
        }
        None => compute_report(ground_truth, prediction, parameters),
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?)
}

/// Run the metric stages. Parameters and shapes are already checked.
fn compute_report(
    ground_truth: &LabelVolume<'_>,
    prediction: &LabelVolume<'_>,
    parameters: &Parameters,
) -> Result<Report> {
    let excluded = parameters.excluded_gt_label();
    let table = ContingencyTable::build(ground_truth, prediction, excluded)?;
    let grown_table = match parameters.grown_background() {
        Some(background) => {
            let grown = prediction.grow_slices(background);
            log::debug!("grew predicted labels over background {background} per section");
            Some(ContingencyTable::build(ground_truth, &grown, excluded)?)
        }
        None => None,
    };
    let overlap = grown_table.as_ref().unwrap_or(&table);

    let voi = parameters.report_voi.then(|| VoiErrors::compute(overlap));
    let rand = parameters.report_rand.then(|| RandErrors::compute(overlap));
    let ted = if parameters.report_ted {
        // Excluding gt background leaves every non-background row intact,
        // which is all the label correspondence looks at.
        let ted = TolerantEditDistance::new(parameters.ted_parameters());
        Some(ted.compute(ground_truth, prediction, &table)?)
    } else {
        None
    };

    if let Some(voi) = &voi {
        log::debug!("voi split {:.6}, merge {:.6}", voi.split, voi.merge);
    }
    if let Some(rand) = &rand {
        log::debug!("adapted rand error {:.6}", rand.adapted_rand_error);
    }

    Ok(Report::assemble(parameters, voi, rand, ted))
}

/// A named ground truth / prediction pair.
#[derive(Debug, Clone)]
pub struct VolumePair<'a> {
    /// Name used in reports.
    pub name: String,
    /// Reference labels.
    pub ground_truth: LabelVolume<'a>,
    /// Labels to evaluate.
    pub prediction: LabelVolume<'a>,
}

impl<'a> VolumePair<'a> {
    /// Create a named pair.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ground_truth: LabelVolume<'a>,
        prediction: LabelVolume<'a>,
    ) -> Self {
        Self {
            name: name.into(),
            ground_truth,
            prediction,
        }
    }
}

/// Configuration for an evaluation session.
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    /// Directory for report output (JSON, CSV).
    pub report_dir: Option<PathBuf>,

    /// Parameters for every comparison.
    pub parameters: Parameters,
}

impl EvalConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }
}

/// Builder for [`EvalConfig`].
#[derive(Debug, Default)]
pub struct EvalConfigBuilder {
    report_dir: Option<PathBuf>,
    parameters: Option<Parameters>,
}

impl EvalConfigBuilder {
    /// Set the report output directory.
    #[must_use]
    pub fn report_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(path.into());
        self
    }

    /// Set the comparison parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> EvalConfig {
        EvalConfig {
            report_dir: self.report_dir,
            parameters: self.parameters.unwrap_or_default(),
        }
    }
}

/// Evaluation session for segmentation comparison.
///
/// # Example
///
/// ```rust,no_run
/// use seg_eval::{EvalConfig, EvalSession, LabelVolume, Parameters, Shape, VolumePair};
///
/// let config = EvalConfig::builder()
///     .report_dir("./reports")
///     .parameters(Parameters::builder().from_skeleton(true).build())
///     .build();
/// let session = EvalSession::new(config);
///
/// let shape = Shape::new(16, 64, 64);
/// let gt = LabelVolume::from_fn(shape, |_, _, x| (x / 16) as u64);
/// let pred = LabelVolume::from_fn(shape, |_, _, x| (x / 32) as u64);
///
/// let batch = session.evaluate_batch("run-1", &[VolumePair::new("block-0", gt, pred)])?;
/// session.write_batch_report(&batch)?;
/// # Ok::<(), seg_eval::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct EvalSession {
    config: EvalConfig,
}

impl EvalSession {
    /// Create a new evaluation session.
    #[must_use]
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate a single volume pair.
    pub fn evaluate(
        &self,
        name: &str,
        ground_truth: &LabelVolume<'_>,
        prediction: &LabelVolume<'_>,
    ) -> Result<VolumeReport> {
        let report = create_report(ground_truth, prediction, &self.config.parameters)?;
        Ok(VolumeReport {
            name: name.to_string(),
            shape: ground_truth.shape(),
            report,
        })
    }

    /// Evaluate many pairs in parallel.
    ///
    /// Parameters are validated once. With `num_threads` set, one pool of
    /// that size runs the whole batch. Any failing pair fails the batch.
    pub fn evaluate_batch(&self, name: &str, pairs: &[VolumePair<'_>]) -> Result<BatchReport> {
        let parameters = &self.config.parameters;
        parameters.validate()?;

        let run = || {
            pairs
                .par_iter()
                .map(|pair| -> Result<VolumeReport> {
                    ensure_same_shape(&pair.ground_truth, &pair.prediction)?;
                    log::debug!("evaluating {}", pair.name);
                    let report = compute_report(&pair.ground_truth, &pair.prediction, parameters)?;
                    Ok(VolumeReport {
                        name: pair.name.clone(),
                        shape: pair.ground_truth.shape(),
                        report,
                    })
                })
                .collect::<Result<Vec<_>>>()
        };
        let volumes = match parameters.num_threads {
            Some(threads) => build_pool(threads)?.install(run)?,
            None => run()?,
        };

        log::info!("evaluated {} volume pairs for {}", volumes.len(), name);
        Ok(BatchReport::new(name.to_string(), parameters.clone(), volumes))
    }

    fn report_dir(&self) -> Result<&Path> {
        self.config
            .report_dir
            .as_deref()
            .ok_or_else(|| Error::Report("no report directory configured".to_string()))
    }

    /// Write a volume report as JSON to the configured report directory.
    ///
    /// Returns the path written.
    pub fn write_report(&self, report: &VolumeReport) -> Result<PathBuf> {
        let dir = self.report_dir()?;
        std::fs::create_dir_all(dir)?;

        let json_path = dir.join(format!("{}.json", report.name));
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&json_path, json)?;

        Ok(json_path)
    }

    /// Write a batch report as JSON plus a CSV summary with one row per pair.
    pub fn write_batch_report(&self, report: &BatchReport) -> Result<()> {
        let dir = self.report_dir()?;
        std::fs::create_dir_all(dir)?;

        let json_path = dir.join(format!("{}.json", report.name));
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(json_path, json)?;

        let csv_path = dir.join(format!("{}.csv", report.name));
        Self::write_csv_summary(report, &csv_path)?;

        Ok(())
    }

    /// Write a CSV table of the batch: one row per pair, one column per metric.
    fn write_csv_summary(report: &BatchReport, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        let keys = report.parameters.requested_keys();

        // Header
        let mut header = vec!["volume".to_string(), "shape".to_string()];
        header.extend(keys.iter().map(|k| k.name().to_string()));
        wtr.write_record(&header)?;

        for volume in &report.volumes {
            let mut row = vec![volume.name.clone(), volume.shape.to_string()];
            row.extend(
                keys.iter()
                    .map(|&k| volume.report.get(k).map_or(String::new(), |v| format!("{v:.6}"))),
            );
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }
}
