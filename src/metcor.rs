//! # Metcor: run façade
//!
//! [`Metcor`] wires the pieces of a trajectory statistics run together:
//!
//! 1. **Grid** ([`SpatialGrid`]) – endpoints are inserted one by one with
//!    [`Metcor::insert_point`].
//! 2. **Correlated data** ([`CorrelatedData`]) – loaded once and tagged onto the endpoints by
//!    arrival hour ([`crate::tagging`]).
//! 3. **Engines** – PSCF, CWT, RTWC and QTBA run in any combination, each reading its parameters
//!    from the [`MetcorConfig`] and applying the configured weights.
//! 4. **Products** – raster matrices, histograms, scatter tables and metrics written under an
//!    output directory.
//!
//! ## Output layout
//!
//! ```text
//! <out>/PSCF_MATRICES/<pollutant>.txt
//! <out>/CWT_MATRICES/<pollutant>.txt
//! <out>/RTWC_MATRICES/<pollutant>.txt
//! <out>/QTBA_MATRICES/<pollutant>.txt
//! <out>/HIST_NIJ.txt
//! <out>/HIST_TAGGED_NIJ.txt
//! <out>/HIST_TAGGED_SOURCE.txt
//! <out>/SCATTER_PSCF_NIJ.txt
//! <out>/SCATTER_PSCF_SOURCE.txt
//! <out>/METRICS.txt
//! ```
//!
//! ## Typical usage
//!
//! ```rust,no_run
//! use metcor::geo_point::GeoPoint;
//! use metcor::metcor::Metcor;
//! use metcor::params::{CwtMethod, MetcorConfig};
//!
//! let mut run = Metcor::new(MetcorConfig::default()).unwrap();
//! run.insert_point(GeoPoint::new(284.3, 45.1, "2010050612", "500.0,45.434,-75.676,-3"));
//! run.load_correlated_data("conc.txt").unwrap();
//!
//! run.run_pscf().unwrap();
//! run.run_cwt(CwtMethod::LogSmoothed).unwrap();
//! run.write_pscf("out").unwrap();
//! run.write_cwt("out").unwrap();
//! ```

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    correlated_data::CorrelatedData,
    geo_point::GeoPoint,
    metcor_errors::MetcorError,
    params::{CwtMethod, MetcorConfig},
    spatial_grid::{export::ScatterKey, Field, RtwcReport, SpatialGrid},
    tagging::{tag_grid, TaggingSummary},
    thresholds::{compute_thresholds, Threshold},
};

#[derive(Debug, Clone)]
pub struct Metcor {
    config: MetcorConfig,
    grid: SpatialGrid,
    data: Option<CorrelatedData>,
    thresholds: Option<Vec<Threshold>>,
}

/// Write `lines` to `path`, one per line.
fn write_lines(path: &Path, lines: &[String]) -> Result<(), MetcorError> {
    let mut out = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Tab-delimited table written through `csv`.
fn write_table(path: &Path, records: &[Vec<String>]) -> Result<(), MetcorError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// File name of a pollutant matrix, path separators replaced.
fn matrix_file_name(pollutant: &str) -> String {
    let safe: String = pollutant
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}.txt")
}

impl Metcor {
    /// Create a run with an empty grid.
    ///
    /// Errors
    /// ----------
    /// * [`MetcorError::InvalidParameter`] when `config` fails validation.
    pub fn new(config: MetcorConfig) -> Result<Self, MetcorError> {
        config.validate()?;
        let grid = SpatialGrid::new(config.grid)?;
        Ok(Metcor {
            config,
            grid,
            data: None,
            thresholds: None,
        })
    }

    /// Create a run from a JSON configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, MetcorError> {
        Self::new(MetcorConfig::from_json_file(path)?)
    }

    pub fn config(&self) -> &MetcorConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn correlated_data(&self) -> Option<&CorrelatedData> {
        self.data.as_ref()
    }

    /// Thresholds used by the last [`Metcor::run_pscf`].
    pub fn thresholds(&self) -> Option<&[Threshold]> {
        self.thresholds.as_deref()
    }

    /// Insert one endpoint. Returns `false` when it falls outside the grid.
    pub fn insert_point(&mut self, point: GeoPoint) -> bool {
        self.grid.insert(point)
    }

    /// Insert many endpoints and return how many were stored.
    pub fn insert_points(&mut self, points: impl IntoIterator<Item = GeoPoint>) -> usize {
        points
            .into_iter()
            .map(|p| self.grid.insert(p))
            .filter(|&stored| stored)
            .count()
    }

    /// Read a correlated data file and tag its records onto the endpoints already inserted.
    pub fn load_correlated_data(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<TaggingSummary, MetcorError> {
        let data = CorrelatedData::from_path(path)?;
        Ok(self.attach_correlated_data(data))
    }

    /// Tag already parsed correlated data onto the endpoints.
    pub fn attach_correlated_data(&mut self, data: CorrelatedData) -> TaggingSummary {
        let summary = tag_grid(&mut self.grid, &data, self.config.zone_offset);
        self.data = Some(data);
        summary
    }

    fn pollutants(&self) -> Result<Vec<String>, MetcorError> {
        self.data
            .as_ref()
            .map(|d| d.pollutants().to_vec())
            .ok_or(MetcorError::MissingCorrelatedData)
    }

    /// Derive the thresholds and compute the PSCF field.
    ///
    /// Return
    /// ----------
    /// * The thresholds used, one per pollutant.
    pub fn run_pscf(&mut self) -> Result<&[Threshold], MetcorError> {
        let data = self.data.as_ref().ok_or(MetcorError::MissingCorrelatedData)?;
        let thresholds = compute_thresholds(data, self.config.threshold_method);
        self.grid.compute_pscf(
            &thresholds,
            &self.config.pscf_weights,
            self.config.by_unique_trajectory_count,
        );
        let stored = self.thresholds.insert(thresholds);
        Ok(stored.as_slice())
    }

    /// Compute the CWT field with `method`, then apply the field weights if configured.
    ///
    /// Return
    /// ----------
    /// * The number of cells holding a CWT.
    pub fn run_cwt(&mut self, method: CwtMethod) -> Result<usize, MetcorError> {
        let pollutants = self.pollutants()?;
        let cells = self.grid.compute_cwt(&pollutants, method.is_log());
        if method.is_smoothed() {
            self.grid
                .smooth_cwt(&pollutants, &self.config.smoothing, method.is_log())?;
        }
        if let Some(weights) = &self.config.field_weights {
            self.grid.apply_weighting(Field::Cwt, weights)?;
        }
        info!(?method, cells, "CWT run finished");
        Ok(cells)
    }

    /// [`Metcor::run_cwt`] with the method of the configuration.
    pub fn run_configured_cwt(&mut self) -> Result<usize, MetcorError> {
        self.run_cwt(self.config.cwt_method)
    }

    /// Run the RTWC engine with the configured schedule, then apply the field weights.
    pub fn run_rtwc(&mut self) -> Result<RtwcReport, MetcorError> {
        let pollutants = self.pollutants()?;
        let report = self.grid.run_rtwc(&pollutants, &self.config.rtwc)?;
        if let Some(weights) = &self.config.field_weights {
            self.grid.apply_weighting(Field::Rtwc, weights)?;
        }
        Ok(report)
    }

    /// Compute the QTBA field, then apply the field weights.
    pub fn run_qtba(&mut self) -> Result<usize, MetcorError> {
        let pollutants = self.pollutants()?;
        let cells = self
            .grid
            .compute_qtba(&pollutants, self.config.dispersion_velocity);
        if let Some(weights) = &self.config.field_weights {
            self.grid.apply_weighting(Field::Qtba, weights)?;
        }
        Ok(cells)
    }

    /// Write one raster matrix per pollutant under `<out>/<FIELD>_MATRICES/`.
    ///
    /// Return
    /// ----------
    /// * The paths written.
    pub fn write_field(
        &self,
        field: Field,
        out_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, MetcorError> {
        let pollutants = self.pollutants()?;
        let no_data = self.config.smoothing.no_data;
        let dir = out_dir
            .as_ref()
            .join(format!("{}_MATRICES", field.label()));
        fs::create_dir_all(&dir)?;

        let mut written = Vec::with_capacity(pollutants.len());
        for (k, name) in pollutants.iter().enumerate() {
            let lines = self.grid.raster(field, k, no_data).ok_or_else(|| {
                MetcorError::InvalidParameter("no_data must be negative".into())
            })?;
            let path = dir.join(matrix_file_name(name));
            write_lines(&path, &lines)?;
            written.push(path);
        }
        info!(field = field.label(), dir = %dir.display(), "matrices written");
        Ok(written)
    }

    pub fn write_pscf(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, MetcorError> {
        self.write_field(Field::Pscf, out_dir)
    }

    pub fn write_cwt(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, MetcorError> {
        self.write_field(Field::Cwt, out_dir)
    }

    pub fn write_rtwc(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, MetcorError> {
        self.write_field(Field::Rtwc, out_dir)
    }

    pub fn write_qtba(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, MetcorError> {
        self.write_field(Field::Qtba, out_dir)
    }

    /// Write the population histograms and the PSCF scatter tables.
    pub fn write_histograms(&self, out_dir: impl AsRef<Path>) -> Result<(), MetcorError> {
        let dir = out_dir.as_ref();
        fs::create_dir_all(dir)?;
        let intervals = self.config.histogram_intervals;

        let histograms = [
            ("HIST_NIJ.txt", self.grid.population_histogram(intervals)),
            ("HIST_TAGGED_NIJ.txt", self.grid.tagged_population_histogram(intervals)),
            ("HIST_TAGGED_SOURCE.txt", self.grid.tagged_source_histogram(intervals)),
        ];
        for (file, lines) in histograms {
            if let Some(lines) = lines {
                write_lines(&dir.join(file), &lines)?;
            }
        }

        let pollutants = self.pollutants()?;
        let scatters = [
            ("SCATTER_PSCF_NIJ.txt", ScatterKey::Population),
            ("SCATTER_PSCF_SOURCE.txt", ScatterKey::Sources),
        ];
        for (file, key) in scatters {
            if let Some(records) = self.grid.pscf_scatter(&pollutants, key) {
                write_table(&dir.join(file), &records)?;
            }
        }
        info!(dir = %dir.display(), intervals, "histograms written");
        Ok(())
    }

    /// Write the average tagged population and natural transport blocks to `<out>/METRICS.txt`.
    pub fn write_metrics(&self, out_dir: impl AsRef<Path>) -> Result<PathBuf, MetcorError> {
        let pollutants = self.pollutants()?;
        let dir = out_dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut lines = self.grid.average_tagged_population(&pollutants);
        lines.extend(self.grid.average_transport_potential(&pollutants));
        let path = dir.join("METRICS.txt");
        write_lines(&path, &lines)?;
        Ok(path)
    }
}
