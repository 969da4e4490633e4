//! Concentration-weighted trajectory field and its Savitzky-Golay smoothing.
//!
//! Smoothing order
//! -----------------
//! For each pollutant the valid CWT values are flattened column-major (longitude index outer,
//! latitude index inner), skipping cells without a computed CWT and cells holding the no-data
//! value. The smoothed sequence is mapped back in the same order. A smoothed value is kept only
//! when it lies inside the Student-t confidence interval of the raw value; any other cell is set
//! to no-data, which later CWT recomputations preserve.

use tracing::{debug, info};

use crate::{metcor_errors::MetcorError, params::SmoothingParams, statistics::smooth};

use super::SpatialGrid;

impl SpatialGrid {
    /// Recompute the CWT of every cell with tagged endpoints.
    ///
    /// Return
    /// ----------
    /// * The number of cells updated.
    pub fn compute_cwt(&mut self, pollutants: &[String], log_transform: bool) -> usize {
        let updated = self
            .cells_mut()
            .iter_mut()
            .filter_map(|cell| cell.compute_cwt(pollutants, log_transform))
            .count();
        debug!(cells = updated, log_transform, "CWT computed");
        updated
    }

    /// Indices and raw values of the smoothable CWT entries of pollutant `k`.
    fn smoothable_cwt(&self, k: usize, no_data: f64) -> (Vec<usize>, Vec<f64>) {
        self.cells()
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.cwt_computed())
            .filter_map(|(idx, cell)| cell.cwt()?.get(k).map(|&v| (idx, v)))
            .filter(|(_, v)| *v != no_data)
            .unzip()
    }

    /// Smooth the CWT field of every pollutant.
    ///
    /// Arguments
    /// -----------------
    /// * `pollutants`: pollutant names, in the order of the CWT vectors.
    /// * `params`: filter length, polynomial degree, confidence level and no-data value.
    /// * `log_transform`: whether the CWT was computed from `log10` concentrations. It selects
    ///   the concentrations the confidence interval is built from.
    ///
    /// Return
    /// ----------
    /// * The number of cells set to no-data, or an error when the filter cannot be built.
    pub fn smooth_cwt(
        &mut self,
        pollutants: &[String],
        params: &SmoothingParams,
        log_transform: bool,
    ) -> Result<usize, MetcorError> {
        let mut rejected = 0;

        for (k, name) in pollutants.iter().enumerate() {
            let (indices, raw) = self.smoothable_cwt(k, params.no_data);
            if raw.is_empty() {
                continue;
            }
            let smoothed = smooth(&raw, params.filter_length, params.poly_degree)?;

            for ((idx, raw), smoothed) in indices.into_iter().zip(raw).zip(smoothed) {
                let cell = &mut self.cells_mut()[idx];
                let accepted = cell
                    .uncertainty(params.confidence, k, name, log_transform)
                    .is_some_and(|u| (smoothed - raw).abs() <= u);

                if accepted {
                    cell.set_cwt(k, smoothed);
                } else {
                    cell.set_cwt(k, params.no_data);
                    rejected += 1;
                }
            }
        }

        info!(rejected, "CWT smoothed");
        Ok(rejected)
    }
}
