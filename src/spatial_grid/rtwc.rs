//! # Redistributed concentration-weighted trajectories (RTWC)
//!
//! A CWT smears the concentration measured at the receptor uniformly along every trajectory.
//! RTWC iteratively redistributes that concentration: each trajectory's endpoint concentrations
//! are rescaled by `cellCWT / avg`, where `avg` is the mean CWT over the cells the trajectory
//! crosses, and the CWT is recomputed from the rescaled values.
//!
//! Schedules
//! -----------------
//! * [`RtwcMode::Fixed`] / [`RtwcMode::FixedSmoothed`] run exactly `max_iterations − 1`
//!   redistribution passes after the initial CWT, then finalize every pollutant.
//! * [`RtwcMode::Converging`] / [`RtwcMode::ConvergingSmoothed`] redistribute until the mean CWT
//!   of a pollutant moves by less than `convergence_percent` between two passes. Each pollutant is
//!   finalized independently, the first time it converges. At least one and at most
//!   `max_iterations` redistribution passes run; pollutants still moving after the last one are
//!   finalized as they are.
//!
//! The smoothed schedules smooth the linear CWT after every pass.
//!
//! Finalizing pollutant `k` copies the current CWT entry `k` of every computed cell into the
//! final field. Entries of other pollutants are left as they are.

use tracing::{debug, info};

use crate::{
    constants::TrajectoryIdSet,
    metcor_errors::MetcorError,
    params::{RtwcMode, RtwcParams},
};

use super::SpatialGrid;

/// Outcome of [`SpatialGrid::run_rtwc`].
#[derive(Debug, Clone, PartialEq)]
pub struct RtwcReport {
    pub mode: RtwcMode,
    /// Number of CWT passes, the initial one included.
    pub iterations: usize,
    /// Pass at which each pollutant was finalized.
    pub finalized_at: Vec<usize>,
    /// Pollutants finalized because `max_iterations` was reached rather than by convergence.
    pub forced: Vec<bool>,
    /// Last percent difference of each pollutant, `NaN` when never evaluated.
    pub percent_differences: Vec<f64>,
}

impl RtwcReport {
    fn new(mode: RtwcMode, n: usize) -> Self {
        RtwcReport {
            mode,
            iterations: 1,
            finalized_at: vec![0; n],
            forced: vec![false; n],
            percent_differences: vec![f64::NAN; n],
        }
    }

    /// True when every pollutant converged before the iteration cap.
    pub fn converged(&self) -> bool {
        self.mode.converges() && !self.forced.iter().any(|&f| f)
    }
}

/// Mean of the strictly positive values, `None` when there is none.
fn positive_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| *v > 0.0)
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

impl SpatialGrid {
    /// One redistribution pass over the world trajectory keys.
    ///
    /// See [`SpatialGrid::redistribute_with_ids`].
    pub fn redistribute_concentration(&mut self, pollutants: &[String], no_data: f64) -> usize {
        let ids = self.take_trajectory_ids();
        let rescaled = self.redistribute_with_ids(&ids, pollutants, no_data);
        self.restore_trajectory_ids(ids);
        rescaled
    }

    /// One redistribution pass over the given trajectory keys.
    ///
    /// For each key and pollutant, the average CWT over the cells the trajectory crosses is taken
    /// over entries different from `no_data`. The trajectory is left untouched for that pollutant
    /// when a crossed cell has no CWT, when no entry was counted, or when the sum is not positive.
    /// Otherwise the current concentrations of the trajectory are multiplied, cell by cell, by
    /// `cellCWT / average`. Rescaling compounds over passes; the original values are kept apart.
    ///
    /// Return
    /// ----------
    /// * The number of endpoint values rescaled.
    pub fn redistribute_with_ids(
        &mut self,
        ids: &TrajectoryIdSet,
        pollutants: &[String],
        no_data: f64,
    ) -> usize {
        let mut rescaled = 0;

        for key in ids {
            let cells = self.cells_with_key(key);
            if cells.is_empty() {
                continue;
            }

            for (k, name) in pollutants.iter().enumerate() {
                let cwt_of = |idx: usize| self.cells()[idx].cwt().and_then(|c| c.get(k).copied());
                let values: Option<Vec<(usize, f64)>> = cells
                    .iter()
                    .map(|&idx| cwt_of(idx).map(|v| (idx, v)))
                    .collect();
                let Some(values) = values else {
                    continue;
                };

                let counted: Vec<(usize, f64)> =
                    values.into_iter().filter(|(_, v)| *v != no_data).collect();
                let sum: f64 = counted.iter().map(|(_, v)| v).sum();
                if counted.is_empty() || sum <= 0.0 {
                    continue;
                }
                let avg = sum / counted.len() as f64;

                for (idx, cwt) in counted {
                    rescaled +=
                        self.cells_mut()[idx].multiply_concentration(key, k, name, cwt / avg);
                }
            }
        }
        rescaled
    }

    /// Copy the CWT of every pollutant into the previous-CWT field.
    fn snapshot_cwt(&mut self) {
        for idx in 0..self.cells().len() {
            let cell = &self.cells()[idx];
            self.previous_cwt[idx] = if cell.cwt_computed() {
                cell.cwt().map(<[f64]>::to_vec)
            } else {
                None
            };
        }
    }

    /// Copy CWT entry `k` of every computed cell into the final field.
    fn finalize_pollutant(&mut self, k: usize, n_pollutants: usize) {
        for idx in 0..self.cells().len() {
            let cell = &self.cells()[idx];
            if !cell.cwt_computed() {
                continue;
            }
            let Some(v) = cell.cwt().and_then(|c| c.get(k).copied()) else {
                continue;
            };
            let fin = self.final_cwt[idx].get_or_insert_with(|| vec![0.0; n_pollutants]);
            if let Some(slot) = fin.get_mut(k) {
                *slot = v;
            }
        }
    }

    /// Relative change (percent) of the mean positive CWT of pollutant `k` since the snapshot.
    ///
    /// `NaN` when either field holds no positive value.
    pub fn percent_difference(&self, k: usize) -> f64 {
        let new = positive_mean(
            self.cells()
                .iter()
                .filter(|c| c.cwt_computed())
                .filter_map(|c| c.cwt().and_then(|v| v.get(k).copied())),
        );
        let old = positive_mean(
            self.previous_cwt
                .iter()
                .filter_map(|v| v.as_ref().and_then(|v| v.get(k).copied())),
        );
        match (new, old) {
            (Some(new), Some(old)) => (new - old).abs() * 100.0 / old,
            _ => f64::NAN,
        }
    }

    /// One redistribution pass followed by a CWT recomputation and, if requested, smoothing.
    fn rtwc_pass(&mut self, pollutants: &[String], params: &RtwcParams) -> Result<(), MetcorError> {
        let no_data = params.smoothing.no_data;
        self.redistribute_concentration(pollutants, no_data);
        self.compute_cwt(pollutants, false);
        if params.mode.smooths() {
            self.smooth_cwt(pollutants, &params.smoothing, false)?;
        }
        Ok(())
    }

    /// Run the RTWC engine and fill the final CWT field.
    ///
    /// Arguments
    /// -----------------
    /// * `pollutants`: pollutant names, in the order of the per-pollutant vectors.
    /// * `params`: schedule, convergence threshold, iteration cap and smoothing parameters.
    ///
    /// Return
    /// ----------
    /// * An [`RtwcReport`], or an error from parameter validation or smoothing.
    ///
    /// See also
    /// ------------
    /// * [`SpatialGrid::redistribute_concentration`] – One redistribution pass.
    /// * [`SpatialGrid::percent_difference`] – Convergence criterion.
    pub fn run_rtwc(
        &mut self,
        pollutants: &[String],
        params: &RtwcParams,
    ) -> Result<RtwcReport, MetcorError> {
        params.validate()?;
        let n = pollutants.len();
        let mut report = RtwcReport::new(params.mode, n);

        self.compute_cwt(pollutants, false);

        if !params.mode.converges() {
            for _ in 1..params.max_iterations {
                self.rtwc_pass(pollutants, params)?;
                report.iterations += 1;
                debug!(iteration = report.iterations, "RTWC pass");
            }
            for k in 0..n {
                self.finalize_pollutant(k, n);
                report.finalized_at[k] = report.iterations;
            }
        } else {
            let mut finalized = vec![false; n];
            let mut passes = 0;
            while finalized.iter().any(|f| !f) && passes < params.max_iterations {
                self.snapshot_cwt();
                self.rtwc_pass(pollutants, params)?;
                passes += 1;
                report.iterations += 1;

                for k in 0..n {
                    if finalized[k] {
                        continue;
                    }
                    let pd = self.percent_difference(k);
                    report.percent_differences[k] = pd;
                    debug!(
                        iteration = report.iterations,
                        pollutant = %pollutants[k],
                        percent_difference = pd,
                        "RTWC convergence"
                    );
                    if (0.0..=params.convergence_percent).contains(&pd) {
                        self.finalize_pollutant(k, n);
                        finalized[k] = true;
                        report.finalized_at[k] = report.iterations;
                    }
                }
            }

            for k in 0..n {
                if finalized[k] {
                    continue;
                }
                self.finalize_pollutant(k, n);
                report.finalized_at[k] = report.iterations;
                report.forced[k] = true;
            }
        }

        info!(
            mode = params.mode.code(),
            iterations = report.iterations,
            "RTWC finished"
        );
        Ok(report)
    }
}
