//! Potential Source Contribution Function.
//!
//! For every cell carrying correlated data:
//!
//! ```text
//! PSCF[k] = w(key) · MIJ[k] / taggedPop
//! ```
//!
//! where `MIJ[k]` counts the tagged endpoints reaching the threshold of pollutant `k` and the
//! weight key is either the tagged population or the number of unique tagged trajectories.

use tracing::{debug, info, warn};

use crate::{thresholds::Threshold, weights::PopulationWeights};

use super::SpatialGrid;

impl SpatialGrid {
    /// Compute the PSCF field.
    ///
    /// Arguments
    /// -----------------
    /// * `thresholds`: one threshold per pollutant, in pollutant order.
    /// * `weights`: population weight table.
    /// * `by_unique`: key the weights by unique tagged trajectory count instead of tagged population.
    ///
    /// Return
    /// ----------
    /// * The number of cells whose PSCF was computed. Cells never tagged, or tagged with data of
    ///   another length than `thresholds`, keep an unallocated PSCF.
    pub fn compute_pscf(
        &mut self,
        thresholds: &[Threshold],
        weights: &PopulationWeights,
        by_unique: bool,
    ) -> usize {
        let mut computed = 0;
        let mut mismatched = 0;

        for idx in 0..self.cells().len() {
            let cell = &mut self.cells_mut()[idx];
            if cell.mij().is_none() {
                continue;
            }
            if let Err(e) = cell.exceedance_counts(thresholds) {
                debug!("PSCF skipped: {e}");
                mismatched += 1;
                continue;
            }

            let tagged = cell.tagged_population();
            let key = if by_unique {
                cell.unique_trajectories(true)
            } else {
                tagged
            };
            let w = weights.lookup(key);
            let values = cell
                .mij()
                .unwrap_or_default()
                .iter()
                .map(|&m| w * m as f64 / tagged as f64)
                .collect();

            self.pscf[idx] = Some(values);
            computed += 1;
        }

        if mismatched > 0 {
            warn!(
                cells = mismatched,
                expected = thresholds.len(),
                "PSCF skipped for cells tagged with a different number of pollutants"
            );
        }
        info!(cells = computed, by_unique, "PSCF computed");
        computed
    }
}
