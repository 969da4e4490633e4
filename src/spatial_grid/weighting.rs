//! Post-weighting of the continuous fields.
//!
//! Every allocated value is multiplied by the weight looked up for its cell. The key is the tagged
//! population for the CWT and RTWC fields and the natural transport sum of the pollutant for QTBA.
//! Weighting is applied in place: applying a table twice multiplies by `w²`.

use tracing::info;

use crate::{metcor_errors::MetcorError, weights::ContinuousWeights};

use super::{Field, SpatialGrid};

impl SpatialGrid {
    /// Weight `field` with `table`.
    ///
    /// Return
    /// ----------
    /// * The number of cells weighted, or [`MetcorError::InvalidParameter`] for [`Field::Pscf`],
    ///   which is weighted by population at computation time.
    pub fn apply_weighting(
        &mut self,
        field: Field,
        table: &ContinuousWeights,
    ) -> Result<usize, MetcorError> {
        if field == Field::Pscf {
            return Err(MetcorError::InvalidParameter(
                "PSCF is weighted by population weights".into(),
            ));
        }
        let mut weighted = 0;

        for idx in 0..self.cells().len() {
            let tagged = self.cells()[idx].tagged_population() as f64;
            match field {
                Field::Pscf => continue,
                Field::Cwt => {
                    let cell = &mut self.cells_mut()[idx];
                    if !cell.cwt_computed() {
                        continue;
                    }
                    let w = table.lookup(tagged);
                    cell.scale_cwt(|_| w);
                }
                Field::Rtwc => {
                    let Some(values) = self.final_cwt[idx].as_mut() else {
                        continue;
                    };
                    let w = table.lookup(tagged);
                    values.iter_mut().for_each(|v| *v *= w);
                }
                Field::Qtba => {
                    let cell = &self.cells()[idx];
                    let weights: Vec<f64> = match &self.qtba[idx] {
                        Some(values) => (0..values.len())
                            .map(|k| table.lookup(cell.transport_sum(k)))
                            .collect(),
                        None => continue,
                    };
                    if let Some(values) = self.qtba[idx].as_mut() {
                        values.iter_mut().zip(weights).for_each(|(v, w)| *v *= w);
                    }
                }
            }
            weighted += 1;
        }

        info!(field = field.label(), cells = weighted, "field weighted");
        Ok(weighted)
    }
}
