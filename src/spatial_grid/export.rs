//! Text products of the grid: ESRI-style raster matrices and PSCF scatter tables.
//!
//! Raster layout
//! -----------------
//! ```text
//! ncols         360
//! nrows         90
//! xllcorner     0.000
//! yllcorner     0.000
//! cellsize      1.000
//! nodata_value  -1.000
//! <row of the northernmost band>
//! ...
//! <row of the equatorial band>
//! <first southern row>
//! ...
//! ```
//!
//! Rows hold one tab-separated value per longitude column, formatted with three decimals.
//! Unallocated cells are written with the no-data value.

use crate::constants::SCATTER_NO_DATA;

use super::{Field, SpatialGrid};

/// Grouping key of the PSCF scatter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterKey {
    /// Tagged population of the cell (`NIJ` column).
    Population,
    /// Number of unique tagged trajectories of the cell (`SourceID` column).
    Sources,
}

impl ScatterKey {
    fn header(self) -> &'static str {
        match self {
            ScatterKey::Population => "NIJ",
            ScatterKey::Sources => "SourceID",
        }
    }
}

impl SpatialGrid {
    fn raster_row(&self, field: Field, j: usize, k: usize, no_data: f64) -> String {
        (0..self.ncols())
            .map(|i| {
                let v = self.field_value(field, self.index(i, j), k).unwrap_or(no_data);
                format!("{v:.3}")
            })
            .collect::<Vec<_>>()
            .join("\t")
    }

    /// Raster matrix of pollutant `k` of `field`, one string per line.
    ///
    /// Return
    /// ----------
    /// * The header lines followed by the northern rows, northernmost first, then the southern
    ///   rows from the equator southward. `None` when `no_data` is not negative.
    pub fn raster(&self, field: Field, k: usize, no_data: f64) -> Option<Vec<String>> {
        if no_data >= 0.0 || no_data.is_nan() {
            return None;
        }
        let p = self.params();
        let south_rows = self.nrows() - self.north_rows();

        let mut lines = vec![
            format!("ncols\t{}", self.ncols()),
            format!("nrows\t{}", self.nrows()),
            format!("xllcorner\t{:.3}", 0.0),
            format!("yllcorner\t{:.3}", 0.0 - south_rows as f64 * p.lat_spacing),
            format!("cellsize\t{:.3}", p.lon_spacing),
            format!("nodata_value\t{no_data:.3}"),
        ];
        lines.extend(
            (0..self.north_rows())
                .rev()
                .chain(self.north_rows()..self.nrows())
                .map(|j| self.raster_row(field, j, k, no_data)),
        );
        Some(lines)
    }

    /// PSCF scatter table: one record per cell, `key` value followed by the PSCF of every
    /// pollutant at full precision, or `-1` for cells without PSCF.
    ///
    /// Return
    /// ----------
    /// * Header record first. `None` without pollutants.
    pub fn pscf_scatter(&self, pollutants: &[String], key: ScatterKey) -> Option<Vec<Vec<String>>> {
        if pollutants.is_empty() {
            return None;
        }

        let mut records = Vec::with_capacity(self.cells().len() + 1);
        records.push(
            std::iter::once(key.header().to_string())
                .chain(pollutants.iter().cloned())
                .collect(),
        );

        for (idx, cell) in self.cells().iter().enumerate() {
            let n = match key {
                ScatterKey::Population => cell.tagged_population(),
                ScatterKey::Sources => cell.unique_trajectories(true),
            };
            let mut record = vec![n.to_string()];
            record.extend((0..pollutants.len()).map(|k| match &self.pscf[idx] {
                Some(values) => values.get(k).copied().unwrap_or(SCATTER_NO_DATA).to_string(),
                None => SCATTER_NO_DATA.to_string(),
            }));
            records.push(record);
        }
        Some(records)
    }
}
