//! # Spatial grid
//!
//! The [`SpatialGrid`] is the latitude/longitude lattice of [`GridCell`]s into which trajectory
//! endpoints are binned. It owns:
//!
//! * the cells, stored column-major (`i` longitude outer, `j` latitude inner),
//! * the per-pollutant **PSCF**, **previous CWT**, **final CWT** (RTWC) and **QTBA** fields, one
//!   `Option<Vec<f64>>` per cell (`None` means the cell was never computed),
//! * the world-wide set of composite trajectory keys and receptors seen by [`SpatialGrid::insert`].
//!
//! The current CWT field is held by the cells themselves.
//!
//! Index mapping
//! -----------------
//! Longitudes span `[0, lon_extent)` with `i = ⌊lon / dLon⌋`.
//!
//! The northern band spans `[0, min(90, lat_extent))` with `j = ⌊lat / dLat⌋`. When
//! `lat_extent > 90`, a southern band covers `[90 − lat_extent, 0)` and is stacked **above** the
//! northern rows: `j = north_rows + ⌈−lat / dLat⌉ − 1`. Anything else is out of bounds.
//!
//! Engines
//! -----------------
//! The field engines live in submodules, each adding an `impl SpatialGrid` block:
//!
//! * [`pscf`] – exceedance probability,
//! * [`cwt`] – concentration-weighted trajectory and its smoothing,
//! * [`rtwc`] – iterative redistribution of the CWT,
//! * [`qtba`] – natural transport potential weighting,
//! * [`weighting`] – post-weighting of the continuous fields,
//! * [`export`], [`histogram`], [`metrics`] – text products.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::{
    constants::{Degree, TrajectoryIdSet, TrajectoryKey, NORTH_POLE_LAT},
    geo_point::{Concentration, GeoPoint},
    grid_cell::GridCell,
    metcor_errors::MetcorError,
    params::GridParams,
};

pub mod cwt;
pub mod export;
pub mod histogram;
pub mod metrics;
pub mod pscf;
pub mod qtba;
pub mod rtwc;
pub mod weighting;

pub use rtwc::RtwcReport;

/// Per-cell, per-pollutant field storage.
pub(crate) type CellField = Vec<Option<Vec<f64>>>;

/// Fields held by the grid, selectable for export and weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Pscf,
    Cwt,
    Rtwc,
    Qtba,
}

impl Field {
    /// Name used for output folders, e.g. `PSCF_MATRICES`.
    pub fn label(self) -> &'static str {
        match self {
            Field::Pscf => "PSCF",
            Field::Cwt => "CWT",
            Field::Rtwc => "RTWC",
            Field::Qtba => "QTBA",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    params: GridParams,
    ncols: usize,
    north_rows: usize,
    nrows: usize,
    cells: Vec<GridCell>,
    pub(crate) pscf: CellField,
    pub(crate) previous_cwt: CellField,
    pub(crate) final_cwt: CellField,
    pub(crate) qtba: CellField,
    trajectory_ids: TrajectoryIdSet,
    receptors: HashSet<String, ahash::RandomState>,
    /// Trajectory id → cells holding at least one of its endpoints.
    id_cells: HashMap<String, BTreeSet<usize>, ahash::RandomState>,
    /// Composite key → cells holding at least one of its endpoints.
    key_cells: HashMap<TrajectoryKey, BTreeSet<usize>, ahash::RandomState>,
}

impl SpatialGrid {
    /// Build an empty grid.
    ///
    /// Arguments
    /// -----------------
    /// * `params`: extent and spacing; validated before allocation.
    ///
    /// Return
    /// ----------
    /// * A grid of `ncols × nrows` empty cells whose corners are the minimum longitude and
    ///   latitude of each bin, or [`MetcorError::InvalidParameter`].
    pub fn new(params: GridParams) -> Result<Self, MetcorError> {
        params.validate()?;
        let ncols = params.ncols();
        let north_rows = params.north_rows();
        let nrows = params.nrows();

        let mut cells = Vec::with_capacity(ncols * nrows);
        for i in 0..ncols {
            for j in 0..nrows {
                let lon = i as f64 * params.lon_spacing;
                let lat = if j < north_rows {
                    j as f64 * params.lat_spacing
                } else {
                    -((j - north_rows + 1) as f64) * params.lat_spacing
                };
                cells.push(GridCell::new(lon, lat));
            }
        }

        let n = cells.len();
        info!(ncols, nrows, "spatial grid allocated");
        Ok(SpatialGrid {
            params,
            ncols,
            north_rows,
            nrows,
            cells,
            pscf: vec![None; n],
            previous_cwt: vec![None; n],
            final_cwt: vec![None; n],
            qtba: vec![None; n],
            trajectory_ids: TrajectoryIdSet::default(),
            receptors: HashSet::default(),
            id_cells: HashMap::default(),
            key_cells: HashMap::default(),
        })
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of rows of the northern band; southern rows follow.
    pub fn north_rows(&self) -> usize {
        self.north_rows
    }

    #[inline]
    pub(crate) fn index(&self, i: usize, j: usize) -> usize {
        i * self.nrows + j
    }

    /// Cell `(i, j)`, `None` outside the lattice.
    pub fn cell(&self, i: usize, j: usize) -> Option<&GridCell> {
        if i < self.ncols && j < self.nrows {
            self.cells.get(self.index(i, j))
        } else {
            None
        }
    }

    /// All cells in flattening order, `i` outer and `j` inner.
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [GridCell] {
        &mut self.cells
    }

    /// `(i, j)` indices of the cell containing `(lon, lat)`.
    ///
    /// Errors
    /// ----------
    /// * [`MetcorError::OutOfBounds`] outside the configured extent.
    pub fn locate(&self, lon: Degree, lat: Degree) -> Result<(usize, usize), MetcorError> {
        let out = || MetcorError::OutOfBounds { lon, lat };
        let p = &self.params;

        if !(0.0..p.lon_extent).contains(&lon) {
            return Err(out());
        }
        let i = ((lon / p.lon_spacing).floor() as usize).min(self.ncols - 1);

        let north_top = p.lat_extent.min(NORTH_POLE_LAT);
        let j = if (0.0..north_top).contains(&lat) {
            ((lat / p.lat_spacing).floor() as usize).min(self.north_rows - 1)
        } else if p.lat_extent > NORTH_POLE_LAT && (NORTH_POLE_LAT - p.lat_extent..0.0).contains(&lat)
        {
            let band = ((-lat / p.lat_spacing).ceil() as usize).max(1);
            (self.north_rows + band - 1).min(self.nrows - 1)
        } else {
            return Err(out());
        };
        Ok((i, j))
    }

    /// Place `point` in its cell.
    ///
    /// The composite trajectory key and the receptor of the point are recorded in the world sets
    /// on every call, including for points that fall outside the grid.
    ///
    /// Return
    /// ----------
    /// * `true` when the point was stored, `false` when it is out of bounds.
    pub fn insert(&mut self, point: GeoPoint) -> bool {
        let key = point.trajectory_key();
        if let Some(key) = &key {
            self.trajectory_ids.insert(key.clone());
        }
        if let Some(receptor) = point.receptor() {
            self.receptors.insert(receptor.to_ascii_lowercase());
        }

        match self.locate(point.lon(), point.lat()) {
            Ok((i, j)) => {
                let idx = self.index(i, j);
                if let Some(id) = point.trajectory_id() {
                    self.id_cells.entry(id.to_string()).or_default().insert(idx);
                }
                if let Some(key) = key {
                    self.key_cells.entry(key).or_default().insert(idx);
                }
                self.cells[idx].add_point(point);
                true
            }
            Err(e) => {
                debug!("endpoint dropped: {e}");
                false
            }
        }
    }

    /// Attach correlated data to every endpoint of `trajectory_id` arriving at the given receptor.
    ///
    /// Return
    /// ----------
    /// * The number of endpoints tagged over the whole grid.
    pub fn attach_data(
        &mut self,
        trajectory_id: &str,
        data: &[Concentration],
        receptor_lat: &str,
        receptor_lon: &str,
    ) -> usize {
        let Some(cells) = self.id_cells.get(trajectory_id) else {
            return 0;
        };
        cells
            .iter()
            .map(|&idx| {
                self.cells[idx].attach_data(trajectory_id, data, receptor_lat, receptor_lon)
            })
            .sum()
    }

    /// World-wide set of composite trajectory keys.
    pub fn trajectory_ids(&self) -> &TrajectoryIdSet {
        &self.trajectory_ids
    }

    pub(crate) fn take_trajectory_ids(&mut self) -> TrajectoryIdSet {
        std::mem::take(&mut self.trajectory_ids)
    }

    pub(crate) fn restore_trajectory_ids(&mut self, ids: TrajectoryIdSet) {
        self.trajectory_ids = ids;
    }

    /// Cells holding endpoints of the composite key `key`, as flat indices.
    /// Only cells where the key carries correlated data are returned.
    pub(crate) fn cells_with_key(&self, key: &str) -> Vec<usize> {
        self.key_cells
            .get(key)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&idx| self.cells[idx].contains_trajectory(key))
            .collect()
    }

    /// Number of distinct receptors seen by [`SpatialGrid::insert`].
    pub fn receptor_count(&self) -> usize {
        self.receptors.len()
    }

    /// Number of endpoints stored in the grid.
    pub fn total_population(&self) -> usize {
        self.cells.iter().map(GridCell::population).sum()
    }

    pub fn max_population(&self) -> usize {
        self.cells.iter().map(GridCell::population).max().unwrap_or(0)
    }

    pub fn max_tagged_population(&self) -> usize {
        self.cells
            .iter()
            .map(GridCell::tagged_population)
            .max()
            .unwrap_or(0)
    }

    pub fn max_tagged_sources(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.unique_trajectories(true))
            .max()
            .unwrap_or(0)
    }

    /// Value of pollutant `k` of `field` at flat index `idx`, `None` where unallocated.
    pub(crate) fn field_value(&self, field: Field, idx: usize, k: usize) -> Option<f64> {
        let values = match field {
            Field::Pscf => self.pscf[idx].as_deref(),
            Field::Cwt => {
                let cell = &self.cells[idx];
                if cell.cwt_computed() {
                    cell.cwt()
                } else {
                    None
                }
            }
            Field::Rtwc => self.final_cwt[idx].as_deref(),
            Field::Qtba => self.qtba[idx].as_deref(),
        };
        values.and_then(|v| v.get(k).copied())
    }

    /// Field value of pollutant `k` in cell `(i, j)`.
    pub fn value(&self, field: Field, i: usize, j: usize, k: usize) -> Option<f64> {
        self.cell(i, j)?;
        self.field_value(field, self.index(i, j), k)
    }
}
