//! # MetCor
//!
//! Trajectory statistics for atmospheric source apportionment.
//!
//! Back-trajectory endpoints are binned into a latitude/longitude [`SpatialGrid`], tagged with
//! measured pollutant concentrations by arrival hour, and turned into per-cell fields that point
//! at the likely source regions:
//!
//! * **PSCF** – Potential Source Contribution Function,
//! * **CWT** – Concentration-Weighted Trajectory, optionally log-averaged and smoothed,
//! * **RTWC** – redistributed CWT, iterated to convergence,
//! * **QTBA** – Quantitative Transport Bias Analysis, weighted by a natural transport potential.
//!
//! The [`Metcor`](crate::metcor::Metcor) façade drives a whole run from a
//! [`MetcorConfig`](crate::params::MetcorConfig) and writes the products to disk.
//!
//! The library logs through `tracing` and installs no subscriber.

pub mod constants;
pub mod correlated_data;
pub mod geo_point;
pub mod grid_cell;
pub mod metcor;
pub mod metcor_errors;
pub mod params;
pub mod spatial_grid;
pub mod statistics;
pub mod tagging;
pub mod thresholds;
pub mod weights;

pub use spatial_grid::SpatialGrid;
