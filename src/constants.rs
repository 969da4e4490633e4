//! # Constants and type definitions for MetCor
//!
//! This module centralizes the **numerical constants**, **geodetic parameters**, and **common type
//! definitions** used throughout the `metcor` library.
//!
//! ## Overview
//!
//! - Earth radius and angular conversions used by the great-circle distance
//! - Tolerances and sentinels of the trajectory statistics engines
//! - Core type aliases (angles, durations, trajectory keys)
//! - Container types for pollutant names and trajectory id sets
//!
//! These definitions are shared by the grid model, the field engines and the
//! correlated data layer.

use std::collections::HashSet;

// -------------------------------------------------------------------------------------------------
// Geodetic constants
// -------------------------------------------------------------------------------------------------

/// Equatorial Earth radius in kilometers, as used by the QTBA distance kernel
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.1369;

/// π / 360, half-angle conversion for the haversine terms
pub const PI_360: f64 = std::f64::consts::PI / 360.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Latitude of the North Pole; the northern hemisphere band ends here
pub const NORTH_POLE_LAT: f64 = 90.0;

// -------------------------------------------------------------------------------------------------
// Numerical tolerances and sentinels
// -------------------------------------------------------------------------------------------------

/// Bisection step below which the Student-t quantile search stops
pub const STUDENT_T_TOLERANCE: f64 = 1e-6;

/// Endpoints closer than this distance (km) to their receptor are ignored by QTBA
pub const RECEPTOR_DISTANCE_EPS: f64 = 1e-9;

/// Natural transport potential returned for a zero time lag
pub const ZERO_LAG_TRANSPORT_POTENTIAL: f64 = 1e9;

/// Value returned by QTBA when a cell carries no usable receptor contribution
pub const QTBA_NO_DATA: f64 = -1.0;

/// Default no-data sentinel of the CWT/RTWC/QTBA fields. Must stay negative.
pub const DEFAULT_NO_DATA: f64 = -1.0;

/// Scatter value written for a cell without computed PSCF
pub const SCATTER_NO_DATA: f64 = -1.0;

/// Weight returned by a weight table when no range matches
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Minutes from which a correlated data timestamp is rounded up to the next hour
pub const ROUND_UP_MINUTES: u8 = 30;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;

/// Distance in kilometers
pub type Kilometer = f64;

/// Time lag in hours
pub type Hour = f64;

/// Dispersion velocity in kilometers per hour
pub type KmPerHour = f64;

/// Composite trajectory key: trajectory id followed by the auxiliary tag without its lag component
pub type TrajectoryKey = String;

/// World-wide set of composite trajectory keys used by the RTWC redistribution
pub type TrajectoryIdSet = HashSet<TrajectoryKey, ahash::RandomState>;

/// Ordered pollutant names; the index of a name is the index in every per-pollutant vector
pub type PollutantNames = Vec<String>;
