//! # Run configuration
//!
//! This module groups every tunable parameter of a MetCor run:
//!
//! * [`GridParams`] – extent and spacing of the latitude/longitude lattice,
//! * [`SmoothingParams`] – Savitzky-Golay filter and confidence interval used on CWT fields,
//! * [`RtwcParams`] – redistribution mode and convergence control,
//! * [`CwtMethod`] – linear or log averaging, with or without smoothing,
//! * [`MetcorConfig`] – the whole run, loadable from a JSON file.
//!
//! Every params struct has sensible defaults, a fluent builder whose `build()` validates the
//! values, and an alternate `{:#}` [`Display`](fmt::Display) that renders an aligned table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use metcor::params::{RtwcMode, RtwcParams, SmoothingParams};
//!
//! let smoothing = SmoothingParams::builder()
//!     .filter_length(7)
//!     .poly_degree(2)
//!     .build()
//!     .unwrap();
//!
//! let rtwc = RtwcParams::builder()
//!     .mode(RtwcMode::ConvergingSmoothed)
//!     .convergence_percent(0.5)
//!     .smoothing(smoothing)
//!     .build()
//!     .unwrap();
//!
//! println!("{rtwc:#}");
//! ```

use std::cmp::Ordering::{Equal, Greater};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{Degree, KmPerHour, DEFAULT_NO_DATA, NORTH_POLE_LAT},
    metcor_errors::MetcorError,
    thresholds::ThresholdMethod,
    weights::{ContinuousWeights, PopulationWeights},
};

/// Width reserved for `name = value` in the alternate display.
const PARAM_COL: usize = 50;

/// Return true iff x > 0.0 and comparable (i.e., not NaN).
#[inline]
fn gt0(x: f64) -> bool {
    x.partial_cmp(&0.0) == Some(Greater)
}

/// Return true iff x >= 0.0 and comparable (i.e., not NaN).
#[inline]
fn ge0(x: f64) -> bool {
    matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
}

fn invalid(msg: &str) -> MetcorError {
    MetcorError::InvalidParameter(msg.into())
}

/// Writes one aligned `name = value   # comment` row.
macro_rules! line {
    ($f:expr, $fmt:expr, $val:expr, $comment:expr) => {{
        let s = format!($fmt, $val);
        let pad = if s.len() < PARAM_COL {
            " ".repeat(PARAM_COL - s.len())
        } else {
            " ".to_string()
        };
        writeln!($f, "  {}{}# {}", s, pad, $comment)
    }};
}

// -------------------------------------------------------------------------------------------------
// Grid
// -------------------------------------------------------------------------------------------------

/// Extent and spacing of the spatial grid.
///
/// The longitude band always starts at 0° and the latitude band at the equator. A latitude extent
/// above 90° adds a southern band of `lat_extent − 90` degrees below the equator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub lon_extent: Degree,
    pub lat_extent: Degree,
    pub lon_spacing: Degree,
    pub lat_spacing: Degree,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams {
            lon_extent: 360.0,
            lat_extent: 90.0,
            lon_spacing: 1.0,
            lat_spacing: 1.0,
        }
    }
}

impl GridParams {
    pub fn builder() -> GridParamsBuilder {
        GridParamsBuilder::new()
    }

    /// Number of longitude columns.
    pub fn ncols(&self) -> usize {
        (self.lon_extent / self.lon_spacing).ceil() as usize
    }

    /// Number of latitude rows in the northern band.
    pub fn north_rows(&self) -> usize {
        (self.lat_extent.min(NORTH_POLE_LAT) / self.lat_spacing).ceil() as usize
    }

    /// Number of latitude rows in the southern band, zero unless `lat_extent > 90`.
    pub fn south_rows(&self) -> usize {
        ((self.lat_extent - NORTH_POLE_LAT).max(0.0) / self.lat_spacing).ceil() as usize
    }

    pub fn nrows(&self) -> usize {
        self.north_rows() + self.south_rows()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GridParamsBuilder {
    params: GridParams,
}

impl GridParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn lon_extent(mut self, v: Degree) -> Self {
        self.params.lon_extent = v;
        self
    }
    pub fn lat_extent(mut self, v: Degree) -> Self {
        self.params.lat_extent = v;
        self
    }
    pub fn lon_spacing(mut self, v: Degree) -> Self {
        self.params.lon_spacing = v;
        self
    }
    pub fn lat_spacing(mut self, v: Degree) -> Self {
        self.params.lat_spacing = v;
        self
    }

    /// Validate and produce a [`GridParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `0 < lon_extent ≤ 360`
    /// * `0 < lat_extent ≤ 180`
    /// * `lon_spacing > 0`, `lat_spacing > 0`
    pub fn build(self) -> Result<GridParams, MetcorError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl GridParams {
    pub(crate) fn validate(&self) -> Result<(), MetcorError> {
        if !gt0(self.lon_extent) || self.lon_extent > 360.0 {
            return Err(invalid("lon_extent must be in (0, 360]"));
        }
        if !gt0(self.lat_extent) || self.lat_extent > 2.0 * NORTH_POLE_LAT {
            return Err(invalid("lat_extent must be in (0, 180]"));
        }
        if !gt0(self.lon_spacing) || !gt0(self.lat_spacing) {
            return Err(invalid("grid spacings must be > 0"));
        }
        Ok(())
    }
}

impl fmt::Display for GridParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Spatial Grid Parameters")?;
            writeln!(f, "-----------------------")?;
            line!(f, "lon_extent  = {:.3}°", self.lon_extent, "Longitude band starting at 0°")?;
            line!(f, "lat_extent  = {:.3}°", self.lat_extent, "Latitude band, > 90° adds the south")?;
            line!(f, "lon_spacing = {:.3}°", self.lon_spacing, "Cell width")?;
            line!(f, "lat_spacing = {:.3}°", self.lat_spacing, "Cell height")?;
            line!(f, "grid        = {}", format!("{} x {}", self.ncols(), self.nrows()), "Columns x rows")
        } else {
            write!(
                f,
                "GridParams(extent={}x{}°, spacing={}x{}°)",
                self.lon_extent, self.lat_extent, self.lon_spacing, self.lat_spacing
            )
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Smoothing
// -------------------------------------------------------------------------------------------------

/// Savitzky-Golay smoothing of a CWT field and the acceptance interval of the smoothed values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Number of samples in the filter window.
    pub filter_length: usize,
    /// Degree of the fitted polynomial, below `filter_length`.
    pub poly_degree: usize,
    /// Confidence level of the Student-t interval, in `(0, 1)`.
    pub confidence: f64,
    /// Value written in cells whose smoothed value is rejected. Must be negative.
    pub no_data: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        SmoothingParams {
            filter_length: 11,
            poly_degree: 4,
            confidence: 0.95,
            no_data: DEFAULT_NO_DATA,
        }
    }
}

impl SmoothingParams {
    pub fn builder() -> SmoothingParamsBuilder {
        SmoothingParamsBuilder::new()
    }

    pub(crate) fn validate(&self) -> Result<(), MetcorError> {
        if self.filter_length == 0 {
            return Err(invalid("filter_length must be >= 1"));
        }
        if self.poly_degree >= self.filter_length {
            return Err(invalid("poly_degree must be < filter_length"));
        }
        if !gt0(self.confidence) || self.confidence >= 1.0 {
            return Err(invalid("confidence must be in (0, 1)"));
        }
        if ge0(self.no_data) || self.no_data.is_nan() {
            return Err(invalid("no_data must be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmoothingParamsBuilder {
    params: SmoothingParams,
}

impl SmoothingParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn filter_length(mut self, v: usize) -> Self {
        self.params.filter_length = v;
        self
    }
    pub fn poly_degree(mut self, v: usize) -> Self {
        self.params.poly_degree = v;
        self
    }
    pub fn confidence(mut self, v: f64) -> Self {
        self.params.confidence = v;
        self
    }
    pub fn no_data(mut self, v: f64) -> Self {
        self.params.no_data = v;
        self
    }

    /// Validate and produce a [`SmoothingParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `filter_length ≥ 1` and `poly_degree < filter_length`
    /// * `0 < confidence < 1`
    /// * `no_data < 0`, so that it never collides with a concentration
    pub fn build(self) -> Result<SmoothingParams, MetcorError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl fmt::Display for SmoothingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Smoothing Parameters")?;
            writeln!(f, "--------------------")?;
            line!(f, "filter_length = {}", self.filter_length, "Savitzky-Golay window")?;
            line!(f, "poly_degree   = {}", self.poly_degree, "Fitted polynomial degree")?;
            line!(f, "confidence    = {:.3}", self.confidence, "Student-t acceptance level")?;
            line!(f, "no_data       = {:.3}", self.no_data, "Rejected cell value")
        } else {
            write!(
                f,
                "SmoothingParams(L={}, degree={}, confidence={:.2}, no_data={})",
                self.filter_length, self.poly_degree, self.confidence, self.no_data
            )
        }
    }
}

// -------------------------------------------------------------------------------------------------
// CWT / RTWC
// -------------------------------------------------------------------------------------------------

/// How the CWT field is averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CwtMethod {
    #[default]
    Linear,
    Log,
    LinearSmoothed,
    LogSmoothed,
}

impl CwtMethod {
    /// Numeric method code, `1` to `4`.
    pub fn from_code(code: u8) -> Result<Self, MetcorError> {
        match code {
            1 => Ok(CwtMethod::Linear),
            2 => Ok(CwtMethod::Log),
            3 => Ok(CwtMethod::LinearSmoothed),
            4 => Ok(CwtMethod::LogSmoothed),
            _ => Err(MetcorError::InvalidParameter(format!(
                "CWT method must be 1 to 4, got {code}"
            ))),
        }
    }

    pub fn is_log(self) -> bool {
        matches!(self, CwtMethod::Log | CwtMethod::LogSmoothed)
    }

    pub fn is_smoothed(self) -> bool {
        matches!(self, CwtMethod::LinearSmoothed | CwtMethod::LogSmoothed)
    }
}

/// Redistribution schedule of the RTWC engine.
///
/// | Mode                   | Code | Stop rule                 | Smoothing |
/// |------------------------|------|---------------------------|-----------|
/// | `Fixed`                | 1    | `max_iterations`          | no        |
/// | `Converging`           | 2    | percent difference        | no        |
/// | `ConvergingSmoothed`   | 3    | percent difference        | yes       |
/// | `FixedSmoothed`        | 4    | `max_iterations`          | yes       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RtwcMode {
    #[default]
    Fixed,
    Converging,
    ConvergingSmoothed,
    FixedSmoothed,
}

impl RtwcMode {
    pub fn from_code(code: u8) -> Result<Self, MetcorError> {
        match code {
            1 => Ok(RtwcMode::Fixed),
            2 => Ok(RtwcMode::Converging),
            3 => Ok(RtwcMode::ConvergingSmoothed),
            4 => Ok(RtwcMode::FixedSmoothed),
            _ => Err(MetcorError::InvalidParameter(format!(
                "RTWC mode must be 1 to 4, got {code}"
            ))),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            RtwcMode::Fixed => 1,
            RtwcMode::Converging => 2,
            RtwcMode::ConvergingSmoothed => 3,
            RtwcMode::FixedSmoothed => 4,
        }
    }

    pub fn converges(self) -> bool {
        matches!(self, RtwcMode::Converging | RtwcMode::ConvergingSmoothed)
    }

    pub fn smooths(self) -> bool {
        matches!(self, RtwcMode::ConvergingSmoothed | RtwcMode::FixedSmoothed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtwcParams {
    pub mode: RtwcMode,
    /// Percent difference between two iterations under which a pollutant is finalized.
    pub convergence_percent: f64,
    /// Iteration budget. The fixed schedules run `max_iterations − 1` redistribution passes after
    /// the initial CWT, the converging ones at most `max_iterations` passes.
    pub max_iterations: usize,
    pub smoothing: SmoothingParams,
}

impl Default for RtwcParams {
    fn default() -> Self {
        RtwcParams {
            mode: RtwcMode::default(),
            convergence_percent: 1.0,
            max_iterations: 1000,
            smoothing: SmoothingParams::default(),
        }
    }
}

impl RtwcParams {
    pub fn builder() -> RtwcParamsBuilder {
        RtwcParamsBuilder::new()
    }

    pub(crate) fn validate(&self) -> Result<(), MetcorError> {
        if !ge0(self.convergence_percent) {
            return Err(invalid("convergence_percent must be >= 0"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be >= 1"));
        }
        self.smoothing.validate()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RtwcParamsBuilder {
    params: RtwcParams,
}

impl RtwcParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn mode(mut self, v: RtwcMode) -> Self {
        self.params.mode = v;
        self
    }
    pub fn convergence_percent(mut self, v: f64) -> Self {
        self.params.convergence_percent = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn smoothing(mut self, v: SmoothingParams) -> Self {
        self.params.smoothing = v;
        self
    }

    /// Validate and produce a [`RtwcParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `convergence_percent ≥ 0`
    /// * `max_iterations ≥ 1`
    /// * the nested [`SmoothingParams`] rules
    pub fn build(self) -> Result<RtwcParams, MetcorError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl fmt::Display for RtwcParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "RTWC Parameters")?;
            writeln!(f, "---------------")?;
            line!(f, "mode                = {}", self.mode.code(), "Redistribution schedule")?;
            line!(f, "convergence_percent = {:.3} %", self.convergence_percent, "Finalization threshold")?;
            line!(f, "max_iterations      = {}", self.max_iterations, "Iteration cap")?;
            writeln!(f)?;
            write!(f, "{:#}", self.smoothing)
        } else {
            write!(
                f,
                "RtwcParams(mode={}, convergence={}%, max_iterations={}, {})",
                self.mode.code(),
                self.convergence_percent,
                self.max_iterations,
                self.smoothing
            )
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Whole run
// -------------------------------------------------------------------------------------------------

/// Configuration of a complete MetCor run.
///
/// Every field has a default, so a JSON file only needs the entries it overrides:
///
/// ```json
/// {
///   "grid": { "lon_extent": 360.0, "lat_extent": 90.0, "lon_spacing": 0.5, "lat_spacing": 0.5 },
///   "threshold_method": { "Percentile": 0.75 },
///   "cwt_method": "LogSmoothed",
///   "zone_offset": -5
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetcorConfig {
    pub grid: GridParams,
    pub smoothing: SmoothingParams,
    pub rtwc: RtwcParams,
    pub cwt_method: CwtMethod,
    pub threshold_method: ThresholdMethod,
    /// Key PSCF weights by unique tagged trajectory count instead of tagged population.
    pub by_unique_trajectory_count: bool,
    pub pscf_weights: PopulationWeights,
    /// Optional post-weighting of the CWT, RTWC and QTBA fields.
    pub field_weights: Option<ContinuousWeights>,
    pub dispersion_velocity: KmPerHour,
    /// Hours added to UTC by the clock of the correlated data (e.g. `-5` for EST).
    pub zone_offset: i32,
    pub histogram_intervals: usize,
}

impl Default for MetcorConfig {
    fn default() -> Self {
        MetcorConfig {
            grid: GridParams::default(),
            smoothing: SmoothingParams::default(),
            rtwc: RtwcParams::default(),
            cwt_method: CwtMethod::default(),
            threshold_method: ThresholdMethod::default(),
            by_unique_trajectory_count: false,
            pscf_weights: PopulationWeights::default(),
            field_weights: None,
            dispersion_velocity: 5.4,
            zone_offset: 0,
            histogram_intervals: 10,
        }
    }
}

impl MetcorConfig {
    /// Load and validate a configuration from a JSON file.
    ///
    /// Errors
    /// ----------
    /// * [`MetcorError::IoError`] when the file cannot be read,
    /// * [`MetcorError::ConfigError`] on malformed JSON,
    /// * [`MetcorError::InvalidParameter`] when a value fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MetcorError> {
        let text = std::fs::read_to_string(path)?;
        let config: MetcorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MetcorError> {
        self.grid.validate()?;
        self.smoothing.validate()?;
        self.rtwc.validate()?;
        if !gt0(self.dispersion_velocity) {
            return Err(invalid("dispersion_velocity must be > 0"));
        }
        if let ThresholdMethod::Percentile(p) = self.threshold_method {
            if p.is_nan() {
                return Err(invalid("percentile must be a number"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MetcorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "{:#}", self.grid)?;
            writeln!(f, "{:#}", self.smoothing)?;
            writeln!(f, "{:#}", self.rtwc)?;
            writeln!(f, "Run Parameters")?;
            writeln!(f, "--------------")?;
            line!(f, "cwt_method                 = {:?}", self.cwt_method, "CWT averaging")?;
            line!(f, "threshold_method           = {:?}", self.threshold_method, "PSCF thresholds")?;
            line!(f, "by_unique_trajectory_count = {}", self.by_unique_trajectory_count, "PSCF weight key")?;
            line!(f, "dispersion_velocity        = {:.2} km/h", self.dispersion_velocity, "QTBA dispersion")?;
            line!(f, "zone_offset                = {} h", self.zone_offset, "Correlated data clock")?;
            line!(f, "histogram_intervals        = {}", self.histogram_intervals, "Histogram bins")
        } else {
            write!(
                f,
                "MetcorConfig({}, cwt={:?}, threshold={:?}, {})",
                self.grid, self.cwt_method, self.threshold_method, self.rtwc
            )
        }
    }
}
