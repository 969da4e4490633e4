//! # Trajectory endpoints
//!
//! A [`GeoPoint`] is one endpoint of a back trajectory: a longitude/latitude position, the
//! identifier of the trajectory run it belongs to, and an auxiliary tag describing the
//! receptor site and the temporal lag of the endpoint.
//!
//! Auxiliary tag layout
//! -----------------
//! The tag is a comma-joined string `"height,receptorLat,receptorLon,lagHours"`:
//!
//! * component `1` is the receptor latitude, compared as a string during tagging,
//! * component `2` is the receptor longitude, compared as a string during tagging,
//! * the **last** component is the lag (hours) between the endpoint and the arrival time.
//!
//! The *composite trajectory key* of a point is its trajectory id followed by the tag with its
//! last component removed, so every endpoint of the same run at the same receptor and height
//! shares one key regardless of the lag.
//!
//! Tagging lifecycle
//! -----------------
//! A point starts *untagged*: it counts toward cell populations but not toward any field.
//! [`GeoPoint::attach_data`] stores a copy of the correlated concentrations. The first
//! successful attach also snapshots the values into `original_values`; later attaches replace the
//! working values only. RTWC then rescales the working values in place through
//! [`GeoPoint::set_concentration`].
//!
//! See also
//! ------------
//! * [`GridCell::attach_data`](crate::grid_cell::GridCell::attach_data) – Tags all matching points of a cell.
//! * [`SpatialGrid::insert`](crate::spatial_grid::SpatialGrid::insert) – Places a point in the lattice.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Degree, Hour, TrajectoryKey},
    metcor_errors::MetcorError,
};

/// A named pollutant concentration attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub name: String,
    pub value: f64,
    /// Whether the value reached the pollutant threshold when it was produced.
    #[serde(default)]
    pub exceeds_threshold: bool,
}

impl Concentration {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Concentration {
            name: name.into(),
            value,
            exceeds_threshold: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    lon: Degree,
    lat: Degree,
    trajectory_id: Option<String>,
    aux_tag: Option<String>,
    values: Option<Vec<Concentration>>,
    original_values: Option<Vec<f64>>,
}

impl GeoPoint {
    /// Create an endpoint belonging to trajectory `trajectory_id` with auxiliary tag `aux_tag`.
    ///
    /// Arguments
    /// -----------------
    /// * `lon`: longitude in degrees, `[0, 360)`.
    /// * `lat`: latitude in degrees, `(-90, 90]`.
    /// * `trajectory_id`: identifier of the trajectory run (e.g. the arrival time `YYYYMMDDHH`).
    /// * `aux_tag`: `"height,receptorLat,receptorLon,lagHours"`.
    ///
    /// Return
    /// ----------
    /// * An untagged [`GeoPoint`].
    pub fn new(
        lon: Degree,
        lat: Degree,
        trajectory_id: impl Into<String>,
        aux_tag: impl Into<String>,
    ) -> Self {
        GeoPoint {
            lon,
            lat,
            trajectory_id: Some(trajectory_id.into()),
            aux_tag: Some(aux_tag.into()),
            values: None,
            original_values: None,
        }
    }

    /// An endpoint without trajectory id nor auxiliary tag. It can never be tagged.
    pub fn anonymous(lon: Degree, lat: Degree) -> Self {
        GeoPoint {
            lon,
            lat,
            trajectory_id: None,
            aux_tag: None,
            values: None,
            original_values: None,
        }
    }

    pub fn lon(&self) -> Degree {
        self.lon
    }

    pub fn lat(&self) -> Degree {
        self.lat
    }

    pub fn trajectory_id(&self) -> Option<&str> {
        self.trajectory_id.as_deref()
    }

    pub fn aux_tag(&self) -> Option<&str> {
        self.aux_tag.as_deref()
    }

    /// True once correlated data has been attached.
    pub fn has_data(&self) -> bool {
        self.values.is_some()
    }

    pub fn values(&self) -> Option<&[Concentration]> {
        self.values.as_deref()
    }

    /// Trajectory id followed by the auxiliary tag without its last comma component.
    ///
    /// Returns `None` when either the id or the tag is missing.
    pub fn trajectory_key(&self) -> Option<TrajectoryKey> {
        let id = self.trajectory_id.as_deref()?;
        let tag = self.aux_tag.as_deref()?;
        let stem = tag.rfind(',').map_or(tag, |idx| &tag[..idx]);
        Some(format!("{id}{stem}"))
    }

    /// Receptor latitude component of the auxiliary tag, as written in the tag.
    pub fn receptor_lat(&self) -> Option<&str> {
        self.aux_tag.as_deref()?.split(',').nth(1)
    }

    /// Receptor longitude component of the auxiliary tag, as written in the tag.
    pub fn receptor_lon(&self) -> Option<&str> {
        self.aux_tag.as_deref()?.split(',').nth(2)
    }

    /// `"lat,lon"` receptor label used to group endpoints by receptor.
    pub fn receptor(&self) -> Option<String> {
        Some(format!("{},{}", self.receptor_lat()?, self.receptor_lon()?))
    }

    /// Case-insensitive comparison of the receptor components with the given strings.
    pub fn matches_receptor(&self, receptor_lat: &str, receptor_lon: &str) -> bool {
        match (self.receptor_lat(), self.receptor_lon()) {
            (Some(lat), Some(lon)) => {
                lat.eq_ignore_ascii_case(receptor_lat) && lon.eq_ignore_ascii_case(receptor_lon)
            }
            _ => false,
        }
    }

    /// Parse the receptor coordinates and the temporal lag out of the auxiliary tag.
    ///
    /// Return
    /// ----------
    /// * `(receptor_lat, receptor_lon, lag_hours)` or [`MetcorError::InvalidAuxTag`] when a
    ///   component is missing or not a number.
    pub fn receptor_geometry(&self) -> Result<(Degree, Degree, Hour), MetcorError> {
        let tag = self
            .aux_tag
            .as_deref()
            .ok_or_else(|| MetcorError::InvalidAuxTag("missing auxiliary tag".into()))?;
        let parts: Vec<&str> = tag.split(',').collect();
        if parts.len() < 4 {
            return Err(MetcorError::InvalidAuxTag(tag.to_string()));
        }

        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| MetcorError::InvalidAuxTag(tag.to_string()))
        };
        Ok((parse(parts[1])?, parse(parts[2])?, parse(parts[3])?))
    }

    /// Attach a copy of `data` as the working concentrations of this point.
    ///
    /// The first successful call also snapshots the values into the original values; the
    /// snapshot is never overwritten afterward. Entries are unique by name, first one wins.
    ///
    /// Errors
    /// ----------
    /// * [`MetcorError::EmptyDataSet`] when `data` is empty; the point is left unchanged.
    pub fn attach_data(&mut self, data: &[Concentration]) -> Result<(), MetcorError> {
        if data.is_empty() {
            return Err(MetcorError::EmptyDataSet);
        }

        let values: Vec<Concentration> = data.iter().unique_by(|c| &c.name).cloned().collect();
        if self.original_values.is_none() {
            self.original_values = Some(values.iter().map(|c| c.value).collect());
        }
        self.values = Some(values);
        Ok(())
    }

    /// Current value of the pollutant `name`.
    pub fn value(&self, name: &str) -> Result<f64, MetcorError> {
        self.values
            .as_ref()
            .and_then(|values| values.iter().find(|c| c.name == name))
            .map(|c| c.value)
            .ok_or_else(|| MetcorError::ValueNotFound(name.to_string()))
    }

    /// Current value at pollutant index `index`.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.as_ref()?.get(index).map(|c| c.value)
    }

    /// Value snapshotted at the first tagging, by pollutant index.
    pub fn original_value(&self, index: usize) -> Result<f64, MetcorError> {
        self.original_values
            .as_ref()
            .and_then(|values| values.get(index).copied())
            .ok_or(MetcorError::OriginalValueNotFound(index))
    }

    /// Replace the working value at `index`. Untagged points and out of range indices are ignored.
    pub fn set_concentration(&mut self, index: usize, value: f64) {
        if let Some(entry) = self.values.as_mut().and_then(|v| v.get_mut(index)) {
            entry.value = value;
        }
    }
}

#[cfg(test)]
mod geo_point_test {
    use super::*;

    fn pairs(a: f64, b: f64) -> Vec<Concentration> {
        vec![Concentration::new("polA", a), Concentration::new("polB", b)]
    }

    #[test]
    fn test_trajectory_key_strips_lag() {
        let p = GeoPoint::new(284.3, 45.4, "2010050612", "500.0,45.434,-75.676,-12");
        assert_eq!(
            p.trajectory_key().as_deref(),
            Some("2010050612500.0,45.434,-75.676")
        );
        assert_eq!(p.receptor_lat(), Some("45.434"));
        assert_eq!(p.receptor_lon(), Some("-75.676"));
        assert_eq!(p.receptor().as_deref(), Some("45.434,-75.676"));

        let no_comma = GeoPoint::new(1.0, 1.0, "x", "");
        assert_eq!(no_comma.trajectory_key().as_deref(), Some("x"));
        assert_eq!(GeoPoint::anonymous(1.0, 1.0).trajectory_key(), None);
    }

    #[test]
    fn test_receptor_matching_ignores_case() {
        let p = GeoPoint::new(1.0, 1.0, "x", "0,45N,75W,-1");
        assert!(p.matches_receptor("45n", "75w"));
        assert!(!p.matches_receptor("45n", "76w"));
        assert!(!GeoPoint::anonymous(1.0, 1.0).matches_receptor("45n", "75w"));
    }

    #[test]
    fn test_receptor_geometry() {
        let p = GeoPoint::new(1.0, 1.0, "x", "500.0,45.5,-75.5,-6");
        let (lat, lon, lag) = p.receptor_geometry().unwrap();
        assert_eq!((lat, lon, lag), (45.5, -75.5, -6.0));

        let bad = GeoPoint::new(1.0, 1.0, "x", "500.0,north,-75.5,-6");
        assert_eq!(
            bad.receptor_geometry(),
            Err(MetcorError::InvalidAuxTag("500.0,north,-75.5,-6".into()))
        );
    }

    #[test]
    fn test_original_values_written_once() {
        let mut p = GeoPoint::new(1.0, 1.0, "x", "0,1,1,0");
        assert!(!p.has_data());
        assert_eq!(p.original_value(0), Err(MetcorError::OriginalValueNotFound(0)));

        p.attach_data(&pairs(3.392, 5.493)).unwrap();
        p.attach_data(&pairs(312.0, 51.0)).unwrap();

        assert_eq!(p.value("polA").unwrap(), 312.0);
        assert_eq!(p.original_value(0).unwrap(), 3.392);
        assert_eq!(p.original_value(1).unwrap(), 5.493);
        assert_eq!(p.original_value(2), Err(MetcorError::OriginalValueNotFound(2)));
    }

    #[test]
    fn test_attach_empty_is_rejected() {
        let mut p = GeoPoint::new(1.0, 1.0, "x", "0,1,1,0");
        assert_eq!(p.attach_data(&[]), Err(MetcorError::EmptyDataSet));
        assert!(!p.has_data());
    }

    #[test]
    fn test_values_unique_by_name() {
        let mut p = GeoPoint::new(1.0, 1.0, "x", "0,1,1,0");
        let data = vec![
            Concentration::new("polA", 1.0),
            Concentration::new("polA", 2.0),
            Concentration::new("polB", 3.0),
        ];
        p.attach_data(&data).unwrap();
        assert_eq!(p.values().unwrap().len(), 2);
        assert_eq!(p.value("polA").unwrap(), 1.0);
    }

    #[test]
    fn test_set_concentration_bounds() {
        let mut p = GeoPoint::new(1.0, 1.0, "x", "0,1,1,0");
        p.set_concentration(0, 34.0);
        assert!(!p.has_data());

        p.attach_data(&pairs(1.0, 2.0)).unwrap();
        p.set_concentration(0, 3123.0);
        p.set_concentration(44, 32.0);
        assert_eq!(p.value("polA").unwrap(), 3123.0);
        assert_eq!(p.value("polB").unwrap(), 2.0);
        assert_eq!(
            p.value("polc"),
            Err(MetcorError::ValueNotFound("polc".into()))
        );
    }
}
