//! # Grid cells
//!
//! A [`GridCell`] is one latitude/longitude bin of the [`SpatialGrid`](crate::spatial_grid::SpatialGrid).
//! It owns the endpoints that fell inside it and derives, on demand, the per-pollutant quantities
//! the field engines need:
//!
//! * **MIJ** – number of tagged endpoints reaching the pollutant threshold (PSCF numerator),
//! * **CWT** – concentration-weighted trajectory value,
//! * **transport sums** – the natural transport potential accumulated by QTBA.
//!
//! Lifecycle
//! -----------------
//! The per-pollutant vectors are allocated by the first successful tagging of the cell, with the
//! length of the attached data set. A cell that was never tagged keeps them unallocated, which is
//! distinct from an allocated vector holding zeros or the no-data sentinel.
//!
//! The CWT vector is recomputed in place. Once computed, an entry that became negative (the
//! no-data sentinel written by field smoothing) is never overwritten by later recomputations.
//!
//! Trajectory keys
//! -----------------
//! Every aggregate groups endpoints by their composite trajectory key
//! ([`GeoPoint::trajectory_key`]). Groups are kept in a `BTreeMap` so that sums are evaluated in a
//! reproducible order.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, warn};

use crate::{
    constants::{Degree, KmPerHour, TrajectoryKey, QTBA_NO_DATA, RECEPTOR_DISTANCE_EPS},
    geo_point::{Concentration, GeoPoint},
    metcor_errors::MetcorError,
    statistics::{critical_value, haversine_km, natural_transport_potential},
    thresholds::Threshold,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    lon_corner: Degree,
    lat_corner: Degree,
    points: Vec<GeoPoint>,
    mij: Option<Vec<usize>>,
    cwt: Option<Vec<f64>>,
    cwt_computed: bool,
    transport_sums: Option<Vec<f64>>,
}

/// Grow `v` to at least `len` entries, filling with zeros.
fn ensure_len(v: &mut Vec<f64>, len: usize) {
    if v.len() < len {
        v.resize(len, 0.0);
    }
}

impl GridCell {
    pub fn new(lon_corner: Degree, lat_corner: Degree) -> Self {
        GridCell {
            lon_corner,
            lat_corner,
            ..Default::default()
        }
    }

    /// `(longitude, latitude)` of the cell corner.
    pub fn corner(&self) -> (Degree, Degree) {
        (self.lon_corner, self.lat_corner)
    }

    pub fn add_point(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of endpoints in the cell (NIJ), tagged or not.
    pub fn population(&self) -> usize {
        self.points.len()
    }

    /// Number of endpoints carrying correlated data.
    pub fn tagged_population(&self) -> usize {
        self.points.iter().filter(|p| p.has_data()).count()
    }

    pub fn mij(&self) -> Option<&[usize]> {
        self.mij.as_deref()
    }

    pub fn cwt(&self) -> Option<&[f64]> {
        self.cwt.as_deref()
    }

    pub fn cwt_computed(&self) -> bool {
        self.cwt_computed
    }

    pub fn transport_sums(&self) -> Option<&[f64]> {
        self.transport_sums.as_deref()
    }

    /// Natural transport sum of pollutant `k`, `0` when QTBA never ran on the cell.
    pub fn transport_sum(&self, k: usize) -> f64 {
        self.transport_sums
            .as_ref()
            .and_then(|s| s.get(k).copied())
            .unwrap_or(0.0)
    }

    /// Attach `data` to every endpoint of trajectory `trajectory_id` arriving at the given receptor.
    ///
    /// Arguments
    /// -----------------
    /// * `trajectory_id`: identifier to match exactly.
    /// * `data`: correlated concentrations to copy onto the matching endpoints.
    /// * `receptor_lat`, `receptor_lon`: receptor strings, matched case-insensitively against the
    ///   auxiliary tag of the endpoints.
    ///
    /// Return
    /// ----------
    /// * The number of endpoints tagged. No match leaves the cell untouched.
    pub fn attach_data(
        &mut self,
        trajectory_id: &str,
        data: &[Concentration],
        receptor_lat: &str,
        receptor_lon: &str,
    ) -> usize {
        let mut tagged = 0;
        for point in self.points.iter_mut().filter(|p| {
            p.trajectory_id() == Some(trajectory_id) && p.matches_receptor(receptor_lat, receptor_lon)
        }) {
            match point.attach_data(data) {
                Ok(()) => tagged += 1,
                Err(e) => warn!(trajectory_id, "endpoint left untagged: {e}"),
            }
        }

        if tagged > 0 && self.mij.is_none() {
            self.mij = Some(vec![0; data.len()]);
            self.cwt = Some(vec![0.0; data.len()]);
            self.transport_sums = Some(vec![0.0; data.len()]);
        }
        tagged
    }

    /// Recount MIJ against `thresholds`.
    ///
    /// Return
    /// ----------
    /// * `Ok(true)` once the counts are updated, `Ok(false)` when MIJ is unallocated.
    /// * [`MetcorError::LengthMismatch`] when the cell was tagged with another number of
    ///   pollutants than `thresholds`. The counts are left untouched.
    pub fn exceedance_counts(&mut self, thresholds: &[Threshold]) -> Result<bool, MetcorError> {
        let Some(mij) = self.mij.as_mut() else {
            return Ok(false);
        };
        if mij.len() != thresholds.len() {
            return Err(MetcorError::LengthMismatch {
                expected: mij.len(),
                found: thresholds.len(),
            });
        }

        for (count, threshold) in mij.iter_mut().zip(thresholds) {
            *count = self
                .points
                .iter()
                .filter(|p| p.has_data())
                .filter(|p| match p.value(&threshold.name) {
                    Ok(v) => threshold.value <= v,
                    Err(e) => {
                        debug!("excluded from MIJ: {e}");
                        false
                    }
                })
                .count();
        }
        Ok(true)
    }

    /// Number of distinct composite trajectory keys, optionally among tagged endpoints only.
    pub fn unique_trajectories(&self, only_tagged: bool) -> usize {
        self.points
            .iter()
            .filter(|p| !only_tagged || p.has_data())
            .filter_map(GeoPoint::trajectory_key)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// For every tagged trajectory key: index of its first endpoint and number of endpoints.
    fn tagged_key_groups(&self) -> BTreeMap<TrajectoryKey, (usize, usize)> {
        let mut groups = BTreeMap::new();
        for (idx, point) in self.points.iter().enumerate().filter(|(_, p)| p.has_data()) {
            if let Some(key) = point.trajectory_key() {
                groups.entry(key).or_insert((idx, 0)).1 += 1;
            }
        }
        groups
    }

    /// True when a tagged endpoint with composite key `key` lies in this cell.
    pub fn contains_trajectory(&self, key: &str) -> bool {
        self.points
            .iter()
            .any(|p| p.has_data() && p.trajectory_key().as_deref() == Some(key))
    }

    /// Recompute the CWT vector of the cell.
    ///
    /// For each pollutant, the concentration of the first endpoint of every trajectory key
    /// (its `log10` when `log_transform` is set) is weighted by the number of endpoints of that key,
    /// summed, and divided by the tagged population.
    ///
    /// Arguments
    /// -----------------
    /// * `pollutants`: pollutant names, in the order of the per-pollutant vectors.
    /// * `log_transform`: average `log10` concentrations. Values must be positive.
    ///
    /// Return
    /// ----------
    /// * The CWT vector, or `None` for a cell without tagged endpoints (left untouched).
    pub fn compute_cwt(&mut self, pollutants: &[String], log_transform: bool) -> Option<&[f64]> {
        let tagged = self.tagged_population();
        if tagged == 0 {
            return None;
        }

        let groups = self.tagged_key_groups();
        let cwt = self.cwt.get_or_insert_with(Vec::new);
        ensure_len(cwt, pollutants.len());

        for (k, name) in pollutants.iter().enumerate() {
            let mut sum = 0.0;
            for (key, (first, count)) in &groups {
                match self.points[*first].value(name) {
                    Ok(v) => {
                        let v = if log_transform { v.log10() } else { v };
                        sum += v * *count as f64;
                    }
                    Err(e) => error!(trajectory = %key, "CWT contribution skipped: {e}"),
                }
            }
            if !self.cwt_computed || cwt[k] >= 0.0 {
                cwt[k] = sum / tagged as f64;
            }
        }

        self.cwt_computed = true;
        self.cwt.as_deref()
    }

    /// Overwrite CWT entry `k`. Ignored until the CWT has been computed once.
    pub fn set_cwt(&mut self, k: usize, value: f64) {
        if !self.cwt_computed {
            return;
        }
        if let Some(entry) = self.cwt.as_mut().and_then(|c| c.get_mut(k)) {
            *entry = value;
        }
    }

    /// Scale the current CWT vector by `factor`, entry by entry.
    pub(crate) fn scale_cwt(&mut self, factor: impl Fn(usize) -> f64) {
        if let Some(cwt) = self.cwt.as_mut() {
            for (k, v) in cwt.iter_mut().enumerate() {
                *v *= factor(k);
            }
        }
    }

    /// Half-width of the confidence interval around CWT entry `k`.
    ///
    /// `sqrt(Σ(cwt − c)² / (n − 1)) · t(1 − confidence, n − 1) / sqrt(n)` over the `n` tagged
    /// endpoints, with `c` the current (or `log10`) concentration.
    ///
    /// Return
    /// ----------
    /// * `None` when the CWT was never computed or when fewer than two endpoints are tagged.
    pub fn uncertainty(
        &self,
        confidence: f64,
        k: usize,
        pollutant: &str,
        log_transform: bool,
    ) -> Option<f64> {
        if !self.cwt_computed {
            return None;
        }
        let center = *self.cwt.as_ref()?.get(k)?;
        let n = self.tagged_population();
        if n < 2 {
            return None;
        }

        let sq_sum: f64 = self
            .points
            .iter()
            .filter(|p| p.has_data())
            .filter_map(|p| p.value(pollutant).ok())
            .map(|v| {
                let v = if log_transform { v.log10() } else { v };
                (center - v).powi(2)
            })
            .sum();

        let n_f = n as f64;
        let t = critical_value(1.0 - confidence, (n - 1) as u32);
        Some((sq_sum / (n_f - 1.0)).sqrt() * t / n_f.sqrt())
    }

    /// Multiply the current value of pollutant `k` on every tagged endpoint of trajectory `key`.
    ///
    /// Return
    /// ----------
    /// * The number of endpoints rescaled.
    pub fn multiply_concentration(
        &mut self,
        key: &str,
        k: usize,
        pollutant: &str,
        factor: f64,
    ) -> usize {
        let mut updated = 0;
        for point in self.points.iter_mut().filter(|p| p.has_data()) {
            if point.trajectory_key().as_deref() != Some(key) {
                continue;
            }
            match point.value(pollutant) {
                Ok(v) => {
                    point.set_concentration(k, factor * v);
                    updated += 1;
                }
                Err(e) => debug!(trajectory = key, "redistribution skipped: {e}"),
            }
        }
        updated
    }

    /// QTBA value of pollutant `pollutant` for this cell.
    ///
    /// Tagged endpoints are grouped by receptor; endpoints sitting on their receptor are ignored.
    /// Each receptor contributes the ratio `Σ ntp·c / Σ ntp` of its concentration-weighted
    /// transport potentials.
    ///
    /// Arguments
    /// -----------------
    /// * `pollutant`, `k`: pollutant name and index.
    /// * `dispersion`: atmospheric dispersion velocity `a` (km/h).
    /// * `world_receptor_count`: number of distinct receptors inserted in the whole grid.
    ///
    /// Return
    /// ----------
    /// * In a single-receptor world, a cell seen by that receptor yields its ratio.
    /// * In a multi-receptor world, a cell seen by several receptors yields the mean ratio over
    ///   them; a receptor without transport potential counts as a zero ratio. The transport sum
    ///   stored for the cell is the mean of the receptor sums.
    /// * `-1` when no receptor has transport potential, and for a cell seen by a single receptor
    ///   of a multi-receptor world.
    /// * `Err` for an endpoint whose tag or concentration cannot be read.
    pub fn natural_transport_average(
        &mut self,
        pollutant: &str,
        dispersion: KmPerHour,
        k: usize,
        world_receptor_count: usize,
    ) -> Result<f64, MetcorError> {
        if self.unique_trajectories(true) == 0 {
            return Ok(QTBA_NO_DATA);
        }

        // receptor -> (Σ ntp, Σ ntp·c)
        let mut per_receptor: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for point in self.points.iter().filter(|p| p.has_data()) {
            let Some(receptor) = point.receptor() else {
                continue;
            };
            let acc = per_receptor
                .entry(receptor.to_ascii_lowercase())
                .or_insert((0.0, 0.0));

            let (lat_r, lon_r, lag) = point.receptor_geometry()?;
            let distance = haversine_km(point.lat(), point.lon() - 360.0, lat_r, lon_r);
            if distance.abs() < RECEPTOR_DISTANCE_EPS {
                continue;
            }
            let ntp = natural_transport_potential(lag.abs(), distance, dispersion);
            acc.0 += ntp;
            acc.1 += ntp * point.value(pollutant)?;
        }

        let cell_receptors = per_receptor.len();
        let contributions: Vec<(f64, f64)> = per_receptor
            .values()
            .filter(|(bare, _)| *bare > 0.0)
            .map(|(bare, weighted)| (weighted / bare, *bare))
            .collect();

        // receptors without transport potential count in the mean with a zero ratio
        let (qtba, transport) = match contributions.as_slice() {
            [] => return Ok(QTBA_NO_DATA),
            [(ratio, bare)] if cell_receptors == 1 && world_receptor_count == 1 => (*ratio, *bare),
            many if cell_receptors > 1 && world_receptor_count > 1 => {
                let n = cell_receptors as f64;
                (
                    many.iter().map(|(r, _)| r).sum::<f64>() / n,
                    many.iter().map(|(_, b)| b).sum::<f64>() / n,
                )
            }
            _ => return Ok(QTBA_NO_DATA),
        };

        let sums = self.transport_sums.get_or_insert_with(Vec::new);
        ensure_len(sums, k + 1);
        sums[k] = transport;
        Ok(qtba)
    }
}

#[cfg(test)]
mod grid_cell_test {
    use super::*;
    use approx::assert_relative_eq;

    const TAG: &str = "0,45,-75,-1";

    fn names() -> Vec<String> {
        vec!["Pollutant A".to_string(), "Pollutant B".to_string()]
    }

    fn data(a: f64, b: f64) -> Vec<Concentration> {
        vec![
            Concentration::new("Pollutant A", a),
            Concentration::new("Pollutant B", b),
        ]
    }

    /// Cell at (1, 1) with x, x, y, z, z, m endpoints; x and y tagged.
    fn example_cell() -> GridCell {
        let mut cell = GridCell::new(1.0, 1.0);
        for id in ["x", "x", "y", "z", "z", "m"] {
            cell.add_point(GeoPoint::new(1.5, 1.5, id, TAG));
        }
        cell.attach_data("x", &data(2.41, 2.39), "45", "-75");
        cell.attach_data("y", &data(1.50, 3.14), "45", "-75");
        cell
    }

    #[test]
    fn test_populations_and_unique_ids() {
        let cell = example_cell();
        assert_eq!(cell.population(), 6);
        assert_eq!(cell.tagged_population(), 3);
        assert_eq!(cell.unique_trajectories(false), 4);
        assert_eq!(cell.unique_trajectories(true), 2);
        assert!(cell.contains_trajectory("x0,45,-75"));
        assert!(!cell.contains_trajectory("z0,45,-75"));
    }

    #[test]
    fn test_attach_requires_receptor_match() {
        let mut cell = GridCell::new(0.0, 0.0);
        cell.add_point(GeoPoint::new(0.5, 0.5, "x", TAG));
        assert_eq!(cell.attach_data("x", &data(1.0, 1.0), "46", "-75"), 0);
        assert!(cell.mij().is_none());
        assert_eq!(cell.attach_data("x", &data(1.0, 1.0), "45", "-75"), 1);
        assert_eq!(cell.mij(), Some(&[0, 0][..]));
    }

    #[test]
    fn test_attach_empty_data_allocates_nothing() {
        let mut cell = GridCell::new(0.0, 0.0);
        cell.add_point(GeoPoint::new(0.5, 0.5, "x", TAG));
        assert_eq!(cell.attach_data("x", &[], "45", "-75"), 0);
        assert_eq!(cell.tagged_population(), 0);
        assert!(cell.cwt().is_none());
    }

    #[test]
    fn test_cwt_example() {
        let mut cell = example_cell();
        let cwt = cell.compute_cwt(&names(), false).unwrap().to_vec();
        assert_relative_eq!(cwt[0], (2.0 * 2.41 + 1.50) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cwt[1], 2.64, epsilon = 1e-12);
        assert_relative_eq!(cwt[0], 2.1067, epsilon = 1e-4);
    }

    #[test]
    fn test_log_cwt() {
        let mut cell = example_cell();
        let cwt = cell.compute_cwt(&names(), true).unwrap().to_vec();
        let expected = (2.0 * 2.41_f64.log10() + 1.50_f64.log10()) / 3.0;
        assert_relative_eq!(cwt[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_cwt_untagged_cell_untouched() {
        let mut cell = GridCell::new(0.0, 0.0);
        cell.add_point(GeoPoint::new(0.5, 0.5, "x", TAG));
        assert!(cell.compute_cwt(&names(), false).is_none());
        assert!(!cell.cwt_computed());
    }

    #[test]
    fn test_negative_cwt_is_sticky() {
        let mut cell = example_cell();
        cell.compute_cwt(&names(), false);
        cell.set_cwt(0, -1.0);
        let cwt = cell.compute_cwt(&names(), false).unwrap().to_vec();
        assert_eq!(cwt[0], -1.0);
        assert_relative_eq!(cwt[1], 2.64, epsilon = 1e-12);
    }

    #[test]
    fn test_set_cwt_before_compute_is_ignored() {
        let mut cell = example_cell();
        cell.set_cwt(0, -1.0);
        assert_eq!(cell.cwt(), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn test_exceedance_counts() {
        let mut cell = example_cell();
        let thresholds = vec![Threshold::new("Pollutant A", 2.0), Threshold::new("Pollutant B", 3.0)];
        assert_eq!(cell.exceedance_counts(&thresholds), Ok(true));
        assert_eq!(cell.mij(), Some(&[2, 1][..]));

        // wrong length leaves the counts untouched
        assert_eq!(
            cell.exceedance_counts(&thresholds[..1]),
            Err(MetcorError::LengthMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(cell.mij(), Some(&[2, 1][..]));

        let mut untagged = GridCell::new(0.0, 0.0);
        assert_eq!(untagged.exceedance_counts(&thresholds), Ok(false));
    }

    #[test]
    fn test_uncertainty() {
        let mut cell = example_cell();
        assert_eq!(cell.uncertainty(0.95, 0, "Pollutant A", false), None);

        let cwt = cell.compute_cwt(&names(), false).unwrap()[0];
        let sq = 2.0 * (cwt - 2.41_f64).powi(2) + (cwt - 1.50_f64).powi(2);
        let expected = (sq / 2.0).sqrt() * critical_value(0.05, 2) / 3.0_f64.sqrt();
        assert_relative_eq!(
            cell.uncertainty(0.95, 0, "Pollutant A", false).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_uncertainty_single_endpoint() {
        let mut cell = GridCell::new(0.0, 0.0);
        cell.add_point(GeoPoint::new(0.5, 0.5, "x", TAG));
        cell.attach_data("x", &data(1.0, 1.0), "45", "-75");
        cell.compute_cwt(&names(), false);
        assert_eq!(cell.uncertainty(0.95, 0, "Pollutant A", false), None);
    }

    #[test]
    fn test_multiply_concentration_compounds() {
        let mut cell = example_cell();
        assert_eq!(cell.multiply_concentration("x0,45,-75", 0, "Pollutant A", 2.0), 2);
        assert_eq!(cell.multiply_concentration("x0,45,-75", 0, "Pollutant A", 2.0), 2);
        let point = &cell.points()[0];
        assert_relative_eq!(point.value("Pollutant A").unwrap(), 4.0 * 2.41);
        assert_eq!(point.original_value(0).unwrap(), 2.41);
        assert_eq!(cell.multiply_concentration("unknown", 0, "Pollutant A", 2.0), 0);
    }

    #[test]
    fn test_qtba_single_receptor() {
        let mut cell = GridCell::new(280.0, 44.0);
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,45.4,-75.7,-6"));
        cell.add_point(GeoPoint::new(284.2, 44.9, "t2", "500.0,45.4,-75.7,-12"));
        cell.attach_data("t1", &data(2.0, 1.0), "45.4", "-75.7");
        cell.attach_data("t2", &data(4.0, 1.0), "45.4", "-75.7");

        let q = cell.natural_transport_average("Pollutant A", 5.4, 0, 1).unwrap();

        let n1 = natural_transport_potential(6.0, haversine_km(44.5, -75.5, 45.4, -75.7), 5.4);
        let n2 = natural_transport_potential(12.0, haversine_km(44.9, -75.8, 45.4, -75.7), 5.4);
        assert_relative_eq!(q, (2.0 * n1 + 4.0 * n2) / (n1 + n2), epsilon = 1e-12);
        assert_relative_eq!(cell.transport_sum(0), n1 + n2, epsilon = 1e-15);
        // bounded by the extreme concentrations
        assert!(q > 2.0 && q < 4.0);
    }

    #[test]
    fn test_qtba_excludes_receptor_endpoint() {
        let mut cell = GridCell::new(284.0, 45.0);
        cell.add_point(GeoPoint::new(284.3, 45.4, "t1", "500.0,45.4,-75.7,0"));
        cell.attach_data("t1", &data(2.0, 1.0), "45.4", "-75.7");
        assert_eq!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 1).unwrap(),
            QTBA_NO_DATA
        );
    }

    #[test]
    fn test_qtba_multi_receptor_mean() {
        let mut cell = GridCell::new(280.0, 44.0);
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,45.4,-75.7,-6"));
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,44.0,-75.0,-6"));
        cell.attach_data("t1", &data(2.0, 1.0), "45.4", "-75.7");
        cell.attach_data("t1", &data(6.0, 1.0), "44.0", "-75.0");

        let q = cell.natural_transport_average("Pollutant A", 5.4, 0, 2).unwrap();
        assert_relative_eq!(q, 4.0, epsilon = 1e-12);

        let n1 = natural_transport_potential(6.0, haversine_km(44.5, -75.5, 45.4, -75.7), 5.4);
        let n2 = natural_transport_potential(6.0, haversine_km(44.5, -75.5, 44.0, -75.0), 5.4);
        assert!(n1 > 0.0 && n2 > 0.0);
        assert_relative_eq!(cell.transport_sum(0), (n1 + n2) / 2.0, epsilon = 1e-15);

        assert_eq!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 1).unwrap(),
            QTBA_NO_DATA
        );
    }

    #[test]
    fn test_qtba_receptor_without_potential_counts_as_zero() {
        // 330 km in 6 h at 5.4 km/h: the second receptor has no transport potential
        let mut cell = GridCell::new(280.0, 44.0);
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,45.4,-75.7,-6"));
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,43.7,-79.4,-6"));
        cell.attach_data("t1", &data(2.0, 1.0), "45.4", "-75.7");
        cell.attach_data("t1", &data(6.0, 1.0), "43.7", "-79.4");

        assert_relative_eq!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 2).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_qtba_single_receptor_in_multi_receptor_world() {
        let mut cell = GridCell::new(280.0, 44.0);
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,45.4,-75.7,-6"));
        cell.attach_data("t1", &data(2.0, 1.0), "45.4", "-75.7");

        assert_eq!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 2).unwrap(),
            QTBA_NO_DATA
        );
        assert_relative_eq!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 1).unwrap(),
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_qtba_malformed_tag() {
        let mut cell = GridCell::new(280.0, 44.0);
        cell.add_point(GeoPoint::new(284.5, 44.5, "t1", "500.0,north,-75.7,x"));
        cell.attach_data("t1", &data(2.0, 1.0), "north", "-75.7");
        assert!(matches!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 1),
            Err(MetcorError::InvalidAuxTag(_))
        ));
    }

    #[test]
    fn test_qtba_untagged() {
        let mut cell = GridCell::new(0.0, 0.0);
        cell.add_point(GeoPoint::new(0.5, 0.5, "x", TAG));
        assert_eq!(
            cell.natural_transport_average("Pollutant A", 5.4, 0, 1).unwrap(),
            QTBA_NO_DATA
        );
    }
}
