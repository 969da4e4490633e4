//! Quantitative Trajectory-Based Analysis over the whole grid.

use tracing::{error, info};

use crate::constants::KmPerHour;

use super::SpatialGrid;

impl SpatialGrid {
    /// Compute the QTBA field.
    ///
    /// Every cell with tagged endpoints gets a QTBA vector, evaluated pollutant by pollutant with
    /// [`GridCell::natural_transport_average`](crate::grid_cell::GridCell::natural_transport_average).
    /// An entry that cannot be evaluated is logged and stored as `0`.
    ///
    /// Arguments
    /// -----------------
    /// * `pollutants`: pollutant names, in the order of the per-pollutant vectors.
    /// * `dispersion`: atmospheric dispersion velocity (km/h).
    ///
    /// Return
    /// ----------
    /// * The number of cells evaluated.
    pub fn compute_qtba(&mut self, pollutants: &[String], dispersion: KmPerHour) -> usize {
        let receptors = self.receptor_count();
        let mut computed = 0;

        for idx in 0..self.cells().len() {
            let cell = &mut self.cells_mut()[idx];
            if cell.tagged_population() == 0 {
                continue;
            }
            let (lon, lat) = cell.corner();

            let values = pollutants
                .iter()
                .enumerate()
                .map(|(k, name)| {
                    cell.natural_transport_average(name, dispersion, k, receptors)
                        .unwrap_or_else(|e| {
                            error!(lon, lat, pollutant = %name, "QTBA entry set to 0: {e}");
                            0.0
                        })
                })
                .collect();

            self.qtba[idx] = Some(values);
            computed += 1;
        }

        info!(cells = computed, receptors, dispersion, "QTBA computed");
        computed
    }
}

#[cfg(test)]
mod qtba_test {
    use super::*;
    use crate::{
        constants::QTBA_NO_DATA,
        geo_point::{Concentration, GeoPoint},
        params::GridParams,
        spatial_grid::Field,
    };

    fn names() -> Vec<String> {
        vec!["A".into(), "missing".into()]
    }

    #[test]
    fn test_qtba_field() {
        let mut g = SpatialGrid::new(GridParams::default()).unwrap();
        g.insert(GeoPoint::new(284.5, 44.5, "t1", "500.0,45.4,-75.7,-6"));
        g.insert(GeoPoint::new(284.3, 45.4, "t2", "500.0,45.4,-75.7,0"));
        g.insert(GeoPoint::new(10.5, 10.5, "t3", "500.0,45.4,-75.7,-40"));
        for id in ["t1", "t2"] {
            g.attach_data(id, &[Concentration::new("A", 3.0)], "45.4", "-75.7");
        }

        assert_eq!(g.compute_qtba(&names(), 5.4), 2);

        // a single receptor and a single endpoint give back its concentration
        assert!((g.value(Field::Qtba, 284, 44, 0).unwrap() - 3.0).abs() < 1e-12);
        // unreadable concentration stored as zero
        assert_eq!(g.value(Field::Qtba, 284, 44, 1), Some(0.0));
        // endpoint on its receptor
        assert_eq!(g.value(Field::Qtba, 284, 45, 0), Some(QTBA_NO_DATA));
        // untagged
        assert_eq!(g.value(Field::Qtba, 10, 10, 0), None);
        assert!(g.cell(284, 44).unwrap().transport_sum(0) > 0.0);
    }
}
