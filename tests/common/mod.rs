#![allow(dead_code)]

use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use metcor::{geo_point::GeoPoint, metcor::Metcor, params::MetcorConfig};

/// Receptor components, written the same way in the endpoint tags and in the data file.
pub const RECEPTOR_LAT: &str = "45.0";
pub const RECEPTOR_LON: &str = "-75.0";

pub const POLLUTANTS: [&str; 2] = ["SO4", "NO3"];

/// Three tagged sampling windows, one hour each.
pub const CORRELATED_DATA: &str = "\
IDATE    ITIME FDATE    FTIME LATR LONR  SO4 NO3
20100506 0000  20100506 0100  45.0 -75.0 2.0 1.0
20100507 0000  20100507 0100  45.0 -75.0 8.0 3.0
20100508 0000  20100508 0100  45.0 -75.0 5.0 2.0
";

fn tag(lag: i32) -> String {
    format!("500.0,{RECEPTOR_LAT},{RECEPTOR_LON},{lag}")
}

/// Endpoints of one back trajectory arriving at `id`, one per hour of lag.
pub fn trajectory(id: &str, path: &[(f64, f64)]) -> Vec<GeoPoint> {
    path.iter()
        .enumerate()
        .map(|(h, &(lon, lat))| GeoPoint::new(lon, lat, id, tag(-(h as i32) - 1)))
        .collect()
}

/// Trajectories of 2010-05-06 and 2010-05-07 follow the same path west of the receptor, the one
/// of 2010-05-08 comes from the south-west and the one of 2010-05-09 has no correlated data.
///
/// ```text
/// cell (284, 45): 06 07 09      cell (284, 44): 08
/// cell (283, 45): 06 07         cell (283, 43): 08
/// cell (282, 46): 06 07         cell (282, 42): 08
/// ```
pub fn endpoints() -> Vec<GeoPoint> {
    let west = [(284.5, 45.5), (283.5, 45.5), (282.5, 46.5)];
    let south_west = [(284.5, 44.5), (283.5, 43.5), (282.5, 42.5)];

    let mut points = trajectory("2010050600", &west);
    points.extend(trajectory("2010050700", &west));
    points.extend(trajectory("2010050800", &south_west));
    points.extend(trajectory("2010050900", &west[..1]));
    points
}

pub fn write_correlated_data(dir: &Path) -> PathBuf {
    let path = dir.join("correlated.txt");
    std::fs::write(&path, CORRELATED_DATA).unwrap();
    path
}

/// A run with the fixture endpoints inserted and the fixture data tagged.
pub fn tagged_run(config: MetcorConfig) -> Metcor {
    let dir = tempfile::tempdir().unwrap();
    let mut run = Metcor::new(config).unwrap();
    assert_eq!(run.insert_points(endpoints()), 10);
    run.load_correlated_data(write_correlated_data(dir.path()))
        .unwrap();
    run
}

pub fn assert_values_close(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = epsilon);
    }
}
