//! # Time-window tagging
//!
//! Back trajectories are identified by their arrival hour `YYYYMMDDHH`. Tagging walks every
//! correlated data record hour by hour, from the start of its sampling window (always tagged) up
//! to its end (excluded), and attaches the record's concentrations to every endpoint of the
//! trajectory arriving at that hour at the record's receptor.
//!
//! Both window bounds are first moved by `−zone_offset` hours, turning local clock times of the
//! correlated data into the UTC hours of the trajectories.

use hifitime::{Epoch, Unit};
use tracing::{debug, info};

use crate::{correlated_data::CorrelatedData, spatial_grid::SpatialGrid};

/// Counters of a tagging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaggingSummary {
    pub records: usize,
    /// Number of `(trajectory id, record)` pairs submitted to the grid.
    pub tag_calls: usize,
    /// Number of endpoints that received data. Endpoints tagged twice count twice.
    pub tagged_endpoints: usize,
}

/// Trajectory id of the hour starting at `epoch`.
///
/// Calendar arithmetic runs in TAI so that hourly labels never repeat across a leap second.
pub fn trajectory_id(epoch: Epoch) -> String {
    let (y, m, d, h, _, _, _) = epoch.to_gregorian_tai();
    format!("{y:04}{m:02}{d:02}{h:02}")
}

/// Hourly trajectory ids of the window `[start, end)`, shifted by `−zone_offset` hours.
///
/// The start hour is always returned, even for an empty or reversed window.
pub fn hourly_ids(start: Epoch, end: Epoch, zone_offset: i32) -> Vec<String> {
    let shift = Unit::Hour * -(zone_offset as i64);
    let (start, end) = (start + shift, end + shift);

    let mut ids = vec![trajectory_id(start)];
    let mut hour = start + Unit::Hour * 1_i64;
    while hour < end {
        ids.push(trajectory_id(hour));
        hour += Unit::Hour * 1_i64;
    }
    ids
}

/// Attach every record of `data` to the endpoints of `grid`.
///
/// Arguments
/// -----------------
/// * `grid`: grid holding the trajectory endpoints.
/// * `data`: parsed correlated data.
/// * `zone_offset`: hours between the correlated data clock and UTC (e.g. `-5` for EST).
///
/// Return
/// ----------
/// * A [`TaggingSummary`].
pub fn tag_grid(grid: &mut SpatialGrid, data: &CorrelatedData, zone_offset: i32) -> TaggingSummary {
    let mut summary = TaggingSummary::default();

    for record in data.records() {
        let concentrations = data.concentrations(record);
        for id in hourly_ids(record.start, record.end, zone_offset) {
            let tagged = grid.attach_data(
                &id,
                &concentrations,
                &record.receptor_lat,
                &record.receptor_lon,
            );
            debug!(trajectory_id = %id, tagged, "record attached");
            summary.tag_calls += 1;
            summary.tagged_endpoints += tagged;
        }
        summary.records += 1;
    }

    info!(
        records = summary.records,
        tag_calls = summary.tag_calls,
        tagged_endpoints = summary.tagged_endpoints,
        "correlated data tagged"
    );
    summary
}

#[cfg(test)]
mod tagging_test {
    use super::*;
    use crate::{geo_point::GeoPoint, params::GridParams};

    fn epoch(y: i32, m: u8, d: u8, h: u8) -> Epoch {
        Epoch::maybe_from_gregorian_tai(y, m, d, h, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_hourly_ids_window() {
        let ids = hourly_ids(epoch(2010, 5, 6, 22), epoch(2010, 5, 7, 1), 0);
        assert_eq!(ids, vec!["2010050622", "2010050623", "2010050700"]);

        // start is always tagged
        assert_eq!(
            hourly_ids(epoch(2010, 5, 6, 22), epoch(2010, 5, 6, 22), 0),
            vec!["2010050622"]
        );
    }

    #[test]
    fn test_zone_offset_shift() {
        // 20:00 EST is 01:00 UTC the next day
        let ids = hourly_ids(epoch(2010, 12, 31, 20), epoch(2010, 12, 31, 22), -5);
        assert_eq!(ids, vec!["2011010101", "2011010102"]);
    }

    #[test]
    fn test_tag_grid() {
        let text = "IDATE ITIME FDATE FTIME LATR LONR A
20100506 2200 20100507 0000 45 -75 3.0
20100506 2200 20100506 2300 46 -75 9.0
";
        let data = CorrelatedData::from_reader(text.as_bytes()).unwrap();
        let mut grid = SpatialGrid::new(GridParams::default()).unwrap();
        grid.insert(GeoPoint::new(1.5, 1.5, "2010050623", "0,45,-75,-3"));
        grid.insert(GeoPoint::new(2.5, 1.5, "2010050700", "0,45,-75,-3"));

        let summary = tag_grid(&mut grid, &data, 0);
        assert_eq!(
            summary,
            TaggingSummary {
                records: 2,
                tag_calls: 3,
                tagged_endpoints: 1
            }
        );
        let p = &grid.cell(1, 1).unwrap().points()[0];
        assert_eq!(p.value("A").unwrap(), 3.0);
        // the end hour is excluded
        assert_eq!(grid.cell(2, 1).unwrap().tagged_population(), 0);
    }
}
