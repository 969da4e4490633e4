mod common;

use common::{endpoints, tagged_run, write_correlated_data, CORRELATED_DATA, POLLUTANTS};
use hifitime::Epoch;
use metcor::{
    correlated_data::CorrelatedData,
    metcor::Metcor,
    metcor_errors::MetcorError,
    params::MetcorConfig,
    tagging::{hourly_ids, TaggingSummary},
};

#[test]
fn test_load_and_tag() {
    let dir = tempfile::tempdir().unwrap();
    let mut run = Metcor::new(MetcorConfig::default()).unwrap();
    run.insert_points(endpoints());

    let summary = run
        .load_correlated_data(write_correlated_data(dir.path()))
        .unwrap();
    assert_eq!(
        summary,
        TaggingSummary {
            records: 3,
            tag_calls: 3,
            tagged_endpoints: 9
        }
    );

    let data = run.correlated_data().unwrap();
    assert_eq!(data.pollutants(), POLLUTANTS);
    assert_eq!(data.column(0), vec![2.0, 8.0, 5.0]);

    let grid = run.grid();
    let cell = grid.cell(284, 45).unwrap();
    assert_eq!(cell.population(), 3);
    assert_eq!(cell.tagged_population(), 2);
    assert_eq!(cell.unique_trajectories(false), 3);
    assert_eq!(cell.unique_trajectories(true), 2);
    assert_eq!(grid.receptor_count(), 1);
    assert_eq!(grid.total_population(), 10);
}

#[test]
fn test_endpoint_values_follow_arrival_hour() {
    let run = tagged_run(MetcorConfig::default());
    let cell = run.grid().cell(284, 44).unwrap();
    let point = &cell.points()[0];
    assert_eq!(point.trajectory_id(), Some("2010050800"));
    assert_eq!(point.value("SO4").unwrap(), 5.0);
    assert_eq!(point.value("NO3").unwrap(), 2.0);
    assert_eq!(
        point.value("PM25"),
        Err(MetcorError::ValueNotFound("PM25".into()))
    );
}

#[test]
fn test_zone_offset_moves_the_window() {
    // local 19:00 at UTC-5 is 00:00 UTC the next day
    let text = "IDATE ITIME FDATE FTIME LATR LONR SO4
20100505 1900 20100505 2000 45.0 -75.0 4.0
";
    let config = MetcorConfig {
        zone_offset: -5,
        ..Default::default()
    };
    let mut run = Metcor::new(config).unwrap();
    run.insert_points(endpoints());
    let summary = run.attach_correlated_data(CorrelatedData::from_reader(text.as_bytes()).unwrap());

    assert_eq!(summary.tagged_endpoints, 3);
    let point = &run.grid().cell(282, 46).unwrap().points()[0];
    assert_eq!(point.value("SO4").unwrap(), 4.0);
}

#[test]
fn test_unknown_receptor_is_not_tagged() {
    let text = CORRELATED_DATA.replace("45.0 -75.0", "50.0 -80.0");
    let mut run = Metcor::new(MetcorConfig::default()).unwrap();
    run.insert_points(endpoints());
    let summary = run.attach_correlated_data(CorrelatedData::from_reader(text.as_bytes()).unwrap());

    assert_eq!(summary.tag_calls, 3);
    assert_eq!(summary.tagged_endpoints, 0);
    assert_eq!(run.grid().max_tagged_population(), 0);
}

#[test]
fn test_half_hour_rounds_up() {
    let text = "IDATE ITIME FDATE FTIME LATR LONR SO4
20100506 2330 20100507 0200 45.0 -75.0 4.0
";
    let data = CorrelatedData::from_reader(text.as_bytes()).unwrap();
    let record = &data.records()[0];
    assert_eq!(
        record.start,
        Epoch::maybe_from_gregorian_tai(2010, 5, 7, 0, 0, 0, 0).unwrap()
    );
    assert_eq!(
        hourly_ids(record.start, record.end, 0),
        vec!["2010050700", "2010050701"]
    );
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut run = Metcor::new(MetcorConfig::default()).unwrap();
    let err = run
        .load_correlated_data(dir.path().join("absent.txt"))
        .unwrap_err();
    assert!(matches!(err, MetcorError::IoError(_)));
    assert!(run.correlated_data().is_none());
}
