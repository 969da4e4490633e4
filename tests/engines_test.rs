mod common;

use approx::assert_relative_eq;
use common::{assert_values_close, tagged_run};
use metcor::{
    metcor_errors::MetcorError,
    params::{CwtMethod, MetcorConfig, RtwcMode, RtwcParams, SmoothingParams},
    spatial_grid::Field,
    thresholds::{Threshold, ThresholdMethod},
    weights::{ContinuousWeights, PopulationWeights},
};

fn field(run: &metcor::metcor::Metcor, field: Field, i: usize, j: usize) -> Vec<f64> {
    (0..2)
        .map(|k| run.grid().value(field, i, j, k).unwrap())
        .collect()
}

#[test]
fn test_pscf_with_mean_thresholds() {
    let mut run = tagged_run(MetcorConfig::default());
    let thresholds = run.run_pscf().unwrap().to_vec();
    assert_eq!(
        thresholds,
        vec![Threshold::new("SO4", 5.0), Threshold::new("NO3", 2.0)]
    );

    // one exceeding endpoint out of two tagged ones
    assert_values_close(&field(&run, Field::Pscf, 284, 45), &[0.5, 0.5], 1e-12);
    assert_values_close(&field(&run, Field::Pscf, 282, 46), &[0.5, 0.5], 1e-12);
    // the threshold itself counts as an exceedance
    assert_values_close(&field(&run, Field::Pscf, 284, 44), &[1.0, 1.0], 1e-12);
    assert_eq!(run.grid().value(Field::Pscf, 10, 10, 0), None);
    assert_eq!(run.thresholds().map(<[_]>::len), Some(2));
}

#[test]
fn test_pscf_population_weights() {
    let config = MetcorConfig {
        pscf_weights: [(2, 2, 0.5)].into_iter().collect::<PopulationWeights>(),
        ..Default::default()
    };
    let mut run = tagged_run(config);
    run.run_pscf().unwrap();
    assert_relative_eq!(run.grid().value(Field::Pscf, 284, 45, 0).unwrap(), 0.25);
    assert_relative_eq!(run.grid().value(Field::Pscf, 284, 44, 0).unwrap(), 1.0);
}

#[test]
fn test_pscf_percentile_thresholds() {
    let config = MetcorConfig {
        threshold_method: ThresholdMethod::Percentile(1.0),
        ..Default::default()
    };
    let mut run = tagged_run(config);
    let thresholds = run.run_pscf().unwrap().to_vec();
    assert_eq!(thresholds[0].value, 8.0);
    assert_relative_eq!(run.grid().value(Field::Pscf, 284, 44, 0).unwrap(), 0.0);
    assert_relative_eq!(run.grid().value(Field::Pscf, 284, 45, 0).unwrap(), 0.5);
}

#[test]
fn test_cwt_linear_and_log() {
    let mut run = tagged_run(MetcorConfig::default());
    assert_eq!(run.run_cwt(CwtMethod::Linear).unwrap(), 6);
    assert_values_close(&field(&run, Field::Cwt, 284, 45), &[5.0, 2.0], 1e-12);
    assert_values_close(&field(&run, Field::Cwt, 283, 43), &[5.0, 2.0], 1e-12);
    // the untagged endpoint of 2010-05-09 does not dilute the average
    assert_eq!(run.grid().cell(284, 45).unwrap().population(), 3);

    let mut run = tagged_run(MetcorConfig::default());
    run.run_cwt(CwtMethod::Log).unwrap();
    assert_relative_eq!(
        run.grid().value(Field::Cwt, 284, 45, 0).unwrap(),
        4f64.log10(),
        epsilon = 1e-12
    );
}

#[test]
fn test_cwt_smoothing_rejects_single_endpoint_cells() {
    // a one-sample filter leaves the values unchanged, so only the uncertainty test decides
    let config = MetcorConfig {
        smoothing: SmoothingParams::builder()
            .filter_length(1)
            .poly_degree(0)
            .build()
            .unwrap(),
        ..Default::default()
    };
    let mut run = tagged_run(config);
    run.run_cwt(CwtMethod::LinearSmoothed).unwrap();

    assert_values_close(&field(&run, Field::Cwt, 284, 45), &[5.0, 2.0], 1e-12);
    assert_values_close(&field(&run, Field::Cwt, 284, 44), &[-1.0, -1.0], 1e-12);
}

#[test]
fn test_cwt_field_weights() {
    let config = MetcorConfig {
        field_weights: Some([(0.0, 1.5, 0.7)].into_iter().collect::<ContinuousWeights>()),
        ..Default::default()
    };
    let mut run = tagged_run(config);
    run.run_cwt(CwtMethod::Linear).unwrap();
    assert_values_close(&field(&run, Field::Cwt, 284, 44), &[3.5, 1.4], 1e-12);
    assert_values_close(&field(&run, Field::Cwt, 284, 45), &[5.0, 2.0], 1e-12);
}

#[test]
fn test_rtwc_uniform_paths_keep_the_cwt() {
    // every trajectory crosses cells of equal CWT, so redistribution factors are all 1
    let config = MetcorConfig {
        rtwc: RtwcParams::builder().max_iterations(5).build().unwrap(),
        ..Default::default()
    };
    let mut run = tagged_run(config);
    let report = run.run_rtwc().unwrap();

    assert_eq!(report.iterations, 5);
    assert_eq!(report.finalized_at, vec![5, 5]);
    assert_values_close(&field(&run, Field::Rtwc, 284, 45), &[5.0, 2.0], 1e-12);
    assert_values_close(&field(&run, Field::Rtwc, 282, 42), &[5.0, 2.0], 1e-12);
}

#[test]
fn test_rtwc_converges_immediately() {
    let config = MetcorConfig {
        rtwc: RtwcParams::builder()
            .mode(RtwcMode::Converging)
            .max_iterations(50)
            .build()
            .unwrap(),
        ..Default::default()
    };
    let mut run = tagged_run(config);
    let report = run.run_rtwc().unwrap();

    assert!(report.converged());
    assert_eq!(report.finalized_at, vec![2, 2]);
    assert_values_close(&report.percent_differences, &[0.0, 0.0], 1e-12);
}

#[test]
fn test_qtba_single_receptor() {
    // a fast dispersion keeps the transport potential of hundred-kilometre distances non-zero
    let config = MetcorConfig {
        dispersion_velocity: 100.0,
        ..Default::default()
    };
    let mut run = tagged_run(config);
    assert_eq!(run.run_qtba().unwrap(), 6);

    // equal lags and distances: the transport-weighted mean is the plain mean
    assert_values_close(&field(&run, Field::Qtba, 284, 45), &[5.0, 2.0], 1e-9);
    assert_values_close(&field(&run, Field::Qtba, 282, 42), &[5.0, 2.0], 1e-9);
    assert!(run.grid().cell(284, 45).unwrap().transport_sum(0) > 0.0);
}

#[test]
fn test_pscf_cannot_be_post_weighted() {
    let weights: ContinuousWeights = [(0.0, 10.0, 0.5)].into_iter().collect();
    let result = metcor::SpatialGrid::new(Default::default())
        .unwrap()
        .apply_weighting(Field::Pscf, &weights);
    assert!(matches!(result, Err(MetcorError::InvalidParameter(_))));
}

#[test]
fn test_qtba_slow_dispersion_yields_no_data() {
    // at 5.4 km/h nothing travels tens of kilometres in an hour
    let mut run = tagged_run(MetcorConfig::default());
    run.run_qtba().unwrap();
    assert_values_close(&field(&run, Field::Qtba, 284, 45), &[-1.0, -1.0], 1e-12);
}
