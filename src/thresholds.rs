//! # PSCF exceedance thresholds
//!
//! PSCF counts, per cell, the tagged endpoints whose concentration reaches a per-pollutant
//! threshold. The threshold is either supplied by the correlated data file (`THRESH` row) or
//! derived from the whole concentration record of the pollutant:
//!
//! | Method                              | Threshold                                         |
//! |-------------------------------------|---------------------------------------------------|
//! | [`ThresholdMethod::Mean`]           | arithmetic mean                                   |
//! | [`ThresholdMethod::MeanPlusOneSd`]  | mean + sample standard deviation (`n − 1`)        |
//! | [`ThresholdMethod::Percentile`]     | `sorted[⌊p·n⌋ − 1]` for `0 < p ≤ 1`, else minimum |
//! | [`ThresholdMethod::FileSupplied`]   | the `THRESH` row, mean when the file has none     |

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::correlated_data::CorrelatedData;

/// Threshold concentration of one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub name: String,
    pub value: f64,
}

impl Threshold {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Threshold {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ThresholdMethod {
    #[default]
    Mean,
    MeanPlusOneSd,
    /// Fraction in `(0, 1]`; anything else selects the minimum.
    Percentile(f64),
    FileSupplied,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let sq = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    (sq / (values.len() as f64 - 1.0)).sqrt()
}

fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    if p > 0.0 && p <= 1.0 {
        let idx = ((p * sorted.len() as f64) as usize).saturating_sub(1);
        sorted[idx.min(sorted.len() - 1)]
    } else {
        sorted[0]
    }
}

impl ThresholdMethod {
    /// Threshold of a single pollutant record. Returns `NaN` for an empty record.
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            ThresholdMethod::Mean | ThresholdMethod::FileSupplied => mean(values),
            ThresholdMethod::MeanPlusOneSd => mean(values) + sample_std_dev(values),
            ThresholdMethod::Percentile(p) => percentile(values, *p),
        }
    }
}

/// Per-pollutant thresholds for `data`, in pollutant order.
///
/// A `THRESH` row in the file always wins over the requested method, mirroring the
/// correlated data convention. [`ThresholdMethod::FileSupplied`] without such a row falls back to
/// the mean.
pub fn compute_thresholds(data: &CorrelatedData, method: ThresholdMethod) -> Vec<Threshold> {
    if let Some(supplied) = data.supplied_thresholds() {
        return supplied.to_vec();
    }
    if method == ThresholdMethod::FileSupplied {
        warn!("no THRESH row in correlated data, falling back to the mean threshold");
    }

    let thresholds: Vec<Threshold> = data
        .pollutants()
        .iter()
        .enumerate()
        .map(|(k, name)| Threshold::new(name.clone(), method.apply(&data.column(k))))
        .collect();

    for t in &thresholds {
        info!(pollutant = %t.name, threshold = t.value, "PSCF threshold");
    }
    thresholds
}
