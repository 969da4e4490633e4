//! # Bin-dependent weighting tables
//!
//! Trajectory statistics are notoriously unstable in sparsely visited cells. A [`WeightTable`]
//! damps such cells by scaling a field value with a factor chosen from the cell's population
//! (or any other per-cell key).
//!
//! A table is an **ordered** list of `(low, high, weight)` ranges. A lookup returns the weight of
//! the first range with `low ≤ key ≤ high` and falls back to `1` when nothing matches. Ranges may
//! overlap on purpose: earlier entries take precedence, independently of their width.
//!
//! Two flavours are used:
//!
//! * [`PopulationWeights`] – integer bins keyed by a tagged population or a unique trajectory
//!   count, used by PSCF.
//! * [`ContinuousWeights`] – float bins, used to post-weight the CWT, RTWC and QTBA fields (the
//!   QTBA key is the per-cell natural transport sum).

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_WEIGHT;

/// One `(low, high, weight)` entry. `low ≤ high` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange<K> {
    pub low: K,
    pub high: K,
    pub weight: f64,
}

impl<K: PartialOrd> WeightRange<K> {
    pub fn new(low: K, high: K, weight: f64) -> Self {
        WeightRange { low, high, weight }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.low <= *key && *key <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable<K> {
    ranges: Vec<WeightRange<K>>,
}

/// Integer-bin weights keyed by a cell population.
pub type PopulationWeights = WeightTable<usize>;

/// Continuous-bin weights keyed by any per-cell float.
pub type ContinuousWeights = WeightTable<f64>;

impl<K: PartialOrd> WeightTable<K> {
    pub fn new(ranges: Vec<WeightRange<K>>) -> Self {
        WeightTable { ranges }
    }

    /// Weight of the first range containing `key`, `1.0` if none does.
    pub fn lookup(&self, key: K) -> f64 {
        self.ranges
            .iter()
            .find(|r| r.contains(&key))
            .map_or(DEFAULT_WEIGHT, |r| r.weight)
    }

    pub fn ranges(&self) -> &[WeightRange<K>] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl<K> FromIterator<(K, K, f64)> for WeightTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, K, f64)>>(iter: I) -> Self {
        WeightTable {
            ranges: iter
                .into_iter()
                .map(|(low, high, weight)| WeightRange { low, high, weight })
                .collect(),
        }
    }
}

impl Default for PopulationWeights {
    /// Five neutral `(1, 1, 1)` entries.
    fn default() -> Self {
        std::iter::repeat((1, 1, 1.0)).take(5).collect()
    }
}

impl Default for ContinuousWeights {
    fn default() -> Self {
        WeightTable { ranges: Vec::new() }
    }
}
