//! Population histograms of the grid.
//!
//! The bin width is `⌈max / intervals⌉` where `max` is the largest per-cell key. Each row reads
//! `"{lower bound}\t{frequency}"`. Keys at the upper end fall in the last bin.

use crate::grid_cell::GridCell;

use super::SpatialGrid;

fn histogram(
    cells: &[GridCell],
    intervals: usize,
    key: impl Fn(&GridCell) -> usize,
    mass: impl Fn(&GridCell) -> usize,
    include: impl Fn(&GridCell) -> bool,
) -> Option<Vec<String>> {
    if intervals == 0 {
        return None;
    }
    let max = cells.iter().map(&key).max().unwrap_or(0);
    let spacing = max.div_ceil(intervals).max(1);

    let mut freq = vec![0usize; intervals];
    for cell in cells.iter().filter(|c| include(c)) {
        let bin = (key(cell) / spacing).min(intervals - 1);
        freq[bin] += mass(cell);
    }

    Some(
        freq.iter()
            .enumerate()
            .map(|(i, f)| format!("{}\t{f}", i * spacing))
            .collect(),
    )
}

impl SpatialGrid {
    /// Histogram of cell populations, weighted by population. `None` for zero intervals.
    pub fn population_histogram(&self, intervals: usize) -> Option<Vec<String>> {
        histogram(
            self.cells(),
            intervals,
            GridCell::population,
            GridCell::population,
            |c| c.population() > 0,
        )
    }

    /// Histogram of tagged populations, weighted by tagged population.
    pub fn tagged_population_histogram(&self, intervals: usize) -> Option<Vec<String>> {
        histogram(
            self.cells(),
            intervals,
            GridCell::tagged_population,
            GridCell::tagged_population,
            |c| c.tagged_population() > 0,
        )
    }

    /// Number of tagged cells per class of unique tagged trajectory count.
    pub fn tagged_source_histogram(&self, intervals: usize) -> Option<Vec<String>> {
        histogram(
            self.cells(),
            intervals,
            |c| c.unique_trajectories(true),
            |_| 1,
            |c| c.tagged_population() > 0,
        )
    }
}
