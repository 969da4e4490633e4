//! Grid-wide summary blocks, averaged over the cells carrying correlated data.

use crate::grid_cell::GridCell;

use super::SpatialGrid;

const METRICS_FOOTER: &str = "------------------------------";

impl SpatialGrid {
    fn tagged_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells().iter().filter(|c| c.tagged_population() > 0)
    }

    fn metrics_block(
        &self,
        title: &str,
        pollutants: &[String],
        per_cell: impl Fn(&GridCell, usize) -> f64,
    ) -> Vec<String> {
        let mut lines = vec![format!("POLLUTANT\t\t{title}")];
        for (k, name) in pollutants.iter().enumerate() {
            let (sum, n) = self
                .tagged_cells()
                .fold((0.0, 0usize), |(s, n), c| (s + per_cell(c, k), n + 1));
            lines.push(format!("{name}\t\t{}", sum / n as f64));
        }
        lines.push(METRICS_FOOTER.to_string());
        lines
    }

    /// Average tagged population of the tagged cells, one line per pollutant.
    pub fn average_tagged_population(&self, pollutants: &[String]) -> Vec<String> {
        self.metrics_block("AVERAGE NIJ", pollutants, |c, _| {
            c.tagged_population() as f64
        })
    }

    /// Average natural transport sum of the tagged cells, one line per pollutant.
    ///
    /// Meaningful once [`SpatialGrid::compute_qtba`] has run.
    pub fn average_transport_potential(&self, pollutants: &[String]) -> Vec<String> {
        self.metrics_block("NATURAL TRANSPORT POT. FUNC", pollutants, |c, k| {
            c.transport_sum(k)
        })
    }
}
