//! Series/parallel pack topology and the quantities derived from it.

use serde::{Deserialize, Serialize};

use crate::cell::CellParameters;

/// Series and parallel cell counts for one chemistry.
///
/// Real-valued: the relaxed phase produces fractional counts, the
/// discretized phase whole numbers stored as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PackTopology {
    pub series: f64,
    pub parallel: f64,
}

impl PackTopology {
    pub fn new(series: f64, parallel: f64) -> Self {
        Self { series, parallel }
    }

    pub fn cell_count(&self) -> f64 {
        self.series * self.parallel
    }

    pub fn energy_kwh(&self, cell: &CellParameters) -> f64 {
        self.cell_count() * cell.energy_kwh()
    }

    pub fn nominal_voltage(&self, cell: &CellParameters) -> f64 {
        self.series * cell.nominal_voltage.value()
    }

    /// Discharge current capability of the whole pack.
    pub fn current_limit(&self, cell: &CellParameters) -> f64 {
        self.parallel * cell.max_current.value()
    }

    pub fn cost(&self, cell: &CellParameters) -> f64 {
        self.cell_count() * cell.unit_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_quantities() {
        let cell = CellParameters::preset_high_energy();
        let pack = PackTopology::new(164.0, 2.0);
        assert!((pack.nominal_voltage(&cell) - 601.88).abs() < 1e-9);
        assert_eq!(pack.current_limit(&cell), 300.0);
        assert_eq!(pack.cost(&cell), 164.0 * 2.0 * 62.0);
        assert!((pack.energy_kwh(&cell) - 328.0 * 0.34498).abs() < 1e-9);
    }
}
