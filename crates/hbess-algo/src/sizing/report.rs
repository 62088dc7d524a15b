//! Result extraction: pack tables and plotting series from solved models.

use hbess_core::{CellPair, Chemistry, LoadProfile, PackTopology};
use serde::Serialize;

use super::refine::DiscreteDesign;
use super::solution::{Solution, TrajectoryState};
use crate::nlp::NlpStatus;

/// Reporting view of one chemistry's pack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackReport {
    pub chemistry: Chemistry,
    pub series: f64,
    pub parallel: f64,
    pub energy_kwh: f64,
    pub nominal_voltage_v: f64,
    /// Largest current seen over every profile and sample
    pub max_current_a: f64,
    /// parallel · per-cell current limit
    pub rated_current_a: f64,
    pub cost: f64,
}

impl PackReport {
    pub fn empty(chemistry: Chemistry) -> Self {
        Self {
            chemistry,
            series: 0.0,
            parallel: 0.0,
            energy_kwh: 0.0,
            nominal_voltage_v: 0.0,
            max_current_a: 0.0,
            rated_current_a: 0.0,
            cost: 0.0,
        }
    }

    fn from_topology(
        chemistry: Chemistry,
        topology: PackTopology,
        trajectories: &[TrajectoryState],
        cells: &CellPair,
    ) -> Self {
        let cell = cells.get(chemistry);
        let max_current_a = trajectories
            .iter()
            .flat_map(|t| t.current_a.iter().copied())
            .fold(0.0, f64::max);
        Self {
            chemistry,
            series: topology.series,
            parallel: topology.parallel,
            energy_kwh: topology.energy_kwh(cell),
            nominal_voltage_v: topology.nominal_voltage(cell),
            max_current_a,
            rated_current_a: topology.current_limit(cell),
            cost: topology.cost(cell),
        }
    }
}

/// One report per chemistry, in [`Chemistry::ALL`] order.
///
/// Chemistries missing from the solution, or sized to nothing, come back
/// all-zero.
pub fn extract(solution: &Solution, cells: &CellPair) -> Vec<PackReport> {
    Chemistry::ALL
        .iter()
        .map(|&chemistry| match solution.chemistry(chemistry) {
            Some(sol) if sol.topology.cell_count() > 0.0 => {
                PackReport::from_topology(chemistry, sol.topology, &sol.trajectories, cells)
            }
            _ => PackReport::empty(chemistry),
        })
        .collect()
}

/// Per-sample traces of one chemistry under one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChemistrySeries {
    pub chemistry: Chemistry,
    pub power_w: Vec<f64>,
    pub current_a: Vec<f64>,
    /// N + 1 values aligned with [`ProfileSeries::soc_time_s`]
    pub soc: Vec<f64>,
    /// Terminal voltage at each SOC point
    pub voltage_v: Vec<f64>,
}

/// Plotting data for one load profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSeries {
    pub profile: String,
    pub time_s: Vec<f64>,
    pub soc_time_s: Vec<f64>,
    pub demand_w: Vec<f64>,
    pub required_energy_kwh: f64,
    pub chemistries: Vec<ChemistrySeries>,
}

fn profile_series(
    solution: &Solution,
    topologies: &[(Chemistry, PackTopology)],
    cells: &CellPair,
    profiles: &[LoadProfile],
) -> Vec<ProfileSeries> {
    profiles
        .iter()
        .enumerate()
        .map(|(k, profile)| {
            let chemistries = topologies
                .iter()
                .filter_map(|&(chemistry, topology)| {
                    let traj = solution.chemistry(chemistry)?.trajectories.get(k)?;
                    let ocv = &cells.get(chemistry).ocv;
                    let voltage_v = traj
                        .soc
                        .iter()
                        .map(|&soc| topology.series * ocv.eval_linear(soc))
                        .collect();
                    Some(ChemistrySeries {
                        chemistry,
                        power_w: traj.power_w.clone(),
                        current_a: traj.current_a.clone(),
                        soc: traj.soc.clone(),
                        voltage_v,
                    })
                })
                .collect();
            ProfileSeries {
                profile: profile.name().to_string(),
                time_s: profile.times(),
                soc_time_s: profile.soc_times(),
                demand_w: profile.powers(),
                required_energy_kwh: profile.required_energy_kwh(),
                chemistries,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "chemistry")]
pub enum DesignKind {
    /// Continuous relaxation, fractional counts
    Relaxed,
    /// Whole-cell design from the refiner
    Integer,
    /// Single-chemistry baseline
    Monotype(Chemistry),
}

impl std::fmt::Display for DesignKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesignKind::Relaxed => write!(f, "relaxed"),
            DesignKind::Integer => write!(f, "integer"),
            DesignKind::Monotype(c) => write!(f, "monotype {}", c.label()),
        }
    }
}

/// Everything a presentation layer needs about one design.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignReport {
    pub kind: DesignKind,
    pub status: NlpStatus,
    pub packs: Vec<PackReport>,
    pub total_cost: f64,
    pub series: Vec<ProfileSeries>,
}

impl DesignReport {
    pub fn from_solution(
        kind: DesignKind,
        solution: &Solution,
        cells: &CellPair,
        profiles: &[LoadProfile],
    ) -> Self {
        let packs = extract(solution, cells);
        let total_cost = packs.iter().map(|p| p.cost).sum();
        let topologies: Vec<_> = solution
            .chemistries
            .iter()
            .map(|c| (c.chemistry, c.topology))
            .collect();
        Self {
            kind,
            status: solution.status,
            packs,
            total_cost,
            series: profile_series(solution, &topologies, cells, profiles),
        }
    }

    /// Report the rounded topology with trajectories from the narrowed solve.
    pub fn from_discrete(
        design: &DiscreteDesign,
        cells: &CellPair,
        profiles: &[LoadProfile],
    ) -> Self {
        let stage_two = &design.stage_two;
        let packs: Vec<PackReport> = Chemistry::ALL
            .iter()
            .map(|&chemistry| match design.pack(chemistry) {
                Some(pack) if !pack.excluded => {
                    let trajectories = stage_two
                        .chemistry(chemistry)
                        .map(|c| c.trajectories.as_slice())
                        .unwrap_or_default();
                    let mut report =
                        PackReport::from_topology(chemistry, pack.topology(), trajectories, cells);
                    report.cost = pack.cost;
                    report
                }
                _ => PackReport::empty(chemistry),
            })
            .collect();
        let topologies: Vec<_> = design
            .packs
            .iter()
            .filter(|p| !p.excluded)
            .map(|p| (p.chemistry, p.topology()))
            .collect();
        Self {
            kind: DesignKind::Integer,
            status: stage_two.status,
            packs,
            total_cost: design.total_cost,
            series: profile_series(stage_two, &topologies, cells, profiles),
        }
    }

    pub fn pack(&self, chemistry: Chemistry) -> Option<&PackReport> {
        self.packs.iter().find(|p| p.chemistry == chemistry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::solution::ChemistrySolution;

    fn solution_with(chemistries: Vec<ChemistrySolution>) -> Solution {
        Solution {
            label: "test".into(),
            status: NlpStatus::Optimal,
            objective_value: 0.0,
            max_violation: 0.0,
            iterations: 1,
            solve_time_ms: 0,
            chemistries,
        }
    }

    #[test]
    fn test_extract_reports_pack_quantities() {
        let cells = CellPair::default();
        let sol = solution_with(vec![ChemistrySolution {
            chemistry: Chemistry::HighEnergy,
            topology: PackTopology::new(164.0, 2.0),
            trajectories: vec![TrajectoryState {
                profile: "p".into(),
                power_w: vec![1.0e4, 2.0e4],
                current_a: vec![16.0, 33.5],
                soc: vec![0.9, 0.89, 0.87],
            }],
        }]);
        let reports = extract(&sol, &cells);
        assert_eq!(reports.len(), 2);

        let he = &reports[0];
        assert_eq!(he.chemistry, Chemistry::HighEnergy);
        assert!((he.nominal_voltage_v - 601.88).abs() < 1e-9);
        assert!((he.max_current_a - 33.5).abs() < 1e-12);
        assert!((he.rated_current_a - 300.0).abs() < 1e-12);
        assert!((he.cost - 164.0 * 2.0 * 62.0).abs() < 1e-9);
        assert!((he.energy_kwh - 328.0 * 94.0 * 3.67 / 1000.0).abs() < 1e-9);

        assert_eq!(reports[1], PackReport::empty(Chemistry::HighPower));
    }

    #[test]
    fn test_extract_zero_pack_is_all_zero() {
        let cells = CellPair::default();
        let sol = solution_with(vec![ChemistrySolution {
            chemistry: Chemistry::HighPower,
            topology: PackTopology::new(261.0, 0.0),
            trajectories: Vec::new(),
        }]);
        let reports = extract(&sol, &cells);
        assert_eq!(reports[1], PackReport::empty(Chemistry::HighPower));
    }

    #[test]
    fn test_voltage_series_uses_linear_ocv() {
        let cells = CellPair::default();
        let profile = LoadProfile::from_columns("p", &[0.0, 10.0], &[100.0, 100.0]).unwrap();
        let sol = solution_with(vec![ChemistrySolution {
            chemistry: Chemistry::HighEnergy,
            topology: PackTopology::new(10.0, 1.0),
            trajectories: vec![TrajectoryState {
                profile: "p".into(),
                power_w: vec![100.0, 100.0],
                current_a: vec![2.5, 2.5],
                soc: vec![0.9, 0.85, 0.8],
            }],
        }]);
        let report = DesignReport::from_solution(DesignKind::Relaxed, &sol, &cells, &[profile]);
        let series = &report.series[0];
        assert_eq!(series.soc_time_s, vec![0.0, 10.0, 20.0]);
        let he = &series.chemistries[0];
        let expected = 10.0 * cells.high_energy.ocv.eval_linear(0.85);
        assert!((he.voltage_v[1] - expected).abs() < 1e-12);
        assert_eq!(report.kind.to_string(), "relaxed");
    }
}
