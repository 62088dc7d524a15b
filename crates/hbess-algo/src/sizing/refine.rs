//! # Discretization Refiner
//!
//! Turns a relaxed design into buildable integer cell counts by
//! round-and-resolve:
//!
//! 1. From the relaxed optimum `(s*, p*)` of each chemistry, rebuild the
//!    model with `parallel = round(p*)` pinned and `series` confined to
//!    `[s* - w, s* + w]` (w = 3 by default). Series counts that were
//!    already pinned (fixed bus voltage) stay pinned.
//! 2. Solve the narrowed model warm-started from the relaxed point.
//! 3. Round series up, snapping values that are integral within a small
//!    tolerance first so solver noise like `164.0000001` does not become 165.
//! 4. A chemistry with zero series or zero parallel cells is dropped
//!    entirely; cost is recomputed from the integers and true unit costs.
//!
//! If the narrowed model has no solution the refiner says so. Falling back
//! to the relaxed design is the caller's decision.

use hbess_core::{CellPair, Chemistry, LoadProfile, PackTopology};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::options::{OverrideBound, TopologyAxis, TopologyOverride, TopologySeed};
use super::problem::SizingProblem;
use super::solution::Solution;
use super::solve_from;
use crate::error::SizingError;
use crate::nlp::{NlpStatus, SolveControl, SolverConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Half-width of the series window around the relaxed value
    pub series_window: f64,
    /// Distance from an integer treated as solver noise before rounding up
    pub integrality_snap: f64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            series_window: 3.0,
            integrality_snap: 1e-6,
        }
    }
}

/// Whole-cell topology of one chemistry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscretePack {
    pub chemistry: Chemistry,
    pub series: u64,
    pub parallel: u64,
    pub cost: f64,
    /// Zero-sized after rounding and left out of the design
    pub excluded: bool,
}

impl DiscretePack {
    pub fn topology(&self) -> PackTopology {
        PackTopology::new(self.series as f64, self.parallel as f64)
    }
}

/// Integer design produced by [`refine`].
#[derive(Debug, Clone, Serialize)]
pub struct DiscreteDesign {
    pub packs: Vec<DiscretePack>,
    /// Σ series · parallel · unit cost over included packs
    pub total_cost: f64,
    /// Objective of the relaxation this design came from
    pub relaxed_cost: f64,
    /// Narrowed solve; trajectories for reporting come from here
    pub stage_two: Solution,
}

impl DiscreteDesign {
    pub fn pack(&self, chemistry: Chemistry) -> Option<&DiscretePack> {
        self.packs.iter().find(|p| p.chemistry == chemistry)
    }
}

/// Round a solved series count up, ignoring sub-tolerance overshoot.
pub fn round_up_series(value: f64, snap: f64) -> u64 {
    let nearest = value.round();
    let snapped = if (value - nearest).abs() <= snap {
        nearest
    } else {
        value.ceil()
    };
    snapped.max(0.0) as u64
}

/// Model options for the narrowed second stage.
fn stage_two_problem(
    cells: &CellPair,
    profiles: &[LoadProfile],
    stage_one: &SizingProblem,
    relaxed: &Solution,
    config: &RefineConfig,
) -> Result<SizingProblem, SizingError> {
    let mut options = stage_one.options().clone();
    for chemistry in stage_one.chemistries() {
        let topology = relaxed.topology(chemistry);
        let parallel = topology.parallel.max(0.0).round();
        options.overrides.push(TopologyOverride {
            chemistry,
            axis: TopologyAxis::Parallel,
            bound: OverrideBound::Fixed(parallel),
        });

        let series_slot = stage_one.slot(chemistry, TopologyAxis::Series);
        if series_slot.is_some_and(|slot| !slot.is_fixed()) {
            let s = topology.series;
            options.overrides.push(TopologyOverride {
                chemistry,
                axis: TopologyAxis::Series,
                bound: OverrideBound::Window {
                    min: (s - config.series_window).max(0.0),
                    max: s + config.series_window,
                },
            });
        }
        options.seeds.push(TopologySeed {
            chemistry,
            series: Some(topology.series.max(1.0)),
            parallel: Some(parallel.max(1.0)),
        });
        debug!(%chemistry, series = topology.series, parallel, "stage-two pins");
    }
    Ok(SizingProblem::build(cells, profiles, &options)?.with_label("discretization"))
}

/// Refine an optimal relaxed solution of `stage_one` into an integer design.
pub fn refine(
    cells: &CellPair,
    profiles: &[LoadProfile],
    stage_one: &SizingProblem,
    relaxed: &Solution,
    config: &RefineConfig,
    solver: &SolverConfig,
    control: &SolveControl,
) -> Result<DiscreteDesign, SizingError> {
    if !relaxed.is_optimal() {
        return Err(SizingError::InvalidInput(format!(
            "refinement needs an optimal relaxation, got {}",
            relaxed.status
        )));
    }

    let stage_two = stage_two_problem(cells, profiles, stage_one, relaxed, config)?;
    let x0 = stage_two.warm_start_from(relaxed);
    let solution = solve_from(&stage_two, x0, solver, control)?;

    match solution.status {
        NlpStatus::Optimal => {}
        NlpStatus::Cancelled => return Err(SizingError::Cancelled),
        status => {
            return Err(SizingError::RefinementInfeasible(format!(
                "stage-two solve ended {} with max violation {:.3e}; no integer topology within ±{} series of the relaxed design",
                status, solution.max_violation, config.series_window
            )));
        }
    }

    let mut packs = Vec::new();
    for chemistry in stage_two.chemistries() {
        let cell = cells.get(chemistry);
        let topology = solution.topology(chemistry);
        let mut series = round_up_series(topology.series, config.integrality_snap);
        let mut parallel = topology.parallel.max(0.0).round() as u64;
        let excluded = series == 0 || parallel == 0;
        if excluded {
            series = 0;
            parallel = 0;
        }
        packs.push(DiscretePack {
            chemistry,
            series,
            parallel,
            cost: (series * parallel) as f64 * cell.unit_cost,
            excluded,
        });
    }
    let total_cost = packs.iter().map(|p| p.cost).sum();

    info!(
        total_cost,
        relaxed_cost = relaxed.objective_value,
        "discretization complete"
    );

    Ok(DiscreteDesign {
        packs,
        total_cost,
        relaxed_cost: relaxed.objective_value,
        stage_two: solution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up_snaps_noise() {
        assert_eq!(round_up_series(164.0000001, 1e-6), 164);
        assert_eq!(round_up_series(163.9999999, 1e-6), 164);
        assert_eq!(round_up_series(163.2, 1e-6), 164);
        assert_eq!(round_up_series(0.0, 1e-6), 0);
        assert_eq!(round_up_series(-1e-9, 1e-6), 0);
    }

    #[test]
    fn test_refine_requires_optimal_relaxation() {
        let cells = CellPair::default();
        let profiles = vec![LoadProfile::constant("flat", 1e3, 60.0, 10.0).unwrap()];
        let stage_one =
            SizingProblem::build(&cells, &profiles, &Default::default()).unwrap();
        let relaxed = Solution {
            label: "relaxed".into(),
            status: NlpStatus::Infeasible,
            objective_value: 0.0,
            max_violation: 1.0,
            iterations: 0,
            solve_time_ms: 0,
            chemistries: Vec::new(),
        };
        let err = refine(
            &cells,
            &profiles,
            &stage_one,
            &relaxed,
            &RefineConfig::default(),
            &SolverConfig::default(),
            &SolveControl::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::InvalidInput(_)));
    }
}
