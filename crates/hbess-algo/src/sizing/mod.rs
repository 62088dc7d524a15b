//! # Hybrid Pack Sizing
//!
//! ```text
//! CellPair + LoadProfiles ──► SizingProblem::build ──► solve ──► Solution
//!                                                                  │
//!                         refine (round parallel, window series) ◄─┤
//!                                                                  ▼
//!                                                          DesignReport
//! ```
//!
//! [`pipeline::size_hybrid_pack`] runs the whole chain; the pieces are public
//! for callers that want a single stage.

pub mod options;
pub mod pipeline;
pub mod problem;
pub mod refine;
pub mod report;
pub mod solution;

pub use options::{
    BuildOptions, ChemistrySet, OverrideBound, TopologyAxis, TopologyOverride, TopologySeed,
    VoltageMode, VoltageModel, VoltageTolerance,
};
pub use pipeline::{size_hybrid_pack, Baseline, Refinement, SizingOutcome, SizingRequest};
pub use problem::{SizingProblem, Slot};
pub use refine::{refine, DiscreteDesign, DiscretePack, RefineConfig};
pub use report::{extract, ChemistrySeries, DesignKind, DesignReport, PackReport, ProfileSeries};
pub use solution::{ChemistrySolution, Solution, TrajectoryState};

use crate::error::SizingError;
use crate::nlp::{self, NonlinearProgram, SolveControl, SolverConfig};

/// Solve a sizing model from its own seed.
///
/// Solver trouble is reported in [`Solution::status`]; `Err` only for
/// malformed configuration.
pub fn solve(
    problem: &SizingProblem,
    config: &SolverConfig,
    control: &SolveControl,
) -> Result<Solution, SizingError> {
    solve_from(problem, problem.initial_point(), config, control)
}

/// Solve a sizing model from a caller-chosen start point.
pub fn solve_from(
    problem: &SizingProblem,
    x0: Vec<f64>,
    config: &SolverConfig,
    control: &SolveControl,
) -> Result<Solution, SizingError> {
    let raw = nlp::solve(problem, x0, config, control, problem.label())?;
    Ok(problem.extract(&raw))
}
