//! End-to-end sizing run: relaxation, monotype baselines, refinement.

use hbess_core::{CellPair, Chemistry, LoadProfile};
use serde::Serialize;
use tracing::{info, warn};

use super::options::{BuildOptions, ChemistrySet};
use super::problem::SizingProblem;
use super::refine::{refine, DiscreteDesign, RefineConfig};
use super::report::{DesignKind, DesignReport};
use super::solution::Solution;
use super::solve;
use crate::error::{RunStatus, SizingError};
use crate::nlp::{SolveControl, SolverConfig};

/// Inputs of one sizing run.
#[derive(Debug, Clone)]
pub struct SizingRequest {
    pub cells: CellPair,
    pub profiles: Vec<LoadProfile>,
    pub options: BuildOptions,
    pub solver: SolverConfig,
    pub refine: RefineConfig,
    /// Also size each chemistry on its own
    pub monotype_baselines: bool,
    /// Round the relaxed design to whole cells
    pub discretize: bool,
}

impl SizingRequest {
    pub fn new(cells: CellPair, profiles: Vec<LoadProfile>) -> Self {
        Self {
            cells,
            profiles,
            options: BuildOptions::default(),
            solver: SolverConfig::default(),
            refine: RefineConfig::default(),
            monotype_baselines: false,
            discretize: false,
        }
    }
}

/// A single-chemistry comparison run. Failure here never fails the request.
#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub chemistry: Chemistry,
    pub status: RunStatus,
    pub message: Option<String>,
    pub design: Option<DesignReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Refinement {
    Integer {
        design: DesignReport,
        #[serde(skip)]
        discrete: Box<DiscreteDesign>,
    },
    /// The narrowed model had no solution; the relaxed design is not a substitute.
    Infeasible { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SizingOutcome {
    pub relaxed: DesignReport,
    #[serde(skip)]
    pub relaxed_solution: Solution,
    pub baselines: Vec<Baseline>,
    pub refinement: Option<Refinement>,
}

impl SizingOutcome {
    /// Whole-cell design when refinement succeeded, the relaxation when it
    /// was not requested, `None` when it was requested and failed.
    pub fn final_design(&self) -> Option<&DesignReport> {
        match &self.refinement {
            None => Some(&self.relaxed),
            Some(Refinement::Integer { design, .. }) => Some(design),
            Some(Refinement::Infeasible { .. }) => None,
        }
    }
}

fn run_baseline(
    request: &SizingRequest,
    chemistry: Chemistry,
    control: &SolveControl,
) -> Result<Baseline, SizingError> {
    let options = request
        .options
        .clone()
        .with_chemistries(ChemistrySet::only(chemistry));
    let attempt = SizingProblem::build(&request.cells, &request.profiles, &options)
        .and_then(|problem| solve(&problem, &request.solver, control))
        .and_then(Solution::require_optimal);
    match attempt {
        Ok(solution) => Ok(Baseline {
            chemistry,
            status: RunStatus::Optimal,
            message: None,
            design: Some(DesignReport::from_solution(
                DesignKind::Monotype(chemistry),
                &solution,
                &request.cells,
                &request.profiles,
            )),
        }),
        Err(SizingError::Cancelled) => Err(SizingError::Cancelled),
        Err(err) => {
            warn!(%chemistry, error = %err, "monotype baseline has no design");
            Ok(Baseline {
                chemistry,
                status: err.status(),
                message: Some(err.to_string()),
                design: None,
            })
        }
    }
}

/// Run a full sizing request.
///
/// `Err` means the relaxed design itself could not be produced (bad input,
/// infeasible, non-converged, cancelled). Baseline and refinement failures
/// are reported inside the outcome.
pub fn size_hybrid_pack(
    request: &SizingRequest,
    control: &SolveControl,
) -> Result<SizingOutcome, SizingError> {
    info!(
        profiles = request.profiles.len(),
        chemistries = ?request.options.chemistries.active(),
        "sizing run started"
    );

    let problem = SizingProblem::build(&request.cells, &request.profiles, &request.options)?
        .with_label("relaxed");
    let relaxed_solution = solve(&problem, &request.solver, control)?.require_optimal()?;
    let relaxed = DesignReport::from_solution(
        DesignKind::Relaxed,
        &relaxed_solution,
        &request.cells,
        &request.profiles,
    );
    info!(cost = relaxed.total_cost, "relaxed design found");

    let mut baselines = Vec::new();
    if request.monotype_baselines && request.options.chemistries.is_hybrid() {
        for chemistry in Chemistry::ALL {
            baselines.push(run_baseline(request, chemistry, control)?);
        }
    }

    let refinement = if request.discretize {
        let result = refine(
            &request.cells,
            &request.profiles,
            &problem,
            &relaxed_solution,
            &request.refine,
            &request.solver,
            control,
        );
        Some(match result {
            Ok(discrete) => Refinement::Integer {
                design: DesignReport::from_discrete(&discrete, &request.cells, &request.profiles),
                discrete: Box::new(discrete),
            },
            Err(SizingError::RefinementInfeasible(reason)) => {
                warn!(%reason, "discretization failed");
                Refinement::Infeasible { reason }
            }
            Err(err) => return Err(err),
        })
    } else {
        None
    };

    Ok(SizingOutcome {
        relaxed,
        relaxed_solution,
        baselines,
        refinement,
    })
}
