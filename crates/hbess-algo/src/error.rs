//! Sizing error taxonomy.

use hbess_core::HbessError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal outcomes of a sizing request that carry no buildable design.
///
/// None of these abort the host; the pipeline hands them to the caller as a
/// status plus message.
#[derive(Error, Debug)]
pub enum SizingError {
    /// Malformed inputs, rejected before any model is built.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The program has no feasible point.
    #[error("Infeasible: {message} (max violation {max_violation:.3e})")]
    Infeasible { message: String, max_violation: f64 },

    /// Iteration or time budget exhausted before feasibility was settled.
    #[error("Solver did not converge after {iterations} iterations (max violation {max_violation:.3e})")]
    SolverNonConvergence { iterations: usize, max_violation: f64 },

    /// Numerical breakdown inside the NLP solver.
    #[error("Solver error: {0}")]
    SolverError(String),

    /// The relaxed design solved but the integer window around it did not.
    #[error("Refinement infeasible: {0}")]
    RefinementInfeasible(String),

    /// The caller cancelled the run.
    #[error("Cancelled by caller")]
    Cancelled,
}

impl From<HbessError> for SizingError {
    fn from(err: HbessError) -> Self {
        SizingError::InvalidInput(err.to_string())
    }
}

/// Coarse outcome class for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Optimal,
    InvalidInput,
    Infeasible,
    SolverNonConvergence,
    SolverError,
    RefinementInfeasible,
    Cancelled,
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Optimal)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Optimal => write!(f, "optimal"),
            RunStatus::InvalidInput => write!(f, "invalid_input"),
            RunStatus::Infeasible => write!(f, "infeasible"),
            RunStatus::SolverNonConvergence => write!(f, "solver_non_convergence"),
            RunStatus::SolverError => write!(f, "solver_error"),
            RunStatus::RefinementInfeasible => write!(f, "refinement_infeasible"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SizingError {
    pub fn status(&self) -> RunStatus {
        match self {
            SizingError::InvalidInput(_) => RunStatus::InvalidInput,
            SizingError::Infeasible { .. } => RunStatus::Infeasible,
            SizingError::SolverNonConvergence { .. } => RunStatus::SolverNonConvergence,
            SizingError::SolverError(_) => RunStatus::SolverError,
            SizingError::RefinementInfeasible(_) => RunStatus::RefinementInfeasible,
            SizingError::Cancelled => RunStatus::Cancelled,
        }
    }

    /// Infeasibility and non-convergence read the same to a user; only the
    /// logs tell them apart.
    pub fn is_infeasible_like(&self) -> bool {
        matches!(
            self,
            SizingError::Infeasible { .. } | SizingError::SolverNonConvergence { .. }
        )
    }
}
