//! Solved sizing models.

use hbess_core::{Chemistry, PackTopology};
use serde::Serialize;

use crate::error::SizingError;
use crate::nlp::NlpStatus;

/// Per-sample state of one chemistry under one load profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryState {
    pub profile: String,
    /// P[0..N], watts
    pub power_w: Vec<f64>,
    /// I[0..N], amperes
    pub current_a: Vec<f64>,
    /// SOC[0..=N]; SOC[0] is the boundary condition
    pub soc: Vec<f64>,
}

/// Topology and trajectories of one chemistry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChemistrySolution {
    pub chemistry: Chemistry,
    pub topology: PackTopology,
    /// One entry per load profile, in input order
    pub trajectories: Vec<TrajectoryState>,
}

/// Values of every model variable after a solve, plus how the solve ended.
///
/// Chemistries absent from the model are absent here too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub label: String,
    pub status: NlpStatus,
    /// Procurement cost at the returned point
    pub objective_value: f64,
    pub max_violation: f64,
    pub iterations: usize,
    pub solve_time_ms: u64,
    pub chemistries: Vec<ChemistrySolution>,
}

impl Solution {
    pub fn chemistry(&self, chemistry: Chemistry) -> Option<&ChemistrySolution> {
        self.chemistries.iter().find(|c| c.chemistry == chemistry)
    }

    /// Topology of a chemistry, or an empty pack if it is not in the model.
    pub fn topology(&self, chemistry: Chemistry) -> PackTopology {
        self.chemistry(chemistry)
            .map(|c| c.topology)
            .unwrap_or_default()
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_success()
    }
}

impl Solution {
    /// Turn a non-optimal solve into the matching [`SizingError`].
    pub fn require_optimal(self) -> Result<Self, SizingError> {
        match self.status {
            NlpStatus::Optimal => Ok(self),
            NlpStatus::Infeasible => Err(SizingError::Infeasible {
                message: format!("{} model has no feasible design", self.label),
                max_violation: self.max_violation,
            }),
            NlpStatus::IterationLimit | NlpStatus::Timeout => {
                Err(SizingError::SolverNonConvergence {
                    iterations: self.iterations,
                    max_violation: self.max_violation,
                })
            }
            NlpStatus::NumericalError => Err(SizingError::SolverError(format!(
                "{} model hit non-finite values",
                self.label
            ))),
            NlpStatus::Cancelled => Err(SizingError::Cancelled),
        }
    }
}
