//! # Constrained Nonlinear Programming
//!
//! A small NLP layer: the [`NonlinearProgram`] trait describes a smooth
//! problem with equality, inequality and box constraints, and [`solve`]
//! drives it to a KKT point with an augmented Lagrangian wrapped around
//! argmin's L-BFGS.
//!
//! The sizing model in [`crate::sizing`] is the only program in this crate,
//! but the layer knows nothing about batteries.

mod control;
mod program;
mod solver;

pub use control::{CancelToken, SolveControl, SolveProgress};
pub use program::{
    max_bound_violation, max_violation, project_onto_bounds, ConstraintRow, NonlinearProgram,
};
pub use solver::{solve, NlpSolution, NlpStatus, SolverConfig};
