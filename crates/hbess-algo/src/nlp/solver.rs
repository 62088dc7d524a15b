//! # Augmented Lagrangian Solver over L-BFGS
//!
//! Solves a [`NonlinearProgram`] by a sequence of unconstrained L-BFGS
//! minimizations of the Powell–Hestenes–Rockafellar augmented Lagrangian:
//!
//! ```text
//! L_μ(y; λ, ν) = f(x)/f_s
//!              + Σ_e [ λ_e g_e(x) + (μ/2) g_e(x)² ]
//!              + Σ_i (1/2μ) [ max(0, ν_i + μ h_i(x))² - ν_i² ]
//!
//! with x = s ⊙ y            (variable scaling)
//!      f_s = max(|f(x₀)|, 1) (objective scaling)
//! ```
//!
//! Box bounds are treated as two more inequality rows per bounded variable,
//! expressed in scaled units (`lb/s - y ≤ 0`, `y - ub/s ≤ 0`).
//!
//! ## Outer Loop
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ for k = 1 .. max_outer_iterations                                   │
//! │   L-BFGS on L_μ in chunks (poll cancel/timeout between chunks)      │
//! │   v = max constraint violation                                      │
//! │   if v ≤ tol and (inner converged or |Δf| small): OPTIMAL           │
//! │   λ ← λ + μ g        ν ← max(0, ν + μ h)                            │
//! │   if v > v_prev / 4:  μ ← min(γ μ, μ_max)                           │
//! │   if μ = μ_max and v > infeasibility threshold three times running: │
//! │       INFEASIBLE                                                    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Gradients are analytic: the program supplies sparse constraint rows and
//! the chain rule through the scaling is applied here.
//!
//! ## References
//!
//! - **Nocedal & Wright (2006)**: "Numerical Optimization", 2nd Ed., Ch. 17.
//! - **Birgin & Martínez (2014)**: "Practical Augmented Lagrangian Methods
//!   for Constrained Optimization", SIAM.

use std::sync::Mutex;

use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use web_time::Instant;

use super::control::{SolveControl, SolveProgress};
use super::program::{max_violation, project_onto_bounds, NonlinearProgram};
use crate::error::SizingError;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Tuning knobs for the augmented Lagrangian solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Multiplier updates before giving up
    pub max_outer_iterations: usize,
    /// L-BFGS iteration budget per outer iteration
    pub max_inner_iterations: u64,
    /// L-BFGS iterations between cancellation checks
    pub inner_chunk: u64,
    /// Feasibility tolerance on scaled constraint rows
    pub tolerance: f64,
    /// Relative objective change that counts as stationary
    pub objective_tolerance: f64,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,
    /// Violation that still counts as infeasible once the penalty is maxed out
    pub infeasibility_threshold: f64,
    /// Gradient norm of L_μ at which an inner solve stops early
    pub inner_gradient_tolerance: f64,
    /// L-BFGS history length
    pub lbfgs_memory: usize,
    pub timeout_seconds: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 50,
            max_inner_iterations: 3000,
            inner_chunk: 250,
            tolerance: 1e-6,
            objective_tolerance: 1e-6,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e8,
            infeasibility_threshold: 1e-3,
            inner_gradient_tolerance: 1e-7,
            lbfgs_memory: 7,
            timeout_seconds: 300,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), SizingError> {
        let positive = [
            ("tolerance", self.tolerance),
            ("objective_tolerance", self.objective_tolerance),
            ("initial_penalty", self.initial_penalty),
            ("max_penalty", self.max_penalty),
            ("infeasibility_threshold", self.infeasibility_threshold),
            ("inner_gradient_tolerance", self.inner_gradient_tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SizingError::InvalidInput(format!(
                    "solver.{name} must be positive, got {value}"
                )));
            }
        }
        if self.penalty_growth.is_nan() || self.penalty_growth <= 1.0 {
            return Err(SizingError::InvalidInput(
                "solver.penalty_growth must exceed 1".into(),
            ));
        }
        if self.max_outer_iterations == 0
            || self.max_inner_iterations == 0
            || self.inner_chunk == 0
            || self.lbfgs_memory == 0
        {
            return Err(SizingError::InvalidInput(
                "solver iteration limits and L-BFGS memory must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// How an NLP solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NlpStatus {
    /// Feasible and stationary within tolerance
    Optimal,
    /// Violation stuck above threshold at maximum penalty
    Infeasible,
    /// Outer iteration budget exhausted
    IterationLimit,
    /// Wall-clock budget exhausted away from feasibility
    Timeout,
    /// Non-finite objective or constraint values
    NumericalError,
    Cancelled,
}

impl NlpStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, NlpStatus::Optimal)
    }
}

impl std::fmt::Display for NlpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NlpStatus::Optimal => write!(f, "optimal"),
            NlpStatus::Infeasible => write!(f, "infeasible"),
            NlpStatus::IterationLimit => write!(f, "iteration_limit"),
            NlpStatus::Timeout => write!(f, "timeout"),
            NlpStatus::NumericalError => write!(f, "numerical_error"),
            NlpStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Raw solver output in program variable space.
#[derive(Debug, Clone)]
pub struct NlpSolution {
    pub x: Vec<f64>,
    pub status: NlpStatus,
    pub objective: f64,
    /// Largest scaled constraint violation after projection onto bounds
    pub max_violation: f64,
    /// Total L-BFGS iterations
    pub iterations: usize,
    pub outer_iterations: usize,
    pub solve_time_ms: u64,
}

// ============================================================================
// AUGMENTED LAGRANGIAN WRAPPER
// ============================================================================

#[derive(Debug, Clone)]
struct Multipliers {
    eq: Vec<f64>,
    ineq: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Multipliers {
    fn zeros(n_eq: usize, n_ineq: usize, n_var: usize) -> Self {
        Self {
            eq: vec![0.0; n_eq],
            ineq: vec![0.0; n_ineq],
            lower: vec![0.0; n_var],
            upper: vec![0.0; n_var],
        }
    }

    /// First-order update λ ← λ + μg, ν ← max(0, ν + μh).
    fn update<P: NonlinearProgram + ?Sized>(
        &mut self,
        program: &P,
        x: &[f64],
        y: &[f64],
        lb: &[f64],
        ub: &[f64],
        penalty: f64,
    ) {
        let mut eq = self.eq.iter_mut();
        program.visit_equalities(x, &mut |value, _| {
            if let Some(lambda) = eq.next() {
                *lambda += penalty * value;
            }
        });
        let mut ineq = self.ineq.iter_mut();
        program.visit_inequalities(x, &mut |value, _| {
            if let Some(nu) = ineq.next() {
                *nu = (*nu + penalty * value).max(0.0);
            }
        });
        for j in 0..y.len() {
            if lb[j].is_finite() {
                self.lower[j] = (self.lower[j] + penalty * (lb[j] - y[j])).max(0.0);
            }
            if ub[j].is_finite() {
                self.upper[j] = (self.upper[j] + penalty * (y[j] - ub[j])).max(0.0);
            }
        }
    }
}

/// Last point L_μ was evaluated at. The line search asks for the cost and
/// the gradient at the same point in separate calls.
#[derive(Debug, Default)]
struct EvaluationCache {
    y: Vec<f64>,
    value: f64,
    gradient: Vec<f64>,
}

/// L_μ in scaled variables, borrowed state only so it can be handed to a
/// fresh executor for every chunk.
struct AugmentedLagrangian<'a, P: ?Sized> {
    program: &'a P,
    scales: &'a [f64],
    objective_scale: f64,
    /// Scaled bounds
    lb: &'a [f64],
    ub: &'a [f64],
    multipliers: &'a Multipliers,
    penalty: f64,
    cache: &'a Mutex<EvaluationCache>,
}

impl<P: ?Sized> Clone for AugmentedLagrangian<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: ?Sized> Copy for AugmentedLagrangian<'_, P> {}

impl<P: NonlinearProgram + ?Sized> AugmentedLagrangian<'_, P> {
    /// Value and gradient at `y`, computed once per distinct point.
    fn evaluate_cached(&self, y: &[f64]) -> (f64, Vec<f64>) {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if cache.y.as_slice() != y || cache.gradient.is_empty() {
            let (value, gradient) = self.evaluate(y);
            cache.y.clear();
            cache.y.extend_from_slice(y);
            cache.value = value;
            cache.gradient = gradient;
        }
        (cache.value, cache.gradient.clone())
    }

    fn evaluate(&self, y: &[f64]) -> (f64, Vec<f64>) {
        let x = unscale(y, self.scales);
        let mu = self.penalty;
        let inv_fs = 1.0 / self.objective_scale;

        // Objective
        let mut value = self.program.objective(&x) * inv_fs;
        let mut grad_x: Vec<f64> = self
            .program
            .objective_gradient(&x)
            .into_iter()
            .map(|g| g * inv_fs)
            .collect();

        // Equalities: λg + (μ/2)g²
        let mut lambdas = self.multipliers.eq.iter();
        self.program.visit_equalities(&x, &mut |g, gradient| {
            let lambda = lambdas.next().copied().unwrap_or(0.0);
            value += lambda * g + 0.5 * mu * g * g;
            let weight = lambda + mu * g;
            for &(j, d) in gradient {
                grad_x[j] += weight * d;
            }
        });

        // Inequalities: (1/2μ)[max(0, ν + μh)² - ν²]
        let mut nus = self.multipliers.ineq.iter();
        self.program.visit_inequalities(&x, &mut |h, gradient| {
            let nu = nus.next().copied().unwrap_or(0.0);
            let shifted = nu + mu * h;
            if shifted > 0.0 {
                value += (shifted * shifted - nu * nu) / (2.0 * mu);
                for &(j, d) in gradient {
                    grad_x[j] += shifted * d;
                }
            } else {
                value -= nu * nu / (2.0 * mu);
            }
        });

        // dx/dy = s
        let mut grad_y: Vec<f64> = grad_x
            .iter()
            .zip(self.scales)
            .map(|(g, s)| g * s)
            .collect();

        // Bounds, already in scaled units
        for j in 0..y.len() {
            if self.lb[j].is_finite() {
                let nu = self.multipliers.lower[j];
                let shifted = nu + mu * (self.lb[j] - y[j]);
                if shifted > 0.0 {
                    value += (shifted * shifted - nu * nu) / (2.0 * mu);
                    grad_y[j] -= shifted;
                } else {
                    value -= nu * nu / (2.0 * mu);
                }
            }
            if self.ub[j].is_finite() {
                let nu = self.multipliers.upper[j];
                let shifted = nu + mu * (y[j] - self.ub[j]);
                if shifted > 0.0 {
                    value += (shifted * shifted - nu * nu) / (2.0 * mu);
                    grad_y[j] += shifted;
                } else {
                    value -= nu * nu / (2.0 * mu);
                }
            }
        }

        (value, grad_y)
    }
}

impl<P: NonlinearProgram + ?Sized> CostFunction for AugmentedLagrangian<'_, P> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, y: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let (value, _) = self.evaluate_cached(y);
        if !value.is_finite() {
            return Err(argmin::core::Error::msg(
                "augmented Lagrangian is not finite",
            ));
        }
        Ok(value)
    }
}

impl<P: NonlinearProgram + ?Sized> Gradient for AugmentedLagrangian<'_, P> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, y: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let (_, grad) = self.evaluate_cached(y);
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(argmin::core::Error::msg(
                "augmented Lagrangian gradient is not finite",
            ));
        }
        Ok(grad)
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn unscale(y: &[f64], scales: &[f64]) -> Vec<f64> {
    y.iter().zip(scales).map(|(v, s)| v * s).collect()
}

enum InnerOutcome {
    Finished { iterations: usize, converged: bool },
    Cancelled { iterations: usize },
    TimedOut { iterations: usize },
}

/// Run L-BFGS on one fixed L_μ, in chunks so cancellation and the timeout
/// are observed. Keeps the best point of every completed chunk; a chunk that
/// errors (line search breakdown) leaves `y` at the previous chunk's result.
fn run_inner<P: NonlinearProgram + ?Sized>(
    lagrangian: AugmentedLagrangian<'_, P>,
    y: &mut Vec<f64>,
    config: &SolverConfig,
    control: &SolveControl,
    start: &Instant,
) -> InnerOutcome {
    let mut used: u64 = 0;
    while used < config.max_inner_iterations {
        if control.is_cancelled() {
            return InnerOutcome::Cancelled {
                iterations: used as usize,
            };
        }
        if start.elapsed().as_secs() >= config.timeout_seconds {
            return InnerOutcome::TimedOut {
                iterations: used as usize,
            };
        }

        let chunk = config.inner_chunk.min(config.max_inner_iterations - used);
        let linesearch = MoreThuenteLineSearch::new();
        let solver = match LBFGS::new(linesearch, config.lbfgs_memory)
            .with_tolerance_grad(config.inner_gradient_tolerance)
        {
            Ok(solver) => solver,
            Err(err) => {
                debug!(error = %err, "rejected L-BFGS gradient tolerance");
                return InnerOutcome::Finished {
                    iterations: used as usize,
                    converged: false,
                };
            }
        };
        let result = Executor::new(lagrangian, solver)
            .configure(|state| state.param(y.clone()).max_iters(chunk))
            .run();

        match result {
            Ok(res) => {
                let iters = res.state().get_iter();
                used += iters;
                if let Some(best) = res.state().get_best_param() {
                    *y = best.clone();
                }
                // Stopped on its own tolerances before the chunk ran out
                if iters < chunk {
                    return InnerOutcome::Finished {
                        iterations: used as usize,
                        converged: true,
                    };
                }
            }
            Err(err) => {
                debug!(error = %err, "L-BFGS chunk aborted, keeping previous iterate");
                return InnerOutcome::Finished {
                    iterations: used as usize,
                    converged: false,
                };
            }
        }
    }
    InnerOutcome::Finished {
        iterations: used as usize,
        converged: false,
    }
}

// ============================================================================
// MAIN SOLVER
// ============================================================================

/// Solve `program` starting from `x0`.
///
/// Solver failures come back as an [`NlpStatus`] on the solution, never as
/// a panic. `Err` is reserved for malformed programs or configuration
/// (dimension mismatches, non-positive scales).
pub fn solve<P: NonlinearProgram + ?Sized>(
    program: &P,
    x0: Vec<f64>,
    config: &SolverConfig,
    control: &SolveControl,
    stage: &str,
) -> Result<NlpSolution, SizingError> {
    config.validate()?;
    let start = Instant::now();

    // ========================================================================
    // INITIALIZATION
    // ========================================================================

    let n = program.n_var();
    let scales = program.variable_scales();
    let (lb, ub) = program.variable_bounds();
    if x0.len() != n || scales.len() != n || lb.len() != n || ub.len() != n {
        return Err(SizingError::SolverError(format!(
            "dimension mismatch: n_var={n}, x0={}, scales={}, bounds={}/{}",
            x0.len(),
            scales.len(),
            lb.len(),
            ub.len()
        )));
    }
    if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(SizingError::SolverError(
            "variable scales must be positive and finite".into(),
        ));
    }

    let lb_y: Vec<f64> = lb.iter().zip(&scales).map(|(l, s)| l / s).collect();
    let ub_y: Vec<f64> = ub.iter().zip(&scales).map(|(u, s)| u / s).collect();
    let mut y: Vec<f64> = x0.iter().zip(&scales).map(|(x, s)| x / s).collect();
    project_onto_bounds(&mut y, &lb_y, &ub_y);

    let x_start = unscale(&y, &scales);
    let f0 = program.objective(&x_start);
    if !f0.is_finite() {
        warn!(stage, "objective is not finite at the initial point");
        return Ok(NlpSolution {
            x: x_start,
            status: NlpStatus::NumericalError,
            objective: f0,
            max_violation: f64::INFINITY,
            iterations: 0,
            outer_iterations: 0,
            solve_time_ms: start.elapsed().as_millis() as u64,
        });
    }
    let objective_scale = f0.abs().max(1.0);
    let mut n_eq = 0usize;
    program.visit_equalities(&x_start, &mut |_, _| n_eq += 1);
    let mut n_ineq = 0usize;
    program.visit_inequalities(&x_start, &mut |_, _| n_ineq += 1);
    let mut multipliers = Multipliers::zeros(n_eq, n_ineq, n);

    debug!(
        stage,
        n_var = n,
        n_eq,
        n_ineq,
        objective_scale,
        "starting augmented Lagrangian solve"
    );

    // ========================================================================
    // OUTER LOOP: MULTIPLIER / PENALTY UPDATES
    // ========================================================================

    let mut penalty = config.initial_penalty;
    let mut total_iterations = 0usize;
    let mut outer_iterations = 0usize;
    let mut prev_violation = f64::INFINITY;
    let mut prev_objective: Option<f64> = None;
    let mut stalled = 0usize;
    let mut timed_out = false;
    let mut status: Option<NlpStatus> = None;

    for outer in 0..config.max_outer_iterations {
        outer_iterations = outer + 1;
        let cache = Mutex::new(EvaluationCache::default());
        let lagrangian = AugmentedLagrangian {
            program,
            scales: &scales,
            objective_scale,
            lb: &lb_y,
            ub: &ub_y,
            multipliers: &multipliers,
            penalty,
            cache: &cache,
        };

        let inner_converged = match run_inner(lagrangian, &mut y, config, control, &start) {
            InnerOutcome::Finished {
                iterations,
                converged,
            } => {
                total_iterations += iterations;
                converged
            }
            InnerOutcome::Cancelled { iterations } => {
                total_iterations += iterations;
                status = Some(NlpStatus::Cancelled);
                break;
            }
            // Judged on the last iterate below, like an exhausted budget
            InnerOutcome::TimedOut { iterations } => {
                total_iterations += iterations;
                timed_out = true;
                break;
            }
        };

        // ====================================================================
        // FEASIBILITY / STATIONARITY CHECK
        // ====================================================================

        let x = unscale(&y, &scales);
        let violation = max_violation(program, &x, &lb, &ub, &scales);
        let objective = program.objective(&x);
        let objective_change = match prev_objective {
            Some(prev) => (objective - prev).abs() / objective_scale,
            None => f64::INFINITY,
        };

        control.report(&SolveProgress {
            stage: stage.to_string(),
            outer_iteration: outer_iterations,
            max_outer_iterations: config.max_outer_iterations,
            inner_iterations: total_iterations,
            max_violation: violation,
            objective,
            penalty,
        });
        debug!(
            stage,
            outer = outer_iterations,
            violation,
            objective,
            penalty,
            inner_converged,
            "augmented Lagrangian iteration"
        );

        if !violation.is_finite() || !objective.is_finite() {
            status = Some(NlpStatus::NumericalError);
            break;
        }

        if violation <= config.tolerance
            && (inner_converged || objective_change <= config.objective_tolerance)
        {
            status = Some(NlpStatus::Optimal);
            break;
        }

        multipliers.update(program, &x, &y, &lb_y, &ub_y, penalty);

        if violation > 0.25 * prev_violation {
            penalty = (penalty * config.penalty_growth).min(config.max_penalty);
        }

        if penalty >= config.max_penalty && violation > config.infeasibility_threshold {
            stalled += 1;
            if stalled >= 3 {
                status = Some(NlpStatus::Infeasible);
                break;
            }
        } else {
            stalled = 0;
        }

        prev_violation = violation;
        prev_objective = Some(objective);
    }

    // ========================================================================
    // POST-PROCESSING
    // ========================================================================

    project_onto_bounds(&mut y, &lb_y, &ub_y);
    let x = unscale(&y, &scales);
    let violation = max_violation(program, &x, &lb, &ub, &scales);
    let objective = program.objective(&x);

    // Out of iterations or time but close: accept at 10x tolerance
    let status = status.unwrap_or(if violation <= config.tolerance * 10.0 {
        NlpStatus::Optimal
    } else if timed_out {
        NlpStatus::Timeout
    } else if penalty >= config.max_penalty && violation > config.infeasibility_threshold {
        NlpStatus::Infeasible
    } else {
        NlpStatus::IterationLimit
    });

    let solve_time_ms = start.elapsed().as_millis() as u64;
    match status {
        NlpStatus::Optimal => info!(
            stage,
            objective,
            violation,
            outer = outer_iterations,
            iterations = total_iterations,
            solve_time_ms,
            "solve converged"
        ),
        NlpStatus::Infeasible => warn!(
            stage,
            violation,
            penalty,
            "no feasible point: violation stalled at maximum penalty"
        ),
        NlpStatus::IterationLimit | NlpStatus::Timeout => warn!(
            stage,
            %status,
            violation,
            outer = outer_iterations,
            iterations = total_iterations,
            "solver did not converge"
        ),
        NlpStatus::NumericalError => warn!(stage, "non-finite values during solve"),
        NlpStatus::Cancelled => info!(stage, "solve cancelled"),
    }

    Ok(NlpSolution {
        x,
        status,
        objective,
        max_violation: violation,
        iterations: total_iterations,
        outer_iterations,
        solve_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::nlp::CancelToken;

    /// min x² + y²  s.t.  x + y = 1,  x ≥ 0.7
    struct Quadratic;

    impl NonlinearProgram for Quadratic {
        fn n_var(&self) -> usize {
            2
        }

        fn initial_point(&self) -> Vec<f64> {
            vec![2.0, 2.0]
        }

        fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![0.7, f64::NEG_INFINITY], vec![f64::INFINITY; 2])
        }

        fn objective(&self, x: &[f64]) -> f64 {
            x[0] * x[0] + x[1] * x[1]
        }

        fn objective_gradient(&self, x: &[f64]) -> Vec<f64> {
            vec![2.0 * x[0], 2.0 * x[1]]
        }

        fn visit_equalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
            visit(x[0] + x[1] - 1.0, &[(0, 1.0), (1, 1.0)]);
        }

        fn visit_inequalities(&self, _x: &[f64], _visit: &mut dyn FnMut(f64, &[(usize, f64)])) {}
    }

    /// x = 1 and x = 2 at once.
    struct Contradiction;

    impl NonlinearProgram for Contradiction {
        fn n_var(&self) -> usize {
            1
        }

        fn initial_point(&self) -> Vec<f64> {
            vec![0.0]
        }

        fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![f64::NEG_INFINITY], vec![f64::INFINITY])
        }

        fn objective(&self, _x: &[f64]) -> f64 {
            0.0
        }

        fn objective_gradient(&self, _x: &[f64]) -> Vec<f64> {
            vec![0.0]
        }

        fn visit_equalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
            visit(x[0] - 1.0, &[(0, 1.0)]);
        }

        fn visit_inequalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
            visit(2.0 - x[0], &[(0, -1.0)]);
        }
    }

    #[test]
    fn test_active_bound_and_equality() {
        let sol = solve(
            &Quadratic,
            Quadratic.initial_point(),
            &SolverConfig::default(),
            &SolveControl::default(),
            "quadratic",
        )
        .unwrap();
        assert_eq!(sol.status, NlpStatus::Optimal);
        assert!((sol.x[0] - 0.7).abs() < 1e-4, "x = {:?}", sol.x);
        assert!((sol.x[1] - 0.3).abs() < 1e-4, "x = {:?}", sol.x);
        assert!((sol.objective - 0.58).abs() < 1e-4);
    }

    #[test]
    fn test_contradiction_is_infeasible() {
        let sol = solve(
            &Contradiction,
            vec![0.0],
            &SolverConfig::default(),
            &SolveControl::default(),
            "contradiction",
        )
        .unwrap();
        assert_eq!(sol.status, NlpStatus::Infeasible);
        assert!(sol.max_violation > 0.1);
    }

    #[test]
    fn test_cancel_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let control = SolveControl::new().with_cancel(token);
        let sol = solve(&Quadratic, vec![2.0, 2.0], &SolverConfig::default(), &control, "q")
            .unwrap();
        assert_eq!(sol.status, NlpStatus::Cancelled);
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let err = solve(
            &Quadratic,
            vec![1.0],
            &SolverConfig::default(),
            &SolveControl::default(),
            "q",
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::SolverError(_)));
    }

    #[test]
    fn test_config_validation() {
        let config = SolverConfig {
            penalty_growth: 1.0,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(SolverConfig::default().validate().is_ok());
    }

    /// Quadratic that counts objective evaluations.
    #[derive(Default)]
    struct Counting {
        objective_calls: AtomicUsize,
    }

    impl NonlinearProgram for Counting {
        fn n_var(&self) -> usize {
            Quadratic.n_var()
        }

        fn initial_point(&self) -> Vec<f64> {
            Quadratic.initial_point()
        }

        fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
            Quadratic.variable_bounds()
        }

        fn objective(&self, x: &[f64]) -> f64 {
            self.objective_calls.fetch_add(1, Ordering::SeqCst);
            Quadratic.objective(x)
        }

        fn objective_gradient(&self, x: &[f64]) -> Vec<f64> {
            Quadratic.objective_gradient(x)
        }

        fn visit_equalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
            Quadratic.visit_equalities(x, visit)
        }

        fn visit_inequalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
            Quadratic.visit_inequalities(x, visit)
        }
    }

    #[test]
    fn test_cost_and_gradient_share_one_evaluation() {
        let program = Counting::default();
        let multipliers = Multipliers::zeros(1, 0, 2);
        let cache = Mutex::new(EvaluationCache::default());
        let bounds = (vec![0.7, f64::NEG_INFINITY], vec![f64::INFINITY; 2]);
        let lagrangian = AugmentedLagrangian {
            program: &program,
            scales: &[1.0, 1.0],
            objective_scale: 1.0,
            lb: &bounds.0,
            ub: &bounds.1,
            multipliers: &multipliers,
            penalty: 10.0,
            cache: &cache,
        };

        let y = vec![1.0, 0.5];
        let value = lagrangian.cost(&y).unwrap();
        let grad = lagrangian.gradient(&y).unwrap();
        assert_eq!(program.objective_calls.load(Ordering::SeqCst), 1);
        // 1.25 + (10/2)(0.5)²
        assert!((value - 2.5).abs() < 1e-12);
        assert_eq!(grad, vec![2.0 + 5.0, 1.0 + 5.0]);

        lagrangian.cost(&vec![0.8, 0.2]).unwrap();
        assert_eq!(program.objective_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timeout_at_feasible_point_is_optimal() {
        let config = SolverConfig {
            timeout_seconds: 0,
            ..SolverConfig::default()
        };
        let sol = solve(&Quadratic, vec![0.7, 0.3], &config, &SolveControl::default(), "q")
            .unwrap();
        assert_eq!(sol.status, NlpStatus::Optimal);
        assert!(sol.max_violation <= config.tolerance * 10.0);
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn test_timeout_away_from_feasibility() {
        let config = SolverConfig {
            timeout_seconds: 0,
            ..SolverConfig::default()
        };
        let sol = solve(&Quadratic, vec![2.0, 2.0], &config, &SolveControl::default(), "q")
            .unwrap();
        assert_eq!(sol.status, NlpStatus::Timeout);
        assert!(sol.max_violation > 1.0);
    }
}
