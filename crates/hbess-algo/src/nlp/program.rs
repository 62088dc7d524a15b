//! The abstract nonlinear program handed to the solver.

/// One scalar constraint evaluated at a point, with its sparse gradient.
///
/// `gradient` lists `(variable index, ∂c/∂x_j)` pairs in unscaled variable
/// space. Indices may repeat; contributions are summed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    pub value: f64,
    pub gradient: Vec<(usize, f64)>,
}

impl ConstraintRow {
    pub fn new(value: f64, gradient: Vec<(usize, f64)>) -> Self {
        Self { value, gradient }
    }
}

/// A smooth constrained minimization problem:
///
/// ```text
/// minimize    f(x)
/// subject to  g(x) = 0
///             h(x) ≤ 0
///             lb ≤ x ≤ ub
/// ```
///
/// Implementations must return the same number of equality and inequality
/// rows for every `x`.
pub trait NonlinearProgram {
    fn n_var(&self) -> usize;

    fn initial_point(&self) -> Vec<f64>;

    /// Box bounds; use `f64::NEG_INFINITY` / `f64::INFINITY` for free sides.
    fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Typical magnitude of each variable. The solver works in `x / scale`.
    fn variable_scales(&self) -> Vec<f64> {
        vec![1.0; self.n_var()]
    }

    fn objective(&self, x: &[f64]) -> f64;

    fn objective_gradient(&self, x: &[f64]) -> Vec<f64>;

    /// Calls `visit(value, gradient)` once per equality row `g(x) = 0`,
    /// always in the same order. The gradient slice is only valid for the
    /// duration of the call, so implementations can reuse one buffer.
    fn visit_equalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)]));

    /// Same as [`visit_equalities`](Self::visit_equalities) for rows `h(x) ≤ 0`.
    fn visit_inequalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)]));

    fn equality_constraints(&self, x: &[f64]) -> Vec<ConstraintRow> {
        let mut rows = Vec::new();
        self.visit_equalities(x, &mut |value, gradient| {
            rows.push(ConstraintRow::new(value, gradient.to_vec()))
        });
        rows
    }

    fn inequality_constraints(&self, x: &[f64]) -> Vec<ConstraintRow> {
        let mut rows = Vec::new();
        self.visit_inequalities(x, &mut |value, gradient| {
            rows.push(ConstraintRow::new(value, gradient.to_vec()))
        });
        rows
    }
}

/// Largest constraint or bound violation at `x`, in the units the program
/// reports its rows (bounds measured relative to `scales`).
pub fn max_violation<P: NonlinearProgram + ?Sized>(
    program: &P,
    x: &[f64],
    lb: &[f64],
    ub: &[f64],
    scales: &[f64],
) -> f64 {
    // NaN rows stick so the caller sees a non-finite violation
    let mut worst: f64 = 0.0;
    let mut track = |v: f64| {
        if v.is_nan() || v > worst {
            worst = v;
        }
    };
    program.visit_equalities(x, &mut |value, _| track(value.abs()));
    program.visit_inequalities(x, &mut |value, _| track(value));
    if worst.is_nan() {
        return f64::NAN;
    }
    worst.max(max_bound_violation(x, lb, ub, scales))
}

/// max_j max((lb_j - x_j)/s_j, (x_j - ub_j)/s_j, 0)
pub fn max_bound_violation(x: &[f64], lb: &[f64], ub: &[f64], scales: &[f64]) -> f64 {
    let mut max_viol: f64 = 0.0;
    for j in 0..x.len() {
        if x[j] < lb[j] {
            max_viol = max_viol.max((lb[j] - x[j]) / scales[j]);
        }
        if x[j] > ub[j] {
            max_viol = max_viol.max((x[j] - ub[j]) / scales[j]);
        }
    }
    max_viol
}

/// Clip every component into `[lb, ub]`.
pub fn project_onto_bounds(x: &mut [f64], lb: &[f64], ub: &[f64]) {
    for j in 0..x.len() {
        x[j] = x[j].max(lb[j]).min(ub[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_violation_is_scaled() {
        let x = [5.0, -2.0];
        let lb = [0.0, 0.0];
        let ub = [4.0, 1.0];
        let scales = [10.0, 1.0];
        // first: (5-4)/10 = 0.1, second: (0-(-2))/1 = 2
        assert_eq!(max_bound_violation(&x, &lb, &ub, &scales), 2.0);
    }

    #[test]
    fn test_projection() {
        let mut x = [5.0, -2.0, 0.5];
        project_onto_bounds(&mut x, &[0.0, 0.0, f64::NEG_INFINITY], &[4.0, 1.0, f64::INFINITY]);
        assert_eq!(x, [4.0, 0.0, 0.5]);
    }
}
