//! # Sizing Model Builder
//!
//! Builds the constrained program behind hybrid pack sizing. One routine
//! covers every variant: the hybrid relaxation, the single-chemistry
//! baselines, and the narrowed discretization stage. Variants differ only in
//! the active [`ChemistrySet`] and in which topology variables are pinned,
//! which the builder resolves into [`Slot`]s.
//!
//! ## Variables
//!
//! ```text
//! ┌──────────────────────────────┬────────────┬──────────────────────────┐
//! │ block                        │ count      │ bounds                   │
//! ├──────────────────────────────┼────────────┼──────────────────────────┤
//! │ series_c, parallel_c         │ ≤ 2 per c  │ ≥ 0 (or override window) │
//! │ P_c,k[i]   power             │ N_k        │ ≥ 0 unless negative ok   │
//! │ I_c,k[i]   current           │ N_k        │ free                     │
//! │ SOC_c,k[i] i = 1..N_k        │ N_k        │ [SOC_min, SOC_max]       │
//! └──────────────────────────────┴────────────┴──────────────────────────┘
//! ```
//!
//! SOC_c,k[0] is the boundary condition and never a variable. Pinned
//! topology values are substituted as constants, so a fixed-voltage series
//! count is exact rather than merely constrained.
//!
//! ## Constraints
//!
//! ```text
//! balance   Σ_c P_c,k[i] - P_k[i]                          = 0
//! SOC       (SOC[i+1] - SOC[i]) · E_c · 3.6e6 + P[i] · Δt_i = 0,  E_c = s·p·e_cell
//! current   I[i] · s · u(SOC[i]) - P[i]                     = 0,  u = OCV or V_nom
//! limit     I[i] - p · I_max                                ≤ 0
//! charge    -I[i] - p · I_charge                            ≤ 0   (negative power only)
//! matched   ±(s_HE·V_HE - s_HP·V_HP) - tol                  ≤ 0   (matched mode only)
//! floor     E_req - Σ_c s·p·e_cell                          ≤ 0   (optional)
//! ```
//!
//! The SOC and current relations are imposed in multiplied form. They equal
//! `SOC[i+1] = SOC[i] - P·Δt/(E·3.6e6)` and `I = P/V` wherever E and V are
//! positive, and stay finite when a chemistry shrinks to nothing.
//!
//! Every row is divided by a reference magnitude (peak power, seed energy,
//! seed current, seed voltage) so that all residuals are O(1) at the seed.

use hbess_core::units::JOULES_PER_KWH;
use hbess_core::{CellPair, CellParameters, Chemistry, LoadProfile, PackTopology};
use tracing::debug;

use super::options::{
    BuildOptions, ChemistrySet, OverrideBound, TopologyAxis, VoltageMode, VoltageModel,
    VoltageTolerance,
};
use super::solution::{ChemistrySolution, Solution, TrajectoryState};
use crate::error::SizingError;
use crate::nlp::{NlpSolution, NonlinearProgram};

/// Seeded parallel counts get this much headroom over the heuristic estimate.
const SEED_MARGIN: f64 = 1.2;
/// Smallest parallel seed; keeps the initial pack voltage and energy non-zero.
const MIN_PARALLEL_SEED: f64 = 0.1;
/// Series seed in matched mode, for the high-energy string.
const MATCHED_SERIES_SEED: f64 = 100.0;

/// A topology quantity: either a model variable or a substituted constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Var(usize),
    Fixed(f64),
}

impl Slot {
    pub fn value(self, x: &[f64]) -> f64 {
        match self {
            Slot::Var(j) => x[j],
            Slot::Fixed(v) => v,
        }
    }

    pub fn is_fixed(self) -> bool {
        matches!(self, Slot::Fixed(_))
    }
}

#[derive(Debug, Clone)]
struct ProfileData {
    name: String,
    power: Vec<f64>,
    dt: Vec<f64>,
    /// max(|P|, 1 W)
    power_ref: f64,
    required_energy_kwh: f64,
}

/// Variable offsets of one chemistry under one profile.
#[derive(Debug, Clone)]
struct TrajectoryBlock {
    profile: usize,
    n: usize,
    power: usize,
    current: usize,
    soc: usize,
    energy_ref_kwh: f64,
    current_ref: f64,
}

impl TrajectoryBlock {
    fn p(&self, i: usize) -> usize {
        self.power + i
    }

    fn i(&self, i: usize) -> usize {
        self.current + i
    }

    /// Index of SOC[i], valid for i in 1..=n.
    fn soc(&self, i: usize) -> usize {
        self.soc + i - 1
    }
}

#[derive(Debug, Clone)]
struct ChemistryModel {
    chemistry: Chemistry,
    cell: CellParameters,
    series: Slot,
    parallel: Slot,
    series_seed: f64,
    parallel_seed: f64,
    blocks: Vec<TrajectoryBlock>,
}

#[derive(Debug, Default)]
struct VariableLayout {
    lb: Vec<f64>,
    ub: Vec<f64>,
    scales: Vec<f64>,
}

impl VariableLayout {
    fn push(&mut self, lb: f64, ub: f64, scale: f64) -> usize {
        self.lb.push(lb);
        self.ub.push(ub);
        self.scales.push(scale);
        self.lb.len() - 1
    }

    fn push_block(&mut self, count: usize, lb: f64, ub: f64, scale: f64) -> usize {
        let start = self.lb.len();
        for _ in 0..count {
            self.push(lb, ub, scale);
        }
        start
    }
}

/// Immutable sizing program for one stage of a run.
#[derive(Debug, Clone)]
pub struct SizingProblem {
    label: String,
    options: BuildOptions,
    profiles: Vec<ProfileData>,
    models: Vec<ChemistryModel>,
    lb: Vec<f64>,
    ub: Vec<f64>,
    scales: Vec<f64>,
    x0: Vec<f64>,
    voltage_ref: f64,
    energy_floor_kwh: f64,
}

impl SizingProblem {
    /// Assemble the program for `profiles` with the chemistries and pins in
    /// `options`.
    ///
    /// Inputs are validated here; nothing malformed reaches the solver.
    pub fn build(
        cells: &CellPair,
        profiles: &[LoadProfile],
        options: &BuildOptions,
    ) -> Result<Self, SizingError> {
        if profiles.is_empty() {
            return Err(SizingError::InvalidInput(
                "at least one load profile is required".into(),
            ));
        }
        if let Some(short) = profiles.iter().find(|p| p.len() < 2) {
            return Err(SizingError::InvalidInput(format!(
                "load profile '{}' needs at least 2 samples",
                short.name()
            )));
        }
        options.validate()?;
        for chemistry in options.chemistries.active() {
            cells.get(chemistry).validate()?;
        }

        let profile_data: Vec<ProfileData> = profiles
            .iter()
            .map(|p| ProfileData {
                name: p.name().to_string(),
                power: p.powers(),
                dt: p.intervals(),
                power_ref: p.peak_power().max(1.0),
                required_energy_kwh: p.required_energy_kwh(),
            })
            .collect();

        let active = options.chemistries.active();
        let share = 1.0 / active.len() as f64;
        let matched = options.chemistries.is_hybrid()
            && matches!(options.voltage, VoltageMode::Matched { .. });
        let series_floor = if matched { 1.0 } else { 0.0 };

        // ====================================================================
        // TOPOLOGY SLOTS
        // ====================================================================

        let mut layout = VariableLayout::default();
        let mut models = Vec::with_capacity(active.len());
        for &chemistry in &active {
            let cell = cells.get(chemistry).clone();
            let v_cell = cell.nominal_voltage.value();
            let seed = options.seed_for(chemistry);

            let default_series = if matched {
                match chemistry {
                    Chemistry::HighEnergy => MATCHED_SERIES_SEED,
                    Chemistry::HighPower => {
                        MATCHED_SERIES_SEED * cells.high_energy.nominal_voltage.value() / v_cell
                    }
                }
            } else {
                1.0
            };
            let series_guess = seed.and_then(|s| s.series).unwrap_or(default_series);

            // A fixed bus voltage outranks any series override.
            let series_bound = options
                .voltage
                .fixed_series(v_cell)
                .map(OverrideBound::Fixed)
                .or_else(|| options.override_for(chemistry, TopologyAxis::Series));
            let (series, series_seed) = match series_bound {
                Some(OverrideBound::Fixed(v)) => (Slot::Fixed(v), v),
                Some(OverrideBound::Window { min, max }) => {
                    let lo = min.max(series_floor);
                    let hi = max.max(lo);
                    let s0 = series_guess.clamp(lo, hi);
                    (Slot::Var(layout.push(lo, hi, s0.max(1.0))), s0)
                }
                None => {
                    let s0 = series_guess.max(series_floor);
                    (
                        Slot::Var(layout.push(series_floor, f64::INFINITY, s0.max(1.0))),
                        s0,
                    )
                }
            };

            let parallel_guess = seed.and_then(|s| s.parallel).unwrap_or_else(|| {
                heuristic_parallel(&cell, series_seed.max(1.0), &profile_data, share, options)
            });
            let (parallel, parallel_seed) =
                match options.override_for(chemistry, TopologyAxis::Parallel) {
                    Some(OverrideBound::Fixed(v)) => (Slot::Fixed(v), v),
                    Some(OverrideBound::Window { min, max }) => {
                        let p0 = parallel_guess.clamp(min, max);
                        (Slot::Var(layout.push(min, max, p0.max(1.0))), p0)
                    }
                    None => (
                        Slot::Var(layout.push(0.0, f64::INFINITY, parallel_guess.max(1.0))),
                        parallel_guess,
                    ),
                };

            models.push(ChemistryModel {
                chemistry,
                cell,
                series,
                parallel,
                series_seed,
                parallel_seed,
                blocks: Vec::with_capacity(profile_data.len()),
            });
        }

        // ====================================================================
        // TRAJECTORY BLOCKS
        // ====================================================================

        let power_lb = if options.allow_negative_power {
            f64::NEG_INFINITY
        } else {
            0.0
        };
        for model in &mut models {
            let v_seed = model.series_seed.max(1.0) * model.cell.nominal_voltage.value();
            let seed_energy = model.series_seed * model.parallel_seed * model.cell.energy_kwh();
            for (k, prof) in profile_data.iter().enumerate() {
                let n = prof.power.len();
                let horizon: f64 = prof.dt.iter().sum();
                let power = layout.push_block(n, power_lb, f64::INFINITY, prof.power_ref);
                let current_ref = prof.power_ref / v_seed;
                let current =
                    layout.push_block(n, f64::NEG_INFINITY, f64::INFINITY, current_ref);
                let soc = layout.push_block(n, options.soc_min, options.soc_max, 1.0);
                let energy_ref_kwh = seed_energy
                    .max(prof.power_ref * horizon / JOULES_PER_KWH)
                    .max(1e-9);
                model.blocks.push(TrajectoryBlock {
                    profile: k,
                    n,
                    power,
                    current,
                    soc,
                    energy_ref_kwh,
                    current_ref,
                });
            }
        }

        let voltage_ref = models
            .iter()
            .map(|m| m.series_seed * m.cell.nominal_voltage.value())
            .fold(1.0, f64::max);
        let energy_floor_kwh = profile_data
            .iter()
            .map(|p| p.required_energy_kwh)
            .fold(0.0, f64::max);

        let label = match options.chemistries {
            ChemistrySet::Both => "hybrid".to_string(),
            ChemistrySet::HighEnergyOnly => "monotype HE".to_string(),
            ChemistrySet::HighPowerOnly => "monotype HP".to_string(),
        };

        let mut problem = Self {
            label,
            options: options.clone(),
            profiles: profile_data,
            models,
            lb: layout.lb,
            ub: layout.ub,
            scales: layout.scales,
            x0: Vec::new(),
            voltage_ref,
            energy_floor_kwh,
        };
        problem.x0 = problem.simulate_seed(share);

        debug!(
            label = %problem.label,
            n_var = problem.lb.len(),
            profiles = problem.profiles.len(),
            "built sizing model"
        );
        Ok(problem)
    }

    /// Rename the stage for logs and progress reports.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn chemistries(&self) -> Vec<Chemistry> {
        self.models.iter().map(|m| m.chemistry).collect()
    }

    /// How a topology quantity entered the model, `None` if the chemistry is absent.
    pub fn slot(&self, chemistry: Chemistry, axis: TopologyAxis) -> Option<Slot> {
        self.models
            .iter()
            .find(|m| m.chemistry == chemistry)
            .map(|m| match axis {
                TopologyAxis::Series => m.series,
                TopologyAxis::Parallel => m.parallel,
            })
    }

    // ========================================================================
    // INITIAL POINTS
    // ========================================================================

    /// Forward-simulate the seeded topology with an even power split.
    fn simulate_seed(&self, share: f64) -> Vec<f64> {
        let mut x = vec![0.0; self.lb.len()];
        for model in &self.models {
            if let Slot::Var(j) = model.series {
                x[j] = model.series_seed;
            }
            if let Slot::Var(j) = model.parallel {
                x[j] = model.parallel_seed;
            }
        }
        for model in &self.models {
            let s = model.series_seed;
            let energy_j = s * model.parallel_seed * model.cell.energy_kwh() * JOULES_PER_KWH;
            for block in &model.blocks {
                let prof = &self.profiles[block.profile];
                let mut soc = self.options.initial_soc;
                for i in 0..block.n {
                    let power = share * prof.power[i];
                    let (u, _) = self.cell_voltage(model, soc);
                    let v = s * u;
                    x[block.p(i)] = power;
                    x[block.i(i)] = if v > 0.0 { power / v } else { 0.0 };
                    if energy_j > 0.0 {
                        soc -= power * prof.dt[i] / energy_j;
                    }
                    soc = soc.clamp(self.options.soc_min, self.options.soc_max);
                    x[block.soc(i + 1)] = soc;
                }
            }
        }
        x
    }

    /// Start point taken from an earlier solve of a compatible model.
    ///
    /// Topology values are clipped into this model's bounds; trajectories
    /// are copied when the profile lengths match and simulated otherwise.
    pub fn warm_start_from(&self, previous: &Solution) -> Vec<f64> {
        let mut x = self.x0.clone();
        for model in &self.models {
            let Some(prev) = previous.chemistry(model.chemistry) else {
                continue;
            };
            if let Slot::Var(j) = model.series {
                x[j] = prev.topology.series.clamp(self.lb[j], self.ub[j]);
            }
            if let Slot::Var(j) = model.parallel {
                x[j] = prev.topology.parallel.clamp(self.lb[j], self.ub[j]);
            }
            for (block, traj) in model.blocks.iter().zip(&prev.trajectories) {
                if traj.power_w.len() != block.n || traj.soc.len() != block.n + 1 {
                    continue;
                }
                for i in 0..block.n {
                    x[block.p(i)] = traj.power_w[i];
                    x[block.i(i)] = traj.current_a[i];
                    x[block.soc(i + 1)] = traj.soc[i + 1];
                }
            }
        }
        x
    }

    // ========================================================================
    // EXTRACTION
    // ========================================================================

    /// Read variable values back into per-chemistry topology and trajectories.
    pub fn extract(&self, nlp: &NlpSolution) -> Solution {
        let x = &nlp.x;
        let chemistries = self
            .models
            .iter()
            .map(|model| ChemistrySolution {
                chemistry: model.chemistry,
                topology: PackTopology::new(model.series.value(x), model.parallel.value(x)),
                trajectories: model
                    .blocks
                    .iter()
                    .map(|block| {
                        let mut soc = Vec::with_capacity(block.n + 1);
                        soc.push(self.options.initial_soc);
                        soc.extend_from_slice(&x[block.soc(1)..block.soc(1) + block.n]);
                        TrajectoryState {
                            profile: self.profiles[block.profile].name.clone(),
                            power_w: x[block.power..block.power + block.n].to_vec(),
                            current_a: x[block.current..block.current + block.n].to_vec(),
                            soc,
                        }
                    })
                    .collect(),
            })
            .collect();

        Solution {
            label: self.label.clone(),
            status: nlp.status,
            objective_value: nlp.objective,
            max_violation: nlp.max_violation,
            iterations: nlp.iterations,
            solve_time_ms: nlp.solve_time_ms,
            chemistries,
        }
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn soc_value(&self, block: &TrajectoryBlock, x: &[f64], i: usize) -> f64 {
        if i == 0 {
            self.options.initial_soc
        } else {
            x[block.soc(i)]
        }
    }

    /// Per-cell voltage and its SOC derivative under the configured model.
    fn cell_voltage(&self, model: &ChemistryModel, soc: f64) -> (f64, f64) {
        match self.options.voltage_model {
            VoltageModel::OpenCircuit => model.cell.ocv.eval_with_derivative(soc),
            VoltageModel::Nominal => (model.cell.nominal_voltage.value(), 0.0),
        }
    }

    fn model(&self, chemistry: Chemistry) -> Option<&ChemistryModel> {
        self.models.iter().find(|m| m.chemistry == chemistry)
    }
}

/// Parallel count that lets `share` of every profile run from the initial
/// SOC down to SOC_min within the current limit, with some headroom.
fn heuristic_parallel(
    cell: &CellParameters,
    series: f64,
    profiles: &[ProfileData],
    share: f64,
    options: &BuildOptions,
) -> f64 {
    let usable = (options.initial_soc - options.soc_min).max(0.05);
    let v_low = series
        * match options.voltage_model {
            VoltageModel::OpenCircuit => cell.ocv.eval_linear(options.soc_min),
            VoltageModel::Nominal => cell.nominal_voltage.value(),
        };
    let string_energy = series * cell.energy_kwh();

    let mut parallel = MIN_PARALLEL_SEED;
    for prof in profiles {
        let discharge_j: f64 = prof
            .power
            .iter()
            .zip(&prof.dt)
            .map(|(p, dt)| p.max(0.0) * dt)
            .sum();
        let by_energy = share * discharge_j / JOULES_PER_KWH / (usable * string_energy);
        let by_current = share * prof.power_ref / (v_low * cell.max_current.value());
        parallel = parallel.max(by_energy.max(by_current) * SEED_MARGIN);
    }
    parallel
}

// ============================================================================
// NONLINEAR PROGRAM
// ============================================================================

impl NonlinearProgram for SizingProblem {
    fn n_var(&self) -> usize {
        self.lb.len()
    }

    fn initial_point(&self) -> Vec<f64> {
        self.x0.clone()
    }

    fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (self.lb.clone(), self.ub.clone())
    }

    fn variable_scales(&self) -> Vec<f64> {
        self.scales.clone()
    }

    /// Σ_c unit_cost_c · series_c · parallel_c
    fn objective(&self, x: &[f64]) -> f64 {
        self.models
            .iter()
            .map(|m| m.cell.unit_cost * m.series.value(x) * m.parallel.value(x))
            .sum()
    }

    fn objective_gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; x.len()];
        for m in &self.models {
            let (s, p) = (m.series.value(x), m.parallel.value(x));
            if let Slot::Var(j) = m.series {
                grad[j] += m.cell.unit_cost * p;
            }
            if let Slot::Var(j) = m.parallel {
                grad[j] += m.cell.unit_cost * s;
            }
        }
        grad
    }

    fn visit_equalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
        let mut gradient: Vec<(usize, f64)> = Vec::with_capacity(8);

        // Power balance per profile and sample
        for (k, prof) in self.profiles.iter().enumerate() {
            let inv_ref = 1.0 / prof.power_ref;
            for i in 0..prof.power.len() {
                gradient.clear();
                let mut value = -prof.power[i];
                for m in &self.models {
                    let j = m.blocks[k].p(i);
                    value += x[j];
                    gradient.push((j, inv_ref));
                }
                visit(value * inv_ref, &gradient);
            }
        }

        for m in &self.models {
            let s = m.series.value(x);
            let p = m.parallel.value(x);
            let e_cell = m.cell.energy_kwh();
            let energy = s * p * e_cell;

            for block in &m.blocks {
                let prof = &self.profiles[block.profile];
                let e_ref = block.energy_ref_kwh;
                let inv_ref_j = 1.0 / (e_ref * JOULES_PER_KWH);

                // SOC recursion
                for i in 0..block.n {
                    gradient.clear();
                    let delta = x[block.soc(i + 1)] - self.soc_value(block, x, i);
                    let power = x[block.p(i)];
                    let value = delta * energy / e_ref + power * prof.dt[i] * inv_ref_j;
                    gradient.push((block.soc(i + 1), energy / e_ref));
                    if i > 0 {
                        gradient.push((block.soc(i), -energy / e_ref));
                    }
                    gradient.push((block.p(i), prof.dt[i] * inv_ref_j));
                    if let Slot::Var(j) = m.series {
                        gradient.push((j, delta * p * e_cell / e_ref));
                    }
                    if let Slot::Var(j) = m.parallel {
                        gradient.push((j, delta * s * e_cell / e_ref));
                    }
                    visit(value, &gradient);
                }

                // Current from power and pack voltage
                let inv_p = 1.0 / prof.power_ref;
                for i in 0..block.n {
                    gradient.clear();
                    let soc = self.soc_value(block, x, i);
                    let (u, du) = self.cell_voltage(m, soc);
                    let current = x[block.i(i)];
                    let value = (current * s * u - x[block.p(i)]) * inv_p;
                    gradient.push((block.i(i), s * u * inv_p));
                    gradient.push((block.p(i), -inv_p));
                    if let Slot::Var(j) = m.series {
                        gradient.push((j, current * u * inv_p));
                    }
                    if i > 0 && du != 0.0 {
                        gradient.push((block.soc(i), current * s * du * inv_p));
                    }
                    visit(value, &gradient);
                }
            }
        }
    }

    fn visit_inequalities(&self, x: &[f64], visit: &mut dyn FnMut(f64, &[(usize, f64)])) {
        let mut gradient: Vec<(usize, f64)> = Vec::with_capacity(4);

        // Current limits
        for m in &self.models {
            let p = m.parallel.value(x);
            let i_max = m.cell.max_current.value();
            let i_charge = m.cell.charge_current_limit().value();
            for block in &m.blocks {
                let inv_ref = 1.0 / block.current_ref;
                for i in 0..block.n {
                    let current = x[block.i(i)];
                    gradient.clear();
                    gradient.push((block.i(i), inv_ref));
                    if let Slot::Var(j) = m.parallel {
                        gradient.push((j, -i_max * inv_ref));
                    }
                    visit((current - p * i_max) * inv_ref, &gradient);

                    if self.options.allow_negative_power {
                        gradient.clear();
                        gradient.push((block.i(i), -inv_ref));
                        if let Slot::Var(j) = m.parallel {
                            gradient.push((j, -i_charge * inv_ref));
                        }
                        visit((-current - p * i_charge) * inv_ref, &gradient);
                    }
                }
            }
        }

        // Pack voltage matching
        if let VoltageMode::Matched { tolerance } = self.options.voltage {
            if let (Some(he), Some(hp)) = (
                self.model(Chemistry::HighEnergy),
                self.model(Chemistry::HighPower),
            ) {
                let v_he = he.cell.nominal_voltage.value();
                let v_hp = hp.cell.nominal_voltage.value();
                let (s_he, s_hp) = (he.series.value(x), hp.series.value(x));
                let diff = s_he * v_he - s_hp * v_hp;
                let (tol, dtol_he, dtol_hp) = match tolerance {
                    VoltageTolerance::Absolute(volts) => (volts, 0.0, 0.0),
                    VoltageTolerance::Relative(frac) => (
                        frac * 0.5 * (s_he * v_he + s_hp * v_hp),
                        frac * 0.5 * v_he,
                        frac * 0.5 * v_hp,
                    ),
                };
                let inv = 1.0 / self.voltage_ref;
                for sign in [1.0, -1.0] {
                    gradient.clear();
                    if let Slot::Var(j) = he.series {
                        gradient.push((j, (sign * v_he - dtol_he) * inv));
                    }
                    if let Slot::Var(j) = hp.series {
                        gradient.push((j, (-sign * v_hp - dtol_hp) * inv));
                    }
                    visit((sign * diff - tol) * inv, &gradient);
                }
            }
        }

        // Minimum installed energy
        if self.options.energy_floor && self.energy_floor_kwh > 0.0 {
            let floor = self.energy_floor_kwh;
            let mut total = 0.0;
            gradient.clear();
            for m in &self.models {
                let (s, p, e) = (m.series.value(x), m.parallel.value(x), m.cell.energy_kwh());
                total += s * p * e;
                if let Slot::Var(j) = m.series {
                    gradient.push((j, -p * e / floor));
                }
                if let Slot::Var(j) = m.parallel {
                    gradient.push((j, -s * e / floor));
                }
            }
            visit((floor - total) / floor, &gradient);
        }
    }
}
