//! End-to-end sizing scenarios on the built-in cell presets.
//!
//! A flat 10 kW demand over eleven 360 s intervals needs 11 kWh; with the
//! default SOC window of 0.8 that is 13.75 kWh of installed HE energy.

use hbess_algo::sizing::{self, OverrideBound, TopologyAxis, TopologyOverride};
use hbess_algo::{
    size_hybrid_pack, BuildOptions, CancelToken, ChemistrySet, NlpStatus, Refinement,
    RunStatus, SizingError, SizingProblem, SizingRequest, Solution, SolveControl, SolverConfig,
    VoltageMode, VoltageModel, VoltageTolerance,
};
use hbess_core::{CellPair, Chemistry, LoadProfile};

fn flat(power_w: f64) -> LoadProfile {
    LoadProfile::constant("flat", power_w, 3600.0, 360.0).unwrap()
}

fn fixed_600() -> BuildOptions {
    BuildOptions::default().with_fixed_voltage(600.0)
}

/// HE cells needed for 13.75 kWh at 163 in series.
const HE_PARALLEL_10KW: f64 = 13.75 / (163.0 * 94.0 * 3.67 / 1000.0);

#[test]
fn flat_load_fixed_voltage_is_optimal_and_physical() {
    let cells = CellPair::default();
    let profile = flat(10_000.0);
    let problem = SizingProblem::build(&cells, &[profile.clone()], &fixed_600()).unwrap();
    let solution = sizing::solve(&problem, &SolverConfig::default(), &SolveControl::default())
        .unwrap();

    assert_eq!(solution.status, NlpStatus::Optimal);
    assert_eq!(solution.topology(Chemistry::HighEnergy).series, 163.0);
    assert_eq!(solution.topology(Chemistry::HighPower).series, 261.0);

    let he = solution.chemistry(Chemistry::HighEnergy).unwrap();
    let hp = solution.chemistry(Chemistry::HighPower).unwrap();
    let (he_traj, hp_traj) = (&he.trajectories[0], &hp.trajectories[0]);

    for (i, demand) in profile.powers().iter().enumerate() {
        let supplied = he_traj.power_w[i] + hp_traj.power_w[i];
        assert!((supplied - demand).abs() <= 1.0, "sample {i}: {supplied} vs {demand}");
    }
    for chem in [he, hp] {
        let traj = &chem.trajectories[0];
        assert_eq!(traj.soc.len(), profile.len() + 1);
        assert!((traj.soc[0] - 0.9).abs() < 1e-12);
        for &soc in &traj.soc {
            assert!((0.1 - 1e-4..=0.9 + 1e-4).contains(&soc), "soc {soc}");
        }
        let rated = chem.topology.current_limit(cells.get(chem.chemistry));
        for &current in &traj.current_a {
            assert!(current <= rated * (1.0 + 1e-3) + 1e-2);
        }
    }

    // Energy-bound design: the cheaper-per-kWh chemistry takes everything.
    let p_he = solution.topology(Chemistry::HighEnergy).parallel;
    assert!((p_he - HE_PARALLEL_10KW).abs() / HE_PARALLEL_10KW < 0.03, "p_he {p_he}");
    assert!(solution.topology(Chemistry::HighPower).parallel < 0.05);
}

fn solve_optimal(cells: &CellPair, profile: &LoadProfile, options: &BuildOptions) -> Solution {
    let problem = SizingProblem::build(cells, &[profile.clone()], options).unwrap();
    let solution = sizing::solve(&problem, &SolverConfig::default(), &SolveControl::default())
        .unwrap();
    assert_eq!(solution.status, NlpStatus::Optimal, "{}", solution.max_violation);
    solution
}

fn assert_balanced(solution: &Solution, profile: &LoadProfile) {
    for (i, demand) in profile.powers().iter().enumerate() {
        let supplied: f64 = solution
            .chemistries
            .iter()
            .map(|c| c.trajectories[0].power_w[i])
            .sum();
        assert!(
            (supplied - demand).abs() <= 1.0 + 1e-4 * demand.abs(),
            "sample {i}: {supplied} vs {demand}"
        );
    }
}

#[test]
fn matched_pack_voltages_agree_within_tolerance() {
    let cells = CellPair::default();
    let profile = flat(40_000.0);
    let options = BuildOptions {
        voltage: VoltageMode::Matched {
            tolerance: VoltageTolerance::Absolute(20.0),
        },
        ..BuildOptions::default()
    };
    let solution = solve_optimal(&cells, &profile, &options);
    assert_balanced(&solution, &profile);

    let v_he = solution.topology(Chemistry::HighEnergy).series * 3.67;
    let v_hp = solution.topology(Chemistry::HighPower).series * 2.3;
    assert!(v_he > 0.0 && v_hp > 0.0);
    assert!((v_he - v_hp).abs() <= 20.0 + 0.5, "V_HE {v_he} vs V_HP {v_hp}");
}

#[test]
fn relative_matching_scales_with_pack_voltage() {
    let cells = CellPair::default();
    let profile = flat(40_000.0);
    let options = BuildOptions {
        voltage: VoltageMode::Matched {
            tolerance: VoltageTolerance::Relative(0.05),
        },
        ..BuildOptions::default()
    };
    let solution = solve_optimal(&cells, &profile, &options);

    let v_he = solution.topology(Chemistry::HighEnergy).series * 3.67;
    let v_hp = solution.topology(Chemistry::HighPower).series * 2.3;
    let allowed = 0.05 * 0.5 * (v_he + v_hp);
    assert!(
        (v_he - v_hp).abs() <= allowed * (1.0 + 1e-3) + 0.5,
        "V_HE {v_he} vs V_HP {v_hp}, allowed {allowed}"
    );
}

#[test]
fn regenerative_load_charges_within_current_limits() {
    let cells = CellPair::default();
    let times: Vec<f64> = (0..=10).map(|k| k as f64 * 360.0).collect();
    let powers = [
        20_000.0, 20_000.0, -8_000.0, -8_000.0, 30_000.0, 30_000.0, -5_000.0, 10_000.0,
        10_000.0, -10_000.0, 20_000.0,
    ];
    let profile = LoadProfile::from_columns("regen", &times, &powers).unwrap();
    let options = BuildOptions {
        allow_negative_power: true,
        ..fixed_600()
    };
    let solution = solve_optimal(&cells, &profile, &options);
    assert_balanced(&solution, &profile);

    for chem in &solution.chemistries {
        let cell = cells.get(chem.chemistry);
        let p = chem.topology.parallel;
        let traj = &chem.trajectories[0];
        for &current in &traj.current_a {
            let floor = -p * cell.charge_current_limit().value();
            let ceiling = p * cell.max_current.value();
            assert!(current >= floor * (1.0 + 1e-3) - 1e-2, "{current} below {floor}");
            assert!(current <= ceiling * (1.0 + 1e-3) + 1e-2, "{current} above {ceiling}");
        }
        for &soc in &traj.soc {
            assert!((0.1 - 1e-4..=0.9 + 1e-4).contains(&soc), "soc {soc}");
        }
    }

    // Negative demand has to be absorbed by at least one pack
    for (i, demand) in powers.iter().enumerate().filter(|(_, d)| **d < 0.0) {
        let lowest = solution
            .chemistries
            .iter()
            .map(|c| c.trajectories[0].power_w[i])
            .fold(f64::INFINITY, f64::min);
        assert!(lowest < 0.0, "sample {i}: demand {demand}, lowest pack power {lowest}");
    }
}

#[test]
fn nominal_voltage_model_derives_current_from_rated_voltage() {
    let cells = CellPair::default();
    let profile = flat(10_000.0);
    let options = BuildOptions {
        voltage_model: VoltageModel::Nominal,
        ..fixed_600()
    };
    let solution = solve_optimal(&cells, &profile, &options);
    assert_balanced(&solution, &profile);

    for chem in &solution.chemistries {
        let v_cell = cells.get(chem.chemistry).nominal_voltage.value();
        let series = chem.topology.series;
        let traj = &chem.trajectories[0];
        for (i, (&current, &power)) in traj.current_a.iter().zip(&traj.power_w).enumerate() {
            let delivered = current * series * v_cell;
            assert!(
                (delivered - power).abs() <= 1.0,
                "{} sample {i}: I·V = {delivered} vs P = {power}",
                chem.chemistry.label()
            );
        }
    }

    // Still energy-bound, so the nominal model sizes like the OCV one
    let p_he = solution.topology(Chemistry::HighEnergy).parallel;
    assert!((p_he - HE_PARALLEL_10KW).abs() / HE_PARALLEL_10KW < 0.03, "p_he {p_he}");
}

#[test]
fn dearer_cells_never_lower_cost() {
    let profile = flat(10_000.0);
    let base = CellPair::default();
    let mut dear = base.clone();
    dear.high_energy.unit_cost = 80.0;

    let cost = |cells: &CellPair| {
        let problem = SizingProblem::build(cells, &[profile.clone()], &fixed_600()).unwrap();
        sizing::solve(&problem, &SolverConfig::default(), &SolveControl::default())
            .unwrap()
            .require_optimal()
            .unwrap()
            .objective_value
    };
    let (cheap_cost, dear_cost) = (cost(&base), cost(&dear));
    assert!(dear_cost >= cheap_cost, "{dear_cost} < {cheap_cost}");
}

#[test]
fn refinement_rounds_to_whole_cells() {
    let mut request = SizingRequest::new(CellPair::default(), vec![flat(120_000.0)]);
    request.options = fixed_600();
    request.discretize = true;

    let outcome = size_hybrid_pack(&request, &SolveControl::default()).unwrap();
    let Some(Refinement::Integer { design, discrete }) = &outcome.refinement else {
        panic!("expected an integer design, got {:?}", outcome.refinement);
    };

    let he = discrete.pack(Chemistry::HighEnergy).unwrap();
    assert_eq!((he.series, he.parallel), (163, 3));
    assert!(!he.excluded);

    let hp = discrete.pack(Chemistry::HighPower).unwrap();
    assert_eq!((hp.series, hp.parallel), (0, 0));
    assert!(hp.excluded);

    assert!((discrete.total_cost - 163.0 * 3.0 * 62.0).abs() < 1e-9);
    assert!(discrete.total_cost >= outcome.relaxed.total_cost - 1e-6);
    assert_eq!(design.total_cost, discrete.total_cost);
    assert!(outcome.final_design().is_some());
}

#[test]
fn undersized_window_reports_infeasible() {
    let window = |chemistry| TopologyOverride {
        chemistry,
        axis: TopologyAxis::Parallel,
        bound: OverrideBound::Window { min: 0.0, max: 1.0 },
    };
    let mut request = SizingRequest::new(CellPair::default(), vec![flat(200_000.0)]);
    request.options = fixed_600()
        .with_override(window(Chemistry::HighEnergy))
        .with_override(window(Chemistry::HighPower));
    request.solver.max_inner_iterations = 1000;

    // 200 kW against at most one string of each chemistry: 145 kW of current
    // headroom and 56 kWh of HE energy, so no budget can fix it
    let err = size_hybrid_pack(&request, &SolveControl::default()).unwrap_err();
    assert!(
        matches!(err, SizingError::Infeasible { .. }),
        "expected Infeasible, got {err}"
    );
    assert_eq!(err.status(), RunStatus::Infeasible);
}

#[test]
fn monotype_baselines_bracket_the_hybrid() {
    let mut request = SizingRequest::new(CellPair::default(), vec![flat(10_000.0)]);
    request.options = fixed_600();
    request.monotype_baselines = true;

    let outcome = size_hybrid_pack(&request, &SolveControl::default()).unwrap();
    assert_eq!(outcome.baselines.len(), 2);
    assert!(outcome.refinement.is_none());

    let costs: Vec<f64> = outcome
        .baselines
        .iter()
        .map(|b| {
            assert_eq!(b.status, RunStatus::Optimal, "{:?}", b.message);
            b.design.as_ref().unwrap().total_cost
        })
        .collect();
    let best_single = costs.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(outcome.relaxed.total_cost <= best_single * 1.02);
    // HP energy costs roughly four times HE energy.
    assert!(costs[1] > costs[0]);

    let hp_only = outcome.baselines[1].design.as_ref().unwrap();
    assert_eq!(hp_only.pack(Chemistry::HighEnergy).unwrap().cost, 0.0);
}

#[test]
fn single_chemistry_request_skips_baselines() {
    let mut request = SizingRequest::new(CellPair::default(), vec![flat(10_000.0)]);
    request.options = fixed_600().with_chemistries(ChemistrySet::HighEnergyOnly);
    request.monotype_baselines = true;

    let outcome = size_hybrid_pack(&request, &SolveControl::default()).unwrap();
    assert!(outcome.baselines.is_empty());
    assert_eq!(outcome.relaxed.pack(Chemistry::HighPower).unwrap().series, 0.0);
}

#[test]
fn cancelled_run_stops_early() {
    let token = CancelToken::new();
    token.cancel();
    let control = SolveControl::new().with_cancel(token);

    let request = SizingRequest::new(CellPair::default(), vec![flat(10_000.0)]);
    let err = size_hybrid_pack(&request, &control).unwrap_err();
    assert!(matches!(err, SizingError::Cancelled));
    assert_eq!(err.status(), RunStatus::Cancelled);
}

#[test]
fn short_profile_is_invalid_input() {
    let one_sample = LoadProfile::from_columns("short", &[0.0], &[1.0]);
    assert!(one_sample.is_err());
}
