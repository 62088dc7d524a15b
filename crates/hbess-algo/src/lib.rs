//! # hbess-algo: Hybrid Battery Pack Sizing
//!
//! Sizes a battery pack built from two chemistries, one energy-dense (HE) and
//! one power-dense (HP), so that a set of load profiles can be served at
//! minimum procurement cost.
//!
//! ## Stages
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Model build | [`SizingProblem::build`] | Continuous nonlinear program |
//! | Solve | [`sizing::solve`] | [`Solution`] with an [`NlpStatus`] |
//! | Refine | [`refine`] | [`DiscreteDesign`] with whole-cell counts |
//! | Report | [`extract`], [`DesignReport`] | Pack tables and plotting series |
//!
//! [`size_hybrid_pack`] chains them and adds optional single-chemistry
//! baselines.
//!
//! ## Solver
//!
//! The [`nlp`] module holds a small augmented Lagrangian method whose inner
//! minimisation is L-BFGS from `argmin`. It works on any
//! [`NonlinearProgram`], polls a [`CancelToken`] between bounded inner runs
//! and reports progress per outer iteration.
//!
//! ## Example
//!
//! ```no_run
//! use hbess_algo::{size_hybrid_pack, SizingRequest, SolveControl};
//! use hbess_core::{CellPair, LoadProfile};
//!
//! let profile = LoadProfile::constant("flat", 10_000.0, 3600.0, 360.0)?;
//! let mut request = SizingRequest::new(CellPair::default(), vec![profile]);
//! request.options = request.options.with_fixed_voltage(600.0);
//! request.discretize = true;
//!
//! let outcome = size_hybrid_pack(&request, &SolveControl::default())?;
//! if let Some(design) = outcome.final_design() {
//!     println!("total cost {:.0}", design.total_cost);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod nlp;
pub mod sizing;

pub use error::{RunStatus, SizingError};
pub use nlp::{CancelToken, NlpStatus, NonlinearProgram, SolveControl, SolveProgress, SolverConfig};
pub use sizing::{
    extract, refine, size_hybrid_pack, Baseline, BuildOptions, ChemistrySeries, ChemistrySet,
    DesignKind, DesignReport, DiscreteDesign, DiscretePack, PackReport, ProfileSeries,
    RefineConfig, Refinement, SizingOutcome, SizingProblem, SizingRequest, Solution, VoltageMode,
    VoltageModel, VoltageTolerance,
};
