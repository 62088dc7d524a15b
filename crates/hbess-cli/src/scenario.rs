//! Scenario files for `hbess size`.
//!
//! ```toml
//! [cells]
//! file = "cells.toml"          # optional; inline tables below win
//!
//! [cells.high_energy]          # optional; defaults to the built-in preset
//! rated_capacity = 94.0
//! # ...
//!
//! [[profiles]]
//! path = "profiles/urban.csv"  # relative to this file
//! name = "urban"               # optional; defaults to the file stem
//!
//! [options]
//! voltage = { mode = "fixed", pack_voltage_v = 600.0 }
//!
//! [solver]
//! max_outer_iterations = 80
//!
//! [run]
//! monotype_baselines = true
//! discretize = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hbess_algo::{BuildOptions, RefineConfig, SizingRequest, SolverConfig};
use hbess_core::{CellPair, CellParameters, LoadProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CellsSection {
    pub file: Option<PathBuf>,
    pub high_energy: Option<CellParameters>,
    pub high_power: Option<CellParameters>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub monotype_baselines: bool,
    pub discretize: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    pub cells: CellsSection,
    pub profiles: Vec<ProfileEntry>,
    pub options: BuildOptions,
    pub solver: SolverConfig,
    pub refine: RefineConfig,
    pub run: RunSection,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing scenario TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve cells and read profiles; relative paths are taken from `base_dir`.
    pub fn into_request(self, base_dir: &Path) -> Result<SizingRequest> {
        if self.profiles.is_empty() {
            bail!("scenario lists no [[profiles]]");
        }

        let mut cells = match &self.cells.file {
            Some(file) => hbess_io::load_cell_pair(&base_dir.join(file))?,
            None => CellPair::default(),
        };
        if let Some(he) = self.cells.high_energy {
            cells.high_energy = he;
        }
        if let Some(hp) = self.cells.high_power {
            cells.high_power = hp;
        }
        cells.validate().context("validating cells")?;

        let profiles = self
            .profiles
            .iter()
            .map(|entry| read_entry(base_dir, entry))
            .collect::<Result<Vec<LoadProfile>>>()?;

        self.options.validate().context("validating [options]")?;

        Ok(SizingRequest {
            cells,
            profiles,
            options: self.options,
            solver: self.solver,
            refine: self.refine,
            monotype_baselines: self.run.monotype_baselines,
            discretize: self.run.discretize,
        })
    }
}

fn read_entry(base_dir: &Path, entry: &ProfileEntry) -> Result<LoadProfile> {
    let path = base_dir.join(&entry.path);
    match &entry.name {
        Some(name) => hbess_io::read_named_profile_csv(name, &path),
        None => hbess_io::read_profile_csv(&path),
    }
}
