//! Cell parameter files.
//!
//! A file holds the cell pair:
//!
//! ```toml
//! [high_energy]
//! name = "NMC 94Ah"
//! rated_capacity = 94.0
//! nominal_voltage = 3.67
//! max_current = 150.0
//! unit_cost = 62.0
//! ocv = { soc = [0.0, 0.5, 1.0], voltage = [3.4, 3.7, 4.1] }
//!
//! [high_power]
//! # ...
//! ```
//!
//! A pair file may leave either table out; the missing side falls back to
//! its built-in preset.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use hbess_core::{CellPair, CellParameters, Chemistry};
use serde::Deserialize;
use tracing::debug;

/// Supported cell file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Toml,
    Json,
}

impl CellFormat {
    pub const ALL: &'static [CellFormat] = &[CellFormat::Toml, CellFormat::Json];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CellFormat::Toml => &["toml"],
            CellFormat::Json => &["json"],
        }
    }

    /// Format from a file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, text: &str) -> Result<T> {
        match self {
            CellFormat::Toml => Ok(toml::from_str(text)?),
            CellFormat::Json => Ok(serde_json::from_str(text)?),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CellPairFile {
    high_energy: Option<CellParameters>,
    high_power: Option<CellParameters>,
}

impl CellPairFile {
    fn into_pair(self) -> CellPair {
        CellPair {
            high_energy: self
                .high_energy
                .unwrap_or_else(|| CellParameters::preset(Chemistry::HighEnergy)),
            high_power: self
                .high_power
                .unwrap_or_else(|| CellParameters::preset(Chemistry::HighPower)),
        }
    }
}

fn read_with_format(path: &Path) -> Result<(CellFormat, String)> {
    let format = CellFormat::from_path(path).ok_or_else(|| {
        anyhow!(
            "unsupported cell file extension: {} (expected .toml or .json)",
            path.display()
        )
    })?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading cell file: {}", path.display()))?;
    Ok((format, text))
}

/// Parse a pair of cells from text.
pub fn parse_cell_pair(format: CellFormat, text: &str) -> Result<CellPair> {
    let file: CellPairFile = format.parse(text)?;
    if file.high_energy.is_none() && file.high_power.is_none() {
        bail!("cell file defines neither high_energy nor high_power");
    }
    let pair = file.into_pair();
    pair.validate()?;
    Ok(pair)
}

pub fn load_cell_pair(path: &Path) -> Result<CellPair> {
    let (format, text) = read_with_format(path)?;
    let pair = parse_cell_pair(format, &text)
        .with_context(|| format!("loading cell pair from {}", path.display()))?;
    debug!(
        high_energy = %pair.high_energy.name,
        high_power = %pair.high_power.name,
        "loaded cell pair"
    );
    Ok(pair)
}
