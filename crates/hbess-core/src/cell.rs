//! Cell parameter sets for the two chemistries of a hybrid pack.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HbessError, HbessResult};
use crate::ocv::OcvCurve;
use crate::units::{AmpereHours, Amperes, KilowattHours, Volts};

/// Cell chemistry role within the hybrid pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chemistry {
    /// Energy-dense cell, cheap per kWh, modest current capability
    HighEnergy,
    /// Power-dense cell, high current per Ah
    HighPower,
}

impl Chemistry {
    pub const ALL: [Chemistry; 2] = [Chemistry::HighEnergy, Chemistry::HighPower];

    /// Short label used in tables and logs.
    pub fn label(self) -> &'static str {
        match self {
            Chemistry::HighEnergy => "HE",
            Chemistry::HighPower => "HP",
        }
    }
}

impl fmt::Display for Chemistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Chemistry {
    type Err = HbessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "he" | "high_energy" | "high-energy" => Ok(Chemistry::HighEnergy),
            "hp" | "high_power" | "high-power" => Ok(Chemistry::HighPower),
            other => Err(HbessError::Parse(format!(
                "unknown chemistry '{}' (expected HE or HP)",
                other
            ))),
        }
    }
}

/// Datasheet constants for one cell type.
///
/// Never mutated once a sizing run starts; the model builder borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    #[serde(default)]
    pub name: String,
    pub rated_capacity: AmpereHours,
    pub nominal_voltage: Volts,
    /// Continuous discharge current limit per cell
    pub max_current: Amperes,
    /// Charge current limit per cell; falls back to `max_current` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_charge_current: Option<Amperes>,
    /// Procurement cost per cell (currency-agnostic)
    pub unit_cost: f64,
    pub ocv: OcvCurve,
}

impl CellParameters {
    /// Nominal stored energy of one cell.
    pub fn energy(&self) -> KilowattHours {
        self.rated_capacity * self.nominal_voltage
    }

    pub fn energy_kwh(&self) -> f64 {
        self.energy().value()
    }

    pub fn charge_current_limit(&self) -> Amperes {
        self.max_charge_current.unwrap_or(self.max_current)
    }

    /// Reject non-positive or non-finite datasheet values.
    pub fn validate(&self) -> HbessResult<()> {
        let label = if self.name.is_empty() {
            "cell"
        } else {
            self.name.as_str()
        };
        let checks = [
            ("rated capacity", self.rated_capacity.value()),
            ("nominal voltage", self.nominal_voltage.value()),
            ("max current", self.max_current.value()),
            ("charge current", self.charge_current_limit().value()),
            ("unit cost", self.unit_cost),
        ];
        for (what, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(HbessError::validation(format!(
                    "{label}: {what} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// 94 Ah / 3.67 V / 150 A high-energy cell at 62 per unit.
    pub fn preset_high_energy() -> Self {
        Self {
            name: "HE reference".to_string(),
            rated_capacity: AmpereHours(94.0),
            nominal_voltage: Volts(3.67),
            max_current: Amperes(150.0),
            max_charge_current: None,
            unit_cost: 62.0,
            ocv: OcvCurve::default_high_energy(),
        }
    }

    /// 23 Ah / 2.3 V / 92 A high-power cell at 38 per unit.
    pub fn preset_high_power() -> Self {
        Self {
            name: "HP reference".to_string(),
            rated_capacity: AmpereHours(23.0),
            nominal_voltage: Volts(2.3),
            max_current: Amperes(92.0),
            max_charge_current: None,
            unit_cost: 38.0,
            ocv: OcvCurve::default_high_power(),
        }
    }

    pub fn preset(chemistry: Chemistry) -> Self {
        match chemistry {
            Chemistry::HighEnergy => Self::preset_high_energy(),
            Chemistry::HighPower => Self::preset_high_power(),
        }
    }
}

/// The two cell types a hybrid pack is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellPair {
    pub high_energy: CellParameters,
    pub high_power: CellParameters,
}

impl Default for CellPair {
    fn default() -> Self {
        Self {
            high_energy: CellParameters::preset_high_energy(),
            high_power: CellParameters::preset_high_power(),
        }
    }
}

impl CellPair {
    pub fn get(&self, chemistry: Chemistry) -> &CellParameters {
        match chemistry {
            Chemistry::HighEnergy => &self.high_energy,
            Chemistry::HighPower => &self.high_power,
        }
    }

    pub fn validate(&self) -> HbessResult<()> {
        self.high_energy.validate()?;
        self.high_power.validate()
    }
}
