//! Model-build options: which chemistries, which voltage regime, which
//! variables are pinned.

use hbess_core::{Chemistry, HbessError};
use serde::{Deserialize, Serialize};

/// Which chemistries appear in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChemistrySet {
    /// Hybrid pack
    #[default]
    Both,
    /// Monotype baseline using only the high-energy cell
    HighEnergyOnly,
    /// Monotype baseline using only the high-power cell
    HighPowerOnly,
}

impl ChemistrySet {
    pub fn only(chemistry: Chemistry) -> Self {
        match chemistry {
            Chemistry::HighEnergy => ChemistrySet::HighEnergyOnly,
            Chemistry::HighPower => ChemistrySet::HighPowerOnly,
        }
    }

    pub fn active(self) -> Vec<Chemistry> {
        match self {
            ChemistrySet::Both => Chemistry::ALL.to_vec(),
            ChemistrySet::HighEnergyOnly => vec![Chemistry::HighEnergy],
            ChemistrySet::HighPowerOnly => vec![Chemistry::HighPower],
        }
    }

    pub fn contains(self, chemistry: Chemistry) -> bool {
        self.active().contains(&chemistry)
    }

    pub fn is_hybrid(self) -> bool {
        matches!(self, ChemistrySet::Both)
    }
}

/// Allowed mismatch between the two pack voltages in matched mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageTolerance {
    /// |V_HE - V_HP| ≤ volts
    Absolute(f64),
    /// |V_HE - V_HP| ≤ fraction × mean(V_HE, V_HP)
    Relative(f64),
}

impl Default for VoltageTolerance {
    fn default() -> Self {
        VoltageTolerance::Absolute(20.0)
    }
}

/// Bus-voltage regime. Fixed and matched are exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VoltageMode {
    /// Series counts are free
    #[default]
    Free,
    /// Every string is pinned to `round(pack_voltage_v / V_cell)`
    Fixed { pack_voltage_v: f64 },
    /// Nominal pack voltages of the two chemistries must agree within a tolerance
    Matched {
        #[serde(default)]
        tolerance: VoltageTolerance,
    },
}

impl VoltageMode {
    /// Series count a fixed-voltage pack uses for a given cell voltage.
    pub fn fixed_series(&self, cell_voltage: f64) -> Option<f64> {
        match self {
            VoltageMode::Fixed { pack_voltage_v } => Some((pack_voltage_v / cell_voltage).round()),
            _ => None,
        }
    }
}

/// How pack voltage is computed when deriving current from power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageModel {
    /// V = series × OCV(SOC)
    #[default]
    OpenCircuit,
    /// V = series × nominal cell voltage
    Nominal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyAxis {
    Series,
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideBound {
    /// Variable eliminated and replaced by this value
    Fixed(f64),
    /// Variable kept, bounded to [min, max]
    Window { min: f64, max: f64 },
}

/// Pins or narrows one topology variable. Later entries win.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyOverride {
    pub chemistry: Chemistry,
    pub axis: TopologyAxis,
    pub bound: OverrideBound,
}

/// Caller-supplied starting topology for one chemistry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologySeed {
    pub chemistry: Chemistry,
    #[serde(default)]
    pub series: Option<f64>,
    #[serde(default)]
    pub parallel: Option<f64>,
}

/// Everything the model builder needs besides cells and profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub chemistries: ChemistrySet,
    pub voltage: VoltageMode,
    pub voltage_model: VoltageModel,
    /// Let one chemistry charge the other. Negative power and current are then
    /// allowed, bounded by the cells' charge current limit.
    pub allow_negative_power: bool,
    pub soc_min: f64,
    pub soc_max: f64,
    /// SOC boundary condition at t = 0
    pub initial_soc: f64,
    /// Require total nominal energy ≥ the largest required profile energy
    pub energy_floor: bool,
    pub seeds: Vec<TopologySeed>,
    pub overrides: Vec<TopologyOverride>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            chemistries: ChemistrySet::Both,
            voltage: VoltageMode::Free,
            voltage_model: VoltageModel::OpenCircuit,
            allow_negative_power: false,
            soc_min: 0.1,
            soc_max: 0.9,
            initial_soc: 0.9,
            energy_floor: false,
            seeds: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

impl BuildOptions {
    pub fn with_chemistries(mut self, chemistries: ChemistrySet) -> Self {
        self.chemistries = chemistries;
        self
    }

    pub fn with_fixed_voltage(mut self, pack_voltage_v: f64) -> Self {
        self.voltage = VoltageMode::Fixed { pack_voltage_v };
        self
    }

    pub fn with_override(mut self, over: TopologyOverride) -> Self {
        self.overrides.push(over);
        self
    }

    /// Effective bound for one topology variable, last override first.
    pub fn override_for(&self, chemistry: Chemistry, axis: TopologyAxis) -> Option<OverrideBound> {
        self.overrides
            .iter()
            .rev()
            .find(|o| o.chemistry == chemistry && o.axis == axis)
            .map(|o| o.bound)
    }

    pub fn seed_for(&self, chemistry: Chemistry) -> Option<&TopologySeed> {
        self.seeds.iter().rev().find(|s| s.chemistry == chemistry)
    }

    pub fn validate(&self) -> Result<(), HbessError> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.soc_min) || !in_unit(self.soc_max) || self.soc_min >= self.soc_max {
            return Err(HbessError::validation(format!(
                "SOC bounds must satisfy 0 <= soc_min < soc_max <= 1, got [{}, {}]",
                self.soc_min, self.soc_max
            )));
        }
        if !in_unit(self.initial_soc) {
            return Err(HbessError::validation(format!(
                "initial SOC must lie in [0, 1], got {}",
                self.initial_soc
            )));
        }
        match self.voltage {
            VoltageMode::Fixed { pack_voltage_v } if !(pack_voltage_v.is_finite() && pack_voltage_v > 0.0) => {
                return Err(HbessError::validation(format!(
                    "fixed pack voltage must be positive, got {pack_voltage_v}"
                )));
            }
            VoltageMode::Matched { tolerance } => {
                let value = match tolerance {
                    VoltageTolerance::Absolute(v) | VoltageTolerance::Relative(v) => v,
                };
                if !value.is_finite() || value < 0.0 {
                    return Err(HbessError::validation(format!(
                        "voltage matching tolerance must be non-negative, got {value}"
                    )));
                }
            }
            _ => {}
        }
        for over in &self.overrides {
            let ok = match over.bound {
                OverrideBound::Fixed(v) => v.is_finite() && v >= 0.0,
                OverrideBound::Window { min, max } => {
                    min.is_finite() && min >= 0.0 && max >= min && !max.is_nan()
                }
            };
            if !ok {
                return Err(HbessError::validation(format!(
                    "invalid {:?} override for {}: {:?}",
                    over.axis, over.chemistry, over.bound
                )));
            }
        }
        for seed in &self.seeds {
            let bad = |v: Option<f64>| v.is_some_and(|v| !v.is_finite() || v <= 0.0);
            if bad(seed.series) || bad(seed.parallel) {
                return Err(HbessError::validation(format!(
                    "seed topology for {} must be positive",
                    seed.chemistry
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_series_rounds() {
        let mode = VoltageMode::Fixed { pack_voltage_v: 600.0 };
        assert_eq!(mode.fixed_series(3.67), Some(163.0));
        assert_eq!(mode.fixed_series(2.3), Some(261.0));
        assert_eq!(VoltageMode::Free.fixed_series(3.67), None);
    }

    #[test]
    fn test_last_override_wins() {
        let opts = BuildOptions::default()
            .with_override(TopologyOverride {
                chemistry: Chemistry::HighPower,
                axis: TopologyAxis::Parallel,
                bound: OverrideBound::Fixed(2.0),
            })
            .with_override(TopologyOverride {
                chemistry: Chemistry::HighPower,
                axis: TopologyAxis::Parallel,
                bound: OverrideBound::Fixed(3.0),
            });
        assert_eq!(
            opts.override_for(Chemistry::HighPower, TopologyAxis::Parallel),
            Some(OverrideBound::Fixed(3.0))
        );
        assert_eq!(opts.override_for(Chemistry::HighEnergy, TopologyAxis::Parallel), None);
    }

    #[test]
    fn test_validate_soc_bounds() {
        let mut opts = BuildOptions::default();
        assert!(opts.validate().is_ok());
        opts.soc_min = 0.95;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_validate_window() {
        let opts = BuildOptions::default().with_override(TopologyOverride {
            chemistry: Chemistry::HighEnergy,
            axis: TopologyAxis::Series,
            bound: OverrideBound::Window { min: 5.0, max: 2.0 },
        });
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_voltage_mode_from_json() {
        let fixed: VoltageMode =
            serde_json::from_str(r#"{"mode":"fixed","pack_voltage_v":600.0}"#).unwrap();
        assert_eq!(fixed, VoltageMode::Fixed { pack_voltage_v: 600.0 });

        let matched: VoltageMode = serde_json::from_str(r#"{"mode":"matched"}"#).unwrap();
        assert_eq!(
            matched,
            VoltageMode::Matched {
                tolerance: VoltageTolerance::Absolute(20.0)
            }
        );

        let relative: VoltageMode =
            serde_json::from_str(r#"{"mode":"matched","tolerance":{"relative":0.05}}"#).unwrap();
        assert_eq!(
            relative,
            VoltageMode::Matched {
                tolerance: VoltageTolerance::Relative(0.05)
            }
        );
    }

    #[test]
    fn test_chemistry_set() {
        assert_eq!(ChemistrySet::Both.active().len(), 2);
        assert!(!ChemistrySet::HighEnergyOnly.contains(Chemistry::HighPower));
        assert_eq!(
            ChemistrySet::only(Chemistry::HighPower),
            ChemistrySet::HighPowerOnly
        );
    }
}
