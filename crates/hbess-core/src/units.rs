//! Unit newtypes for battery quantities.
//!
//! Cell datasheets mix ampere-hours, volts, amperes and kilowatt-hours.
//! Keeping them in distinct wrappers stops a capacity from being passed
//! where a current is expected.
//!
//! All wrappers are `#[repr(transparent)]` and serialize as a bare number, so
//! config files stay readable:
//!
//! ```
//! use hbess_core::units::{AmpereHours, Volts};
//!
//! let capacity = AmpereHours(94.0);
//! let voltage = Volts(3.67);
//! let energy = capacity * voltage;
//! assert!((energy.value() - 0.34498).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Display with the unit symbol and raw access, shared by every unit type.
macro_rules! impl_unit {
    ($type:ty, $unit_name:literal) => {
        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Raw numeric value in the type's base unit
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }
        }
    };
}

/// Charge capacity in ampere-hours (Ah)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AmpereHours(pub f64);

impl_unit!(AmpereHours, "Ah");

/// Electric potential in volts (V)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Volts(pub f64);

impl_unit!(Volts, "V");

/// Current in amperes (A). Positive means discharge.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit!(Amperes, "A");

/// Energy in kilowatt-hours (kWh)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KilowattHours(pub f64);

impl_unit!(KilowattHours, "kWh");

/// Joules per kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3.6e6;

impl Mul<Volts> for AmpereHours {
    type Output = KilowattHours;

    /// Ah x V = Wh, reported in kWh.
    fn mul(self, rhs: Volts) -> Self::Output {
        KilowattHours(self.0 * rhs.0 / 1000.0)
    }
}
