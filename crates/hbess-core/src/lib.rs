//! Core data model for hybrid battery pack sizing.
//!
//! Cell datasheets, load profiles, OCV interpolation and pack topology. Every
//! type here is plain data validated on construction; the optimization lives
//! in `hbess-algo`.

pub mod cell;
pub mod error;
pub mod load;
pub mod ocv;
pub mod topology;
pub mod units;

pub use cell::{CellPair, CellParameters, Chemistry};
pub use error::{HbessError, HbessResult};
pub use load::{LoadProfile, LoadSample};
pub use ocv::{OcvCurve, OcvTable};
pub use topology::PackTopology;
pub use units::{AmpereHours, Amperes, KilowattHours, Volts};
