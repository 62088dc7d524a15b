//! # hbess-io: Input Files for Pack Sizing
//!
//! | Module | Reads |
//! |--------|-------|
//! | [`profile`] | Load profile CSV (`time (s)`, `power (W)`) |
//! | [`cells`] | Cell parameter files, TOML or JSON |

pub mod cells;
pub mod profile;

pub use cells::{load_cell_pair, parse_cell_pair, CellFormat};
pub use profile::{parse_profile_csv, read_named_profile_csv, read_profile_csv};
