pub mod cells;
pub mod profile;
pub mod report;
pub mod size;
