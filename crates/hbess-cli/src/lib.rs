pub mod cli;
pub mod scenario;

pub use cli::{Cli, Commands, OutputFormat, ProfileCommands};
pub use scenario::Scenario;
