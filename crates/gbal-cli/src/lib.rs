pub mod areas;
pub mod cli;
pub mod common;

pub use areas::{AreaConfig, AreasConfig, BoundaryConfig, ScalableConfig};
pub use cli::{build_cli_command, Cli, Commands, PowerFlowCommands};
