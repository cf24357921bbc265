use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::common::{LinearSolver, OutputFormat};
use gbal_algo::BalanceType;

#[derive(Parser, Debug)]
#[command(name = "gbal", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Adjust injections until every area reaches its target net position
    Balance {
        /// Network case file (JSON)
        case: PathBuf,
        /// Area definitions (JSON)
        #[arg(short, long)]
        areas: PathBuf,
        /// Balance computation parameters (JSON); defaults when omitted
        #[arg(short, long)]
        parameters: Option<PathBuf>,
        /// Override the net position threshold (MW)
        #[arg(long)]
        threshold: Option<f64>,
        /// Override the maximum number of iterations
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Scale once from static injection balances, without any load flow
        #[arg(long)]
        single_pass: bool,
        /// Write the balanced case here
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Threading hint (`auto` or integer)
        #[arg(long, default_value = "auto")]
        threads: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the net position of each area
    NetPosition {
        /// Network case file (JSON)
        case: PathBuf,
        /// Area definitions (JSON)
        #[arg(short, long)]
        areas: PathBuf,
        /// Run a DC load flow before measuring
        #[arg(long)]
        solve: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Load flow
    Pf {
        #[command(subcommand)]
        command: PowerFlowCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PowerFlowCommands {
    /// Run a DC load flow on a case
    Dc {
        /// Network case file (JSON)
        case: PathBuf,
        /// Write the solved case here
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Linear solver backend
        #[arg(long, value_enum, default_value_t = LinearSolver::Gauss)]
        solver: LinearSolver,
        /// Put the whole imbalance on the reference bus
        #[arg(long)]
        no_distributed_slack: bool,
        /// How the imbalance is distributed
        #[arg(long, value_enum, default_value_t = SlackDistribution::GenerationPMax)]
        balance_type: SlackDistribution,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlackDistribution {
    /// Generators, in proportion to Pmax
    GenerationPMax,
    /// Generators, in proportion to their target P
    GenerationP,
    /// Loads, in proportion to P0
    Load,
}

impl From<SlackDistribution> for BalanceType {
    fn from(value: SlackDistribution) -> Self {
        match value {
            SlackDistribution::GenerationPMax => BalanceType::ProportionalToGenerationPMax,
            SlackDistribution::GenerationP => BalanceType::ProportionalToGenerationP,
            SlackDistribution::Load => BalanceType::ProportionalToLoad,
        }
    }
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
