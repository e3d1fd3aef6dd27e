// gkeg/src/cli.rs
//! Command-line argument structure.
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use gkeg_common::config::Config;
use gkeg_common::error::Result;
use gkeg_common::formulary::{Formulary, LIBGUESTFS};
use gkeg_common::Formula;

pub mod caveats;
pub mod deps;
pub mod doctor;
pub mod info;
pub mod install;
pub mod steps;

use crate::cli::caveats::Caveats;
use crate::cli::deps::Deps;
use crate::cli::doctor::Doctor;
use crate::cli::info::Info;
use crate::cli::install::InstallArgs;
use crate::cli::steps::Steps;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "gkeg", bin_name = "gkeg")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build libguestfs from source and install it into its keg
    Install(InstallArgs),
    /// Show the dependency set for a platform
    Deps(Deps),
    /// Check external requirements, dependencies and build tools
    Doctor(Doctor),
    /// Show the formula
    Info(Info),
    /// Print post-install guidance
    Caveats(Caveats),
    /// Print the planned build steps without running them
    Steps(Steps),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Deps(command) => command.run(config),
            Self::Doctor(command) => command.run(config),
            Self::Info(command) => command.run(config),
            Self::Caveats(command) => command.run(config),
            Self::Steps(command) => command.run(config),
        }
    }
}

pub(crate) fn load_formula(config: &Config) -> Result<Formula> {
    Formulary::new(config.clone()).load_formula(LIBGUESTFS)
}

pub(crate) fn print_header(text: &str) {
    println!("{}{}", "==> ".bold().blue(), text.bold());
}
