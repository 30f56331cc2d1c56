//! # Command Line Module
//!
//! This module offers UNIX-like CLI tooling in order to facilitate
//! scripting and ergonomic use of the solver. This uses the
//! [clap](https://docs.rs/clap/latest/clap/) crate to provide standard
//! behavior, which is outlined in [this](https://clig.dev/) great guide.

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use std::path::PathBuf;

use crate::game::GameModule;

/* CLI DEFINITIONS */

/// Exhaustively solves finite two-player games tier by tier.
#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /* REQUIRED COMMANDS */
    /// Available subcommands for the main 'tiers' command.
    #[command(subcommand)]
    pub command: Commands,

    /* DEFAULTS PROVIDED */
    /// Send no output to STDOUT during successful execution.
    #[arg(short, long, group = "output")]
    pub quiet: bool,
}

/// Subcommand choices, specified as `tiers <subcommand>`.
#[derive(Subcommand)]
pub enum Commands {
    /// Solve every tier of a game bottom-up.
    Solve(SolveArgs),

    /// Check a game implementation's self-consistency without solving it.
    Test(TestArgs),

    /// Provides information about the system's offerings.
    Info(InfoArgs),
}

/* ARGUMENT AND OPTION DEFINITIONS */

/// Specifies a complete solving run over one game variant.
#[derive(Args)]
pub struct SolveArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /* OPTIONAL ARGUMENTS */
    /// Solve a specific variant of game.
    #[arg(short, long)]
    pub variant: Option<String>,

    /// Database file that solved tier tables are flushed to.
    #[arg(short, long, default_value = "solutions.db")]
    pub database: PathBuf,

    /// Re-solve tiers whose tables already exist.
    #[arg(short, long)]
    pub force: bool,

    /// Cross-check every solved tier against this reference database.
    #[arg(short, long)]
    pub reference: Option<PathBuf>,
}

/// Specifies a conformance-testing run over one game variant.
#[derive(Args)]
pub struct TestArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /* OPTIONAL ARGUMENTS */
    /// Test a specific variant of game.
    #[arg(short, long)]
    pub variant: Option<String>,

    /// Seed for the reproducible position sampler.
    #[arg(short, long, default_value_t = 285077)]
    pub seed: u64,
}

/// Specifies a game whose information should be printed.
#[derive(Args)]
pub struct InfoArgs {
    /// Specify the game to provide information about.
    pub target: GameModule,
}
