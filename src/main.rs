#![forbid(unsafe_code)]
//! # Execution Module
//!
//! The module which aggregates the libraries provided in `game`, `solver`,
//! and `database` to provide an entry point to all the functionality of the
//! project.
//!
//! Instead of this project's modules having an emphasized many-to-many
//! relationship, greater weight is placed on making things fit into this
//! module as a centralized point.

use anyhow::Result;
use clap::Parser;

use std::process;

use crate::database::sqlite;
use crate::game::GameData;
use crate::game::GameModule;
use crate::game::Information;
use crate::game::TierGame;
use crate::game::mnk;
use crate::game::zero_by;
use crate::interface::cli::*;

/* MODULES */

mod database;
mod game;
mod interface;
mod solver;

/* PROGRAM ENTRY */

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let ret = match &cli.command {
        Commands::Solve(args) => solve(args),
        Commands::Test(args) => test(args),
        Commands::Info(args) => info(args),
    };

    if let Err(e) = ret {
        if !cli.quiet {
            eprintln!("{e:#}");
        }

        process::exit(exitcode::USAGE)
    }

    process::exit(exitcode::OK)
}

/* SUBCOMMAND EXECUTORS */

fn solve(args: &SolveArgs) -> Result<()> {
    let game = session(args.target, &args.variant)?;
    let namer = session(args.target, &args.variant)?;
    let db = sqlite::Database::new(&args.database)?
        .with_tier_names(move |tier| namer.tier_name(tier));

    match &args.reference {
        Some(path) => {
            let namer = session(args.target, &args.variant)?;
            let reference = sqlite::Database::new(path)?
                .with_tier_names(move |tier| namer.tier_name(tier));

            solver::solve_game(
                game.as_ref(),
                &db,
                args.force,
                Some(&reference as &dyn database::Database),
            )
        },
        None => solver::solve_game(game.as_ref(), &db, args.force, None),
    }
}

fn test(args: &TestArgs) -> Result<()> {
    let game = session(args.target, &args.variant)?;
    let parents = solver::util::parent_map(game.as_ref())?;
    let order = solver::util::tier_order(game.as_ref())?;
    for &tier in &order {
        solver::tester::test_tier(
            game.as_ref(),
            tier,
            &parents[&tier],
            args.seed,
        )?;
    }

    println!(
        "No API inconsistencies found across {} canonical tiers.",
        order.len(),
    );

    Ok(())
}

fn info(args: &InfoArgs) -> Result<()> {
    let data: GameData = match args.target {
        GameModule::ZeroBy => zero_by::Session::info(),
        GameModule::Mnk => mnk::Session::info(),
    };

    println!("\t{}\n", data.name);
    println!("{}\n", data.about);
    println!("Authors: {}", data.authors);
    println!("Variant protocol: {}", data.variant_protocol);
    println!("Variant pattern: {}", data.variant_pattern);
    println!("Variant default: {}", data.variant_default);
    Ok(())
}

/* UTILITY */

fn session(
    target: GameModule,
    variant: &Option<String>,
) -> Result<Box<dyn TierGame>> {
    Ok(match target {
        GameModule::ZeroBy => {
            Box::new(zero_by::Session::new(variant.clone())?)
        },
        GameModule::Mnk => Box::new(mnk::Session::new(variant.clone())?),
    })
}
