//! # Distributed Worker Module
//!
//! In multi-node deployments an external dispatcher owns the tier schedule,
//! and each node runs the cooperative loop in this module: ask for work,
//! solve whatever tier comes back, report how it went, repeat. The
//! transport is abstracted behind a small duplex trait so the same loop
//! serves in-process channels and the network shims built on top of them.

use anyhow::Context;
use anyhow::Result;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use std::thread;
use std::time::Duration;

use crate::database::Database;
use crate::game::Tier;
use crate::game::TierGame;
use crate::solver::Outcome;
use crate::solver::solve_tier;

/* DEFINITIONS */

/// What the dispatcher can ask of a worker.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    /// No work available; ask again in a second.
    Sleep,

    /// Shut down cleanly.
    Terminate,

    /// Solve a tier, skipping it if already solved.
    Solve(Tier),

    /// Solve a tier unconditionally.
    ForceSolve(Tier),
}

/// What a worker tells the dispatcher.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Report {
    /// Ready for a command.
    Check,

    /// The tier was solved and flushed.
    Solved(Tier),

    /// The tier was already solved and left untouched.
    Loaded(Tier),

    /// Solving the tier failed; the dispatcher decides what happens next.
    Errored { tier: Tier, message: String },
}

/// A duplex link to the dispatcher.
pub trait Link {
    fn send(&self, report: Report) -> Result<()>;
    fn recv(&self) -> Result<Command>;
}

/// A [`Link`] over in-process channels, used directly in tests and single
/// -machine deployments, and wrapped by network transports otherwise.
pub struct ChannelLink {
    commands: Receiver<Command>,
    reports: Sender<Report>,
}

/* WORKER LOOP */

/// Runs the worker loop until the dispatcher terminates it or the link
/// itself fails. Tier solve failures are reported, not fatal.
pub fn run(
    game: &dyn TierGame,
    db: &dyn Database,
    link: &dyn Link,
) -> Result<()> {
    loop {
        link.send(Report::Check)?;
        match link.recv()? {
            Command::Sleep => thread::sleep(Duration::from_secs(1)),
            Command::Terminate => return Ok(()),
            Command::Solve(tier) => attempt(game, db, link, tier, false)?,
            Command::ForceSolve(tier) => attempt(game, db, link, tier, true)?,
        }
    }
}

fn attempt(
    game: &dyn TierGame,
    db: &dyn Database,
    link: &dyn Link,
    tier: Tier,
    force: bool,
) -> Result<()> {
    let report = match solve_tier(game, db, tier, force, None) {
        Ok(Outcome::Solved) => Report::Solved(tier),
        Ok(Outcome::Loaded) => Report::Loaded(tier),
        Err(e) => {
            log::error!("worker failed to solve tier {tier}: {e:#}");
            Report::Errored {
                tier,
                message: format!("{e:#}"),
            }
        },
    };

    link.send(report)
}

/* LINK IMPLEMENTATIONS */

impl ChannelLink {
    pub fn new(commands: Receiver<Command>, reports: Sender<Report>) -> Self {
        Self { commands, reports }
    }
}

impl Link for ChannelLink {
    fn send(&self, report: Report) -> Result<()> {
        self.reports
            .send(report)
            .context("Dispatcher hung up while receiving a report.")
    }

    fn recv(&self) -> Result<Command> {
        self.commands
            .recv()
            .context("Dispatcher hung up while sending a command.")
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::database::volatile;
    use crate::game::Variable;
    use crate::game::zero_by;

    #[test]
    fn workers_solve_skip_and_resolve_on_command() -> Result<()> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (report_tx, report_rx) = crossbeam_channel::unbounded();
        let link = ChannelLink::new(command_rx, report_tx);

        command_tx.send(Command::Solve(0))?;
        command_tx.send(Command::Solve(0))?;
        command_tx.send(Command::ForceSolve(0))?;
        command_tx.send(Command::Terminate)?;

        let game = zero_by::Session::variant("2-1".into())?;
        let db = volatile::Database::new();
        run(&game, &db, &link)?;

        let reports = report_rx.try_iter().collect::<Vec<Report>>();
        assert_eq!(
            reports,
            vec![
                Report::Check,
                Report::Solved(0),
                Report::Check,
                Report::Loaded(0),
                Report::Check,
                Report::Solved(0),
                Report::Check,
            ],
        );

        Ok(())
    }

    #[test]
    fn workers_report_failures_and_continue() -> Result<()> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (report_tx, report_rx) = crossbeam_channel::unbounded();
        let link = ChannelLink::new(command_rx, report_tx);

        // Tier 2 requires tier 1 and tier 0 solved first, so asking for it
        // up front fails; the worker must still take the next command.
        command_tx.send(Command::Solve(2))?;
        command_tx.send(Command::Solve(0))?;
        command_tx.send(Command::Terminate)?;

        let game = zero_by::Session::variant("2-1".into())?;
        let db = volatile::Database::new();
        run(&game, &db, &link)?;

        let reports = report_rx.try_iter().collect::<Vec<Report>>();
        assert_eq!(reports.len(), 5);
        assert!(matches!(reports[1], Report::Errored { tier: 2, .. }));
        assert_eq!(reports[2], Report::Check);
        assert_eq!(reports[3], Report::Solved(0));
        assert_eq!(reports[4], Report::Check);
        Ok(())
    }

    #[test]
    fn sleeping_workers_wake_for_the_next_command() -> Result<()> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (report_tx, report_rx) = crossbeam_channel::unbounded();
        let link = ChannelLink::new(command_rx, report_tx);

        command_tx.send(Command::Sleep)?;
        command_tx.send(Command::Terminate)?;

        let game = zero_by::Session::variant("2-1".into())?;
        let db = volatile::Database::new();
        run(&game, &db, &link)?;

        let reports = report_rx.try_iter().collect::<Vec<Report>>();
        assert_eq!(reports, vec![Report::Check, Report::Check]);
        Ok(())
    }
}
