//! Admin CLI for the tax computation platform.
//!
//! Currently covers the database-migration boundary: inspect and advance
//! the storage schema revision chain. `check` exits 0 when up to date
//! and 1 when migrations are pending, for CI gates.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taxcalc_store::MigrationRunner;

#[derive(Parser)]
#[command(name = "taxcalc", version, about = "Tax platform administration")]
struct Cli {
    /// Path to the migration state file.
    #[arg(
        long,
        env = "TAXCALC_MIGRATION_STATE",
        default_value = "data/migration_state.json"
    )]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current revision and pending migrations.
    Status,
    /// Apply migrations forward to a revision (default: head).
    Upgrade {
        /// Target revision id.
        revision: Option<String>,
    },
    /// Revert migrations back to a revision ("base" for none).
    Downgrade {
        /// Target revision id.
        revision: String,
    },
    /// Create a new revision skeleton.
    Revision {
        /// Revision message.
        message: String,
        /// Seed the revision from a schema diff.
        #[arg(short = 'a', long)]
        autogenerate: bool,
    },
    /// List the full revision chain.
    History,
    /// Show the currently applied revision.
    Current,
    /// Show the newest known revision.
    Head,
    /// Record a revision as applied without running it.
    Stamp {
        /// Revision id to record.
        revision: String,
    },
    /// Exit 0 if the schema is up to date, 1 if migrations are pending.
    Check,
}

fn run(cli: Cli) -> Result<ExitCode> {
    let runner = MigrationRunner::with_builtin(cli.state_file);

    match cli.command {
        Command::Status => {
            let status = runner.status()?;
            println!(
                "current: {}",
                status.current.as_deref().unwrap_or("(base)")
            );
            println!("head:    {}", status.head.as_deref().unwrap_or("(none)"));
            if status.pending.is_empty() {
                println!("up to date");
            } else {
                println!("pending:");
                for id in &status.pending {
                    println!("  {id}");
                }
            }
        }
        Command::Upgrade { revision } => {
            let applied = runner.upgrade(revision.as_deref())?;
            if applied.is_empty() {
                println!("nothing to apply");
            } else {
                for id in applied {
                    println!("applied {id}");
                }
            }
        }
        Command::Downgrade { revision } => {
            let reverted = runner.downgrade(&revision)?;
            if reverted.is_empty() {
                println!("nothing to revert");
            } else {
                for id in reverted {
                    println!("reverted {id}");
                }
            }
        }
        Command::Revision {
            message,
            autogenerate,
        } => {
            let mut runner = runner;
            let revision = runner.new_revision(&message, autogenerate);
            println!("created {}", revision.id);
            for op in &revision.upgrade_ops {
                println!("  {op}");
            }
        }
        Command::History => {
            for revision in runner.history() {
                println!("{}  {}", revision.id, revision.message);
            }
        }
        Command::Current => {
            println!("{}", runner.current()?.as_deref().unwrap_or("(base)"));
        }
        Command::Head => {
            match runner.head() {
                Some(head) => println!("{}", head.id),
                None => println!("(none)"),
            }
        }
        Command::Stamp { revision } => {
            runner.stamp(&revision)?;
            println!("stamped {revision}");
        }
        Command::Check => {
            let status = runner.status()?;
            if status.is_up_to_date {
                println!("up to date");
            } else {
                println!("{} migration(s) pending", status.pending.len());
                return Ok(ExitCode::from(1));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse())
}
