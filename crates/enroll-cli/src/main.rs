//! # enroll CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers on a
//! single-threaded runtime.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use enroll_cli::catalog::{run_options, run_subjects, OptionsArgs, SubjectsArgs};
use enroll_cli::grid::{run_grid, GridArgs};
use enroll_cli::history::{run_history, run_resync, HistoryArgs, ResyncArgs};
use enroll_cli::register::{run_register, RegisterArgs};
use enroll_cli::Context;

/// Academy enrollment client.
///
/// Browses subjects and timeslots, submits registrations and tracks their
/// review status.
#[derive(Parser, Debug)]
#[command(name = "enroll", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the subject catalog.
    Subjects(SubjectsArgs),

    /// List group types, levels, education types and grades.
    Options(OptionsArgs),

    /// Show the weekly timeslot grid.
    Grid(GridArgs),

    /// Register for a subject and submit the application.
    Register(RegisterArgs),

    /// Show locally recorded applications.
    History(HistoryArgs),

    /// Fetch reviewer decisions for pending applications.
    Resync(ResyncArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let ctx = Context::load(cli.config.as_deref())?;
    match &cli.command {
        Commands::Subjects(args) => run_subjects(args, &ctx).await,
        Commands::Options(args) => run_options(args, &ctx).await,
        Commands::Grid(args) => run_grid(args, &ctx).await,
        Commands::Register(args) => run_register(args, &ctx).await,
        Commands::History(args) => run_history(args, &ctx).await,
        Commands::Resync(args) => run_resync(args, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_grid_filters() {
        let cli = Cli::try_parse_from(["enroll", "grid", "--subject", "Physics", "--group-type", "private"])
            .unwrap();
        match cli.command {
            Commands::Grid(args) => {
                assert_eq!(args.subject.as_deref(), Some("Physics"));
                assert_eq!(args.group_type.as_deref(), Some("private"));
            }
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["enroll", "history", "-vv", "--config", "enroll.yaml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("enroll.yaml")));
        assert!(matches!(cli.command, Commands::History(_)));
    }

    #[test]
    fn cli_register_requires_slot() {
        let result = Cli::try_parse_from([
            "enroll", "register", "--subject", "Math", "--group-type", "group",
            "--group-level", "beginner", "--education-type", "national", "--grade", "G10",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["enroll", "enrol"]).is_err());
    }
}
