//! Command implementations for the roster importer CLI
//!
//! Contains the command runners, logging setup and the human-readable run
//! summary.

use crate::cli::args::{Args, Commands, DescribeArgs, EngineKind, ImportArgs};
use crate::config::ImportConfig;
use crate::engine::Engine;
use crate::engine::memory::MemoryEngine;
use crate::input::read_players;
use crate::models::ImportReport;
use crate::schema::SchemaCatalog;
use crate::session::ImportSession;

use anyhow::{Context, Result, bail};
use colored::*;
use std::time::Instant;
use tracing::{debug, info};

/// Main command runner
///
/// Returns an error for any session-level or finalize failure; the binary
/// maps that to a non-zero exit status.
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Commands::Import(import) => run_import(import),
        Commands::Describe(describe) => run_describe(describe),
    }
}

fn run_import(args: &ImportArgs) -> Result<()> {
    let start_time = Instant::now();
    args.validate()?;

    let config = load_configuration(args)?;
    debug!("Loaded configuration: {:?}", config);

    let rows = read_players(&args.csv)
        .with_context(|| format!("Failed to read players from {}", args.csv.display()))?;

    if !args.quiet {
        println!("{}", "Starting roster import".bright_green().bold());
        println!("  {} {}", "Roster:".bright_cyan(), args.roster.display());
        println!(
            "  {} {} ({} rows)",
            "Players:".bright_cyan(),
            args.csv.display(),
            rows.len().to_string().bright_white().bold()
        );
    }

    let engine = open_engine(args.engine)?;
    let mut session = ImportSession::new(engine, config);
    let result = session.run(&args.roster, &rows);
    let report = session.report().clone();
    drop(session);

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Wrote run report to {}", path.display());
    }

    if !args.quiet {
        print_summary(&report, start_time.elapsed().as_millis());
    }

    result.with_context(|| format!("Import into {} failed", args.roster.display()))?;
    Ok(())
}

fn run_describe(args: &DescribeArgs) -> Result<()> {
    let mut engine = open_engine(args.engine)?;

    let handle = engine.open(&args.roster);
    if !handle.is_valid() {
        bail!("Engine refused to open roster file: {}", args.roster.display());
    }

    let catalog = SchemaCatalog::load(&*engine, handle);
    if !engine.close(handle) {
        bail!("Engine failed to close {}", args.roster.display());
    }
    let catalog =
        catalog.with_context(|| format!("Failed to read schema of {}", args.roster.display()))?;

    println!("{}", args.roster.display().to_string().bright_green().bold());
    print!("{}", catalog.describe());
    Ok(())
}

fn open_engine(kind: EngineKind) -> Result<Box<dyn Engine>> {
    match kind {
        EngineKind::Memory => Ok(Box::new(MemoryEngine::new())),
        #[cfg(feature = "tdbaccess")]
        EngineKind::Tdb => Ok(Box::new(crate::engine::tdb::TdbLibrary::new())),
        #[cfg(not(feature = "tdbaccess"))]
        EngineKind::Tdb => bail!("This build has no tdbaccess support; rebuild with --features tdbaccess"),
    }
}

/// Set up structured logging on stderr
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roster_import={}", log_level)));

    if args.is_quiet() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Load configuration from file, then apply command-line overrides
fn load_configuration(args: &ImportArgs) -> Result<ImportConfig> {
    let config = ImportConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let config = args.apply_overrides(config);
    config.validate()?;
    Ok(config)
}

fn print_summary(report: &ImportReport, elapsed_ms: u128) {
    println!("\n{}", "Import Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        elapsed_ms.to_string().bright_white()
    );
    println!(
        "  {} {}/{} ({:.1}%)",
        "Players imported:".bright_cyan(),
        report.rows_imported.to_string().bright_white().bold(),
        report.rows_read,
        report.success_rate()
    );

    if !report.skipped.is_empty() {
        println!(
            "  {} {}",
            "Rows skipped:".bright_red(),
            report.skipped.len().to_string().bright_red().bold()
        );
        for skip in &report.skipped {
            let marker = if skip.partially_written {
                " (partially written)".bright_red().to_string()
            } else {
                String::new()
            };
            println!(
                "    row {} {}: {}{}",
                skip.row,
                skip.player.bright_white(),
                skip.reason,
                marker
            );
        }
    }

    if !report.verification_failures.is_empty() {
        println!(
            "  {} {}",
            "Verification failures:".bright_yellow(),
            report.verification_failures.len().to_string().bright_yellow().bold()
        );
        for failure in &report.verification_failures {
            println!("    row {}: {}", failure.row, failure.message);
        }
    }

    for warning in &report.pool_exhausted {
        println!(
            "  {} {} {} pool exhausted, reused #{}",
            "Jersey warning:".bright_yellow(),
            warning.team,
            warning.position,
            warning.number
        );
    }

    match report.finalize {
        Some(outcome) if outcome.is_clean() => {
            println!("  {} {}", "Roster:".bright_cyan(), "saved".bright_green().bold());
        }
        Some(outcome) => {
            let steps: Vec<String> = outcome
                .failed_steps()
                .iter()
                .map(ToString::to_string)
                .collect();
            println!(
                "  {} {}",
                "Roster:".bright_red(),
                format!("{} failed", steps.join(", ")).bright_red().bold()
            );
        }
        None => {
            println!("  {} {}", "Roster:".bright_red(), "not finalized".bright_red().bold());
        }
    }
}
