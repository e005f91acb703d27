//! Command-line argument definitions for the roster importer
//!
//! Defines the CLI interface using the clap derive API. Flags given here
//! override values loaded from the configuration file.

use crate::config::ImportConfig;
use crate::error::{Result, RosterError};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the roster importer
///
/// Writes scraped player attributes from a CSV file into a roster database,
/// one typed record per player.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "roster-import",
    version,
    about = "Import player attribute CSVs into a roster database",
    long_about = "Reads a merged player attribute CSV and writes one typed record per player \
                  into the roster's player table, assigning jersey numbers and draft defaults \
                  where the CSV leaves them blank. The roster is compacted and saved at the end."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Import a player CSV into a roster file
    Import(ImportArgs),
    /// Print the tables and fields of a roster file
    Describe(DescribeArgs),
}

/// Engine adapter used to open the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// In-process engine reading JSON roster files
    Memory,
    /// Native tdbaccess library (requires the `tdbaccess` feature)
    Tdb,
}

/// Arguments for the import command
#[derive(Debug, Clone, Parser)]
pub struct ImportArgs {
    /// Roster database to write into
    #[arg(value_name = "ROSTER")]
    pub roster: PathBuf,

    /// Player attribute CSV to read
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Configuration file (JSON); defaults to the user config directory
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Player table name
    #[arg(long = "table", value_name = "NAME")]
    pub table: Option<String>,

    /// Skip reading each field back after writing it
    #[arg(long = "no-verify")]
    pub no_verify: bool,

    /// Seed for jersey numbers picked from exhausted pools
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Write the run report as JSON to this path
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Engine adapter
    #[arg(long = "engine", value_enum, default_value = "memory")]
    pub engine: EngineKind,

    /// Disable the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Arguments for the describe command
#[derive(Debug, Clone, Parser)]
pub struct DescribeArgs {
    /// Roster database to inspect
    #[arg(value_name = "ROSTER")]
    pub roster: PathBuf,

    /// Engine adapter
    #[arg(long = "engine", value_enum, default_value = "memory")]
    pub engine: EngineKind,

    /// Logging verbosity level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        match &self.command {
            Commands::Import(args) => args.get_log_level(),
            Commands::Describe(args) => verbosity_level(args.verbose),
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(&self.command, Commands::Import(args) if args.quiet)
    }
}

impl ImportArgs {
    /// Check the input files exist before anything is opened
    pub fn validate(&self) -> Result<()> {
        if !self.csv.is_file() {
            return Err(RosterError::Configuration {
                message: format!("CSV file does not exist: {}", self.csv.display()),
            });
        }
        if self.engine == EngineKind::Memory && !self.roster.is_file() {
            return Err(RosterError::Configuration {
                message: format!("Roster file does not exist: {}", self.roster.display()),
            });
        }
        Ok(())
    }

    /// Determine the log level from verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            verbosity_level(self.verbose)
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }

    /// Layer command-line flags over a loaded configuration
    pub fn apply_overrides(&self, mut config: ImportConfig) -> ImportConfig {
        if let Some(table) = &self.table {
            config = config.with_player_table(table.clone());
        }
        if self.no_verify {
            config = config.without_verification();
        }
        if let Some(seed) = self.seed {
            config = config.with_jersey_seed(seed);
        }
        if !self.show_progress() {
            config = config.without_progress();
        }
        config
    }
}

fn verbosity_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn import_args(extra: &[&str]) -> ImportArgs {
        let mut argv = vec!["roster-import", "import", "roster.json", "players.csv"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Commands::Import(args) => args,
            other => panic!("Expected import command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_defaults() {
        let args = import_args(&[]);
        assert_eq!(args.roster, PathBuf::from("roster.json"));
        assert_eq!(args.engine, EngineKind::Memory);
        assert!(!args.no_verify);
        assert!(args.show_progress());
        assert_eq!(args.get_log_level(), "warn");
    }

    #[test]
    fn test_log_level() {
        assert_eq!(import_args(&["-v"]).get_log_level(), "info");
        assert_eq!(import_args(&["-vv"]).get_log_level(), "debug");
        assert_eq!(import_args(&["-vvvv"]).get_log_level(), "trace");
        assert_eq!(import_args(&["--quiet"]).get_log_level(), "error");
        assert!(Args::try_parse_from(["roster-import", "import", "a", "b", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = import_args(&["--table", "PLYR", "--no-verify", "--seed", "9", "--quiet"]);
        let config = args.apply_overrides(ImportConfig::default());

        assert_eq!(config.player_table, "PLYR");
        assert!(!config.verify_writes);
        assert_eq!(config.jersey_seed, Some(9));
        assert!(!config.show_progress);
    }

    #[test]
    fn test_no_flags_keep_file_values() {
        let loaded = ImportConfig::default().with_jersey_seed(4);
        let config = import_args(&[]).apply_overrides(loaded.clone());
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_describe_command() {
        let args = Args::try_parse_from(["roster-import", "describe", "roster.json", "-vv"]).unwrap();
        assert!(matches!(args.command, Commands::Describe(_)));
        assert_eq!(args.get_log_level(), "debug");
        assert!(!args.is_quiet());
    }

    #[test]
    fn test_validate_requires_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        let csv = temp_dir.path().join("players.csv");
        let roster = temp_dir.path().join("roster.json");
        fs::write(&csv, "first_name,position\n").unwrap();

        let mut args = import_args(&[]);
        args.csv = csv;
        args.roster = roster.clone();
        assert!(args.validate().is_err());

        fs::write(&roster, "{\"tables\": []}").unwrap();
        assert!(args.validate().is_ok());

        args.engine = EngineKind::Tdb;
        fs::remove_file(&roster).unwrap();
        assert!(args.validate().is_ok());
    }
}
