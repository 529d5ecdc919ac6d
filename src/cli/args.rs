use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "sace-queue")]
#[command(about = "Inspect and manage the SACE offline operation queue")]
#[command(long_about = "sace-queue - SACE offline operation queue

Field-visit registers created or edited without connectivity are kept in a
local queue and replayed once the device is back online. This tool inspects
and maintains that queue.

QUICK START:
  sace-queue status            Pending operations and oldest entry
  sace-queue list              Every queued operation
  sace-queue add visita.json   Queue a register from a JSON file
  sace-queue watch             Print connectivity changes as they happen
  sace-queue clear --force     Discard the whole queue

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  sace-queue <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub output: OutputFormat,

    /// Data directory holding config.yaml and queue.db
    #[arg(long, env = "SACE_QUEUE_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show queue status
    ///
    /// Displays the number of pending operations and the age of the oldest.
    ///
    /// # Examples
    ///
    ///   sace-queue status
    ///   sace-queue status --probe
    Status {
        /// Also check connectivity with a TCP probe
        #[arg(long)]
        probe: bool,
    },

    /// List queued operations in replay order
    #[command(alias = "ls")]
    List,

    /// Show one queued operation as stored
    Show {
        /// Operation id
        id: String,
    },

    /// Queue a register mutation
    ///
    /// Reads the register JSON from a file, or from stdin when FILE is '-'.
    /// File attachments are dropped; only their metadata is kept.
    ///
    /// # Examples
    ///
    ///   sace-queue add visita.json
    ///   sace-queue add --update 42 visita.json
    ///   cat visita.json | sace-queue add -
    Add {
        /// JSON file with the register data, or '-' for stdin
        file: String,

        /// Queue an update of this register instead of a create
        #[arg(long, value_name = "REGISTRO_ID")]
        update: Option<i64>,
    },

    /// Watch connectivity and print each change
    ///
    /// Probes the configured address every `probe_interval_secs` seconds and
    /// prints the current state, then one line per online/offline change
    /// with the number of pending operations.
    ///
    /// # Examples
    ///
    ///   sace-queue watch
    ///   sace-queue --output json watch --changes 1
    Watch {
        /// Exit after this many changes
        #[arg(long, value_name = "N")]
        changes: Option<usize>,
    },

    /// Discard every queued operation
    Clear {
        /// Confirm the operation
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_update() {
        let cli = Cli::parse_from(["sace-queue", "add", "--update", "42", "visita.json"]);
        match cli.command {
            Commands::Add { file, update } => {
                assert_eq!(file, "visita.json");
                assert_eq!(update, Some(42));
            },
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_global_output_flag() {
        let cli = Cli::parse_from(["sace-queue", "list", "--output", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_parse_watch_limit() {
        let cli = Cli::parse_from(["sace-queue", "watch", "--changes", "2"]);
        assert!(matches!(cli.command, Commands::Watch { changes: Some(2) }));
    }
}
