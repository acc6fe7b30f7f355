/*
 *  Copyright 2026 Process Orchestrator Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "process-orchestrator-cli",
    version,
    about = "Command-line interface for the process orchestrator",
    long_about = "Create, run, and inspect process records against the durable \
                  store; run the worker pool and cron loop with `serve`."
)]
pub struct Cli {
    /// Path to a process-orchestrator.toml config file. Defaults to the
    /// search order documented in the library's `ConfigLoader`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all but error-level logging.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Declare a new process record (PENDING, not yet started).
    Create {
        /// Unique identifier for the new record.
        id: String,

        /// Name of a registered process type.
        #[arg(long = "type")]
        process_type: String,

        /// JSON object supplying placeholder values, e.g. '{"env":"prod"}'.
        #[arg(long, default_value = "{}")]
        input: String,

        /// Cron expression for recurring execution; omit for manual-only.
        #[arg(long)]
        schedule: Option<String>,
    },

    /// Start a process record (enqueues task index 0).
    Start {
        id: String,
    },

    /// Stop a running process record.
    Stop {
        id: String,
    },

    /// Stop then start a process record from a fresh task index 0.
    Restart {
        id: String,
    },

    /// Delete a process record (rejected while IN_PROGRESS).
    Delete {
        id: String,
    },

    /// Show a process record's current engine-managed state.
    Show {
        id: String,

        /// Print as JSON instead of a human-readable table.
        #[arg(long)]
        json: bool,
    },

    /// List a process record's task instances, ordered by task index.
    Tasks {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// List process records, optionally filtered by status.
    List {
        /// Filter to one status: PENDING, IN_PROGRESS, COMPLETED, FAILED, STOPPED.
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print aggregate counts across all process records.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Run the worker pool and cron scheduling loop until interrupted.
    Serve {
        /// Seconds to wait for in-flight tasks to finish on shutdown.
        #[arg(long, default_value_t = 30)]
        drain_seconds: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_parses_type_and_defaults_input_to_empty_object() {
        let cli = Cli::try_parse_from(["po", "create", "nightly-backup", "--type", "backup"]).unwrap();
        match cli.command {
            Commands::Create {
                id,
                process_type,
                input,
                schedule,
            } => {
                assert_eq!(id, "nightly-backup");
                assert_eq!(process_type, "backup");
                assert_eq!(input, "{}");
                assert_eq!(schedule, None);
            }
            _ => panic!("expected Create"),
        }
    }

    #[test]
    fn create_accepts_a_schedule() {
        let cli = Cli::try_parse_from([
            "po", "create", "nightly-backup", "--type", "backup", "--schedule", "0 2 * * *",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { schedule, .. } => assert_eq!(schedule.as_deref(), Some("0 2 * * *")),
            _ => panic!("expected Create"),
        }
    }

    #[test]
    fn serve_defaults_drain_seconds_to_thirty() {
        let cli = Cli::try_parse_from(["po", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { drain_seconds } => assert_eq!(drain_seconds, 30),
            _ => panic!("expected Serve"),
        }
    }

    #[test]
    fn missing_required_type_on_create_is_a_parse_error() {
        assert!(Cli::try_parse_from(["po", "create", "nightly-backup"]).is_err());
    }

    #[test]
    fn verbose_and_quiet_are_global_flags_available_after_subcommand_position() {
        let cli = Cli::try_parse_from(["po", "--verbose", "list"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }
}
