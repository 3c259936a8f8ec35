//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

/// Cronhands CLI.
#[derive(Parser)]
#[command(name = "cronhands")]
#[command(about = "Recurring shell job scheduler")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CRONHANDS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler in the foreground (default)
    Run,

    /// Load and validate the configuration, then exit
    CheckConfig,

    /// Check a command against the validation rules
    ValidateCommand {
        /// Command line as it would be passed to the shell
        command: String,
    },

    /// Manage stored jobs
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Subcommand)]
pub enum JobAction {
    /// Create a job and print its id
    Add(AddJobArgs),

    /// List stored jobs
    List,

    /// Delete a job
    Remove {
        id: Uuid,
    },

    /// Run a job once now and wait for it to finish
    Run {
        id: Uuid,
    },

    /// Show dependency status as JSON
    Deps {
        id: Uuid,
    },
}

#[derive(Args)]
pub struct AddJobArgs {
    /// Job name
    #[arg(long)]
    pub name: String,

    /// Shell command
    #[arg(long)]
    pub command: String,

    /// 5-field cron expression
    #[arg(long, conflicts_with = "interval", required_unless_present = "interval")]
    pub cron: Option<String>,

    /// Fixed interval such as 30s, 5m, 1h, 2d
    #[arg(long)]
    pub interval: Option<String>,

    /// IANA timezone for cron schedules
    #[arg(long)]
    pub timezone: Option<String>,

    /// Per-attempt timeout in seconds (1-86400)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Attempts per run (1-10)
    #[arg(long)]
    pub retries: Option<u32>,

    #[arg(long, default_value_t = 0)]
    pub priority: i32,

    /// Job that must have completed first (repeatable)
    #[arg(long = "depends-on")]
    pub depends_on: Vec<String>,

    /// Owning user, used to pick notification configs
    #[arg(long)]
    pub owner: Option<Uuid>,

    /// Create the job disabled
    #[arg(long)]
    pub inactive: bool,
}
