//! CLI definition using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use towcheck_domain::model::SpecKind;
use towcheck_types::OutputFormat;

#[derive(Parser)]
#[command(name = "towcheck")]
#[command(version)]
#[command(about = "Caravan and tow vehicle weight compliance checks")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Store directory override
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Specification kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Vehicle,
    Caravan,
}

impl From<KindArg> for SpecKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Vehicle => SpecKind::Vehicle,
            KindArg::Caravan => SpecKind::Caravan,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a compliance check from a request file
    Check {
        /// Path to request JSON (readings plus vehicle/caravan spec sources)
        request: PathBuf,

        /// CSV of raw readings; rows replace the request's readings by role
        #[arg(long, short = 'r')]
        readings: Option<PathBuf>,

        /// Save the sealed result to history
        #[arg(long)]
        save: bool,
    },

    /// Look up a specification in the registry
    Resolve {
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Registration plate
        #[arg(long, requires = "state")]
        plate: Option<String>,

        /// Issuing state of the plate
        #[arg(long, requires = "plate")]
        state: Option<String>,

        #[arg(long, conflicts_with = "plate")]
        make: Option<String>,

        #[arg(long, conflicts_with = "plate")]
        model: Option<String>,

        #[arg(long, conflicts_with = "plate")]
        year: Option<u16>,

        #[arg(long, conflicts_with = "plate")]
        variant: Option<String>,
    },

    /// Manage the verified registry
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Inspect the admin review queue
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },

    /// Admin review of pending specifications
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Show saved weigh results
    History {
        /// Limit number of entries shown
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Show one saved weigh result
    Show {
        /// Result id
        id: String,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set store directory
        #[arg(long)]
        set_store_dir: Option<PathBuf>,

        /// Set registry seed imported into an empty registry
        #[arg(long)]
        set_registry_seed: Option<PathBuf>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Set log level (error, warn, info, debug, trace)
        #[arg(long)]
        set_log_level: Option<String>,

        /// Set whole-combination tolerance in percent
        #[arg(long)]
        set_tolerance: Option<f64>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
pub enum RegistryAction {
    /// Import a TOML seed file as MASTER_VERIFIED records
    Import {
        /// Path to seed TOML
        seed: PathBuf,
    },
    /// List registry records
    List,
}

#[derive(Subcommand)]
pub enum PendingAction {
    /// List submissions awaiting review
    List,
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Approve a pending submission and merge it into the registry
    Approve {
        /// Pending record id
        id: String,

        /// Name of the approving administrator
        #[arg(long)]
        reviewer: String,
    },
}
