//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Docship documentation pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: docship.toml)
    #[arg(short = 'C', long, default_value = "docship.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for the full pipeline run
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Branch name of the push event (default: the work tree's HEAD branch)
    #[arg(long = "ref")]
    pub event_ref: Option<String>,

    /// Discard the cached checkout and virtualenv before running
    #[arg(long)]
    pub fresh: bool,

    /// Go through every step but commit and push nothing
    #[arg(long)]
    pub dry_run: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Init a docship project
    Init {
        /// the name(path) of the project directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Run the full pipeline for a push event: trigger, checkout, provision,
    /// install, generate, publish
    Run {
        #[command(flatten)]
        run_args: RunArgs,
    },

    /// Provision, install and generate against the local work tree without
    /// publishing
    Build {
        /// Discard the virtualenv before building
        #[arg(long)]
        fresh: bool,
    },

    /// Commit the existing build output and push it to the publish branch
    Publish {
        /// overwrite the remote branch history
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        force: Option<bool>,
    },

    /// Serve the build output locally
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the record of the most recent run
    Status,
}

#[allow(unused)]
impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
    pub const fn is_run(&self) -> bool {
        matches!(self.command, Commands::Run { .. })
    }
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_publish(&self) -> bool {
        matches!(self.command, Commands::Publish { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_status(&self) -> bool {
        matches!(self.command, Commands::Status)
    }
}
