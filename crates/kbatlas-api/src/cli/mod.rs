//! CLI command definitions for the `kbatlas` binary.
//!
//! Uses clap derive macros. Commands follow a noun-verb pattern
//! (e.g., `kbatlas builder new`, `kbatlas template list`).

pub mod builder;
pub mod template;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use kbatlas_types::builder::{BuilderStep, DeployEnvironment, OwnerId};

/// Build, validate and deploy AI agents.
#[derive(Parser)]
#[command(name = "kbatlas", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format: pretty or json.
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: String,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Owner id that builder commands act on behalf of.
    #[arg(long, global = true, env = "KBATLAS_OWNER")]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The owner for builder commands; required there, ignored elsewhere.
    pub fn owner_id(&self) -> anyhow::Result<OwnerId> {
        match self.owner.as_deref().map(str::trim) {
            Some(owner) if !owner.is_empty() => Ok(OwnerId::new(owner)),
            _ => anyhow::bail!("no owner given: pass --owner or set KBATLAS_OWNER"),
        }
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        let serving = matches!(self.command, Commands::Serve { .. });
        match self.verbose {
            _ if self.quiet => "error",
            0 if serving => "info,sqlx=warn",
            0 => "warn",
            1 => "info,sqlx=warn",
            _ => "debug",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage builder sessions.
    Builder {
        #[command(subcommand)]
        action: BuilderCommand,
    },

    /// Browse and seed agent templates.
    Template {
        #[command(subcommand)]
        action: TemplateCommand,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum BuilderCommand {
    /// Start a new builder session.
    New {
        /// Clone this template instead of starting empty.
        #[arg(long)]
        template: Option<String>,
    },

    /// List your builder sessions, most recent first.
    #[command(alias = "ls")]
    List,

    /// Show a session's configuration and validation report.
    Show {
        /// Builder id.
        id: String,
    },

    /// Replace one configuration section from a JSON file.
    ///
    /// The file holds `{"section": "<name>", "data": {...}}`.
    Update {
        /// Builder id.
        id: String,

        /// Path to the section JSON (`-` for stdin).
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Move a session to another wizard step.
    Step {
        /// Builder id.
        id: String,

        /// Target step.
        #[arg(value_parser = parse_step)]
        step: BuilderStep,
    },

    /// Upload inline knowledge files and index them in a vector store.
    SyncFiles {
        /// Builder id.
        id: String,
    },

    /// Deploy a validated session to the agent provider.
    Deploy {
        /// Builder id.
        id: String,

        /// Target environment.
        #[arg(long = "env", default_value = "production", value_parser = parse_environment)]
        environment: DeployEnvironment,
    },

    /// Abandon a session.
    #[command(alias = "rm")]
    Delete {
        /// Builder id.
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// List templates.
    #[command(alias = "ls")]
    List {
        /// Include non-public templates.
        #[arg(long)]
        all: bool,
    },

    /// Insert or refresh the built-in templates.
    Seed,
}

fn parse_step(s: &str) -> Result<BuilderStep, String> {
    s.parse()
}

fn parse_environment(s: &str) -> Result<DeployEnvironment, String> {
    s.parse()
}
