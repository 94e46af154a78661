//! Casket CLI
//!
//! Command-line tools for inspecting and editing a file-backed Casket.
//!
//! # Commands
//!
//! - `create` - Create a new entity
//! - `get` - Print one entity as JSON
//! - `set` - Set one attribute through a unit of work
//! - `delete` - Delete an entity
//! - `dump` - Print every row

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Casket command-line tools.
#[derive(Parser)]
#[command(name = "casket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new entity
    Create {
        /// Entity id; a random id is generated when omitted
        id: Option<String>,

        /// Initial attribute as `name=value` or `name:kind=value`
        #[arg(short, long = "attr")]
        attrs: Vec<String>,
    },

    /// Print an entity as JSON
    Get {
        /// Entity id
        id: String,
    },

    /// Set one attribute on an existing entity
    Set {
        /// Entity id
        id: String,

        /// Attribute name
        name: String,

        /// Attribute kind (bool, int, long, string, json)
        kind: String,

        /// Attribute value
        value: String,

        /// Adopt the stored version once if another writer got in first
        #[arg(short, long)]
        lenient: bool,
    },

    /// Delete an entity
    Delete {
        /// Entity id
        id: String,
    },

    /// Print every row as JSON
    Dump,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Create { id, attrs } => {
            let path = cli.path.ok_or("Store path required for create")?;
            commands::create::run(&path, id.as_deref(), &attrs)?;
        }
        Commands::Get { id } => {
            let path = cli.path.ok_or("Store path required for get")?;
            commands::get::run(&path, &id)?;
        }
        Commands::Set {
            id,
            name,
            kind,
            value,
            lenient,
        } => {
            let path = cli.path.ok_or("Store path required for set")?;
            commands::set::run(&path, &id, &name, &kind, &value, lenient)?;
        }
        Commands::Delete { id } => {
            let path = cli.path.ok_or("Store path required for delete")?;
            commands::delete::run(&path, &id)?;
        }
        Commands::Dump => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path)?;
        }
        Commands::Version => {
            println!("Casket CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Casket Core v{}", casket_core::VERSION);
        }
    }

    Ok(())
}
