//! appdatastore CLI
//!
//! Command-line access to a shared-memory store, from any process on the
//! host.
//!
//! # Commands
//!
//! - `set` / `get` / `has` / `delete` - single keys
//! - `list` / `export` - key listing and JSON export
//! - `sweep` - remove expired keys now
//! - `unlock` - break a lock left by a dead process
//! - `destroy` - remove the store and every item in it
//!
//! Sealed values use a key derived from the `APPDS_PASSWORD` environment
//! variable.

mod commands;

use appds_core::DEFAULT_STORE_NAME;
use clap::{Parser, Subcommand};
use commands::StoreOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// appdatastore shared-memory store tools.
#[derive(Parser)]
#[command(name = "appds")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store name
    #[arg(global = true, short, long, default_value = DEFAULT_STORE_NAME)]
    store: String,

    /// Shared-memory directory (defaults to /dev/shm where available)
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Reject keys nesting under or above existing keys
    #[arg(global = true, long)]
    dot_names: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a value (JSON, or a bare string)
    Set {
        /// Key name
        name: String,

        /// Value
        value: String,

        /// Lifetime in seconds (fractions allowed)
        #[arg(short, long, value_parser = parse_ttl)]
        ttl: Option<Duration>,

        /// Seal the value (needs APPDS_PASSWORD)
        #[arg(short, long)]
        encrypt: bool,
    },

    /// Print a value as JSON
    Get {
        /// Key name
        name: String,
    },

    /// Print whether a key exists
    Has {
        /// Key name
        name: String,
    },

    /// Remove a key
    Delete {
        /// Key name
        name: String,
    },

    /// List keys
    List {
        /// Only keys starting with this prefix
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Print the whole store as JSON
    Export {
        /// Single-line output
        #[arg(short, long)]
        compact: bool,
    },

    /// Remove expired keys now
    Sweep,

    /// Break a stale lock on an item
    Unlock {
        /// Item name
        item: String,
    },

    /// Remove the store and all its items
    Destroy,
}

fn parse_ttl(arg: &str) -> Result<Duration, String> {
    let secs: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = StoreOptions {
        name: cli.store,
        dir: cli.dir,
        dot_names: cli.dot_names,
        password: std::env::var("APPDS_PASSWORD").ok(),
    };

    let result = match cli.command {
        Commands::Set {
            name,
            value,
            ttl,
            encrypt,
        } => commands::set::run(&options, &name, &value, ttl.unwrap_or_default(), encrypt),
        Commands::Get { name } => commands::get::run(&options, &name),
        Commands::Has { name } => commands::has::run(&options, &name),
        Commands::Delete { name } => commands::delete::run(&options, &name),
        Commands::List { prefix } => commands::list::run(&options, &prefix),
        Commands::Export { compact } => commands::export::run(&options, compact),
        Commands::Sweep => commands::sweep::run(&options),
        Commands::Unlock { item } => commands::unlock::run(&options, &item),
        Commands::Destroy => commands::destroy::run(&options),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
