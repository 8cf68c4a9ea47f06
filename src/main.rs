//! Labbook - command-line access to the entity-linking core
//!
//! Inspects stored entries and the links persisted for them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use labbook_core::{
    persisted_links, scan_entry, LabbookConfig, Owner, OwnerKind, SqliteLinkStore, StoredEntry,
};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "labbook")]
#[command(about = "Entity-linked notebook for lab protocols and experiments", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(long, env = "LABBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and database schema
    Init,

    /// Print the links carried by a stored entry file, as JSON
    Scan {
        /// Path to a stored entry (body.json)
        file: PathBuf,
    },

    /// Print the links persisted for an owner, as JSON
    Links {
        /// Owner kind: protocol or experiment
        owner_kind: OwnerKind,

        /// Owner identifier
        id: Uuid,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("labbook={},labbook_core={}", level, level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Labbook v{} starting...", env!("CARGO_PKG_VERSION"));

    let config =
        LabbookConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Init => {
            fs::create_dir_all(&config.storage.data_dir).with_context(|| {
                format!(
                    "Failed to create data directory {}",
                    config.storage.data_dir.display()
                )
            })?;
            let database_path = config.storage.database_path();
            SqliteLinkStore::open(&database_path).with_context(|| {
                format!("Failed to open database {}", database_path.display())
            })?;
            info!("Initialized {}", config.storage.data_dir.display());
            println!("Data directory: {}", config.storage.data_dir.display());
            println!("Database:       {}", database_path.display());
        }
        Commands::Scan { file } => {
            let bytes =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let entry = StoredEntry::from_bytes(&bytes)
                .with_context(|| format!("{} is not a stored entry", file.display()))?;
            let links = scan_entry(&entry.body, &entry.description);
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
        Commands::Links { owner_kind, id } => {
            let store = SqliteLinkStore::open(config.storage.database_path())
                .context("Failed to open link store")?;
            let links = persisted_links(&store, &Owner::new(owner_kind, id))?;
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
