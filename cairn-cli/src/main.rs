//! Cairn CLI: inspection and maintenance of cache files.
//!
//! ```bash
//! cairn stat ./cache/guids.cache
//! cairn keys ./cache/guids.cache --limit 20
//! cairn get ./cache/guids.cache plex://movie/5d776
//! cairn trim ./cache/guids.cache --max-items 10000
//! ```
//!
//! Bounds, format and log level come from `cairn.toml` and `CAIRN_*`
//! environment variables; see `cairn --help` for all options.

mod commands;

use anyhow::{bail, Result};
use cairn_core::config::{CairnConfig, LoggingConfig};
use cairn_core::SerializationFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Inspect and maintain Cairn cache files",
    version,
    after_help = "Configuration is read from ./cairn.toml when present, then CAIRN_* environment variables."
)]
struct Cli {
    /// Configuration file to use instead of ./cairn.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache file format (bincode or json), overriding the configuration
    #[arg(long, global = true)]
    format: Option<SerializationFormat>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show item count, serialized size and bounds
    Stat {
        /// Cache file
        path: PathBuf,
    },
    /// List keys from least to most recently used
    Keys {
        /// Cache file
        path: PathBuf,

        /// Show only the N most recently used keys
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the identifiers stored for a key
    Get {
        /// Cache file
        path: PathBuf,
        key: String,

        /// Mark the key as most recently used
        #[arg(long)]
        touch: bool,
    },
    /// Remove a key
    Delete {
        /// Cache file
        path: PathBuf,
        key: String,
    },
    /// Remove every key
    Clear {
        /// Cache file
        path: PathBuf,
    },
    /// Evict least recently used keys until the bounds hold, then save
    Trim {
        /// Cache file
        path: PathBuf,

        /// Item bound, overriding the configuration
        #[arg(long)]
        max_items: Option<u64>,

        /// Serialized size bound in bytes, overriding the configuration
        #[arg(long)]
        max_bytesize: Option<u64>,
    },
}

fn load_config(cli: &Cli) -> Result<CairnConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            CairnConfig::load_from(path)?
        }
        None => CairnConfig::load()?,
    };

    if let Some(format) = cli.format {
        config.cache.format = format;
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &LoggingConfig, verbose: u8) {
    let filter = match verbose {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    init_logging(&config.logging, cli.verbose);

    let cache_config = &config.cache;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Stat { path } => commands::inspect::stat(&path, cache_config, &mut out),
        Commands::Keys { path, limit } => commands::inspect::keys(&path, cache_config, limit, &mut out),
        Commands::Get { path, key, touch } => {
            commands::inspect::get(&path, cache_config, &key, touch, &mut out)
        }
        Commands::Delete { path, key } => commands::edit::delete(&path, cache_config, &key, &mut out),
        Commands::Clear { path } => commands::edit::clear(&path, cache_config, &mut out),
        Commands::Trim { path, max_items, max_bytesize } => {
            commands::edit::trim(&path, cache_config, max_items, max_bytesize, &mut out)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
