//! bitlog CLI
//!
//! Runs a single operation against a store directory.

use std::process;

use bitlog::{Config, Engine};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// bitlog CLI
#[derive(Parser, Debug)]
#[command(name = "bitlog")]
#[command(about = "Append-only key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./bitlog_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Compact the segment down to its live records
    Merge,

    /// Print segment and index statistics
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,bitlog=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder().data_dir(&args.data_dir).build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command) {
        tracing::error!("Command failed: {}", e);
        process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> bitlog::Result<()> {
    match command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Merge => {
            let stats = engine.merge()?;
            println!(
                "merged: {} records scanned, {} kept, {} -> {} bytes ({} reclaimed)",
                stats.records_scanned,
                stats.live_records,
                stats.bytes_before,
                stats.bytes_after,
                stats.reclaimed()
            );
        }
        Commands::Stats => {
            let recovery = engine.recovery_result();
            println!("segment:      {}", engine.segment_path().display());
            println!("size:         {} bytes", engine.segment_size());
            println!("live keys:    {}", engine.len());
            println!("replayed:     {} records", recovery.records_replayed);
            println!("tail dropped: {}", recovery.was_truncated);
        }
    }

    Ok(())
}
