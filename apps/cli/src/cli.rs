//! Command line interface definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cloudfiles - chunked file transfer against a directory-backed drive
#[derive(Parser)]
#[command(name = "cloudfiles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chunked upload, ranged download and config relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a local file to the drive
    Upload {
        path: PathBuf,

        /// Placeholder id reported back with progress events
        #[arg(long)]
        caller_id: Option<String>,

        /// Comma-separated allowed extensions, e.g. "pdf, png"
        #[arg(long)]
        accept: Option<String>,

        /// Largest accepted file, in megabytes
        #[arg(long)]
        max_size_mb: Option<f64>,
    },

    /// Download a stored file into the download directory
    Download {
        /// Stored file id
        id: String,

        /// Save under this name instead of the stored one
        #[arg(long)]
        name: Option<String>,

        /// Override the download directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Store a JSON payload in the relay and print its id
    RelayPut {
        /// JSON text, or `@path` to read it from a file
        payload: String,

        /// Also print the navigation URL for this page location
        #[arg(long, value_name = "URL")]
        href: Option<String>,
    },

    /// Wait for a relayed payload and print it
    RelayGet {
        config_id: String,

        /// Override the relay timeout
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Remove a relayed payload
    RelayDrop { config_id: String },
}
