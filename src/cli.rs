// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run Python snippets in throwaway serverless functions.
///
/// `config.yaml` is the primary source of truth.
/// CLI flags only override config values.
#[derive(Parser, Debug)]
#[command(name = "lambdarun", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP service.
    Serve {
        /// Path to config file
        ///
        /// Defaults to ./config.yaml, missing file means defaults
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Override server.addr
        ///
        /// Example:
        /// --addr 127.0.0.1:3000
        #[arg(long)]
        addr: Option<String>,
    },

    /// Execute one snippet and print its output.
    Run {
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Snippet source given inline
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        source: Option<String>,

        /// Read the snippet from a file instead
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print lifecycle events as JSON to stderr
        #[arg(long)]
        events: bool,
    },

    /// Check a config file and print the result as JSON.
    Validate {
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Write a starter config.yaml into the current directory.
    Init,
}
