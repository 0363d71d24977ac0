// src/main.rs

//! lambdarun
//!
//! Runs Python snippets inside throwaway serverless functions: package,
//! create, invoke once, delete. Exposed over HTTP (`serve`) or as a one-shot
//! command (`run`).
//!
//! All real work lives in `runner`; this file only wires up the process.

mod auth;
mod backend;
mod cli;
mod config;
mod engine;
mod error;
mod execution_id;
mod identity;
mod metrics;
mod packager;
mod retry;
mod runner;
mod runtime;
mod sinks;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout is reserved for snippet output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lambdarun=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    runner::run(cli).await
}
