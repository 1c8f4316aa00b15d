//! Main entry point for the application.
//!
//! Scans a Singularity scheduler, prints one tab-separated row per task (or per
//! deploy with `--deploys`) and records every task it sees in a local SQLite
//! cache.

mod cli;
mod client;
mod config;
mod constants;
mod core;
mod db;
mod errors;
mod event;
mod schema;
mod utils;

use clap::Parser;
use crate::client::{HttpSingularity, SingularityClient};
use crate::config::Config;
use crate::core::report::ReportOptions;
use crate::core::{CollectOptions, Collector, Sink};
use crate::db::CacheStore;
use crate::errors::Error;
use std::io::BufWriter;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main entry point that initializes and runs the application.
///
/// # Initialization steps:
/// 1. Parse CLI arguments and load environment variables
/// 2. Load configuration and initialize logging
/// 3. Open the cache store
/// 4. Collect, render and cache
#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let dotenv = dotenvy::dotenv();

    let mut config = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(level) = &cli.logging_level {
        config.logging.level = level.clone();
    }
    utils::init_logging(&config.logging, cli.debug);

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!("Failed to load .env file: {}", e);
        }
    }

    if let Err(e) = run(cli, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, config: Config) -> Result<(), Error> {
    let mut env = cli.env.clone();
    if let Some(preset) = cli.preset {
        match config.env_preset(preset) {
            Some(names) => {
                info!("Using environment preset {}: {}", preset, names.join(", "));
                env = names.to_vec();
            }
            None => warn!("Unknown environment preset {}", preset),
        }
    }

    let store = if config.cache.enabled && !cli.no_cache {
        Some(Arc::new(CacheStore::open(&config.cache)?))
    } else {
        None
    };

    let client: Arc<dyn SingularityClient> =
        Arc::new(HttpSingularity::new(&cli.url, config.request_timeout()?)?);

    let report = ReportOptions {
        print_headers: !cli.no_print_headers,
        print_active: !cli.no_print_active,
        print_pending: cli.print_pending,
        include_inactive: cli.include_inactive,
        include_status: cli.include_status,
        include_docker_image: cli.docker_image,
        env,
    };
    let options = CollectOptions {
        workers: cli.workers.unwrap_or(config.workers),
        retry_attempts: config.retry_attempts,
        history_page_size: config.history_page_size,
        include_inactive: cli.include_inactive,
        print_active: report.print_active,
        print_pending: report.print_pending,
    };

    let collector = Collector::new(Arc::clone(&client), options);
    let requests = collector.load_requests().await?;

    let (sink, renderer) = Sink::spawn(
        BufWriter::new(std::io::stdout()),
        report,
        store,
        client.base_url(),
    );
    let summary = if cli.deploys {
        collector.collect_deploys(requests, &sink).await
    } else {
        collector.collect_tasks(requests, &sink).await
    };
    drop(sink);

    let rendered = renderer
        .await
        .map_err(|e| Error::IoError(std::io::Error::other(e)))?;
    let (_, stats) = rendered?;

    info!(
        "Run finished: {} requests, {} dispatched, {} resolved, {} dropped, {} printed, {} suppressed",
        summary.requests,
        summary.dispatched,
        summary.resolved,
        summary.dropped,
        stats.printed,
        stats.suppressed
    );
    Ok(())
}
