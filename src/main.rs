// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
pub mod config;
mod kubernetes;
mod output;
pub mod progress;
mod release;
mod status;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use cli::Args;
use config::Config;
use kubernetes::KubeBackend;
use release::HelmSecretStore;
use status::Aggregator;

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    // Create log directory
    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // File appender with size-based rotation:
    // - Max 10MB per file
    // - Keep up to 5 files (total max ~50MB)
    // - Also rotate daily
    let log_path = log_dir.join("helmstat.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024); // 10MB

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let filter = if verbose {
        "helmstat=debug"
    } else {
        "helmstat=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // File layer (always enabled)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file_appender))
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        // Both file and stderr output
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        // File only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let args = Args::parse();

    // Always log to file (~/.helmstat/log/helmstat.log), with -v also to stderr
    init_logging(args.verbose);

    let stored = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Ignoring config file: {:#}", e);
        Config::default()
    });
    let config = stored.merge_args(&args);
    if args.save_config {
        config
            .save()
            .context("Failed to save defaults to the config file")?;
    }

    let backend = Arc::new(KubeBackend::connect(config.context.as_deref()).await?);
    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| backend.default_namespace().to_string());
    let store = HelmSecretStore::new(
        backend.client(),
        (!args.all_namespaces).then_some(namespace),
    );
    let format = config.output_format();

    if args.history {
        let revisions = store.list_revisions(&args.release).await?;
        println!(
            "{}",
            output::format_history(&revisions, &format, args.no_headers)
        );
        return Ok(());
    }

    let options = config.aggregate_options(!args.no_events);
    info!(
        release = %args.release,
        all_namespaces = args.all_namespaces,
        concurrency = options.concurrency,
        timeout_secs = options.timeout.as_secs(),
        "Inspecting release"
    );

    let progress = progress::create_progress_handle();
    let aggregator = Aggregator::new(Arc::new(store), backend)
        .with_options(options)
        .with_progress(Arc::clone(&progress));

    match run_with_spinner(&aggregator, &args.release, &progress).await {
        Ok(status) => {
            if status.deadline_exceeded {
                warn!(release = %args.release, "Status is incomplete, deadline exceeded");
            }
            println!(
                "{}",
                output::format_status(&status, &format, args.no_headers)
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run the aggregation while a spinner follows its progress updates
async fn run_with_spinner(
    aggregator: &Aggregator,
    release: &str,
    progress: &progress::ProgressHandle,
) -> Result<status::ReleaseStatus, status::AggregateError> {
    use progress::{ProgressUpdate, create_spinner};

    let spinner = create_spinner(&format!("Loading release {}...", release));
    let mut progress_rx = progress.subscribe();
    let mut aggregate = Box::pin(aggregator.aggregate(release));

    let result = loop {
        tokio::select! {
            biased;
            update = progress_rx.recv() => {
                match update {
                    Ok(ProgressUpdate::LoadingRelease { release }) => {
                        spinner.set_message(format!("Loading release {}...", release));
                    }
                    Ok(ProgressUpdate::Discovering) => {
                        spinner.set_message("Discovering API resources...");
                    }
                    Ok(ProgressUpdate::Enriching { total }) => {
                        spinner.set_message(format!("Inspecting {} resources...", total));
                    }
                    Ok(ProgressUpdate::ResourceComplete { kind, name, done, total }) => {
                        spinner.set_message(format!("[{}/{}] {}/{}", done, total, kind, name));
                    }
                    Err(_) => {}
                }
            }
            result = &mut aggregate => {
                break result;
            }
        }
    };

    spinner.finish_and_clear();
    result
}
