// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use loggbro::{
    buffer::AggregationBuffer,
    config::Config,
    flusher::Flusher,
    listener::{ListenerConfig, SyslogServer},
    scheduler::Scheduler,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("LOGGBRO_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,hyper_util=off,rustls=off,reqwest=off,{log_level}");
    let filter = match EnvFilter::try_new(env_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse log level in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error reading configuration on startup: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(
        "Shipping to {} every {:?}",
        config.ingest_url, config.flush_interval
    );

    let buffer = Arc::new(AggregationBuffer::new(config.max_buffered_events));
    let flusher = match Flusher::new(&config, Arc::clone(&buffer)) {
        Ok(flusher) => flusher,
        Err(e) => {
            error!("Error reading configuration on startup: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cancel_token = CancellationToken::new();
    let (records_tx, records_rx) = mpsc::unbounded_channel();

    let listener_config = ListenerConfig {
        host: config.host.clone(),
        port: config.port,
    };
    let server = match SyslogServer::bind(&listener_config, records_tx, cancel_token.clone()).await
    {
        Ok(server) => server,
        Err(e) => {
            error!("boot failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    let server_task = tokio::spawn(server.spin());

    let scheduler = Scheduler::new(
        buffer,
        flusher,
        config.flush_interval,
        config.verbose,
    );
    let scheduler_task = tokio::spawn(scheduler.run(records_rx, cancel_token.clone()));

    shutdown_signal().await;
    info!("Shutdown signal received");
    cancel_token.cancel();

    if let Err(e) = server_task.await {
        error!("Syslog server task failed: {e}");
    }
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task failed: {e}");
    }

    info!("Stopped");
    ExitCode::SUCCESS
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            error!("Unable to listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
