// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Runs the ingestion loop and the periodic flush loop side by side.
//!
//! The two loops share nothing but the [`AggregationBuffer`]. On cancellation
//! the ingestion loop empties whatever is already queued in the channel, then
//! a last flush is attempted. Records still in flight on the network are lost.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::buffer::AggregationBuffer;
use crate::flusher::Flusher;
use crate::record::LogRecord;

pub struct Scheduler {
    buffer: Arc<AggregationBuffer>,
    flusher: Flusher,
    flush_interval: Duration,
    verbose: bool,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        buffer: Arc<AggregationBuffer>,
        flusher: Flusher,
        flush_interval: Duration,
        verbose: bool,
    ) -> Self {
        Scheduler {
            buffer,
            flusher,
            flush_interval,
            verbose,
        }
    }

    /// Runs until `cancel_token` fires, then ships what is left once.
    pub async fn run(
        self,
        records_rx: mpsc::UnboundedReceiver<LogRecord>,
        cancel_token: CancellationToken,
    ) {
        let ingestion = tokio::spawn(ingest_records(
            Arc::clone(&self.buffer),
            records_rx,
            cancel_token.clone(),
            self.verbose,
        ));

        let mut flush_interval = interval(self.flush_interval);
        flush_interval.tick().await; // discard first tick, which is instantaneous

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = flush_interval.tick() => self.flush().await,
            }
        }

        info!("Shutting down, attempting final flush");
        if let Err(e) = ingestion.await {
            error!("Ingestion task failed: {e}");
        }
        self.flush().await;
    }

    async fn flush(&self) {
        if let Err(e) = self.flusher.flush().await {
            error!("ship: {e}");
        }
    }
}

/// Feeds records into the buffer until the channel closes or the token fires.
pub async fn ingest_records(
    buffer: Arc<AggregationBuffer>,
    mut records_rx: mpsc::UnboundedReceiver<LogRecord>,
    cancel_token: CancellationToken,
    verbose: bool,
) {
    debug!("Ingestion loop started");
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                records_rx.close();
                while let Ok(record) = records_rx.try_recv() {
                    ingest(&buffer, &record, verbose);
                }
                break;
            }
            received = records_rx.recv() => match received {
                Some(record) => ingest(&buffer, &record, verbose),
                None => break,
            }
        }
    }
    debug!("Ingestion loop stopped");
}

fn ingest(buffer: &AggregationBuffer, record: &LogRecord, verbose: bool) {
    if verbose {
        info!("{record:?}");
    }
    buffer.ingest(record);
}
