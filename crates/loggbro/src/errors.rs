// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Failure to ship one batch. The batch is gone either way.
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("Failed to serialize batch: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Failed to send batch: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Batch rejected with status {status}: {body}")]
    RemoteRejected { status: StatusCode, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to bind {transport} listener to {address}: {source}")]
    Bind {
        transport: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
