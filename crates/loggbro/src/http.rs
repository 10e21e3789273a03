// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::Config;

/// Builds the client used for shipping. When the proxy setting cannot be
/// applied, falls back to a direct client that keeps the request timeout.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config.https_proxy.as_deref(), config.flush_timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to apply HTTPS proxy setting, shipping without proxy: {e}");
            build_client(None, config.flush_timeout).unwrap_or_else(|e| {
                error!("Unable to build HTTP client, using defaults: {e}");
                reqwest::Client::new()
            })
        }
    }
}

fn build_client(
    https_proxy: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30));

    if let Some(proxy) = https_proxy {
        debug!("Shipping through HTTPS proxy {proxy}");
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }

    Ok(builder.build()?)
}
