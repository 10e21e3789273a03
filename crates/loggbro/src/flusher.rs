// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships drained batches to the structured ingestion endpoint.
//!
//! Delivery is at most once: a batch leaves the buffer before it is sent and
//! is never put back, whatever the outcome of the request.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, error, info};

use crate::buffer::AggregationBuffer;
use crate::config::Config;
use crate::errors::{ConfigError, ShipError};
use crate::http::get_client;

#[derive(Clone)]
pub struct Flusher {
    client: reqwest::Client,
    ingest_url: String,
    headers: HeaderMap,
    buffer: Arc<AggregationBuffer>,
}

impl Flusher {
    /// Fails when the token cannot be sent as an `Authorization` header.
    pub fn new(config: &Config, buffer: Arc<AggregationBuffer>) -> Result<Self, ConfigError> {
        Ok(Flusher {
            client: get_client(config),
            ingest_url: config.ingest_url.clone(),
            headers: build_headers(config)?,
            buffer,
        })
    }

    /// Drains the buffer and posts everything in it as one request.
    ///
    /// Returns the number of streams shipped. An empty buffer makes no request.
    pub async fn flush(&self) -> Result<usize, ShipError> {
        let drained = self.buffer.drain_all();
        let n_streams = drained.streams.len();

        info!("Sending {n_streams} event streams");
        if n_streams == 0 {
            return Ok(0);
        }

        let body = serde_json::to_vec(&drained.streams)?;
        self.ship(body).await?;

        debug!("Successfully shipped {n_streams} event streams");
        Ok(n_streams)
    }

    async fn ship(&self, body: Vec<u8>) -> Result<(), ShipError> {
        let resp = self
            .client
            .post(&self.ingest_url)
            .headers(self.headers.clone())
            .body(body.clone())
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                let status = resp.status();
                let payload = resp.text().await.unwrap_or_default();
                error!("JSON: {}", String::from_utf8_lossy(&body));
                error!("{status}: Ingestion endpoint rejected batch: {payload}");
                Err(ShipError::RemoteRejected {
                    status,
                    body: payload,
                })
            }
            Err(e) => {
                error!("JSON: {}", String::from_utf8_lossy(&body));
                error!("Error shipping batch: {e}");
                Err(ShipError::Transport(e))
            }
        }
    }
}

fn build_headers(config: &Config) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, config.authorization()?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;
    use tracing_test::traced_test;

    const PATH: &str = "/api/v1/ingest/humio-structured";

    fn config(url: String) -> Config {
        Config {
            ingest_url: url,
            flush_timeout: Duration::from_secs(2),
            ..Config::for_token("test-token")
        }
    }

    fn record(host: &str, tag: &str, msg: &str) -> LogRecord {
        LogRecord {
            hostname: Some(host.to_string()),
            tag: Some(tag.to_string()),
            facility: Some(3),
            content: msg.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_headers() {
        let headers = build_headers(&Config::for_token("abc")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_flusher_refuses_token_unusable_as_header() {
        let buffer = Arc::new(AggregationBuffer::unbounded());
        let result = Flusher::new(&Config::for_token("bad\ntoken"), buffer);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_flush_empty_buffer_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .expect(0)
            .create_async()
            .await;

        let buffer = Arc::new(AggregationBuffer::unbounded());
        let flusher = Flusher::new(&config(format!("{}{PATH}", server.url())), buffer).unwrap();

        assert_eq!(flusher.flush().await.unwrap(), 0);
        assert!(logs_contain("Sending 0 event streams"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_flush_ships_batch_with_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer test-token")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!([
                {
                    "tags": {"@host": "a", "@tag": "x"},
                    "events": [
                        {"timestamp": "2016-06-06T12:00:00+02:00",
                         "attributes": {"host": "a", "msg": "m1", "tag": "x", "fac": "3"}},
                        {"timestamp": "2016-06-06T12:00:01+02:00",
                         "attributes": {"host": "a", "msg": "m2", "tag": "x", "fac": "3"}}
                    ]
                },
                {
                    "tags": {"@host": "b", "@tag": "y"},
                    "events": [
                        {"timestamp": "2016-06-06T12:00:02+02:00",
                         "attributes": {"host": "b", "msg": "m3", "tag": "y", "fac": "3"}}
                    ]
                }
            ])))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let buffer = Arc::new(AggregationBuffer::unbounded());
        for (i, (host, tag, msg)) in [("a", "x", "m1"), ("a", "x", "m2"), ("b", "y", "m3")]
            .into_iter()
            .enumerate()
        {
            let mut r = record(host, tag, msg);
            r.timestamp = Some(
                chrono::DateTime::parse_from_rfc3339(&format!("2016-06-06T12:00:0{i}+02:00"))
                    .unwrap(),
            );
            buffer.ingest(&r);
        }

        let flusher = Flusher::new(
            &config(format!("{}{PATH}", server.url())),
            Arc::clone(&buffer),
        )
        .unwrap();

        assert_eq!(flusher.flush().await.unwrap(), 2);
        assert!(buffer.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_flush_rejected_drops_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(401)
            .with_body("invalid token")
            .expect(1)
            .create_async()
            .await;

        let buffer = Arc::new(AggregationBuffer::unbounded());
        buffer.ingest(&record("a", "x", "lost message"));
        let flusher = Flusher::new(
            &config(format!("{}{PATH}", server.url())),
            Arc::clone(&buffer),
        )
        .unwrap();

        match flusher.flush().await {
            Err(ShipError::RemoteRejected { status, body }) => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "invalid token");
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        assert!(buffer.is_empty());
        assert!(logs_contain("lost message"));
        assert!(logs_contain("invalid token"));
        mock.assert_async().await;

        // Nothing is retried on the next flush.
        assert_eq!(flusher.flush().await.unwrap(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_flush_transport_error_drops_batch() {
        // Grab a free port and close it again so nothing is listening there.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let buffer = Arc::new(AggregationBuffer::unbounded());
        buffer.ingest(&record("a", "x", "unreachable"));
        let flusher = Flusher::new(
            &config(format!("http://{addr}{PATH}")),
            Arc::clone(&buffer),
        )
        .unwrap();

        let result = flusher.flush().await;

        assert!(matches!(result, Err(ShipError::Transport(_))));
        assert!(buffer.is_empty());
        assert!(logs_contain("Error shipping batch"));
        assert!(logs_contain("unreachable"));
    }

    #[tokio::test]
    async fn test_records_after_drain_go_to_next_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let buffer = Arc::new(AggregationBuffer::unbounded());
        let flusher = Flusher::new(
            &config(format!("{}{PATH}", server.url())),
            Arc::clone(&buffer),
        )
        .unwrap();

        buffer.ingest(&record("a", "x", "m1"));
        assert_eq!(flusher.flush().await.unwrap(), 1);

        buffer.ingest(&record("a", "x", "m2"));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.event_count(), 1);
        assert_eq!(flusher.flush().await.unwrap(), 1);

        mock.assert_async().await;
        assert!(buffer.drain_all().streams.is_empty());
    }
}
