// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Typed syslog records and their conversion into aggregation events.
//!
//! Records are never rejected for missing metadata. Absent fields are
//! substituted as follows:
//!
//! | field       | fallback                                 |
//! |-------------|------------------------------------------|
//! | `hostname`  | peer IP address, then [`UNKNOWN_HOST`]   |
//! | `tag`       | [`UNKNOWN_TAG`]                          |
//! | `facility`  | empty string                             |
//! | `timestamp` | local time at ingestion                  |

use std::net::SocketAddr;

use chrono::{DateTime, FixedOffset};
use syslog_loose::Variant;

use crate::event::{Event, TagSet};
use crate::timestamp;

/// Hostname used when neither the message nor the transport names one.
pub const UNKNOWN_HOST: &str = "unknown";
/// Tag used when the message has no app name (the syslog NILVALUE).
pub const UNKNOWN_TAG: &str = "-";

/// One syslog message as produced by the listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub hostname: Option<String>,
    pub tag: Option<String>,
    pub facility: Option<u8>,
    pub severity: Option<u8>,
    pub priority: Option<u8>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub content: String,
    pub client: Option<SocketAddr>,
}

impl LogRecord {
    /// Parses a single RFC 5424 or RFC 3164 message, detecting the format.
    #[must_use]
    pub fn parse(line: &str, client: Option<SocketAddr>) -> Self {
        let message = syslog_loose::parse_message(line, Variant::Either);

        let facility = message.facility.map(|f| f as u8);
        let severity = message.severity.map(|s| s as u8);
        let priority = match (facility, severity) {
            (Some(f), Some(s)) => Some((f << 3) | s),
            _ => None,
        };

        LogRecord {
            hostname: message.hostname.map(str::to_string),
            tag: message.appname.map(str::to_string),
            facility,
            severity,
            priority,
            timestamp: message.timestamp,
            content: message.msg.to_string(),
            client,
        }
    }

    pub fn host(&self) -> String {
        match (&self.hostname, self.client) {
            (Some(hostname), _) if !hostname.is_empty() => hostname.clone(),
            (_, Some(client)) => client.ip().to_string(),
            _ => UNKNOWN_HOST.to_string(),
        }
    }

    pub fn tag(&self) -> &str {
        match self.tag.as_deref() {
            Some(tag) if !tag.is_empty() => tag,
            _ => UNKNOWN_TAG,
        }
    }

    /// The grouping fingerprint: `{"@host": host, "@tag": tag}`.
    pub fn tags(&self) -> TagSet {
        TagSet::origin(&self.host(), self.tag())
    }

    /// Builds the event, clamping the timestamp to `now`.
    pub fn to_event(&self, now: DateTime<FixedOffset>) -> Event {
        let timestamp = match self.timestamp {
            Some(ts) => timestamp::normalize(ts, now),
            None => now,
        };
        let facility = self.facility.map(|f| f.to_string()).unwrap_or_default();

        Event::new(timestamp::format(&timestamp))
            .with_attribute("host", self.host())
            .with_attribute("msg", self.content.clone())
            .with_attribute("tag", self.tag())
            .with_attribute("fac", facility)
    }
}
