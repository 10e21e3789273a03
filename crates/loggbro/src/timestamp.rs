// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Clamping of record timestamps to the local clock.

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use tracing::warn;

/// Returns `timestamp`, or `now` if `timestamp` lies in the future.
pub fn normalize(
    timestamp: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    if timestamp > now {
        let skew = timestamp.signed_duration_since(now);
        warn!(
            "Fixing timestamp {}: {}ms in the future",
            timestamp.to_rfc3339(),
            skew.num_milliseconds()
        );
        now
    } else {
        timestamp
    }
}

/// Current local time with its UTC offset.
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Formats as RFC 3339 with second precision and a numeric offset,
/// e.g. `2016-06-06T12:00:00+02:00`.
pub fn format(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}
