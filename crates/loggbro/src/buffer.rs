// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mutex-guarded aggregation of events into per-origin streams.
//!
//! The buffer is shared between the ingestion task and the flusher. Both only
//! ever hold the lock for the append or the swap; no I/O happens under it.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::event::{EventStream, TagSet};
use crate::record::LogRecord;
use crate::timestamp;

#[derive(Debug, Default)]
struct Streams {
    streams: Vec<EventStream>,
    // Position of each tag set in `streams`.
    index: HashMap<TagSet, usize>,
    events: usize,
    dropped: usize,
}

/// Everything captured by one [`AggregationBuffer::drain_all`].
#[derive(Debug, Default)]
pub struct Drained {
    pub streams: Vec<EventStream>,
    /// Records refused since the previous drain because the buffer was full.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct AggregationBuffer {
    inner: Mutex<Streams>,
    max_events: Option<usize>,
}

impl Default for AggregationBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl AggregationBuffer {
    /// `max_events` of `None` leaves the buffer unbounded, which is also the
    /// default. When a cap is set and reached, newly arriving records are
    /// dropped until the next drain.
    #[must_use]
    pub fn new(max_events: Option<usize>) -> Self {
        AggregationBuffer {
            inner: Mutex::new(Streams::default()),
            max_events,
        }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    fn lock(&self) -> MutexGuard<'_, Streams> {
        // Nothing inside the critical sections can leave `Streams` half updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends the record to the stream matching its origin, creating the
    /// stream if this origin has not been seen since the last drain.
    pub fn ingest(&self, record: &LogRecord) {
        self.ingest_at(record, timestamp::now());
    }

    /// Like [`ingest`](Self::ingest) with an explicit "now" for clamping.
    pub fn ingest_at(&self, record: &LogRecord, now: chrono::DateTime<chrono::FixedOffset>) {
        let tags = record.tags();
        let event = record.to_event(now);

        let mut inner = self.lock();

        if let Some(max) = self.max_events {
            if inner.events >= max {
                if inner.dropped == 0 {
                    warn!("Aggregation buffer full ({max} events), dropping new records until next flush");
                }
                inner.dropped += 1;
                return;
            }
        }

        inner.events += 1;
        match inner.index.get(&tags).copied() {
            Some(position) => inner.streams[position].events.push(event),
            None => {
                let position = inner.streams.len();
                inner.index.insert(tags.clone(), position);
                inner.streams.push(EventStream::new(tags, event));
            }
        }
    }

    /// Takes every stream out of the buffer, leaving it empty.
    pub fn drain_all(&self) -> Drained {
        let taken = mem::take(&mut *self.lock());
        if taken.dropped > 0 {
            warn!(
                "Dropped {} records because the aggregation buffer was full",
                taken.dropped
            );
        }
        debug!(
            "Drained {} streams holding {} events",
            taken.streams.len(),
            taken.events
        );
        Drained {
            streams: taken.streams,
            dropped: taken.dropped,
        }
    }

    /// Number of streams currently buffered.
    pub fn len(&self) -> usize {
        self.lock().streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().streams.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.lock().events
    }
}
