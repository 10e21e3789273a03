// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog aggregation and shipping.
//!
//! Records arrive from the [`listener`], are grouped by origin into
//! [`event::EventStream`]s inside the [`buffer::AggregationBuffer`], and the
//! [`flusher::Flusher`] periodically drains the buffer and posts the batch to a
//! structured ingestion endpoint. The [`scheduler::Scheduler`] runs both halves.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod errors;
pub mod event;
pub mod flusher;
pub mod http;
pub mod listener;
pub mod record;
pub mod scheduler;
pub mod timestamp;
