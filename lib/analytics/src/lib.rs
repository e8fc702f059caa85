// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tokenscope offline analysis.
//!
//! Reads the JSONL event log written by the serving side and reconstructs
//! what the service was doing: prefill throughput per wall-clock second and
//! percentile summaries of the per-request latency fields. Everything here
//! is synchronous; logs are analyzed after the fact, not tailed.

use std::path::PathBuf;

pub mod log;
pub mod percentile;
pub mod throughput;

pub use log::read_records;
pub use percentile::{LatencyField, PercentileSummary, extract, summarize};
pub use throughput::{ThroughputSample, prefill_throughput};

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("failed to read event log {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A line that is not a valid record. The log is append-only and
    /// written one flushed line at a time, so this points at real
    /// corruption and is not skipped silently.
    #[error("malformed record at line {line_no}: {source}")]
    Malformed {
        line_no: usize,
        source: serde_json::Error,
    },

    #[error("no values to summarize")]
    EmptyInput,

    #[error("unknown latency field: {0}")]
    UnknownField(String),
}
