// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Prefill throughput reconstruction.
//!
//! The event log does not say when each prompt token was processed, only
//! when the request started and when its first output token appeared. The
//! reconstruction assumes prefill work is spread uniformly over that window:
//! each record contributes `input_length / duration_ms` tokens to every
//! millisecond of `[s_time + queue_time, + first_token_time)`, and the
//! millisecond buckets are then folded into wall-clock seconds. Overlapping
//! requests simply add up.

use std::collections::BTreeMap;

use serde::Serialize;

use tokenscope_stream::protocols::RequestRecord;

/// Prompt tokens attributed to one wall-clock second (`second` is epoch
/// seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThroughputSample {
    pub second: u64,
    pub tokens: f64,
}

/// Reconstruct per-second prefill throughput from a set of records.
///
/// Records that never produced a first token have no observable prefill
/// window and are skipped. Returned samples are sparse and ascending;
/// seconds with no attributed work are absent.
pub fn prefill_throughput(records: &[RequestRecord]) -> Vec<ThroughputSample> {
    let mut per_ms: BTreeMap<u64, f64> = BTreeMap::new();

    for record in records {
        if record.first_token_time < 0.0 {
            continue;
        }
        let start_ms = record.s_time + (record.queue_time * 1000.0) as u64;
        // Sub-millisecond windows still attribute their input somewhere.
        let duration_ms = ((record.first_token_time * 1000.0) as u64).max(1);
        let rate = record.input_length as f64 / duration_ms as f64;
        for ms in start_ms..start_ms + duration_ms {
            *per_ms.entry(ms).or_insert(0.0) += rate;
        }
    }

    let mut per_second: BTreeMap<u64, f64> = BTreeMap::new();
    for (ms, tokens) in per_ms {
        *per_second.entry(ms / 1000).or_insert(0.0) += tokens;
    }

    per_second
        .into_iter()
        .map(|(second, tokens)| ThroughputSample { second, tokens })
        .collect()
}
