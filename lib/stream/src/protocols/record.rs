// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Sentinel for latency fields that were never observed: a request with no
/// first token has no first-token time, and a single-token request has no
/// inter-token gap.
pub const UNOBSERVED: f64 = -1.0;

/// Terminal state of one executed request.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationOutcome {
    /// The engine exhausted its output naturally.
    #[default]
    Completed,
    /// A stop sequence matched and generation was cancelled early.
    StoppedByUser,
    /// The caller aborted the request while it was generating.
    Aborted,
    /// The engine rejected the request or failed mid-stream.
    Failed,
}

/// One line of the event log.
///
/// Field names and units are a stable contract shared with the offline
/// analysis tooling: epoch milliseconds for `s_time`/`e_time`, seconds for
/// the latency fields, [`UNOBSERVED`] where a value was never measured.
/// Readers tolerate unknown extra fields, and `outcome` defaults to
/// `completed` so logs written before the field existed still parse.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestRecord {
    /// Request arrival, epoch milliseconds.
    pub s_time: u64,

    /// Seconds spent queued before generation started.
    pub queue_time: f64,

    /// Seconds from generation start to the first token.
    pub first_token_time: f64,

    /// Seconds from generation start to the last token.
    pub inference_time: f64,

    /// Largest gap between two consecutive tokens, seconds.
    pub max_time_between_tokens: f64,

    /// Prompt length in tokens.
    pub input_length: u64,

    /// Output tokens actually produced.
    pub output_token: u64,

    /// Request end, epoch milliseconds.
    pub e_time: u64,

    #[serde(default)]
    pub outcome: GenerationOutcome,
}
