// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RequestId, TokenIdType};

/// Conditions that end generation before the engine runs out of tokens.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct StopConditions {
    /// Hard cap on the number of output tokens.
    pub max_tokens: Option<u32>,

    /// Lower bound the engine should honor before any natural stop.
    pub min_tokens: Option<u32>,

    /// Token-id suffixes that terminate generation as soon as the output
    /// ends with one of them. The matching token itself is still delivered.
    pub stop_sequences: Vec<Vec<TokenIdType>>,
}

/// Sampling knobs forwarded to the engine untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SamplingOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<i32>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        SamplingOptions {
            temperature: Some(0.1),
            top_p: Some(0.9),
            top_k: Some(-1),
        }
    }
}

/// A fully tokenized generation request.
///
/// The prompt is a non-empty token-id sequence; tokenization happens upstream
/// and is out of scope here. `arrival_epoch_ms` and `queue_seconds` carry the
/// queueing story into the per-request record.
#[derive(Serialize, Deserialize, Debug, Clone, Builder)]
#[builder(pattern = "owned", build_fn(public))]
pub struct GenerationRequest {
    /// Unique request id; defaults to a fresh uuid4 hex string.
    #[builder(default = "Uuid::new_v4().simple().to_string()")]
    pub id: RequestId,

    /// Prompt token ids. Must be non-empty; the controller rejects empty
    /// prompts before generation starts.
    pub token_ids: Vec<TokenIdType>,

    #[builder(default)]
    pub stop_conditions: StopConditions,

    #[builder(default)]
    pub sampling: SamplingOptions,

    /// Wall-clock arrival of the request, epoch milliseconds. Stamped by the
    /// controller when absent.
    #[builder(default = "None")]
    pub arrival_epoch_ms: Option<u64>,

    /// Time the request spent queued before generation started, in seconds.
    #[builder(default = "0.0")]
    pub queue_seconds: f64,
}

impl GenerationRequest {
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Prompt length in tokens, as recorded in the event log.
    pub fn input_length(&self) -> u64 {
        self.token_ids.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let request = GenerationRequest::builder()
            .token_ids(vec![1, 2, 3])
            .build()
            .unwrap();

        assert_eq!(request.token_ids, vec![1, 2, 3]);
        assert_eq!(request.input_length(), 3);
        assert_eq!(request.queue_seconds, 0.0);
        assert!(request.arrival_epoch_ms.is_none());
        assert!(request.stop_conditions.stop_sequences.is_empty());
        // uuid4 hex, no hyphens
        assert_eq!(request.id.len(), 32);
        assert!(!request.id.contains('-'));
    }

    #[test]
    fn sampling_defaults_match_serving_defaults() {
        let sampling = SamplingOptions::default();
        assert_eq!(sampling.temperature, Some(0.1));
        assert_eq!(sampling.top_p, Some(0.9));
        assert_eq!(sampling.top_k, Some(-1));
    }

    #[test]
    fn distinct_requests_get_distinct_ids() {
        let a = GenerationRequest::builder()
            .token_ids(vec![1])
            .build()
            .unwrap();
        let b = GenerationRequest::builder()
            .token_ids(vec![1])
            .build()
            .unwrap();
        assert_ne!(a.id, b.id);
    }
}
