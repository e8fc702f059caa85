// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Drives one request through its lifecycle and guarantees the bookkeeping.
//!
//! A request moves `Queued -> Generating -> {Completed, StoppedByUser,
//! Aborted, Failed}`. Whatever the terminal state, a request that started
//! generating produces exactly one [`RequestRecord`] in the event log. An
//! invalid request is rejected before generation and leaves no record.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::engine::{EngineError, TokenEngine};
use crate::latency::LatencyAggregator;
use crate::protocols::{
    GenerationOutcome, GenerationRequest, RequestId, RequestRecord, TokenIdType,
};
use crate::recorder::RecorderHandle;
use crate::stop::StopSequenceMatcher;
use crate::stream::TimedTokenStream;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Rejected before generation started; no record is written.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine failed; a record with whatever was measured has already
    /// been written.
    #[error(transparent)]
    Generator(#[from] EngineError),
}

/// What the caller gets back for a request that did not fail.
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub request_id: RequestId,
    pub outcome: GenerationOutcome,
    /// Tokens delivered to the caller, in order. On a stop-sequence match
    /// this ends with the matched suffix and nothing after it.
    pub token_ids: Vec<TokenIdType>,
    /// The record that was submitted to the event log.
    pub record: RequestRecord,
}

/// Executes requests against an engine and records every one of them.
///
/// Cheap to clone; all clones share the engine and the recorder handle.
#[derive(Clone)]
pub struct RequestController {
    engine: Arc<dyn TokenEngine>,
    recorder: RecorderHandle,
}

impl RequestController {
    pub fn new(engine: Arc<dyn TokenEngine>, recorder: RecorderHandle) -> Self {
        RequestController { engine, recorder }
    }

    /// Run one request to a terminal state.
    ///
    /// `cancel` aborts the request from outside (client disconnect,
    /// deadline); the stop-sequence path cancels from inside. Either way the
    /// engine is told to stop and the record is written before returning.
    pub async fn execute(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<RequestResult, RequestError> {
        if request.token_ids.is_empty() {
            return Err(RequestError::InvalidRequest(
                "prompt token_ids must not be empty".to_string(),
            ));
        }

        let request_id = request.id.clone();
        let input_length = request.input_length();
        let queue_time = request.queue_seconds;
        let s_time = request.arrival_epoch_ms.unwrap_or_else(epoch_ms);
        let mut matcher = StopSequenceMatcher::new(request.stop_conditions.stop_sequences.clone());

        debug!("request {request_id}: starting generation, {input_length} prompt tokens");
        let start = Instant::now();
        let stream = match self.engine.generate(request).await {
            Ok(stream) => stream,
            Err(e) => {
                // Never entered the token loop; record sentinels and surface
                // the failure.
                warn!("request {request_id}: engine refused generation: {e}");
                let record = build_record(
                    s_time,
                    queue_time,
                    input_length,
                    LatencyAggregator::new(start),
                    GenerationOutcome::Failed,
                );
                self.submit_record(&request_id, record).await;
                return Err(RequestError::Generator(e));
            }
        };

        let mut timed = TimedTokenStream::new(stream);
        let mut aggregator = LatencyAggregator::new(start);
        let mut token_ids: Vec<TokenIdType> = Vec::new();
        let mut failure: Option<EngineError> = None;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("request {request_id}: aborted by caller");
                    self.engine.cancel(&request_id).await;
                    break GenerationOutcome::Aborted;
                }
                item = timed.next() => {
                    let Some(item) = item else {
                        break GenerationOutcome::Completed;
                    };
                    match item {
                        Ok(event) => {
                            aggregator.observe(event.at);
                            token_ids.push(event.token_id);
                            if let Some(idx) = matcher.push(event.token_id) {
                                debug!(
                                    "request {request_id}: stop sequence {idx} matched \
                                     after {} tokens",
                                    token_ids.len()
                                );
                                self.engine.cancel(&request_id).await;
                                // Break without polling again; tokens past
                                // the match must never be consumed.
                                break GenerationOutcome::StoppedByUser;
                            }
                        }
                        Err(e) => {
                            warn!("request {request_id}: engine failed mid-stream: {e}");
                            failure = Some(e);
                            break GenerationOutcome::Failed;
                        }
                    }
                }
            }
        };

        let record = build_record(s_time, queue_time, input_length, aggregator, outcome);
        self.submit_record(&request_id, record.clone()).await;

        match failure {
            Some(e) => Err(RequestError::Generator(e)),
            None => Ok(RequestResult {
                request_id,
                outcome,
                token_ids,
                record,
            }),
        }
    }

    /// Recording failures must not change what the caller sees; they are
    /// surfaced loudly here and nowhere else.
    async fn submit_record(&self, request_id: &str, record: RequestRecord) {
        if let Err(e) = self.recorder.submit(record).await {
            error!("request {request_id}: failed to record event: {e}");
        }
    }
}

fn build_record(
    s_time: u64,
    queue_time: f64,
    input_length: u64,
    aggregator: LatencyAggregator,
    outcome: GenerationOutcome,
) -> RequestRecord {
    let breakdown = aggregator.finish();
    RequestRecord {
        s_time,
        queue_time,
        first_token_time: breakdown.first_token_seconds,
        inference_time: breakdown.inference_seconds,
        max_time_between_tokens: breakdown.max_gap_seconds,
        input_length,
        output_token: breakdown.tokens,
        e_time: epoch_ms(),
        outcome,
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
