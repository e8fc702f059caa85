// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! MockEngine - an in-process [`TokenEngine`] with scripted timing.
//!
//! Emits tokens on a configurable TTFT / inter-token schedule so the
//! instrumentation above it can be exercised without a real backend. Used by
//! the integration tests and the `simulate` command.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineError, TokenEngine, TokenStream};
use crate::mocker::protocols::MockEngineArgs;
use crate::protocols::{GenerationRequest, RequestId, TokenIdType};

/// Generate a random token in the mock vocabulary range.
pub fn generate_random_token() -> TokenIdType {
    rand::rng().random_range(1000..2000)
}

pub struct MockEngine {
    args: MockEngineArgs,
    active_requests: Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
}

impl MockEngine {
    pub fn new(args: MockEngineArgs) -> Self {
        MockEngine {
            args,
            active_requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Requests currently generating; drops to zero once emission tasks
    /// finish or are cancelled.
    pub async fn active_request_count(&self) -> usize {
        self.active_requests.lock().await.len()
    }
}

#[async_trait]
impl TokenEngine for MockEngine {
    async fn generate(&self, request: GenerationRequest) -> Result<TokenStream, EngineError> {
        if self.args.reject {
            return Err(EngineError::Rejected(
                "mock engine is configured to reject requests".to_string(),
            ));
        }
        if request.token_ids.is_empty() {
            return Err(EngineError::Rejected("empty prompt".to_string()));
        }

        let plan: Vec<TokenIdType> = match &self.args.script {
            Some(ids) => ids.clone(),
            None => (0..self.args.num_tokens)
                .map(|_| generate_random_token())
                .collect(),
        };
        let mut limit = plan.len();
        if let Some(max_tokens) = request.stop_conditions.max_tokens {
            limit = limit.min(max_tokens as usize);
        }

        let request_id = request.id.clone();
        let cancel = CancellationToken::new();
        {
            let mut active = self.active_requests.lock().await;
            active.insert(request_id.clone(), cancel.clone());
        }

        let (stream_tx, stream_rx) = mpsc::unbounded_channel::<Result<TokenIdType, EngineError>>();

        let ttft = self.args.ttft;
        let inter_token = self.args.inter_token;
        let fail_after = self.args.fail_after;
        let active_requests = self.active_requests.clone();

        tokio::spawn(async move {
            let mut emitted = 0usize;
            loop {
                if emitted >= limit {
                    break;
                }
                if fail_after.is_some_and(|n| emitted >= n as usize) {
                    let _ = stream_tx.send(Err(EngineError::Backend(
                        "injected backend failure".to_string(),
                    )));
                    break;
                }

                let delay = if emitted == 0 { ttft } else { inter_token };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                if stream_tx.send(Ok(plan[emitted])).is_err() {
                    tracing::debug!("request {request_id}: token receiver dropped");
                    break;
                }
                emitted += 1;
            }

            let mut active = active_requests.lock().await;
            active.remove(&request_id);
        });

        Ok(Box::pin(UnboundedReceiverStream::new(stream_rx)))
    }

    async fn cancel(&self, request_id: &RequestId) {
        let active = self.active_requests.lock().await;
        if let Some(token) = active.get(request_id) {
            token.cancel();
        } else {
            tracing::debug!("cancel for unknown request {request_id}: already finished");
        }
    }
}
