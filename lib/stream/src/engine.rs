// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The seam between the instrumentation layer and whatever actually produces
//! tokens. Real backends and the in-process mock implement [`TokenEngine`];
//! everything above it only ever sees a stream of token ids.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::protocols::{GenerationRequest, RequestId, TokenIdType};

/// Tokens as the engine yields them, in generation order. An `Err` item is
/// terminal: no further items follow it.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<TokenIdType, EngineError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine refused the request before producing any tokens.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The engine failed while generating.
    #[error("backend failure: {0}")]
    Backend(String),

    /// The engine's output channel closed without a terminal signal.
    #[error("token stream closed unexpectedly")]
    StreamClosed,
}

#[async_trait]
pub trait TokenEngine: Send + Sync {
    /// Accept a request and return its token stream. `Ok` means the engine
    /// has admitted the request; stream items arrive in generation order.
    async fn generate(&self, request: GenerationRequest) -> Result<TokenStream, EngineError>;

    /// Stop producing for `request_id` promptly. Idempotent; cancelling an
    /// unknown or already-finished request is a no-op, so callers may race
    /// cancellation against natural completion freely.
    async fn cancel(&self, request_id: &RequestId);
}
