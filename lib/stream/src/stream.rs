// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Timed token consumption.
//!
//! [`TimedTokenStream`] wraps an engine's [`TokenStream`] and stamps each
//! token with `Instant::now()` at the exact poll that yields it. That makes
//! the timestamp the token's availability time at the consumption point,
//! which is what the latency breakdown is defined over; producer-side send
//! times would hide queueing between engine and consumer.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::stream::{Stream, StreamExt};

use crate::engine::{EngineError, TokenStream};
use crate::protocols::TokenIdType;

/// One consumed token and the moment it became available.
#[derive(Debug, Clone, Copy)]
pub struct TokenEvent {
    pub token_id: TokenIdType,
    pub at: Instant,
}

pub struct TimedTokenStream {
    inner: TokenStream,
    done: bool,
}

impl TimedTokenStream {
    pub fn new(inner: TokenStream) -> Self {
        TimedTokenStream { inner, done: false }
    }
}

impl Stream for TimedTokenStream {
    type Item = Result<TokenEvent, EngineError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(token_id))) => Poll::Ready(Some(Ok(TokenEvent {
                token_id,
                at: Instant::now(),
            }))),
            Poll::Ready(Some(Err(e))) => {
                // An error is terminal; fuse so callers polling again see the
                // stream as ended rather than a second error.
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
