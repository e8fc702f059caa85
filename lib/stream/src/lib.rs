// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tokenscope streaming instrumentation.
//!
//! Wraps a token-producing engine with timed consumption, stop-sequence
//! detection and per-request latency recording. The serving path is
//! [`controller::RequestController::execute`]; everything it measures lands
//! as one [`protocols::RequestRecord`] per request in a JSONL event log
//! owned by [`recorder::Recorder`].

pub mod controller;
pub mod engine;
pub mod latency;
pub mod mocker;
pub mod protocols;
pub mod recorder;
pub mod stop;
pub mod stream;

pub use controller::{RequestController, RequestError, RequestResult};
pub use engine::{EngineError, TokenEngine, TokenStream};
pub use protocols::{
    GenerationOutcome, GenerationRequest, RequestId, RequestRecord, TokenIdType,
};
pub use recorder::{Recorder, RecorderError, RecorderHandle};

pub use tokio_util::sync::CancellationToken;
