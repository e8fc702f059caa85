// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # Tokenscope Protocols
//!
//! Message formats exchanged across the instrumentation pipeline: the
//! [`request::GenerationRequest`] handed to an engine, and the
//! [`record::RequestRecord`] appended to the event log for every executed
//! request.

pub mod record;
pub mod request;

/// The token ID type
pub type TokenIdType = u32;

/// Identifies one request across the engine, controller and event log.
pub type RequestId = String;

pub use record::{GenerationOutcome, RequestRecord, UNOBSERVED};
pub use request::{GenerationRequest, SamplingOptions, StopConditions};
