// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::protocols::TokenIdType;

/// Configuration arguments for MockEngine
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(pattern = "owned", build_fn(public))]
pub struct MockEngineArgs {
    /// Delay before the first token of each request.
    #[builder(default = "Duration::from_millis(20)")]
    pub ttft: Duration,

    /// Delay between consecutive tokens.
    #[builder(default = "Duration::from_millis(5)")]
    pub inter_token: Duration,

    /// Tokens emitted per request when the request itself does not cap the
    /// output with `max_tokens`.
    #[builder(default = "32")]
    pub num_tokens: u32,

    /// Exact token ids to emit instead of random ones. The script length
    /// overrides `num_tokens`.
    #[builder(default = "None")]
    pub script: Option<Vec<TokenIdType>>,

    /// Emit this many tokens, then fail the stream with a backend error.
    #[builder(default = "None")]
    pub fail_after: Option<u32>,

    /// Refuse every request at generate time.
    #[builder(default = "false")]
    pub reject: bool,
}

impl Default for MockEngineArgs {
    fn default() -> MockEngineArgs {
        MockEngineArgsBuilder::default()
            .build()
            .expect("Failed to build default MockEngineArgs")
    }
}
