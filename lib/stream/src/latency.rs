// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Folds a request's token timestamps into its latency breakdown.
//!
//! Pure bookkeeping over monotonic [`Instant`]s, no clocks of its own: the
//! consumer passes in the generation-start instant and one instant per
//! token, which keeps the math deterministic under test.

use std::time::{Duration, Instant};

use crate::protocols::UNOBSERVED;

/// Per-request latency summary, in seconds. Fields that were never observed
/// hold [`UNOBSERVED`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyBreakdown {
    /// Generation start to first token.
    pub first_token_seconds: f64,

    /// Generation start to last token. Equals `first_token_seconds` for a
    /// single-token request.
    pub inference_seconds: f64,

    /// Largest gap between consecutive tokens; needs at least two.
    pub max_gap_seconds: f64,

    /// Tokens observed.
    pub tokens: u64,
}

pub struct LatencyAggregator {
    start: Instant,
    first: Option<Instant>,
    last: Option<Instant>,
    max_gap: Option<Duration>,
    tokens: u64,
}

impl LatencyAggregator {
    pub fn new(start: Instant) -> Self {
        LatencyAggregator {
            start,
            first: None,
            last: None,
            max_gap: None,
            tokens: 0,
        }
    }

    /// Record one token's availability time. Timestamps are expected in
    /// consumption order; `Instant::duration_since` saturates to zero if a
    /// caller ever hands in an earlier instant.
    pub fn observe(&mut self, at: Instant) {
        if let Some(last) = self.last {
            let gap = at.duration_since(last);
            if self.max_gap.is_none_or(|current| gap > current) {
                self.max_gap = Some(gap);
            }
        } else {
            self.first = Some(at);
        }
        self.last = Some(at);
        self.tokens += 1;
    }

    pub fn finish(self) -> LatencyBreakdown {
        LatencyBreakdown {
            first_token_seconds: self
                .first
                .map_or(UNOBSERVED, |t| t.duration_since(self.start).as_secs_f64()),
            inference_seconds: self
                .last
                .map_or(UNOBSERVED, |t| t.duration_since(self.start).as_secs_f64()),
            max_gap_seconds: self.max_gap.map_or(UNOBSERVED, |d| d.as_secs_f64()),
            tokens: self.tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn no_tokens_yields_sentinels() {
        let breakdown = LatencyAggregator::new(Instant::now()).finish();
        assert_eq!(breakdown.first_token_seconds, UNOBSERVED);
        assert_eq!(breakdown.inference_seconds, UNOBSERVED);
        assert_eq!(breakdown.max_gap_seconds, UNOBSERVED);
        assert_eq!(breakdown.tokens, 0);
    }

    #[test]
    fn single_token_inference_equals_first_token() {
        let start = Instant::now();
        let mut agg = LatencyAggregator::new(start);
        agg.observe(at(start, 250));

        let breakdown = agg.finish();
        assert_relative_eq!(breakdown.first_token_seconds, 0.25);
        assert_relative_eq!(breakdown.inference_seconds, 0.25);
        assert_eq!(breakdown.max_gap_seconds, UNOBSERVED);
        assert_eq!(breakdown.tokens, 1);
    }

    #[test]
    fn max_gap_is_largest_consecutive_delta() {
        let start = Instant::now();
        let mut agg = LatencyAggregator::new(start);
        // Gaps: 30ms, 120ms, 50ms.
        for ms in [100, 130, 250, 300] {
            agg.observe(at(start, ms));
        }

        let breakdown = agg.finish();
        assert_relative_eq!(breakdown.first_token_seconds, 0.1);
        assert_relative_eq!(breakdown.inference_seconds, 0.3);
        assert_relative_eq!(breakdown.max_gap_seconds, 0.12);
        assert_eq!(breakdown.tokens, 4);
    }

    #[test]
    fn gap_to_first_token_is_not_a_gap() {
        // A slow first token must show up in TTFT, never in max gap.
        let start = Instant::now();
        let mut agg = LatencyAggregator::new(start);
        agg.observe(at(start, 5000));
        agg.observe(at(start, 5010));

        let breakdown = agg.finish();
        assert_relative_eq!(breakdown.first_token_seconds, 5.0);
        assert_relative_eq!(breakdown.max_gap_seconds, 0.01);
    }

    #[test]
    fn evenly_spaced_tokens() {
        let start = Instant::now();
        let mut agg = LatencyAggregator::new(start);
        for i in 1..=10u64 {
            agg.observe(at(start, i * 10));
        }

        let breakdown = agg.finish();
        assert_eq!(breakdown.tokens, 10);
        assert_relative_eq!(breakdown.first_token_seconds, 0.01);
        assert_relative_eq!(breakdown.inference_seconds, 0.1);
        assert_relative_eq!(breakdown.max_gap_seconds, 0.01);
    }
}
