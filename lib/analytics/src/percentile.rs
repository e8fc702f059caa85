// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Percentile summaries over the per-request latency fields.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use tokenscope_stream::protocols::RequestRecord;

use crate::AnalyticsError;

/// The latency fields a summary can be computed over, addressed by their
/// event-log names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum LatencyField {
    QueueTime,
    FirstTokenTime,
    InferenceTime,
    MaxTimeBetweenTokens,
}

impl LatencyField {
    /// Parse an event-log field name, with a typed error for the CLI.
    pub fn parse(name: &str) -> Result<LatencyField, AnalyticsError> {
        name.parse()
            .map_err(|_| AnalyticsError::UnknownField(name.to_string()))
    }

    /// Every summarizable field, in event-log order.
    pub fn all() -> Vec<LatencyField> {
        LatencyField::iter().collect()
    }

    pub fn value(&self, record: &RequestRecord) -> f64 {
        match self {
            LatencyField::QueueTime => record.queue_time,
            LatencyField::FirstTokenTime => record.first_token_time,
            LatencyField::InferenceTime => record.inference_time,
            LatencyField::MaxTimeBetweenTokens => record.max_time_between_tokens,
        }
    }
}

/// Extract one field from every record, dropping sentinel values. A request
/// that never produced a token has no first-token time to summarize.
pub fn extract(records: &[RequestRecord], field: LatencyField) -> Vec<f64> {
    records
        .iter()
        .map(|record| field.value(record))
        .filter(|value| *value >= 0.0)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Summarize a set of values. Empty input is a typed error rather than a
/// NaN-filled summary.
pub fn summarize(values: &[f64]) -> Result<PercentileSummary, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::EmptyInput);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

    Ok(PercentileSummary {
        count: sorted.len(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        p50: quantile(&sorted, 0.50),
        p90: quantile(&sorted, 0.90),
        p99: quantile(&sorted, 0.99),
    })
}

/// Linear interpolation at rank `q * (n - 1)`. `sorted` must be ascending
/// and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
