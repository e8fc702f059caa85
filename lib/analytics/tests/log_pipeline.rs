// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Full pipeline: serve requests through the instrumentation layer, then
//! analyze the log it wrote.

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use tokenscope_analytics::{LatencyField, extract, prefill_throughput, read_records, summarize};
use tokenscope_stream::controller::RequestController;
use tokenscope_stream::mocker::engine::MockEngine;
use tokenscope_stream::mocker::protocols::MockEngineArgsBuilder;
use tokenscope_stream::protocols::{GenerationOutcome, GenerationRequest, StopConditions};
use tokenscope_stream::recorder::Recorder;

#[tokio::test]
async fn served_requests_are_analyzable() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("events.jsonl");

    let recorder = Recorder::new(CancellationToken::new(), &log_path)
        .await
        .unwrap();
    let args = MockEngineArgsBuilder::default()
        .ttft(Duration::from_millis(10))
        .inter_token(Duration::from_millis(2))
        .script(Some(vec![1, 2, 7, 8, 3, 4]))
        .build()
        .unwrap();
    let engine = Arc::new(MockEngine::new(args));
    let controller = RequestController::new(engine, recorder.handle());

    // One natural completion, one stop-sequence hit, one invalid request
    // that must not show up in the log.
    controller
        .execute(
            GenerationRequest::builder()
                .token_ids(vec![10; 64])
                .build()
                .unwrap(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    controller
        .execute(
            GenerationRequest::builder()
                .token_ids(vec![10; 32])
                .stop_conditions(StopConditions {
                    stop_sequences: vec![vec![7, 8]],
                    ..Default::default()
                })
                .build()
                .unwrap(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let invalid = controller
        .execute(
            GenerationRequest::builder().token_ids(vec![]).build().unwrap(),
            CancellationToken::new(),
        )
        .await;
    assert!(invalid.is_err());

    recorder.shutdown();
    recorder.join().await.unwrap();

    let records = read_records(&log_path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].outcome, GenerationOutcome::Completed);
    assert_eq!(records[0].output_token, 6);
    assert_eq!(records[1].outcome, GenerationOutcome::StoppedByUser);
    assert_eq!(records[1].output_token, 4);

    // Both requests produced a first token, so both prefill windows count.
    let samples = prefill_throughput(&records);
    let attributed: f64 = samples.iter().map(|s| s.tokens).sum();
    let expected: f64 = records.iter().map(|r| r.input_length as f64).sum();
    assert!(
        (attributed - expected).abs() < 1e-6,
        "attributed {attributed} tokens, expected {expected}"
    );

    let ttfts = extract(&records, LatencyField::FirstTokenTime);
    let summary = summarize(&ttfts).unwrap();
    assert_eq!(summary.count, 2);
    assert!(summary.min >= 0.01, "TTFT should include the 10ms delay");
    assert!(summary.p99 >= summary.p50);
}
