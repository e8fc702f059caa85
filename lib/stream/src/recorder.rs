// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Durable event log for request records.
//!
//! A single writer task owns the log file; the serving path only ever talks
//! to it through a cheap clonable [`RecorderHandle`]. Every record becomes
//! one JSON line, flushed before the next is taken, so a crash loses at most
//! the record being written. Durability is deliberately favored over write
//! throughput: record volume is one line per request, not per token.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::protocols::RequestRecord;

const RECORD_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("failed to open event log {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to append record: {0}")]
    Write(#[from] std::io::Error),

    /// The writer task has exited; the record was not accepted.
    #[error("event log writer has shut down")]
    Closed,
}

/// Submission side of the recorder, handed to every request path.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RequestRecord>,
}

impl RecorderHandle {
    /// Queue one record for appending. `Err(Closed)` means the writer has
    /// exited (shutdown or a write failure) and the record was dropped.
    pub async fn submit(&self, record: RequestRecord) -> Result<(), RecorderError> {
        self.tx.send(record).await.map_err(|_| RecorderError::Closed)
    }
}

/// Owns the writer task appending records to a JSONL file.
pub struct Recorder {
    tx: mpsc::Sender<RequestRecord>,
    cancel: CancellationToken,
    count: Arc<AtomicU64>,
    task: JoinHandle<Result<(), RecorderError>>,
}

impl Recorder {
    /// Open `path` for appending and spawn the writer task. The file is
    /// created if absent; an existing log grows, it is never truncated.
    pub async fn new(
        cancel: CancellationToken,
        path: impl AsRef<Path>,
    ) -> Result<Recorder, RecorderError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| RecorderError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
        let count = Arc::new(AtomicU64::new(0));

        let writer_count = count.clone();
        let writer_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let result = run_writer(rx, file, writer_count, writer_cancel).await;
            if let Err(ref e) = result {
                tracing::error!("event log writer terminated: {e}");
            }
            result
        });

        tracing::debug!("recording request events to {}", path.display());
        Ok(Recorder {
            tx,
            cancel,
            count,
            task,
        })
    }

    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle {
            tx: self.tx.clone(),
        }
    }

    /// Records appended so far.
    pub fn record_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Ask the writer to drain anything already submitted and exit.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the writer task to finish, surfacing its terminal error if
    /// it died on a write. Call [`shutdown`](Self::shutdown) first (or drop
    /// every [`RecorderHandle`]) or this will wait for more records forever.
    pub async fn join(self) -> Result<(), RecorderError> {
        let Recorder { tx, task, .. } = self;
        drop(tx);
        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("event log writer task panicked: {e}");
                Err(RecorderError::Closed)
            }
        }
    }
}

async fn run_writer(
    mut rx: mpsc::Receiver<RequestRecord>,
    file: File,
    count: Arc<AtomicU64>,
    cancel: CancellationToken,
) -> Result<(), RecorderError> {
    let mut writer = BufWriter::new(file);
    loop {
        tokio::select! {
            maybe_record = rx.recv() => match maybe_record {
                Some(record) => {
                    append(&mut writer, &record).await?;
                    count.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            },
            _ = cancel.cancelled() => {
                // Drain records submitted before the shutdown signal.
                while let Ok(record) = rx.try_recv() {
                    append(&mut writer, &record).await?;
                    count.fetch_add(1, Ordering::Relaxed);
                }
                break;
            }
        }
    }
    writer.flush().await?;
    tracing::debug!(
        "event log writer exited after {} records",
        count.load(Ordering::Relaxed)
    );
    Ok(())
}

async fn append(
    writer: &mut BufWriter<File>,
    record: &RequestRecord,
) -> Result<(), RecorderError> {
    let line = serde_json::to_vec(record)?;
    writer.write_all(&line).await?;
    writer.write_all(b"\n").await?;
    // Flush per line so a crash loses at most the record in flight.
    writer.flush().await?;
    Ok(())
}
