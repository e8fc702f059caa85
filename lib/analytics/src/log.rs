// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Event-log reading.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tokenscope_stream::protocols::RequestRecord;

use crate::AnalyticsError;

/// Load every record from a JSONL event log.
///
/// Blank lines are tolerated (a crash can leave a trailing newline); any
/// other unparsable line fails with its line number.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<RequestRecord>, AnalyticsError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AnalyticsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| AnalyticsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record =
            serde_json::from_str(&line).map_err(|source| AnalyticsError::Malformed {
                line_no: idx + 1,
                source,
            })?;
        records.push(record);
    }

    tracing::debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use tokenscope_stream::protocols::GenerationOutcome;

    const GOOD_LINE: &str = r#"{"s_time":1000,"queue_time":0.1,"first_token_time":0.05,"inference_time":0.2,"max_time_between_tokens":0.01,"input_length":64,"output_token":16,"e_time":1300,"outcome":"completed"}"#;

    #[test]
    fn reads_records_and_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{GOOD_LINE}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{GOOD_LINE}").unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].input_length, 64);
        assert_eq!(records[0].outcome, GenerationOutcome::Completed);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{GOOD_LINE}").unwrap();
        writeln!(file, "{{not json").unwrap();

        let err = read_records(&path).unwrap_err();
        assert!(matches!(err, AnalyticsError::Malformed { line_no: 2, .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = read_records(dir.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(err, AnalyticsError::Io { .. }));
    }

    #[test]
    fn pre_outcome_logs_still_parse() {
        // Records written before the outcome field existed.
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"s_time":1,"queue_time":0.0,"first_token_time":-1,"inference_time":-1,"max_time_between_tokens":-1,"input_length":8,"output_token":0,"e_time":2}}"#
        )
        .unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records[0].outcome, GenerationOutcome::Completed);
    }
}
