// SPDX-FileCopyrightText: Copyright (c) 2026 Tokenscope Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Incremental stop-sequence detection over token ids.

use std::collections::VecDeque;

use crate::protocols::TokenIdType;

/// Watches a growing output sequence for configured token-id suffixes.
///
/// Feed every produced token through [`push`](Self::push); a `Some(idx)`
/// return means the output now ends with `sequences[idx]` and generation
/// should stop. Only the last `max_len` tokens are retained, so memory stays
/// bounded no matter how long generation runs.
pub struct StopSequenceMatcher {
    sequences: Vec<Vec<TokenIdType>>,
    history: VecDeque<TokenIdType>,
    max_len: usize,
}

impl StopSequenceMatcher {
    /// Empty sequences can never match and are discarded up front.
    pub fn new(sequences: Vec<Vec<TokenIdType>>) -> Self {
        let sequences: Vec<Vec<TokenIdType>> =
            sequences.into_iter().filter(|s| !s.is_empty()).collect();
        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
        StopSequenceMatcher {
            sequences,
            history: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Record one produced token. Returns the index of the first sequence
    /// the current output suffix equals, if any. The matching token has
    /// already been delivered to the caller; anything after it must not be.
    pub fn push(&mut self, token: TokenIdType) -> Option<usize> {
        if self.max_len == 0 {
            return None;
        }
        if self.history.len() == self.max_len {
            self.history.pop_front();
        }
        self.history.push_back(token);
        self.sequences.iter().position(|seq| self.suffix_matches(seq))
    }

    fn suffix_matches(&self, seq: &[TokenIdType]) -> bool {
        if seq.len() > self.history.len() {
            return false;
        }
        self.history
            .iter()
            .rev()
            .zip(seq.iter().rev())
            .all(|(seen, want)| seen == want)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(matcher: &mut StopSequenceMatcher, tokens: &[TokenIdType]) -> Option<(usize, usize)> {
        for (pos, token) in tokens.iter().enumerate() {
            if let Some(idx) = matcher.push(*token) {
                return Some((pos, idx));
            }
        }
        None
    }

    #[test]
    fn full_suffix_matches() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![5, 6, 7, 8]]);
        let hit = feed(&mut matcher, &[1, 2, 5, 6, 7, 8]);
        assert_eq!(hit, Some((5, 0)));
    }

    #[test]
    fn shorter_suffix_matches() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![7, 8]]);
        let hit = feed(&mut matcher, &[5, 6, 7, 8]);
        assert_eq!(hit, Some((3, 0)));
    }

    #[test]
    fn non_contiguous_subsequence_does_not_match() {
        // [6, 8] appears in order in [5, 6, 7, 8] but never as a suffix.
        let mut matcher = StopSequenceMatcher::new(vec![vec![6, 8]]);
        assert_eq!(feed(&mut matcher, &[5, 6, 7, 8]), None);
    }

    #[test]
    fn match_fires_on_the_completing_token_only() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![7, 8]]);
        assert_eq!(matcher.push(7), None);
        assert_eq!(matcher.push(8), Some(0));
    }

    #[test]
    fn first_matching_sequence_wins() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![1, 2], vec![2]]);
        // Both end the output at token 2; index 0 is reported.
        assert_eq!(feed(&mut matcher, &[1, 2]), Some((1, 0)));

        let mut matcher = StopSequenceMatcher::new(vec![vec![9, 9], vec![2]]);
        assert_eq!(feed(&mut matcher, &[1, 2]), Some((1, 1)));
    }

    #[test]
    fn empty_sequences_are_discarded() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![], vec![]]);
        assert!(matcher.is_empty());
        assert_eq!(feed(&mut matcher, &[1, 2, 3]), None);
    }

    #[test]
    fn no_sequences_never_matches() {
        let mut matcher = StopSequenceMatcher::new(vec![]);
        assert_eq!(feed(&mut matcher, &[1, 2, 3, 4, 5]), None);
    }

    #[test]
    fn sequence_longer_than_output_cannot_match() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![1, 1, 1]]);
        assert_eq!(matcher.push(1), None);
        assert_eq!(matcher.push(1), None);
        assert_eq!(matcher.push(1), Some(0));
    }

    #[test]
    fn history_is_bounded_by_longest_sequence() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![8, 9]]);
        for token in 0..10_000 {
            matcher.push(token % 7);
        }
        assert!(matcher.history.len() <= 2);
        // Still matches after the long run.
        assert_eq!(matcher.push(8), None);
        assert_eq!(matcher.push(9), Some(0));
    }

    #[test]
    fn repeated_pattern_matches_at_first_completion() {
        let mut matcher = StopSequenceMatcher::new(vec![vec![3, 3]]);
        let hit = feed(&mut matcher, &[3, 1, 3, 3, 3]);
        assert_eq!(hit, Some((3, 0)));
    }
}
