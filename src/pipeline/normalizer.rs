//! Flattening of hierarchical alignment output into timed words.
//!
//! Nothing outside this module looks inside an [`AlignmentResult`].

use crate::pipeline::types::Word;
use crate::stt::aligner::{AlignedToken, AlignmentResult, TokenKind};

/// Flatten `result` into time-ordered words, shifted by `time_offset`.
///
/// Tokens that are not words (punctuation, whitespace, anything without an
/// alphanumeric character) and tokens without a usable `start < end` pair
/// are dropped.
pub fn normalize(result: &AlignmentResult, time_offset: f64) -> Vec<Word> {
    let mut dropped = 0usize;
    let mut words: Vec<Word> = result
        .utterances
        .iter()
        .flat_map(|u| u.sub_segments.iter())
        .flat_map(|s| s.tokens.iter())
        .filter_map(|token| {
            let word = to_word(token, time_offset);
            if word.is_none() {
                dropped += 1;
            }
            word
        })
        .collect();

    // Aligners emit tokens in order; a stable sort keeps equal starts as given
    words.sort_by(|a, b| a.start.total_cmp(&b.start));

    if dropped > 0 {
        tracing::debug!(kept = words.len(), dropped, "Normalized alignment tokens");
    }
    words
}

fn to_word(token: &AlignedToken, time_offset: f64) -> Option<Word> {
    if token.kind != TokenKind::Word {
        return None;
    }
    let text = token.text.trim();
    if !text.chars().any(char::is_alphanumeric) {
        return None;
    }
    let (start, end) = (token.start?, token.end?);
    if !start.is_finite() || !end.is_finite() || end <= start {
        return None;
    }
    Some(Word::new(text, start + time_offset, end + time_offset))
}
