//! Word-to-speaker attribution.
//!
//! Each word is attributed by its midpoint. A midpoint inside a speaker turn
//! (both ends inclusive) takes that turn's speaker; a midpoint in a gap takes
//! the nearest turn. Whenever two turns are equally good, the one that
//! starts earlier wins, so the result never depends on input order.

use crate::defaults::SPEAKER_LABEL_PREFIX;
use crate::pipeline::types::{SpeakerSegment, Word};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpeakerMapper {
    label_prefix: String,
}

impl Default for WordSpeakerMapper {
    fn default() -> Self {
        Self::new(SPEAKER_LABEL_PREFIX)
    }
}

impl WordSpeakerMapper {
    pub fn new(label_prefix: &str) -> Self {
        Self {
            label_prefix: label_prefix.to_string(),
        }
    }

    /// Label every word with a display speaker ("Speaker 1", …).
    ///
    /// Labels are numbered in order of first appearance in `words`. With no
    /// speaker turns the words come back unlabeled.
    pub fn map(&self, mut words: Vec<Word>, segments: &[SpeakerSegment]) -> Vec<Word> {
        if segments.is_empty() || words.is_empty() {
            for word in &mut words {
                word.speaker = None;
            }
            return words;
        }

        let mut sorted: Vec<&SpeakerSegment> = segments.iter().collect();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
        debug_assert!(sorted.windows(2).all(|w| w[0].start <= w[1].start));

        let mut labels: HashMap<&str, String> = HashMap::new();
        let mut unassigned = 0usize;
        for word in &mut words {
            word.speaker = match nearest_segment(&sorted, word.midpoint()) {
                Some(segment) => {
                    let next_number = labels.len() + 1;
                    let label = labels
                        .entry(segment.speaker_id.as_str())
                        .or_insert_with(|| format!("{} {}", self.label_prefix, next_number));
                    Some(label.clone())
                }
                None => {
                    unassigned += 1;
                    None
                }
            };
        }

        tracing::debug!(
            words = words.len(),
            speakers = labels.len(),
            unassigned,
            "Mapped words to speakers"
        );
        words
    }
}

/// Pick the turn for `midpoint` from turns sorted by start.
fn nearest_segment<'a>(sorted: &[&'a SpeakerSegment], midpoint: f64) -> Option<&'a SpeakerSegment> {
    // Adjacent turns can both contain a boundary midpoint; the first (earlier)
    // one is taken.
    if let Some(&containing) = sorted.iter().find(|s| s.contains(midpoint)) {
        return Some(containing);
    }

    let mut best: Option<(&SpeakerSegment, f64)> = None;
    for &segment in sorted {
        let distance = if midpoint < segment.start {
            segment.start - midpoint
        } else {
            midpoint - segment.end()
        };
        // Strict comparison: an equal distance never displaces an earlier turn
        if distance >= 0.0 && best.is_none_or(|(_, d)| distance < d) {
            best = Some((segment, distance));
        }
    }
    best.map(|(segment, _)| segment)
}
