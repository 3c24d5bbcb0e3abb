//! Pre-merging of diarization turns before per-segment transcription.
//!
//! Acoustic models do poorly on sub-second clips, so adjacent turns of the
//! same speaker are glued together until they reach a useful length. The
//! merged span never exceeds the configured maximum: a run stops growing at
//! the last original boundary that keeps it under the cap.

use crate::config::PipelineConfig;
use crate::pipeline::types::SpeakerSegment;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentMerger {
    min_duration: f64,
    max_duration: f64,
}

impl Default for SegmentMerger {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl SegmentMerger {
    pub fn new(min_duration: f64, max_duration: f64) -> Self {
        Self {
            min_duration,
            max_duration,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.min_segment_for_transcription,
            config.max_segment_for_transcription,
        )
    }

    /// Merge short same-speaker runs and enforce the maximum span.
    ///
    /// The input is sorted by start first; turns with a non-positive or
    /// non-finite duration are dropped.
    pub fn merge(&self, segments: &[SpeakerSegment]) -> Vec<SpeakerSegment> {
        let mut sorted: Vec<&SpeakerSegment> = segments
            .iter()
            .filter(|s| s.start.is_finite() && s.duration.is_finite() && s.duration > 0.0)
            .collect();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut merged: Vec<SpeakerSegment> = Vec::with_capacity(sorted.len());
        let mut current: Option<SpeakerSegment> = None;

        for segment in sorted {
            current = match current.take() {
                Some(mut run) if self.can_extend(&run, segment) => {
                    let end = run.end().max(segment.end());
                    run.duration = end - run.start;
                    Some(run)
                }
                Some(run) => {
                    self.push_capped(&mut merged, run);
                    Some(segment.clone())
                }
                None => Some(segment.clone()),
            };
        }
        if let Some(run) = current {
            self.push_capped(&mut merged, run);
        }

        tracing::debug!(
            input = segments.len(),
            output = merged.len(),
            "Merged diarization segments"
        );
        merged
    }

    fn can_extend(&self, run: &SpeakerSegment, next: &SpeakerSegment) -> bool {
        let extended = run.end().max(next.end()) - run.start;
        run.speaker_id == next.speaker_id
            && run.duration < self.min_duration
            && extended <= self.max_duration
    }

    /// A single turn longer than the cap has no inner boundary to split at,
    /// so it is cut into equal pieces that each fit.
    fn push_capped(&self, out: &mut Vec<SpeakerSegment>, segment: SpeakerSegment) {
        if segment.duration <= self.max_duration || self.max_duration <= 0.0 {
            out.push(segment);
            return;
        }

        let pieces = (segment.duration / self.max_duration).ceil() as usize;
        let piece = segment.duration / pieces as f64;
        for i in 0..pieces {
            let start = segment.start + piece * i as f64;
            let end = if i + 1 == pieces {
                segment.end()
            } else {
                start + piece
            };
            out.push(SpeakerSegment::new(
                segment.speaker_id.clone(),
                start,
                end - start,
            ));
        }
    }
}

/// Cut `[0, duration]` into consecutive windows no longer than `max_window`.
///
/// Used when there are no diarization turns to drive segmentation.
pub fn fixed_windows(duration: f64, max_window: f64) -> Vec<(f64, f64)> {
    if !duration.is_finite() || duration <= 0.0 || !max_window.is_finite() || max_window <= 0.0 {
        return Vec::new();
    }
    let count = (duration / max_window).ceil().max(1.0) as usize;
    let width = duration / count as f64;
    (0..count)
        .map(|i| {
            let start = width * i as f64;
            let end = if i + 1 == count {
                duration
            } else {
                start + width
            };
            (start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_three_short_turns_merge_into_one() {
        let merger = SegmentMerger::new(3.0, 30.0);
        let segments = vec![
            SpeakerSegment::new("A", 0.0, 1.0),
            SpeakerSegment::new("A", 1.0, 1.0),
            SpeakerSegment::new("A", 2.0, 1.0),
        ];

        let merged = merger.merge(&segments);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].speaker_id, "A");
        assert!(approx(merged[0].start, 0.0));
        assert!(approx(merged[0].duration, 3.0));
    }

    #[test]
    fn test_appended_long_turn_is_capped() {
        let merger = SegmentMerger::new(3.0, 30.0);
        let segments = vec![
            SpeakerSegment::new("A", 0.0, 1.0),
            SpeakerSegment::new("A", 1.0, 1.0),
            SpeakerSegment::new("A", 2.0, 1.0),
            SpeakerSegment::new("A", 3.0, 28.0),
        ];

        let merged = merger.merge(&segments);

        assert!(merged.iter().all(|s| s.duration <= 30.0));
        let total: f64 = merged.iter().map(|s| s.duration).sum();
        assert!(approx(total, 31.0));
        assert!(approx(merged[0].duration, 3.0));
    }

    #[test]
    fn test_run_stops_at_boundary_that_would_exceed_cap() {
        // Still below the minimum after three turns, but adding the 28s turn
        // would overshoot the cap, so the split lands on that boundary.
        let merger = SegmentMerger::new(10.0, 30.0);
        let segments = vec![
            SpeakerSegment::new("A", 0.0, 1.0),
            SpeakerSegment::new("A", 1.0, 1.0),
            SpeakerSegment::new("A", 2.0, 1.0),
            SpeakerSegment::new("A", 3.0, 28.0),
        ];

        let merged = merger.merge(&segments);

        assert_eq!(merged.len(), 2);
        assert!(approx(merged[0].end(), 3.0));
        assert!(approx(merged[1].start, 3.0));
        assert!(approx(merged[1].duration, 28.0));
    }

    #[test]
    fn test_single_long_segment_passes_through() {
        let merger = SegmentMerger::new(2.0, 30.0);
        let segments = vec![SpeakerSegment::new("A", 5.0, 12.0)];
        assert_eq!(merger.merge(&segments), segments);
    }

    #[test]
    fn test_speaker_change_breaks_run() {
        let merger = SegmentMerger::new(3.0, 30.0);
        let segments = vec![
            SpeakerSegment::new("A", 0.0, 1.0),
            SpeakerSegment::new("B", 1.0, 1.0),
            SpeakerSegment::new("A", 2.0, 1.0),
        ];

        let merged = merger.merge(&segments);
        let speakers: Vec<&str> = merged.iter().map(|s| s.speaker_id.as_str()).collect();
        assert_eq!(speakers, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_unsorted_input_is_sorted_and_gaps_are_spanned() {
        let merger = SegmentMerger::new(3.0, 30.0);
        let segments = vec![
            SpeakerSegment::new("A", 2.5, 1.0),
            SpeakerSegment::new("A", 0.0, 1.0),
        ];

        let merged = merger.merge(&segments);
        assert_eq!(merged.len(), 1);
        assert!(approx(merged[0].start, 0.0));
        assert!(approx(merged[0].end(), 3.5));
    }

    #[test]
    fn test_oversized_turn_is_split_into_equal_pieces() {
        let merger = SegmentMerger::new(2.0, 30.0);
        let merged = merger.merge(&[SpeakerSegment::new("A", 0.0, 75.0)]);

        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|s| s.duration <= 30.0 && s.speaker_id == "A"));
        assert!(approx(merged[2].end(), 75.0));
    }

    #[test]
    fn test_degenerate_segments_are_dropped() {
        let merger = SegmentMerger::default();
        let segments = vec![
            SpeakerSegment::new("A", 0.0, 0.0),
            SpeakerSegment::new("A", 1.0, f64::NAN),
            SpeakerSegment::new("B", 2.0, 3.0),
        ];
        let merged = merger.merge(&segments);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].speaker_id, "B");
    }

    #[test]
    fn test_empty_input() {
        assert!(SegmentMerger::default().merge(&[]).is_empty());
    }

    #[test]
    fn test_fixed_windows_cover_duration() {
        let windows = fixed_windows(65.0, 30.0);
        assert_eq!(windows.len(), 3);
        assert!(approx(windows[0].0, 0.0));
        assert!(approx(windows[2].1, 65.0));
        assert!(windows.iter().all(|(s, e)| e - s <= 30.0));

        assert_eq!(fixed_windows(4.0, 30.0), vec![(0.0, 4.0)]);
        assert!(fixed_windows(0.0, 30.0).is_empty());
    }
}
