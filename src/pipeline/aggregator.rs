//! Grouping of labeled words into transcript segments and final rendering.

use crate::pipeline::types::{TranscriptSegment, Word};

/// A failed stretch of the recording that produced no words.
///
/// It becomes an empty-text, unattributed segment placed before the word at
/// `position`, so the speakers on either side are never fused across it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placeholder {
    pub position: usize,
    pub start: f64,
    pub end: f64,
}

/// Group consecutive words that share a speaker label.
///
/// A change of label (including to or from "no speaker") starts a new
/// segment. Segment ids count up from 0, and the words of all segments
/// concatenate back to exactly the input.
pub fn aggregate(words: Vec<Word>) -> Vec<TranscriptSegment> {
    aggregate_with_placeholders(words, &[])
}

/// [`aggregate`], with an empty segment inserted for each placeholder.
///
/// Placeholders must be ordered by `position`; one past the last word
/// appends at the end.
pub fn aggregate_with_placeholders(
    words: Vec<Word>,
    placeholders: &[Placeholder],
) -> Vec<TranscriptSegment> {
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut pending = placeholders.iter().peekable();

    for (i, word) in words.into_iter().enumerate() {
        while let Some(gap) = pending.next_if(|p| p.position <= i) {
            push_placeholder(&mut segments, gap);
        }

        if let Some(current) = segments.last_mut()
            && !current.words.is_empty()
            && current.speaker == word.speaker
        {
            current.end = word.end;
            current.text.push(' ');
            current.text.push_str(&word.text);
            current.words.push(word);
            continue;
        }

        let id = segments.len();
        segments.push(TranscriptSegment {
            id,
            start: word.start,
            end: word.end,
            text: word.text.clone(),
            speaker: word.speaker.clone(),
            words: vec![word],
        });
    }

    for gap in pending {
        push_placeholder(&mut segments, gap);
    }

    segments
}

fn push_placeholder(segments: &mut Vec<TranscriptSegment>, gap: &Placeholder) {
    let id = segments.len();
    segments.push(TranscriptSegment {
        id,
        start: gap.start,
        end: gap.end,
        text: String::new(),
        speaker: None,
        words: Vec::new(),
    });
}

/// Render segments as the caller-facing transcript.
///
/// Diarized output is one `"<label>: <text>"` line per segment; otherwise the
/// segment texts are joined with single spaces.
pub fn render(segments: &[TranscriptSegment], diarization_applied: bool) -> String {
    if !diarization_applied {
        return plain_text(segments);
    }

    segments
        .iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| match &s.speaker {
            Some(label) => format!("{}: {}", label, s.text),
            None => s.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Segment texts joined with single spaces.
pub fn plain_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of distinct speaker labels across `segments`.
pub fn distinct_speakers(segments: &[TranscriptSegment]) -> usize {
    let mut labels: Vec<&str> = segments.iter().filter_map(|s| s.speaker.as_deref()).collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(text: &str, start: f64, end: f64, speaker: Option<&str>) -> Word {
        Word {
            speaker: speaker.map(str::to_string),
            ..Word::new(text, start, end)
        }
    }

    #[test]
    fn test_single_unlabeled_word() {
        let segments = aggregate(vec![Word::new("hi", 0.0, 0.3)]);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, 0);
        assert_eq!(segments[0].text, "hi");
        assert_eq!(segments[0].speaker, None);
        assert_eq!(render(&segments, false), "hi");
    }

    #[test]
    fn test_groups_by_speaker_change() {
        let words = vec![
            labeled("hi", 0.0, 0.3, Some("Speaker 1")),
            labeled("there", 0.4, 0.6, Some("Speaker 1")),
            labeled("hello", 1.0, 1.4, Some("Speaker 2")),
            labeled("again", 1.5, 1.9, Some("Speaker 1")),
        ];

        let segments = aggregate(words);

        assert_eq!(segments.len(), 3);
        assert_eq!(
            segments.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(segments[0].text, "hi there");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 0.6);
        assert_eq!(segments[1].speaker.as_deref(), Some("Speaker 2"));
        assert_eq!(
            render(&segments, true),
            "Speaker 1: hi there\nSpeaker 2: hello\nSpeaker 1: again"
        );
        assert_eq!(plain_text(&segments), "hi there hello again");
        assert_eq!(distinct_speakers(&segments), 2);
    }

    #[test]
    fn test_change_to_and_from_no_speaker_splits() {
        let words = vec![
            labeled("a", 0.0, 0.1, Some("Speaker 1")),
            labeled("b", 0.2, 0.3, None),
            labeled("c", 0.4, 0.5, Some("Speaker 1")),
        ];
        let segments = aggregate(words);
        assert_eq!(segments.len(), 3);
        assert_eq!(render(&segments, true), "Speaker 1: a\nb\nSpeaker 1: c");
    }

    #[test]
    fn test_words_partition_exactly() {
        let words: Vec<Word> = (0..20)
            .map(|i| {
                let speaker = if (i / 3) % 2 == 0 { "Speaker 1" } else { "Speaker 2" };
                labeled(&format!("w{}", i), i as f64, i as f64 + 0.5, Some(speaker))
            })
            .collect();

        let segments = aggregate(words.clone());
        let flattened: Vec<Word> = segments.into_iter().flat_map(|s| s.words).collect();
        assert_eq!(flattened, words);
    }

    #[test]
    fn test_placeholder_keeps_same_speaker_apart() {
        let words = vec![
            labeled("before", 0.0, 0.5, Some("Speaker 1")),
            labeled("after", 4.0, 4.5, Some("Speaker 1")),
        ];
        let gap = Placeholder {
            position: 1,
            start: 1.0,
            end: 3.5,
        };

        let segments = aggregate_with_placeholders(words, &[gap]);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["before", "", "after"]);
        assert_eq!(
            segments.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(segments[1].speaker, None);
        assert!(segments[1].words.is_empty());
        assert_eq!((segments[1].start, segments[1].end), (1.0, 3.5));
        assert_eq!(segments[2].speaker.as_deref(), Some("Speaker 1"));
        // Empty text never reaches the rendered transcript
        assert_eq!(render(&segments, true), "Speaker 1: before\nSpeaker 1: after");
        assert_eq!(plain_text(&segments), "before after");
    }

    #[test]
    fn test_placeholders_at_the_edges() {
        let words = vec![labeled("middle", 2.0, 2.5, Some("Speaker 1"))];
        let gaps = [
            Placeholder {
                position: 0,
                start: 0.0,
                end: 2.0,
            },
            Placeholder {
                position: 1,
                start: 3.0,
                end: 5.0,
            },
            Placeholder {
                position: 1,
                start: 5.0,
                end: 7.0,
            },
        ];

        let segments = aggregate_with_placeholders(words.clone(), &gaps);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["", "middle", "", ""]);
        let flattened: Vec<Word> = segments.into_iter().flat_map(|s| s.words).collect();
        assert_eq!(flattened, words);
    }

    #[test]
    fn test_empty_words() {
        let segments = aggregate(vec![]);
        assert!(segments.is_empty());
        assert_eq!(render(&segments, true), "");
        assert_eq!(distinct_speakers(&segments), 0);
    }
}
