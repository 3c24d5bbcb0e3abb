//! Data types shared by every pipeline stage.
//!
//! All of them serialise with the camelCase field names callers consume, so
//! the JSON shape stays identical whichever strategy produced it.

use crate::config::PipelineConfig;
use crate::defaults;
use serde::{Deserialize, Serialize};

/// A single word with its timestamps in seconds on the original timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
    /// Display label ("Speaker 1") once mapped, `None` when unattributed.
    #[serde(default)]
    pub speaker: Option<String>,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            speaker: None,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Raw diarization output: one speaker talking from `start` for `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSegment {
    #[serde(alias = "speaker")]
    pub speaker_id: String,
    pub start: f64,
    pub duration: f64,
}

impl SpeakerSegment {
    pub fn new(speaker_id: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            start,
            duration,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Closed-interval containment: both boundaries count as inside.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end()
    }
}

/// One speaker-homogeneous run of words in the final transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: Option<String>,
    pub words: Vec<Word>,
}

/// What a pipeline run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Final rendering after post-processing (`"<label>: <text>"` lines when
    /// diarization applied).
    pub text: String,
    /// Plain concatenated segment text before post-processing.
    pub raw_text: String,
    pub processing_time_seconds: f64,
    pub pipeline_steps: Vec<String>,
    pub diarization_applied: bool,
    pub word_level_timestamps: bool,
    pub speaker_count_detected: usize,
    pub segments: Vec<TranscriptSegment>,
}

/// Entry-point request: the audio plus the per-run options.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    /// WAV file contents.
    pub audio_bytes: Vec<u8>,
    pub punctuate: bool,
    pub denormalize: bool,
    pub denormalize_style: String,
    pub enable_diarization: bool,
    pub speaker_count_hint: Option<usize>,
    pub max_speakers: Option<usize>,
}

impl PipelineRequest {
    /// Request with the documented defaults (diarization on, no post-processing).
    pub fn new(audio_bytes: Vec<u8>) -> Self {
        Self {
            audio_bytes,
            punctuate: false,
            denormalize: false,
            denormalize_style: defaults::DENORMALIZE_STYLE.to_string(),
            enable_diarization: true,
            speaker_count_hint: None,
            max_speakers: None,
        }
    }

    /// Request whose options come from a loaded configuration.
    pub fn from_config(audio_bytes: Vec<u8>, config: &PipelineConfig) -> Self {
        Self {
            audio_bytes,
            punctuate: config.punctuate,
            denormalize: config.denormalize,
            denormalize_style: config.denormalize_style.clone(),
            enable_diarization: config.enable_diarization,
            speaker_count_hint: config.speaker_count_hint,
            max_speakers: config.max_speakers,
        }
    }

    pub fn with_diarization(mut self, enabled: bool) -> Self {
        self.enable_diarization = enabled;
        self
    }

    pub fn with_punctuation(mut self, enabled: bool) -> Self {
        self.punctuate = enabled;
        self
    }

    pub fn with_denormalization(mut self, enabled: bool, style: &str) -> Self {
        self.denormalize = enabled;
        self.denormalize_style = style.to_string();
        self
    }

    pub fn with_speaker_hints(mut self, expected: Option<usize>, max: Option<usize>) -> Self {
        self.speaker_count_hint = expected;
        self.max_speakers = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_midpoint() {
        let word = Word::new("hi", 1.0, 1.5);
        assert!((word.midpoint() - 1.25).abs() < f64::EPSILON);
        assert!((word.duration() - 0.5).abs() < f64::EPSILON);
        assert!(word.speaker.is_none());
    }

    #[test]
    fn test_speaker_segment_end_and_closed_containment() {
        let seg = SpeakerSegment::new("A", 1.0, 2.0);
        assert!((seg.end() - 3.0).abs() < f64::EPSILON);
        assert!(seg.contains(1.0));
        assert!(seg.contains(3.0));
        assert!(seg.contains(2.0));
        assert!(!seg.contains(0.99));
        assert!(!seg.contains(3.01));
    }

    #[test]
    fn test_speaker_segment_accepts_speaker_alias() {
        let seg: SpeakerSegment =
            serde_json::from_str(r#"{"speaker":"SPK_0","start":0.5,"duration":1.0}"#).unwrap();
        assert_eq!(seg.speaker_id, "SPK_0");

        let seg: SpeakerSegment =
            serde_json::from_str(r#"{"speakerId":"SPK_1","start":0.0,"duration":2.0}"#).unwrap();
        assert_eq!(seg.speaker_id, "SPK_1");
    }

    #[test]
    fn test_pipeline_result_uses_camel_case_fields() {
        let result = PipelineResult {
            text: "hi".to_string(),
            raw_text: "hi".to_string(),
            processing_time_seconds: 0.1,
            pipeline_steps: vec!["transcription".to_string()],
            diarization_applied: false,
            word_level_timestamps: true,
            speaker_count_detected: 0,
            segments: vec![],
        };

        let json = serde_json::to_value(&result).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "diarizationApplied",
                "pipelineSteps",
                "processingTimeSeconds",
                "rawText",
                "segments",
                "speakerCountDetected",
                "text",
                "wordLevelTimestamps",
            ]
        );
    }

    #[test]
    fn test_transcript_segment_serialises_null_speaker() {
        let segment = TranscriptSegment {
            id: 0,
            start: 0.0,
            end: 0.3,
            text: "hi".to_string(),
            speaker: None,
            words: vec![Word::new("hi", 0.0, 0.3)],
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert!(json["speaker"].is_null());
        assert_eq!(json["words"][0]["text"], "hi");
    }

    #[test]
    fn test_request_defaults() {
        let request = PipelineRequest::new(vec![1, 2, 3]);
        assert!(request.enable_diarization);
        assert!(!request.punctuate);
        assert!(!request.denormalize);
        assert_eq!(request.denormalize_style, "default");
        assert_eq!(request.speaker_count_hint, None);
    }

    #[test]
    fn test_request_from_config() {
        let config = PipelineConfig {
            punctuate: true,
            enable_diarization: false,
            max_speakers: Some(3),
            ..PipelineConfig::default()
        };
        let request = PipelineRequest::from_config(vec![], &config);
        assert!(request.punctuate);
        assert!(!request.enable_diarization);
        assert_eq!(request.max_speakers, Some(3));
    }

    #[test]
    fn test_request_builders_chain() {
        let request = PipelineRequest::new(vec![])
            .with_diarization(false)
            .with_punctuation(true)
            .with_denormalization(true, "spoken")
            .with_speaker_hints(Some(2), Some(4));
        assert!(!request.enable_diarization);
        assert!(request.punctuate);
        assert!(request.denormalize);
        assert_eq!(request.denormalize_style, "spoken");
        assert_eq!(request.speaker_count_hint, Some(2));
        assert_eq!(request.max_speakers, Some(4));
    }
}
