use crate::defaults;
use crate::error::{DiarscribeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub collaborators: CollaboratorConfig,
}

/// Which orchestration strategy a run uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Diarize first, then transcribe and align each merged segment in parallel.
    #[default]
    SegmentFirst,
    /// One transcription and one alignment over the whole recording.
    WholeAudioFirst,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::SegmentFirst => "segment_first",
            Strategy::WholeAudioFirst => "whole_audio_first",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = DiarscribeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "segment_first" | "segment" => Ok(Strategy::SegmentFirst),
            "whole_audio_first" | "whole_audio" | "whole" => Ok(Strategy::WholeAudioFirst),
            other => Err(DiarscribeError::ConfigInvalidValue {
                key: "strategy".to_string(),
                message: format!(
                    "unknown strategy '{}', expected segment_first or whole_audio_first",
                    other
                ),
            }),
        }
    }
}

/// Every recognised pipeline option, with documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    /// Attribute words to speakers (default: true).
    pub enable_diarization: bool,
    /// Expected number of speakers, forwarded to the diarizer.
    pub speaker_count_hint: Option<usize>,
    /// Upper bound on speakers, forwarded to the diarizer.
    pub max_speakers: Option<usize>,
    /// Run the punctuation collaborator on each output segment.
    pub punctuate: bool,
    /// Run the denormalization collaborator on each output segment.
    pub denormalize: bool,
    pub denormalize_style: String,
    /// Concurrent segment workers (segment-first only).
    pub worker_concurrency: usize,
    /// Same-speaker runs shorter than this (seconds) are merged.
    pub min_segment_for_transcription: f64,
    /// No merged segment may exceed this (seconds).
    pub max_segment_for_transcription: f64,
    /// Unpadded segments shorter than this (seconds) skip alignment.
    pub min_segment_for_alignment: f64,
    /// Seconds of audio context added around each extracted segment.
    pub context_padding: f64,
    /// Per-call timeout for every collaborator.
    pub collaborator_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            enable_diarization: true,
            speaker_count_hint: None,
            max_speakers: None,
            punctuate: false,
            denormalize: false,
            denormalize_style: defaults::DENORMALIZE_STYLE.to_string(),
            worker_concurrency: defaults::WORKER_CONCURRENCY,
            min_segment_for_transcription: defaults::MIN_SEGMENT_FOR_TRANSCRIPTION,
            max_segment_for_transcription: defaults::MAX_SEGMENT_FOR_TRANSCRIPTION,
            min_segment_for_alignment: defaults::MIN_SEGMENT_FOR_ALIGNMENT,
            context_padding: defaults::CONTEXT_PADDING,
            collaborator_timeout_secs: defaults::COLLABORATOR_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> DiarscribeError {
            DiarscribeError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.worker_concurrency == 0 {
            return Err(invalid("worker_concurrency", "must be at least 1"));
        }
        if self.collaborator_timeout_secs == 0 {
            return Err(invalid("collaborator_timeout_secs", "must be at least 1"));
        }
        for (key, value) in [
            (
                "min_segment_for_transcription",
                self.min_segment_for_transcription,
            ),
            (
                "max_segment_for_transcription",
                self.max_segment_for_transcription,
            ),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(key, "must be a positive number of seconds"));
            }
        }
        for (key, value) in [
            ("min_segment_for_alignment", self.min_segment_for_alignment),
            ("context_padding", self.context_padding),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, "must be zero or a positive number of seconds"));
            }
        }
        if self.min_segment_for_transcription > self.max_segment_for_transcription {
            return Err(invalid(
                "min_segment_for_transcription",
                "must not exceed max_segment_for_transcription",
            ));
        }
        if let (Some(expected), Some(max)) = (self.speaker_count_hint, self.max_speakers)
            && expected > max
        {
            return Err(invalid("speaker_count_hint", "must not exceed max_speakers"));
        }
        Ok(())
    }
}

/// An external program standing in for one collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn is_configured(&self) -> bool {
        !self.program.trim().is_empty()
    }

    /// Parse a whitespace-separated command line ("whisper-cli --json").
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }
}

/// Programs backing the collaborators when run from the command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub transcribe: CommandSpec,
    pub align: CommandSpec,
    pub diarize: CommandSpec,
    pub punctuate: CommandSpec,
    pub denormalize: CommandSpec,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DIARSCRIBE_STRATEGY → pipeline.strategy
    /// - DIARSCRIBE_WORKERS → pipeline.worker_concurrency
    /// - DIARSCRIBE_TIMEOUT_SECS → pipeline.collaborator_timeout_secs
    /// - DIARSCRIBE_TRANSCRIBE_CMD → collaborators.transcribe
    /// - DIARSCRIBE_ALIGN_CMD → collaborators.align
    /// - DIARSCRIBE_DIARIZE_CMD → collaborators.diarize
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(strategy) = std::env::var("DIARSCRIBE_STRATEGY")
            && !strategy.is_empty()
        {
            self.pipeline.strategy = strategy.parse()?;
        }

        if let Ok(workers) = std::env::var("DIARSCRIBE_WORKERS")
            && !workers.is_empty()
        {
            self.pipeline.worker_concurrency =
                workers
                    .trim()
                    .parse()
                    .map_err(|_| DiarscribeError::ConfigInvalidValue {
                        key: "DIARSCRIBE_WORKERS".to_string(),
                        message: format!("'{}' is not a number", workers),
                    })?;
        }

        if let Ok(timeout) = std::env::var("DIARSCRIBE_TIMEOUT_SECS")
            && !timeout.is_empty()
        {
            self.pipeline.collaborator_timeout_secs =
                timeout
                    .trim()
                    .parse()
                    .map_err(|_| DiarscribeError::ConfigInvalidValue {
                        key: "DIARSCRIBE_TIMEOUT_SECS".to_string(),
                        message: format!("'{}' is not a number", timeout),
                    })?;
        }

        for (var, spec) in [
            ("DIARSCRIBE_TRANSCRIBE_CMD", &mut self.collaborators.transcribe),
            ("DIARSCRIBE_ALIGN_CMD", &mut self.collaborators.align),
            ("DIARSCRIBE_DIARIZE_CMD", &mut self.collaborators.diarize),
        ] {
            if let Ok(line) = std::env::var(var)
                && !line.trim().is_empty()
            {
                *spec = CommandSpec::parse(&line);
            }
        }

        Ok(self)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/diarscribe/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("diarscribe").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_diarscribe_env() {
        for key in [
            "DIARSCRIBE_STRATEGY",
            "DIARSCRIBE_WORKERS",
            "DIARSCRIBE_TIMEOUT_SECS",
            "DIARSCRIBE_TRANSCRIBE_CMD",
            "DIARSCRIBE_ALIGN_CMD",
            "DIARSCRIBE_DIARIZE_CMD",
        ] {
            remove_env(key);
        }
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();
        let p = &config.pipeline;

        assert_eq!(p.strategy, Strategy::SegmentFirst);
        assert!(p.enable_diarization);
        assert_eq!(p.speaker_count_hint, None);
        assert_eq!(p.max_speakers, None);
        assert!(!p.punctuate);
        assert!(!p.denormalize);
        assert_eq!(p.denormalize_style, "default");
        assert_eq!(p.worker_concurrency, 4);
        assert_eq!(p.min_segment_for_transcription, 2.0);
        assert_eq!(p.max_segment_for_transcription, 30.0);
        assert_eq!(p.min_segment_for_alignment, 0.5);
        assert_eq!(p.context_padding, 0.5);
        assert_eq!(p.collaborator_timeout(), Duration::from_secs(120));

        assert!(!config.collaborators.transcribe.is_configured());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [pipeline]
            strategy = "whole_audio_first"
            enable_diarization = false
            speaker_count_hint = 2
            max_speakers = 5
            punctuate = true
            worker_concurrency = 8
            min_segment_for_transcription = 3.0
            max_segment_for_transcription = 20.0
            context_padding = 0.25

            [collaborators.transcribe]
            program = "whisper-cli"
            args = ["--model", "base"]

            [collaborators.diarize]
            program = "pyannote-run"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        let p = &config.pipeline;

        assert_eq!(p.strategy, Strategy::WholeAudioFirst);
        assert!(!p.enable_diarization);
        assert_eq!(p.speaker_count_hint, Some(2));
        assert_eq!(p.max_speakers, Some(5));
        assert!(p.punctuate);
        assert_eq!(p.worker_concurrency, 8);
        assert_eq!(p.min_segment_for_transcription, 3.0);
        assert_eq!(p.max_segment_for_transcription, 20.0);
        assert_eq!(p.context_padding, 0.25);
        // Untouched field keeps its default
        assert_eq!(p.min_segment_for_alignment, 0.5);

        assert_eq!(config.collaborators.transcribe.program, "whisper-cli");
        assert_eq!(config.collaborators.transcribe.args, vec!["--model", "base"]);
        assert!(config.collaborators.diarize.is_configured());
        assert!(!config.collaborators.align.is_configured());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[pipeline]\nworker_concurrency = 2\n")
            .unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.worker_concurrency, 2);
        assert_eq!(
            config.pipeline,
            PipelineConfig {
                worker_concurrency: 2,
                ..PipelineConfig::default()
            }
        );
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[pipeline\nstrategy = \"broken").unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_diarscribe_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_override_strategy_and_workers() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarscribe_env();

        set_env("DIARSCRIBE_STRATEGY", "whole-audio-first");
        set_env("DIARSCRIBE_WORKERS", "6");
        let config = Config::default().with_env_overrides().unwrap();

        assert_eq!(config.pipeline.strategy, Strategy::WholeAudioFirst);
        assert_eq!(config.pipeline.worker_concurrency, 6);
        assert_eq!(config.pipeline.collaborator_timeout_secs, 120);

        clear_diarscribe_env();
    }

    #[test]
    fn test_env_override_commands() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarscribe_env();

        set_env("DIARSCRIBE_TRANSCRIBE_CMD", "asr --lang en");
        set_env("DIARSCRIBE_ALIGN_CMD", "");
        let config = Config::default().with_env_overrides().unwrap();

        assert_eq!(config.collaborators.transcribe.program, "asr");
        assert_eq!(config.collaborators.transcribe.args, vec!["--lang", "en"]);
        // Empty string should not override default
        assert!(!config.collaborators.align.is_configured());

        clear_diarscribe_env();
    }

    #[test]
    fn test_env_override_invalid_number_is_error() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_diarscribe_env();

        set_env("DIARSCRIBE_TIMEOUT_SECS", "soon");
        let result = Config::default().with_env_overrides();
        assert!(matches!(
            result,
            Err(DiarscribeError::ConfigInvalidValue { .. })
        ));

        clear_diarscribe_env();
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "segment_first".parse::<Strategy>().unwrap(),
            Strategy::SegmentFirst
        );
        assert_eq!(
            "Whole-Audio-First".parse::<Strategy>().unwrap(),
            Strategy::WholeAudioFirst
        );
        assert!("sideways".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = PipelineConfig {
            worker_concurrency: 0,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("worker_concurrency"));
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = PipelineConfig {
            min_segment_for_transcription: 40.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_padding_and_nan() {
        let negative = PipelineConfig {
            context_padding: -0.1,
            ..PipelineConfig::default()
        };
        assert!(negative.validate().is_err());

        let nan = PipelineConfig {
            max_segment_for_transcription: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_hint_above_max() {
        let config = PipelineConfig {
            speaker_count_hint: Some(5),
            max_speakers: Some(2),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_command_spec_parse() {
        let spec = CommandSpec::parse("  align-words --device cpu ");
        assert_eq!(spec.program, "align-words");
        assert_eq!(spec.args, vec!["--device", "cpu"]);

        let empty = CommandSpec::parse("   ");
        assert!(!empty.is_configured());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_path_is_xdg_style() {
        if let Some(path) = Config::default_path() {
            let path_str = path.to_string_lossy();
            assert!(path_str.contains("diarscribe"));
            assert!(path_str.ends_with("config.toml"));
        }
    }
}
