//! Command-line interface for diarscribe
//!
//! Provides argument parsing using clap derive macros.

use crate::config::{PipelineConfig, Strategy};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Speaker-attributed transcription of WAV recordings
#[derive(Parser, Debug)]
#[command(
    name = "diarscribe",
    version,
    about = "Speaker-attributed transcription of WAV recordings"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a WAV file with speaker labels
    Run(RunArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Options for a single run. Anything left unset falls back to the config.
#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// WAV file to transcribe ("-" reads stdin)
    #[arg(value_name = "AUDIO")]
    pub audio: PathBuf,

    /// Processing strategy (segment-first, whole-audio-first)
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub strategy: Option<Strategy>,

    /// Concurrent segment workers
    #[arg(long, short = 'w', value_name = "N")]
    pub workers: Option<usize>,

    /// Expected number of speakers
    #[arg(long, value_name = "N")]
    pub speakers: Option<usize>,

    /// Upper bound on the number of speakers
    #[arg(long, value_name = "N")]
    pub max_speakers: Option<usize>,

    /// Skip diarization; output is unlabeled
    #[arg(long)]
    pub no_diarization: bool,

    /// Restore punctuation in each segment
    #[arg(long)]
    pub punctuate: bool,

    /// Rewrite spoken forms (numbers, dates) into written ones
    #[arg(long)]
    pub denormalize: bool,

    /// Denormalization style passed to the denormalizer
    #[arg(long, value_name = "STYLE")]
    pub denormalize_style: Option<String>,

    /// Per-call collaborator timeout. Examples: 90, 30s, 5m, 1m30s
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout_secs)]
    pub timeout: Option<u64>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Overlay the command-line options on `config`.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(workers) = self.workers {
            config.worker_concurrency = workers;
        }
        if self.speakers.is_some() {
            config.speaker_count_hint = self.speakers;
        }
        if self.max_speakers.is_some() {
            config.max_speakers = self.max_speakers;
        }
        if self.no_diarization {
            config.enable_diarization = false;
        }
        if self.punctuate {
            config.punctuate = true;
        }
        if self.denormalize {
            config.denormalize = true;
        }
        if let Some(style) = &self.denormalize_style {
            config.denormalize_style = style.clone();
        }
        if let Some(secs) = self.timeout {
            config.collaborator_timeout_secs = secs;
        }
    }
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment) as TOML
    Show,
    /// Print the default configuration file path
    Path,
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    s.parse::<Strategy>().map_err(|e| e.to_string())
}

/// Parse a timeout string into seconds.
///
/// Supports any duration format accepted by `humantime`, plus bare numbers
/// (seconds).
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}
