//! Collaborators backed by external programs.
//!
//! Each collaborator is a configured program that receives a WAV path as its
//! last argument and/or text on stdin, and answers on stdout. This keeps
//! model runtimes out of the process: any CLI that speaks this contract can be
//! plugged in from the config file.

use crate::config::{CollaboratorConfig, CommandSpec};
use crate::error::{DiarscribeError, Result};
use crate::pipeline::orchestrator::Collaborators;
use crate::pipeline::types::SpeakerSegment;
use crate::stt::aligner::{Aligner, AlignmentResult};
use crate::stt::diarizer::Diarizer;
use crate::stt::text::{Denormalizer, Punctuator};
use crate::stt::transcriber::Transcriber;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run `spec` with `extra_args` appended, optionally feeding `stdin`.
///
/// Returns stdout on success. `wrap` builds the collaborator-specific error
/// for spawn failures, non-zero exits and undecodable output.
async fn run_program(
    spec: &CommandSpec,
    extra_args: &[String],
    stdin: Option<&str>,
    wrap: fn(String) -> DiarscribeError,
) -> Result<String> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .args(extra_args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DiarscribeError::CollaboratorNotFound {
                program: spec.program.clone(),
            }
        } else {
            wrap(format!("Failed to execute {}: {}", spec.program, e))
        }
    })?;

    // Stdin is fed from its own task so a program that streams its answer
    // cannot block on a full stdout pipe while we are still writing.
    let feeder = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => {
            let input = input.to_owned();
            Some(tokio::spawn(async move {
                let written = pipe.write_all(input.as_bytes()).await;
                // Dropping the pipe closes stdin so the program sees EOF
                drop(pipe);
                written
            }))
        }
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| wrap(format!("Failed to wait for {}: {}", spec.program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(wrap(format!(
            "{} failed with status {:?}: {}",
            spec.program,
            output.status.code(),
            stderr.trim()
        )));
    }

    if let Some(feeder) = feeder {
        match feeder.await {
            Ok(Ok(())) => {}
            // The program exited successfully without reading all of its input
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(wrap(format!("Failed to write to {}: {}", spec.program, e)));
            }
            Err(e) => {
                return Err(wrap(format!("Stdin writer for {} stopped: {}", spec.program, e)));
            }
        }
    }

    String::from_utf8(output.stdout)
        .map_err(|e| wrap(format!("{} produced non-UTF-8 output: {}", spec.program, e)))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn transcription_error(message: String) -> DiarscribeError {
    DiarscribeError::Transcription { message }
}

fn alignment_error(message: String) -> DiarscribeError {
    DiarscribeError::Alignment { message }
}

fn diarization_error(message: String) -> DiarscribeError {
    DiarscribeError::Diarization { message }
}

fn post_process_error(message: String) -> DiarscribeError {
    DiarscribeError::PostProcess { message }
}

/// `<program> <args…> <wav-path>` → transcript on stdout.
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    spec: CommandSpec,
}

impl CommandTranscriber {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        // The program wants a file; the temp file lives until this call returns
        let mut file = tempfile::Builder::new()
            .prefix("diarscribe-asr-")
            .suffix(".wav")
            .tempfile()?;
        file.write_all(wav)?;
        file.flush()?;

        let stdout = run_program(
            &self.spec,
            &[path_arg(file.path())],
            None,
            transcription_error,
        )
        .await?;
        Ok(stdout.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.spec.program
    }
}

/// `<program> <args…> <wav-path>` with the transcript on stdin →
/// alignment JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandAligner {
    spec: CommandSpec,
}

impl CommandAligner {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Aligner for CommandAligner {
    async fn align(&self, audio_path: &Path, transcript: &str) -> Result<AlignmentResult> {
        let stdout = run_program(
            &self.spec,
            &[path_arg(audio_path)],
            Some(transcript),
            alignment_error,
        )
        .await?;
        if stdout.trim().is_empty() {
            return Ok(AlignmentResult::default());
        }
        serde_json::from_str(&stdout).map_err(|e| DiarscribeError::Alignment {
            message: format!("{} returned invalid alignment JSON: {}", self.spec.program, e),
        })
    }

    fn name(&self) -> &str {
        &self.spec.program
    }
}

/// `<program> <args…> [--num-speakers N] [--max-speakers N] <wav-path>` →
/// JSON array of speaker turns on stdout.
#[derive(Debug, Clone)]
pub struct CommandDiarizer {
    spec: CommandSpec,
}

impl CommandDiarizer {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    fn hint_args(
        expected_speakers: Option<usize>,
        max_speakers: Option<usize>,
        audio_path: &Path,
    ) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(n) = expected_speakers {
            args.push("--num-speakers".to_string());
            args.push(n.to_string());
        }
        if let Some(n) = max_speakers {
            args.push("--max-speakers".to_string());
            args.push(n.to_string());
        }
        args.push(path_arg(audio_path));
        args
    }
}

#[async_trait]
impl Diarizer for CommandDiarizer {
    async fn diarize(
        &self,
        audio_path: &Path,
        expected_speakers: Option<usize>,
        max_speakers: Option<usize>,
    ) -> Result<Vec<SpeakerSegment>> {
        let args = Self::hint_args(expected_speakers, max_speakers, audio_path);
        let stdout = run_program(&self.spec, &args, None, diarization_error).await?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout).map_err(|e| DiarscribeError::Diarization {
            message: format!("{} returned invalid speaker JSON: {}", self.spec.program, e),
        })
    }

    fn name(&self) -> &str {
        &self.spec.program
    }
}

/// Text on stdin → punctuated text on stdout.
#[derive(Debug, Clone)]
pub struct CommandPunctuator {
    spec: CommandSpec,
}

impl CommandPunctuator {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Punctuator for CommandPunctuator {
    async fn punctuate(&self, text: &str) -> Result<String> {
        let stdout = run_program(&self.spec, &[], Some(text), post_process_error).await?;
        Ok(stdout.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.spec.program
    }
}

/// Text on stdin, `--style <style>` appended → denormalized text on stdout.
#[derive(Debug, Clone)]
pub struct CommandDenormalizer {
    spec: CommandSpec,
}

impl CommandDenormalizer {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Denormalizer for CommandDenormalizer {
    async fn denormalize(&self, text: &str, style: &str) -> Result<String> {
        let args = ["--style".to_string(), style.to_string()];
        let stdout = run_program(&self.spec, &args, Some(text), post_process_error).await?;
        Ok(stdout.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.spec.program
    }
}

/// Process-backed collaborators built from configuration.
///
/// Transcription and alignment programs are required; diarization,
/// punctuation and denormalization are left out when not configured.
pub fn collaborators_from_config(config: &CollaboratorConfig) -> Result<Collaborators> {
    fn required(spec: &CommandSpec, key: &str) -> Result<CommandSpec> {
        if spec.is_configured() {
            Ok(spec.clone())
        } else {
            Err(DiarscribeError::ConfigInvalidValue {
                key: format!("collaborators.{}.program", key),
                message: "a program is required".to_string(),
            })
        }
    }

    let mut collaborators = Collaborators::new(
        Arc::new(CommandTranscriber::new(required(&config.transcribe, "transcribe")?)),
        Arc::new(CommandAligner::new(required(&config.align, "align")?)),
    );
    if config.diarize.is_configured() {
        collaborators =
            collaborators.with_diarizer(Arc::new(CommandDiarizer::new(config.diarize.clone())));
    }
    if config.punctuate.is_configured() {
        collaborators = collaborators
            .with_punctuator(Arc::new(CommandPunctuator::new(config.punctuate.clone())));
    }
    if config.denormalize.is_configured() {
        collaborators = collaborators.with_denormalizer(Arc::new(CommandDenormalizer::new(
            config.denormalize.clone(),
        )));
    }
    Ok(collaborators)
}
