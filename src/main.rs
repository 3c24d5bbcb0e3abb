use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use diarscribe::cli::{Cli, Commands, ConfigAction, RunArgs};
use diarscribe::config::Config;
use diarscribe::error::DiarscribeError;
use diarscribe::pipeline::{Pipeline, PipelineRequest, PipelineResult};
use diarscribe::stt::command::collaborators_from_config;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for a run stopped with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);
    tracing::debug!(version = %diarscribe::version_string(), "diarscribe starting");

    match cli.command {
        Commands::Run(args) => {
            let config = load_config(cli.config.as_deref())?;
            run_command(config, args).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "diarscribe",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the transcript.
fn init_logging(quiet: bool, verbose: u8) {
    let filter = match (quiet, verbose) {
        (true, _) => tracing_subscriber::EnvFilter::new("diarscribe=error"),
        (false, 0) => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| diarscribe::defaults::LOG_FILTER.into()),
        (false, 1) => tracing_subscriber::EnvFilter::new("diarscribe=debug"),
        (false, _) => tracing_subscriber::EnvFilter::new("diarscribe=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        // An explicit path must exist
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };

    Ok(config.with_env_overrides()?)
}

async fn run_command(mut config: Config, args: RunArgs) -> Result<()> {
    args.apply_to(&mut config.pipeline);

    let audio = read_audio(&args.audio).await?;
    let collaborators = collaborators_from_config(&config.collaborators)
        .context("Collaborator programs are not configured (see `diarscribe config show`)")?;
    let request = PipelineRequest::from_config(audio, &config.pipeline);
    let pipeline = Pipeline::new(config.pipeline, collaborators)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling run");
            on_signal.cancel();
        }
    });

    match pipeline.run_with_cancel(&request, cancel).await {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_transcript(&result);
            }
            Ok(())
        }
        Err(DiarscribeError::Cancelled) => {
            eprintln!("Cancelled");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => Err(e.into()),
    }
}

async fn read_audio(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read audio from stdin")?;
        return Ok(bytes);
    }
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Print the transcript, colouring speaker labels on a terminal.
fn print_transcript(result: &PipelineResult) {
    if !result.diarization_applied || !std::io::stdout().is_terminal() {
        println!("{}", result.text);
        return;
    }

    for segment in &result.segments {
        match &segment.speaker {
            Some(label) => println!("{}: {}", label.bold().cyan(), segment.text),
            None => println!("{}", segment.text),
        }
    }
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .or_else(Config::default_path)
                .context("No configuration directory available on this system")?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
