use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use posewatch::announce::{CommandSpeaker, PrintSpeaker, Speaker, SystemCommandExecutor};
use posewatch::cli::{Cli, Commands, ConfigAction};
use posewatch::config::Config;
use posewatch::dataset::{DatasetWriter, export_records};
use posewatch::frames::read_frames;
use posewatch::pose::Normalizer;
use posewatch::replay::{ReplayEvent, ReplayOptions, replay};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Features {
            input,
            output,
            class,
        } => {
            let config = load_config(cli.config.as_deref())?;
            handle_features(&config, input.as_deref(), output.as_deref(), class.as_deref())?;
        }
        Commands::Replay {
            input,
            frame_interval,
            delay,
            speak,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(delay) = delay {
                config.announce.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            }
            handle_replay(&config, input.as_deref(), frame_interval, speak)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "posewatch",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
///
/// Logs go to stderr so stdout stays clean for CSV and labels.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/posewatch/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides apply on top of all three.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(std::io::stdin().lock())),
    }
}

/// Normalize frame records into dataset CSV rows.
fn handle_features(
    config: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    class: Option<&str>,
) -> Result<()> {
    let records = read_frames(open_input(input)?)?;

    let sink: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };

    let normalizer = Normalizer::new(config.normalizer.torso_multiplier);
    let mut writer = DatasetWriter::new(sink)?;
    let summary = export_records(records, &normalizer, class, &mut writer)?;
    writer.finish()?;

    info!(
        written = summary.written,
        skipped = summary.skipped,
        "feature export finished"
    );
    Ok(())
}

/// Replay recorded frames and print every label and announcement.
fn handle_replay(
    config: &Config,
    input: Option<&Path>,
    frame_interval: Duration,
    speak: bool,
) -> Result<()> {
    let records = read_frames(open_input(input)?)?;

    let speaker: Arc<dyn Speaker> = if speak {
        Arc::new(CommandSpeaker::new(
            SystemCommandExecutor::new(),
            &config.speech.command,
            &config.speech.args,
        ))
    } else {
        Arc::new(PrintSpeaker)
    };

    let color = std::io::stdout().is_terminal();
    let summary = replay(
        records,
        config,
        speaker,
        ReplayOptions { frame_interval },
        |event| print_event(event, color),
    )?;

    println!(
        "{} frames ({} labeled, {} without pose, {} skipped), {} announcements over {}",
        summary.frames,
        summary.labeled,
        summary.not_detected,
        summary.errors,
        summary.spoken,
        humantime::format_duration(summary.duration),
    );
    Ok(())
}

fn print_event(event: &ReplayEvent, color: bool) {
    let at = format!("{:>8.3}s", event.at.as_secs_f64());
    match &event.result {
        Ok(outcome) => {
            let confidence = outcome
                .decision
                .as_ref()
                .map(|d| format!(" ({:.2})", d.confidence))
                .unwrap_or_default();
            let marker = if outcome.announced { " *" } else { "" };
            if color {
                println!(
                    "{} {}{}{}",
                    at.dimmed(),
                    outcome.text.green(),
                    confidence.dimmed(),
                    marker.yellow()
                );
            } else {
                println!("{} {}{}{}", at, outcome.text, confidence, marker);
            }
        }
        Err(e) => {
            if color {
                println!("{} {}", at.dimmed(), format!("skipped: {}", e).red());
            } else {
                println!("{} skipped: {}", at, e);
            }
        }
    }
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides()?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                eprintln!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
                std::process::exit(1);
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&config_path, Config::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            println!("{} {}", "Wrote".green(), config_path.display());
        }
    }
    Ok(())
}
