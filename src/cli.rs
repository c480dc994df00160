//! Command-line interface for posewatch
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Posture classification from body landmarks
#[derive(Parser, Debug)]
#[command(
    name = "posewatch",
    version,
    about = "Posture classification from body landmarks"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: announcements, -vv: decisions, -vvv: feature rows)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration such as `33ms`, `2s` or `1m30s`.
///
/// Bare numbers are milliseconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize recorded frames into training CSV rows
    Features {
        /// JSON Lines frame records (default: stdin)
        #[arg(long, short = 'i', value_name = "FILE")]
        input: Option<PathBuf>,

        /// CSV destination (default: stdout)
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Class written for every row, overriding the records' own class
        #[arg(long, value_name = "NAME")]
        class: Option<String>,
    },

    /// Run recorded frames and scores through the pipeline in simulated time
    Replay {
        /// JSON Lines frame records (default: stdin)
        #[arg(long, short = 'i', value_name = "FILE")]
        input: Option<PathBuf>,

        /// Spacing for records without a timestamp (e.g. 33ms, 0.5s)
        #[arg(long, value_name = "DURATION", default_value = "33ms", value_parser = parse_duration)]
        frame_interval: Duration,

        /// Announcement delay override (e.g. 2s, 1500ms)
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        delay: Option<Duration>,

        /// Speak announcements with the configured TTS command
        #[arg(long)]
        speak: bool,
    },

    /// View and initialize configuration
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

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_required() {
        let result = Cli::try_parse_from(["posewatch"]);
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_parse_verbose_repeated_flags() {
        let cli = Cli::try_parse_from(["posewatch", "-v", "-v", "config", "path"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_features_defaults() {
        let cli = Cli::try_parse_from(["posewatch", "features"]).unwrap();
        match cli.command {
            Commands::Features {
                input,
                output,
                class,
            } => {
                assert!(input.is_none());
                assert!(output.is_none());
                assert!(class.is_none());
            }
            _ => panic!("Expected Features command"),
        }
    }

    #[test]
    fn test_parse_features_with_options() {
        let cli = Cli::try_parse_from([
            "posewatch",
            "features",
            "-i",
            "frames.jsonl",
            "--output",
            "data.csv",
            "--class",
            "legs_up",
        ])
        .unwrap();
        match cli.command {
            Commands::Features {
                input,
                output,
                class,
            } => {
                assert_eq!(input, Some(PathBuf::from("frames.jsonl")));
                assert_eq!(output, Some(PathBuf::from("data.csv")));
                assert_eq!(class.as_deref(), Some("legs_up"));
            }
            _ => panic!("Expected Features command"),
        }
    }

    #[test]
    fn test_parse_replay_defaults() {
        let cli = Cli::try_parse_from(["posewatch", "replay"]).unwrap();
        match cli.command {
            Commands::Replay {
                input,
                frame_interval,
                delay,
                speak,
            } => {
                assert!(input.is_none());
                assert_eq!(frame_interval, Duration::from_millis(33));
                assert!(delay.is_none());
                assert!(!speak);
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_parse_replay_durations() {
        let cli = Cli::try_parse_from([
            "posewatch",
            "replay",
            "--frame-interval",
            "100",
            "--delay",
            "1s500ms",
            "--speak",
        ])
        .unwrap();
        match cli.command {
            Commands::Replay {
                frame_interval,
                delay,
                speak,
                ..
            } => {
                assert_eq!(frame_interval, Duration::from_millis(100));
                assert_eq!(delay, Some(Duration::from_millis(1500)));
                assert!(speak);
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_parse_replay_rejects_bad_duration() {
        let result = Cli::try_parse_from(["posewatch", "replay", "--delay", "soon"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_parse_config_actions() {
        let cli = Cli::try_parse_from(["posewatch", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));

        let cli = Cli::try_parse_from(["posewatch", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[test]
    fn test_global_options_after_command() {
        let cli = Cli::try_parse_from([
            "posewatch",
            "config",
            "path",
            "--config",
            "/tmp/config.toml",
            "-q",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["posewatch", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_invalid_command_returns_error() {
        let err = Cli::try_parse_from(["posewatch", "invalid"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["posewatch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
