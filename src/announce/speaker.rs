//! Speech output for announcements, with testable command execution.
//!
//! The `Speaker` trait is the text-to-speech seam. `CommandSpeaker` shells out
//! to a TTS program through `CommandExecutor`, so tests never spawn processes.

use crate::defaults;
use crate::error::{PosewatchError, Result};
use std::process::Command;
use std::sync::{Arc, Mutex};

/// Fire-and-forget text-to-speech.
pub trait Speaker: Send + Sync {
    /// Speak `text`. Voice and locale are the implementation's concern.
    fn speak(&self, text: &str) -> Result<()>;

    /// Name for logging.
    fn name(&self) -> &'static str {
        "speaker"
    }
}

impl<T: Speaker + ?Sized> Speaker for Arc<T> {
    fn speak(&self, text: &str) -> Result<()> {
        (**self).speak(text)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync so it can run on timer threads.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments, returning its stdout.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PosewatchError::SpeechToolNotFound {
                    tool: command.to_string(),
                }
            } else {
                PosewatchError::SpeechFailed {
                    message: format!("Failed to execute {}: {}", command, e),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PosewatchError::SpeechFailed {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command, output.status, stderr
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Speaks by running a TTS program with the text as its last argument.
///
/// # Requirements
/// The configured program must be on `PATH`. The default is `espeak-ng -v id`.
///
/// # Installation
/// Ubuntu/Debian: `sudo apt install espeak-ng`
/// Arch: `sudo pacman -S espeak-ng`
pub struct CommandSpeaker<E: CommandExecutor = SystemCommandExecutor> {
    executor: E,
    command: String,
    args: Vec<String>,
}

impl<E: CommandExecutor> CommandSpeaker<E> {
    pub fn new(executor: E, command: &str, args: &[String]) -> Self {
        Self {
            executor,
            command: command.to_string(),
            args: args.to_vec(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl CommandSpeaker<SystemCommandExecutor> {
    /// Speaker running the default TTS program on the host.
    pub fn system() -> Self {
        let args: Vec<String> = defaults::SPEECH_ARGS.iter().map(|s| s.to_string()).collect();
        Self::new(SystemCommandExecutor::new(), defaults::SPEECH_COMMAND, &args)
    }
}

impl<E: CommandExecutor> Speaker for CommandSpeaker<E> {
    fn speak(&self, text: &str) -> Result<()> {
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.push(text);
        self.executor
            .execute(&self.command, &args)
            .map_err(|e| match e {
                PosewatchError::SpeechToolNotFound { tool } => PosewatchError::SpeechFailed {
                    message: format!(
                        "{} not found. Install it or set [speech] command in the config:\n\
                         Ubuntu/Debian: sudo apt install espeak-ng\n\
                         Arch: sudo pacman -S espeak-ng",
                        tool
                    ),
                },
                other => other,
            })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Records every text it is asked to speak.
///
/// Clones share the same record, so a clone can be handed to the throttle
/// while this one is inspected.
#[derive(Debug, Clone, Default)]
pub struct CollectorSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl CollectorSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.spoken.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Speaker for CollectorSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        self.spoken
            .lock()
            .map_err(|_| PosewatchError::SpeechFailed {
                message: "collector poisoned".to_string(),
            })?
            .push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Prints announcements to stdout instead of speaking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintSpeaker;

impl Speaker for PrintSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        println!("announce: {}", text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
