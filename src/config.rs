use crate::announce::throttle::DebouncePolicy;
use crate::classify::interpreter::PostureLabel;
use crate::defaults;
use crate::error::{PosewatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub normalizer: NormalizerConfig,
    pub announce: AnnounceConfig,
    pub speech: SpeechConfig,
    pub labels: LabelsConfig,
}

/// Feature normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizerConfig {
    pub torso_multiplier: f32,
}

/// Announcement throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnounceConfig {
    pub enabled: bool,
    pub delay_ms: u64,
    pub policy: DebouncePolicy,
}

/// Text-to-speech program configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub command: String,
    pub args: Vec<String>,
}

/// Display text for each posture label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelsConfig {
    pub normal: String,
    pub legs_up: String,
    pub lying_down: String,
    pub unrecognized: String,
    pub not_detected: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            torso_multiplier: defaults::TORSO_SIZE_MULTIPLIER,
        }
    }
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: defaults::ANNOUNCE_DELAY_MS,
            policy: DebouncePolicy::KeepFirst,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: defaults::SPEECH_COMMAND.to_string(),
            args: defaults::SPEECH_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            normal: defaults::TEXT_NORMAL.to_string(),
            legs_up: defaults::TEXT_LEGS_UP.to_string(),
            lying_down: defaults::TEXT_LYING_DOWN.to_string(),
            unrecognized: defaults::TEXT_UNRECOGNIZED.to_string(),
            not_detected: defaults::TEXT_NOT_DETECTED.to_string(),
        }
    }
}

impl LabelsConfig {
    /// Display text for a label.
    pub fn text_for(&self, label: PostureLabel) -> &str {
        match label {
            PostureLabel::Normal => &self.normal,
            PostureLabel::LegsUp => &self.legs_up,
            PostureLabel::LyingDown => &self.lying_down,
            PostureLabel::Unrecognized => &self.unrecognized,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PosewatchError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                PosewatchError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(PosewatchError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - POSEWATCH_ANNOUNCE_DELAY_MS → announce.delay_ms
    /// - POSEWATCH_ANNOUNCE_POLICY → announce.policy (keep-first, keep-latest)
    /// - POSEWATCH_SPEECH_COMMAND → speech.command
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(delay) = std::env::var("POSEWATCH_ANNOUNCE_DELAY_MS")
            && !delay.is_empty()
        {
            self.announce.delay_ms =
                delay
                    .trim()
                    .parse()
                    .map_err(|_| PosewatchError::ConfigInvalidValue {
                        key: "POSEWATCH_ANNOUNCE_DELAY_MS".to_string(),
                        message: format!("'{}' is not a number of milliseconds", delay),
                    })?;
        }

        if let Ok(policy) = std::env::var("POSEWATCH_ANNOUNCE_POLICY")
            && !policy.is_empty()
        {
            self.announce.policy = match policy.trim() {
                "keep-first" => DebouncePolicy::KeepFirst,
                "keep-latest" => DebouncePolicy::KeepLatest,
                other => {
                    return Err(PosewatchError::ConfigInvalidValue {
                        key: "POSEWATCH_ANNOUNCE_POLICY".to_string(),
                        message: format!("expected keep-first or keep-latest, got '{}'", other),
                    });
                }
            };
        }

        if let Ok(command) = std::env::var("POSEWATCH_SPEECH_COMMAND")
            && !command.is_empty()
        {
            self.speech.command = command;
        }

        Ok(self)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        let multiplier = self.normalizer.torso_multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(PosewatchError::ConfigInvalidValue {
                key: "normalizer.torso_multiplier".to_string(),
                message: format!("must be a positive number, got {}", multiplier),
            });
        }
        if self.announce.delay_ms == 0 {
            return Err(PosewatchError::ConfigInvalidValue {
                key: "announce.delay_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.speech.command.trim().is_empty() {
            return Err(PosewatchError::ConfigInvalidValue {
                key: "speech.command".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Serialize to TOML, e.g. for `config show` and `config init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PosewatchError::Other(format!("Failed to serialize configuration: {}", e)))
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/posewatch/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("posewatch")
            .join("config.toml")
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

    fn clear_posewatch_env() {
        remove_env("POSEWATCH_ANNOUNCE_DELAY_MS");
        remove_env("POSEWATCH_ANNOUNCE_POLICY");
        remove_env("POSEWATCH_SPEECH_COMMAND");
    }

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.normalizer.torso_multiplier, 2.5);

        assert!(config.announce.enabled);
        assert_eq!(config.announce.delay_ms, 2000);
        assert_eq!(config.announce.policy, DebouncePolicy::KeepFirst);

        assert_eq!(config.speech.command, "espeak-ng");
        assert_eq!(config.speech.args, vec!["-v", "id"]);

        assert_eq!(config.labels.legs_up, "Kaki Di Atas");
        assert_eq!(config.labels.not_detected, "Pose tidak terdeteksi");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_temp(
            r#"
            [normalizer]
            torso_multiplier = 3.0

            [announce]
            enabled = false
            delay_ms = 1500
            policy = "keep-latest"

            [speech]
            command = "spd-say"
            args = ["-l", "en"]

            [labels]
            normal = "Upright"
            legs_up = "Legs up"
            lying_down = "Lying down"
            unrecognized = "Unknown"
            not_detected = "No pose"
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.normalizer.torso_multiplier, 3.0);
        assert!(!config.announce.enabled);
        assert_eq!(config.announce.delay_ms, 1500);
        assert_eq!(config.announce.policy, DebouncePolicy::KeepLatest);
        assert_eq!(config.speech.command, "spd-say");
        assert_eq!(config.speech.args, vec!["-l", "en"]);
        assert_eq!(config.labels.text_for(PostureLabel::Normal), "Upright");
        assert_eq!(config.labels.text_for(PostureLabel::Unrecognized), "Unknown");
        assert_eq!(config.labels.not_detected, "No pose");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_temp(
            r#"
            [announce]
            delay_ms = 500
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.announce.delay_ms, 500);
        assert!(config.announce.enabled);
        assert_eq!(config.normalizer, NormalizerConfig::default());
        assert_eq!(config.speech, SpeechConfig::default());
        assert_eq!(config.labels, LabelsConfig::default());
    }

    #[test]
    fn test_missing_file_is_config_file_not_found() {
        let result = Config::load(Path::new("/tmp/nonexistent_posewatch_config_12345.toml"));
        assert!(matches!(
            result,
            Err(PosewatchError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let config =
            Config::load_or_default(Path::new("/tmp/nonexistent_posewatch_config_12345.toml"))
                .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let temp_file = write_temp(
            r#"
            [announce
            delay_ms = "broken
        "#,
        );

        let result = Config::load_or_default(temp_file.path());
        assert!(matches!(result, Err(PosewatchError::Config(_))));
    }

    #[test]
    fn test_env_override_delay_and_policy() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_posewatch_env();

        set_env("POSEWATCH_ANNOUNCE_DELAY_MS", "750");
        set_env("POSEWATCH_ANNOUNCE_POLICY", "keep-latest");
        let config = Config::default().with_env_overrides().unwrap();

        assert_eq!(config.announce.delay_ms, 750);
        assert_eq!(config.announce.policy, DebouncePolicy::KeepLatest);
        assert_eq!(config.speech.command, "espeak-ng");

        clear_posewatch_env();
    }

    #[test]
    fn test_env_override_speech_command() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_posewatch_env();

        set_env("POSEWATCH_SPEECH_COMMAND", "say");
        let config = Config::default().with_env_overrides().unwrap();
        assert_eq!(config.speech.command, "say");

        clear_posewatch_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_posewatch_env();

        set_env("POSEWATCH_ANNOUNCE_DELAY_MS", "");
        let config = Config::default().with_env_overrides().unwrap();
        assert_eq!(config.announce.delay_ms, 2000);

        clear_posewatch_env();
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_posewatch_env();

        set_env("POSEWATCH_ANNOUNCE_DELAY_MS", "soon");
        let result = Config::default().with_env_overrides();
        assert!(matches!(
            result,
            Err(PosewatchError::ConfigInvalidValue { .. })
        ));

        clear_posewatch_env();
        set_env("POSEWATCH_ANNOUNCE_POLICY", "newest");
        assert!(Config::default().with_env_overrides().is_err());

        clear_posewatch_env();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.normalizer.torso_multiplier = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.normalizer.torso_multiplier = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.announce.delay_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.speech.command = "  ".to_string();
        match config.validate() {
            Err(PosewatchError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "speech.command")
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = Config::default();
        config.announce.policy = DebouncePolicy::KeepLatest;

        let text = config.to_toml().unwrap();
        assert!(text.contains("keep-latest"));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_path_ends_with_app_config() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("posewatch"));
        assert!(path_str.ends_with("config.toml"));
    }
}
