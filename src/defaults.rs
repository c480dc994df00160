//! Default configuration constants for posewatch.
//!
//! Shared by the config layer, the normalizer and the announcement throttle so
//! the literal values live in one place.

/// Number of landmarks in the pose vocabulary.
pub const LANDMARK_COUNT: usize = 33;

/// Channels emitted per landmark: normalized x, y, z and the presence marker.
pub const FEATURE_CHANNELS: usize = 4;

/// Length of a normalized feature vector.
pub const FEATURE_LEN: usize = LANDMARK_COUNT * FEATURE_CHANNELS;

/// Number of posture classes the classifier scores.
pub const CLASS_COUNT: usize = 3;

/// Value written to the fourth channel of every landmark.
pub const PRESENCE_MARKER: f32 = 1.0;

/// Multiplier applied to the torso length when picking the normalization scale.
///
/// Keeps a sane minimum scale when limbs are folded against the body and the
/// farthest landmark is close to the hips.
pub const TORSO_SIZE_MULTIPLIER: f32 = 2.5;

/// Delay between an announcement request and the moment it is spoken.
pub const ANNOUNCE_DELAY_MS: u64 = 2000;

/// Default text-to-speech program.
pub const SPEECH_COMMAND: &str = "espeak-ng";

/// Default arguments passed before the announced text.
pub const SPEECH_ARGS: &[&str] = &["-v", "id"];

/// Display text for each label (Indonesian).
pub const TEXT_NORMAL: &str = "Normal";
pub const TEXT_LEGS_UP: &str = "Kaki Di Atas";
pub const TEXT_LYING_DOWN: &str = "Tidur";
pub const TEXT_UNRECOGNIZED: &str = "Error";
pub const TEXT_NOT_DETECTED: &str = "Pose tidak terdeteksi";

/// Frame spacing used by replay when records carry no timestamp (~30 fps).
pub const REPLAY_FRAME_INTERVAL_MS: u64 = 33;
