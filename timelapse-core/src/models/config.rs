use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Default frame rate of the assembled timelapse.
pub const DEFAULT_TIMELAPSE_FPS: f64 = 24.0;

/// Default per-snapshot timeout for subprocess backends.
pub const DEFAULT_CAPTURE_TIMEOUT_SECS: f64 = 30.0;

/// Longest accepted gap between two capture slots.
pub const MAX_CAPTURE_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// RTSP transport used to pull a snapshot from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the assembler treats frames whose dimensions differ from the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Reject the whole assembly on the first mismatched frame.
    #[default]
    Strict,
    /// Drop mismatched frames with a warning and keep going.
    Lenient,
}

/// Length of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLength {
    /// Capture for a wall-clock window.
    Duration(Duration),
    /// Capture a fixed number of times.
    Attempts(u64),
}

impl SessionLength {
    /// Total number of capture attempts for the given interval.
    ///
    /// A duration-based session captures at `t = 0, interval, 2 * interval, ...`
    /// up to and including the last slot that does not exceed the duration,
    /// so the count is `floor(duration / interval) + 1`. There is no wait
    /// after the final attempt, so a 300s window at a 60s interval takes six
    /// captures and ends right after the one at t = 300s.
    pub fn attempts(&self, interval: Duration) -> u64 {
        match *self {
            Self::Attempts(count) => count,
            Self::Duration(duration) => {
                let interval_nanos = interval.as_nanos().max(1);
                let slots = duration.as_nanos() / interval_nanos;
                u64::try_from(slots).unwrap_or(u64::MAX - 1) + 1
            }
        }
    }

    fn is_empty(&self) -> bool {
        match *self {
            Self::Attempts(count) => count == 0,
            Self::Duration(duration) => duration.is_zero(),
        }
    }
}

/// Settings for the assembly step.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseSettings {
    pub fps: f64,
    pub output_path: PathBuf,
    pub mismatch_policy: MismatchPolicy,
}

/// Immutable configuration for one capture session.
///
/// Built once (usually from a YAML file via [`RawConfig`]) and handed to
/// the session by value. Nothing reads configuration from global state.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfiguration {
    /// Network address of the video source (e.g. `rtsp://camera/stream`).
    pub source_address: String,

    /// Transport hint passed through to the snapshot provider.
    pub transport: Transport,

    /// Time between the starts of two consecutive capture slots.
    pub interval: Duration,

    /// Session length as a window or an explicit attempt count.
    pub length: SessionLength,

    /// Directory where frame files and the session manifest are written.
    pub output_directory: PathBuf,

    /// File extension of captured frames (default: `jpg`).
    pub frame_extension: String,

    /// Run the assembler after capture (default: true).
    pub timelapse_enabled: bool,

    pub timelapse: TimelapseSettings,

    /// Upper bound for a single snapshot in subprocess backends.
    pub capture_timeout: Duration,

    /// Encoder/grabber binary used by the ffmpeg backend.
    pub ffmpeg_path: PathBuf,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_address.trim().is_empty() {
            return Err(ConfigError::Invalid("source address must not be empty".into()));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid("capture interval must be positive".into()));
        }
        if self.interval > MAX_CAPTURE_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "capture interval of {:.0}s exceeds the {}s limit",
                self.interval.as_secs_f64(),
                MAX_CAPTURE_INTERVAL.as_secs()
            )));
        }
        if self.length.is_empty() {
            return Err(ConfigError::Invalid(
                "session duration or attempt count must be positive".into(),
            ));
        }
        if !(self.timelapse.fps.is_finite() && self.timelapse.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timelapse fps must be positive, got {}",
                self.timelapse.fps
            )));
        }
        if self.frame_extension.is_empty()
            || !self.frame_extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid(format!(
                "unsupported frame extension: {:?}",
                self.frame_extension
            )));
        }
        if self.capture_timeout.is_zero() {
            return Err(ConfigError::Invalid("capture timeout must be positive".into()));
        }
        Ok(())
    }

    /// Number of capture attempts this configuration schedules.
    pub fn planned_attempts(&self) -> u64 {
        self.length.attempts(self.interval)
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let raw: RawConfig = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        raw.into_configuration()
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        raw.into_configuration()
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        let output_directory = PathBuf::from(".");
        Self {
            source_address: String::new(),
            transport: Transport::Tcp,
            interval: Duration::from_secs(60),
            length: SessionLength::Duration(Duration::from_secs(3600)),
            timelapse: TimelapseSettings {
                fps: DEFAULT_TIMELAPSE_FPS,
                output_path: output_directory.join("timelapse.mp4"),
                mismatch_policy: MismatchPolicy::Strict,
            },
            output_directory,
            frame_extension: "jpg".into(),
            timelapse_enabled: true,
            capture_timeout: Duration::from_secs_f64(DEFAULT_CAPTURE_TIMEOUT_SECS),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

/// On-disk configuration shape.
///
/// Accepts the older minute-based keys (`interval_minutes`,
/// `duration_minutes`), `rtsp_url`, and `use_udp` alongside the current ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(alias = "rtsp_url")]
    pub source_address: Option<String>,
    pub transport: Option<Transport>,
    pub use_udp: Option<bool>,
    pub interval_seconds: Option<f64>,
    pub interval_minutes: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub attempt_count: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub timelapse_enabled: Option<bool>,
    pub timelapse_fps: Option<f64>,
    pub timelapse_output_path: Option<PathBuf>,
    pub mismatch_policy: Option<MismatchPolicy>,
    pub frame_extension: Option<String>,
    pub ffmpeg_path: Option<PathBuf>,
    pub capture_timeout_seconds: Option<f64>,
}

impl RawConfig {
    pub fn into_configuration(self) -> Result<CaptureConfiguration, ConfigError> {
        let source_address = self
            .source_address
            .ok_or_else(|| ConfigError::Invalid("source_address is required".into()))?;

        let transport = match (self.transport, self.use_udp) {
            (Some(t), _) => t,
            (None, Some(true)) => Transport::Udp,
            (None, _) => Transport::Tcp,
        };

        let interval = match (self.interval_seconds, self.interval_minutes) {
            (Some(secs), None) => seconds("interval_seconds", secs)?,
            (None, Some(mins)) => seconds("interval_minutes", mins * 60.0)?,
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "set only one of interval_seconds and interval_minutes".into(),
                ))
            }
            (None, None) => return Err(ConfigError::Invalid("interval_seconds is required".into())),
        };

        let length = match (self.duration_seconds, self.duration_minutes, self.attempt_count) {
            (Some(secs), None, None) => SessionLength::Duration(seconds("duration_seconds", secs)?),
            (None, Some(mins), None) => {
                SessionLength::Duration(seconds("duration_minutes", mins * 60.0)?)
            }
            (None, None, Some(count)) => SessionLength::Attempts(count),
            (None, None, None) => {
                return Err(ConfigError::Invalid(
                    "one of duration_seconds or attempt_count is required".into(),
                ))
            }
            _ => {
                return Err(ConfigError::Invalid(
                    "duration_seconds, duration_minutes and attempt_count are mutually exclusive"
                        .into(),
                ))
            }
        };

        let output_directory = self
            .output_dir
            .ok_or_else(|| ConfigError::Invalid("output_dir is required".into()))?;
        let output_path = self
            .timelapse_output_path
            .unwrap_or_else(|| output_directory.join("timelapse.mp4"));
        let capture_timeout = seconds(
            "capture_timeout_seconds",
            self.capture_timeout_seconds.unwrap_or(DEFAULT_CAPTURE_TIMEOUT_SECS),
        )?;

        let config = CaptureConfiguration {
            source_address,
            transport,
            interval,
            length,
            frame_extension: self.frame_extension.unwrap_or_else(|| "jpg".into()),
            timelapse_enabled: self.timelapse_enabled.unwrap_or(true),
            timelapse: TimelapseSettings {
                fps: self.timelapse_fps.unwrap_or(DEFAULT_TIMELAPSE_FPS),
                output_path,
                mismatch_policy: self.mismatch_policy.unwrap_or_default(),
            },
            output_directory,
            capture_timeout,
            ffmpeg_path: self.ffmpeg_path.unwrap_or_else(|| PathBuf::from("ffmpeg")),
        };
        config.validate()?;
        Ok(config)
    }
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::Invalid(format!("{} must be positive, got {}", key, value)));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::Invalid(format!("{} out of range: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_derives_floor_plus_one() {
        let length = SessionLength::Duration(Duration::from_secs(300));
        assert_eq!(length.attempts(Duration::from_secs(60)), 6);

        let uneven = SessionLength::Duration(Duration::from_secs(299));
        assert_eq!(uneven.attempts(Duration::from_secs(60)), 5);

        let shorter_than_interval = SessionLength::Duration(Duration::from_secs(10));
        assert_eq!(shorter_than_interval.attempts(Duration::from_secs(60)), 1);
    }

    #[test]
    fn explicit_count_is_used_as_is() {
        let length = SessionLength::Attempts(4);
        assert_eq!(length.attempts(Duration::from_millis(1)), 4);
    }

    #[test]
    fn parses_current_keys() {
        let config = CaptureConfiguration::from_yaml_str(
            r#"
source_address: rtsp://camera.local/stream
transport: udp
interval_seconds: 60
duration_seconds: 300
output_dir: /tmp/frames
timelapse_fps: 30
"#,
        )
        .unwrap();

        assert_eq!(config.transport, Transport::Udp);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.planned_attempts(), 6);
        assert_eq!(config.timelapse.fps, 30.0);
        assert_eq!(config.timelapse.output_path, PathBuf::from("/tmp/frames/timelapse.mp4"));
        assert_eq!(config.timelapse.mismatch_policy, MismatchPolicy::Strict);
        assert!(config.timelapse_enabled);
    }

    #[test]
    fn parses_legacy_minute_keys() {
        let config = CaptureConfiguration::from_yaml_str(
            r#"
rtsp_url: rtsp://camera.local/stream
interval_minutes: 1
duration_minutes: 5
use_udp: true
output_dir: frames
"#,
        )
        .unwrap();

        assert_eq!(config.source_address, "rtsp://camera.local/stream");
        assert_eq!(config.transport, Transport::Udp);
        assert_eq!(config.length, SessionLength::Duration(Duration::from_secs(300)));
        assert_eq!(config.timelapse.fps, DEFAULT_TIMELAPSE_FPS);
    }

    #[test]
    fn rejects_both_duration_and_count() {
        let err = CaptureConfiguration::from_yaml_str(
            r#"
source_address: rtsp://cam
interval_seconds: 5
duration_seconds: 60
attempt_count: 3
output_dir: out
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_values() {
        for yaml in [
            "source_address: a\ninterval_seconds: 0\nattempt_count: 3\noutput_dir: out\n",
            "source_address: a\ninterval_seconds: -5\nattempt_count: 3\noutput_dir: out\n",
            "source_address: a\ninterval_seconds: 5\nattempt_count: 0\noutput_dir: out\n",
            "source_address: a\ninterval_seconds: 5\nduration_seconds: 0\noutput_dir: out\n",
            "source_address: a\ninterval_seconds: 5\nattempt_count: 2\noutput_dir: out\ntimelapse_fps: 0\n",
        ] {
            let err = CaptureConfiguration::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "accepted: {}", yaml);
        }
    }

    #[test]
    fn rejects_interval_beyond_a_year() {
        let err = CaptureConfiguration::from_yaml_str(
            "source_address: a\ninterval_seconds: 1000000000000\nattempt_count: 2\noutput_dir: out\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("exceeds")), "{:?}", err);

        let config = CaptureConfiguration {
            source_address: "rtsp://camera/stream".into(),
            interval: MAX_CAPTURE_INTERVAL,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_required_keys() {
        let err = CaptureConfiguration::from_yaml_str("interval_seconds: 5\nattempt_count: 1\n")
            .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("source_address is required".into()));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = CaptureConfiguration::from_yaml_str("transport: [tcp").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
