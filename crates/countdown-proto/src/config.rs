use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::platform;
use crate::presentation::RevealTiming;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("timing.{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidTiming { field: &'static str, value: f64 },
    #[error("timing.tick_interval_secs must be greater than zero (got {0})")]
    InvalidTick(f64),
    #[error("invalid target instant {input:?}: {source}")]
    InvalidTarget {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub event: EventConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

/// What the page counts down to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Second footer line, usually the date in words.
    #[serde(default = "default_subtitle")]
    pub subtitle: String,
    /// RFC 3339 instant with an explicit offset, e.g. `2029-10-06T11:00:00+00:00`.
    #[serde(default = "default_target")]
    pub target: DateTime<FixedOffset>,
}

/// Reveal and fallback timings, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Title appears this long after playback starts.
    #[serde(default = "default_title_show_delay")]
    pub title_show_delay_secs: f64,
    /// Countdown appears this long before playback ends.
    #[serde(default = "default_countdown_show_before")]
    pub countdown_show_before_secs: f64,
    #[serde(default = "default_ready_grace")]
    pub ready_grace_secs: f64,
    #[serde(default = "default_stall_grace")]
    pub stall_grace_secs: f64,
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: f64,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_video_path")]
    pub path: PathBuf,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            target: default_target(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            title_show_delay_secs: default_title_show_delay(),
            countdown_show_before_secs: default_countdown_show_before(),
            ready_grace_secs: default_ready_grace(),
            stall_grace_secs: default_stall_grace(),
            load_timeout_secs: default_load_timeout(),
            tick_interval_secs: default_tick_interval(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            path: default_video_path(),
            volume: default_volume(),
            muted: false,
        }
    }
}

fn default_title() -> String {
    "Fischerstiching 2029".to_string()
}

fn default_subtitle() -> String {
    "06. Oktober 2029".to_string()
}

fn default_target() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2029, 10, 6, 11, 0, 0)
        .single()
        .unwrap_or_default()
        .fixed_offset()
}

fn default_title_show_delay() -> f64 {
    0.5
}

fn default_countdown_show_before() -> f64 {
    1.0
}

fn default_ready_grace() -> f64 {
    0.5
}

fn default_stall_grace() -> f64 {
    3.0
}

fn default_load_timeout() -> f64 {
    5.0
}

fn default_tick_interval() -> f64 {
    1.0
}

fn default_video_path() -> PathBuf {
    platform::data_dir().join("intro.mp4")
}

fn default_volume() -> f32 {
    0.5
}

/// Parse a command-line or config target such as `2029-10-06T13:00:00+02:00`.
pub fn parse_target(input: &str) -> Result<DateTime<FixedOffset>, ConfigError> {
    DateTime::parse_from_rfc3339(input.trim()).map_err(|source| ConfigError::InvalidTarget {
        input: input.to_string(),
        source,
    })
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("title_show_delay_secs", self.title_show_delay_secs),
            ("countdown_show_before_secs", self.countdown_show_before_secs),
            ("ready_grace_secs", self.ready_grace_secs),
            ("stall_grace_secs", self.stall_grace_secs),
            ("load_timeout_secs", self.load_timeout_secs),
            ("tick_interval_secs", self.tick_interval_secs),
        ];
        for (field, value) in fields {
            // also catches NaN, infinity and anything past Duration::MAX
            if value < 0.0 || Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::InvalidTiming { field, value });
            }
        }
        if self.tick_interval_secs <= 0.0 {
            return Err(ConfigError::InvalidTick(self.tick_interval_secs));
        }
        Ok(())
    }

    /// Timings in the form the presentation state machine consumes.
    /// Call after [`TimingConfig::validate`].
    pub fn reveal_timing(&self) -> RevealTiming {
        RevealTiming {
            title_delay_secs: self.title_show_delay_secs,
            countdown_lead_secs: self.countdown_show_before_secs,
            ready_grace: Duration::from_secs_f64(self.ready_grace_secs),
            stall_grace: Duration::from_secs_f64(self.stall_grace_secs),
            load_timeout: Duration::from_secs_f64(self.load_timeout_secs),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_secs)
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
