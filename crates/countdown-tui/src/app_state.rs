//! AppState — shared read-only data passed to all components during render.
//!
//! The App event loop is the only writer: visibility and timeline come from
//! `CoreBroadcast` messages, the countdown from the one-second tick.

use chrono::{DateTime, FixedOffset, Utc};
use countdown_proto::config::Config;
use countdown_proto::countdown::{Countdown, CountdownDisplay};
use countdown_proto::presentation::{Region, Visibility};

use crate::core::PlayerHealth;

/// Playback position as last reported by mpv.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timeline {
    pub time_pos: Option<f64>,
    pub duration: Option<f64>,
}

impl Timeline {
    /// 0.0..=1.0, or `None` until the duration is known.
    pub fn progress(&self) -> Option<f64> {
        let duration = self.duration.filter(|d| d.is_finite() && *d > 0.0)?;
        Some((self.time_pos.unwrap_or(0.0) / duration).clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub title: String,
    pub subtitle: String,
    pub target: DateTime<FixedOffset>,
    /// Mirror of the core's region flags.
    pub visibility: Visibility,
    pub countdown: CountdownDisplay,
    pub expired: bool,
    pub timeline: Timeline,
    pub health: PlayerHealth,
    pub last_warning: Option<String>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let mut state = Self {
            title: config.event.title.clone(),
            subtitle: config.event.subtitle.clone(),
            target: config.event.target,
            visibility: Visibility::default(),
            countdown: CountdownDisplay::default(),
            expired: false,
            timeline: Timeline::default(),
            health: PlayerHealth::default(),
            last_warning: None,
        };
        state.refresh_countdown(Utc::now());
        state
    }

    /// Replace the mirror with the core's latest region flags.
    pub fn sync_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.visibility.is_visible(region)
    }

    /// Recompute the four fields. Runs on every tick, whether the panel is
    /// visible or not, so it is current the moment it appears.
    pub fn refresh_countdown(&mut self, now: DateTime<Utc>) {
        let countdown = Countdown::between(&now, &self.target);
        self.countdown = countdown.display();
        self.expired = countdown.is_expired();
    }
}
