//! Time remaining until the event, split into display fields.
//!
//! The decomposition floors the millisecond difference: 1 d 23:59:59.999 left
//! reads `001:23:59:59`, never `002:00:00:00`.

use std::fmt;

use chrono::{DateTime, TimeZone};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Whole days, hours, minutes and seconds left until a target instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    /// The target has been reached or passed. All fields are zero.
    pub expired: bool,
}

impl Countdown {
    pub const EXPIRED: Countdown = Countdown {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        expired: true,
    };

    /// Remaining time from `now` until `target`. The two instants may carry
    /// different offsets; only the absolute difference matters.
    pub fn between<A: TimeZone, B: TimeZone>(now: &DateTime<A>, target: &DateTime<B>) -> Self {
        Self::from_millis(target.timestamp_millis() - now.timestamp_millis())
    }

    /// Split a millisecond difference. Zero or negative means expired.
    pub fn from_millis(remaining_ms: i64) -> Self {
        if remaining_ms <= 0 {
            return Self::EXPIRED;
        }

        Self {
            days: (remaining_ms / MS_PER_DAY) as u64,
            hours: ((remaining_ms % MS_PER_DAY) / MS_PER_HOUR) as u8,
            minutes: ((remaining_ms % MS_PER_HOUR) / MS_PER_MINUTE) as u8,
            seconds: ((remaining_ms % MS_PER_MINUTE) / MS_PER_SECOND) as u8,
            expired: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Total whole seconds represented by the four fields.
    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400
            + u64::from(self.hours) * 3_600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds)
    }

    pub fn display(&self) -> CountdownDisplay {
        CountdownDisplay {
            days: format!("{:03}", self.days),
            hours: format!("{:02}", self.hours),
            minutes: format!("{:02}", self.minutes),
            seconds: format!("{:02}", self.seconds),
        }
    }
}

/// Zero-padded text for the four countdown cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownDisplay {
    pub days: String,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl Default for CountdownDisplay {
    fn default() -> Self {
        Countdown::EXPIRED.display()
    }
}

impl fmt::Display for CountdownDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}
