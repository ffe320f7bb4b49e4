use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StartMoment;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Time since the start moment, split into days, hours, minutes and seconds.
///
/// Days are 86400-second spans, not calendar days; DST shifts don't affect
/// the breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElapsedDuration {
    pub days: u64,
    /// 0..=23
    pub hours: u8,
    /// 0..=59
    pub minutes: u8,
    /// 0..=59
    pub seconds: u8,
}

impl ElapsedDuration {
    pub const ZERO: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / SECS_PER_DAY,
            hours: ((total / SECS_PER_HOUR) % 24) as u8,
            minutes: ((total / SECS_PER_MINUTE) % 60) as u8,
            seconds: (total % 60) as u8,
        }
    }

    /// Whole seconds from `start` to `now`, clamped at zero when `start` lies
    /// in the future.
    pub fn between(start: StartMoment, now: DateTime<Utc>) -> Self {
        let elapsed = now.timestamp().saturating_sub(start.epoch_seconds());
        Self::from_seconds(u64::try_from(elapsed).unwrap_or(0))
    }

    pub fn total_seconds(&self) -> u64 {
        self.days * SECS_PER_DAY
            + u64::from(self.hours) * SECS_PER_HOUR
            + u64::from(self.minutes) * SECS_PER_MINUTE
            + u64::from(self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for ElapsedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}
