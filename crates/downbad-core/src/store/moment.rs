use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The instant elapsed time is measured from.
///
/// Stored as whole seconds since the Unix epoch. Construction goes through
/// [`StartMoment::from_epoch_seconds`] or a `DateTime`, so every value maps
/// to a representable point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StartMoment(i64);

impl StartMoment {
    /// `None` when `secs` is outside the range chrono can represent.
    pub fn from_epoch_seconds(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(|_| Self(secs))
    }

    /// Truncates sub-second precision.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self(dt.timestamp())
    }

    /// Interpret a wall-clock reading in the local time zone.
    ///
    /// Ambiguous readings (DST fall-back) resolve to the earlier instant;
    /// readings that don't exist locally (DST spring-forward gap) yield `None`.
    pub fn from_local_naive(naive: NaiveDateTime) -> Option<Self> {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| Self::from_datetime(&dt))
    }

    pub fn epoch_seconds(self) -> i64 {
        self.0
    }

    pub fn to_utc(self) -> DateTime<Utc> {
        // Every constructor checks the range.
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    pub fn to_local(self) -> DateTime<Local> {
        self.to_utc().with_timezone(&Local)
    }

    pub fn is_after(self, now: DateTime<Utc>) -> bool {
        self.0 > now.timestamp()
    }
}

impl TryFrom<i64> for StartMoment {
    type Error = String;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        Self::from_epoch_seconds(secs).ok_or_else(|| format!("epoch seconds out of range: {secs}"))
    }
}

impl From<StartMoment> for i64 {
    fn from(moment: StartMoment) -> Self {
        moment.0
    }
}

impl fmt::Display for StartMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_local().format("%Y-%m-%d %H:%M:%S"))
    }
}
