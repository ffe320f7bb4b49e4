//! Home-screen widget snapshot.
//!
//! The widget doesn't subscribe to anything. Each manual refresh reads the
//! store once and renders a days/hours card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::store::{DurationStore, StartMoment};
use crate::ticker::ElapsedDuration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSnapshot {
    pub label: String,
    /// `"<LABEL> FREE"`, upper-cased.
    pub headline: String,
    pub days: u64,
    /// Hours past the last whole day, 0..=23.
    pub hours: u8,
    pub start: StartMoment,
    pub captured_at: DateTime<Utc>,
}

impl WidgetSnapshot {
    /// Read the store once, using the store's own clock.
    pub fn capture(store: &DurationStore) -> Self {
        let clock = store.clock();
        Self::capture_with(store, clock.as_ref())
    }

    pub fn capture_with(store: &DurationStore, clock: &dyn Clock) -> Self {
        let snapshot = store.snapshot();
        let now = clock.now();
        let elapsed = ElapsedDuration::between(snapshot.start, now);
        Self {
            headline: format!("{} free", snapshot.label).to_uppercase(),
            label: snapshot.label,
            days: elapsed.days,
            hours: elapsed.hours,
            start: snapshot.start,
            captured_at: now,
        }
    }

    /// Plain-text card: headline, days, hours.
    pub fn render(&self) -> String {
        format!("{}\n{} Days\n{} Hours", self.headline, self.days, self.hours)
    }
}
