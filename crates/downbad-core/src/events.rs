use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StartMoment;
use crate::ticker::{ElapsedDuration, Tick};

/// Every user-visible state change or reading, in the shape the CLI prints
/// as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StartMomentSet {
        start: StartMoment,
        /// The requested time was in the future and was replaced by "now".
        clamped: bool,
        at: DateTime<Utc>,
    },
    HabitLabelSet {
        label: String,
        at: DateTime<Utc>,
    },
    /// Current progress, from a one-shot read or a ticker emission.
    Elapsed {
        label: String,
        start: StartMoment,
        elapsed: ElapsedDuration,
        generation: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn elapsed(label: impl Into<String>, tick: &Tick) -> Self {
        Event::Elapsed {
            label: label.into(),
            start: tick.start,
            elapsed: tick.elapsed,
            generation: tick.generation,
            at: tick.at,
        }
    }
}
