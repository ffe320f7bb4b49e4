//! # Down Bad Core Library
//!
//! Counts the time since a user-chosen start moment ("sober since ...").
//! The CLI is a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Duration Store**: the persisted start moment and habit label, exposed
//!   as replaying observable streams plus two setters
//! - **Ticker**: turns the start-moment stream into one elapsed-time value per
//!   second, restarting whenever the start moment changes
//! - **Storage**: SQLite key-value preferences and TOML configuration
//! - **Widget / share**: one-shot snapshot and share message built from the
//!   same store
//! - **Update checker**: independent release-feed poller
//!
//! ## Key Components
//!
//! - [`DurationStore`]: durable state, constructed once and passed around
//! - [`Ticker`]: switch-latest elapsed-time stream
//! - [`Database`]: key-value persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod share;
pub mod storage;
pub mod store;
pub mod ticker;
pub mod update;
pub mod widget;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, UpdateError};
pub use events::Event;
pub use share::share_text;
pub use storage::{Config, Database};
pub use store::{DurationStore, StartMoment, StoreSnapshot, DEFAULT_HABIT_LABEL};
pub use ticker::{ElapsedDuration, Tick, Ticker};
pub use update::{UpdateChecker, UpdateStatus};
pub use widget::WidgetSnapshot;
