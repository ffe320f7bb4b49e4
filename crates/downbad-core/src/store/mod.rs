//! Duration store: the durable start moment and habit label.
//!
//! Values live in the `prefs` table of a [`Database`] and are mirrored in
//! `tokio::sync::watch` channels. New observers get the current value
//! replayed, then every change. A setter publishes only after SQLite has
//! accepted the write, so observers never see a value that isn't on disk
//! and a failed write leaves the previous value in place everywhere.
//!
//! A missing start moment is never written implicitly. Each read of an
//! unset store synthesizes "now" from the store's clock.
//!
//! Writes from other connections to the same file (another `downbad`
//! process) reach the channels through [`DurationStore::refresh`]. Until a
//! refresh, one-shot reads and observers reflect this handle's last view.

mod moment;

pub use moment::StartMoment;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::StorageError;
use crate::storage::Database;

pub const START_TIME_KEY: &str = "start_time_epoch";
pub const HABIT_NAME_KEY: &str = "habit_name";
pub const DEFAULT_HABIT_LABEL: &str = "sober";

/// Stream of start moments: current value first, then each change.
pub type StartMomentStream = BoxStream<'static, StartMoment>;

/// Stream of habit labels: current value first, then each change.
pub type LabelStream = BoxStream<'static, String>;

/// One-shot view of the store, as used by the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub start: StartMoment,
    pub label: String,
    /// `false` when `start` was synthesized because nothing is stored yet.
    pub start_persisted: bool,
}

/// Handle to the persisted start moment and habit label.
///
/// Cheap to clone; clones share the same database and channels. Construct
/// one per process and pass it to every consumer.
#[derive(Clone)]
pub struct DurationStore {
    inner: Arc<Inner>,
}

struct Inner {
    db: Mutex<Database>,
    start_tx: watch::Sender<Option<StartMoment>>,
    label_tx: watch::Sender<Option<String>>,
    /// `data_version` at the last load, to skip refreshes with nothing new.
    seen_version: AtomicI64,
    clock: Arc<dyn Clock>,
}

fn load_values(db: &Database) -> Result<(Option<StartMoment>, Option<String>), StorageError> {
    let start = match db.kv_get_i64(START_TIME_KEY)? {
        None => None,
        Some(secs) => Some(StartMoment::from_epoch_seconds(secs).ok_or_else(|| {
            StorageError::Corrupt {
                key: START_TIME_KEY.to_string(),
                value: secs.to_string(),
            }
        })?),
    };
    Ok((start, db.kv_get(HABIT_NAME_KEY)?))
}

/// Replace the channel value if it differs. Returns whether it did.
fn publish_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

impl DurationStore {
    /// Open a store over `db` using the system clock.
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] if a stored value can't be decoded.
    pub fn open(db: Database) -> Result<Self, StorageError> {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    /// Open a store that reads "now" from `clock`.
    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let seen_version = db.data_version()?;
        let (start, label) = load_values(&db)?;

        info!(
            path = ?db.path(),
            start_persisted = start.is_some(),
            label_persisted = label.is_some(),
            "duration store opened"
        );

        let (start_tx, _) = watch::channel(start);
        let (label_tx, _) = watch::channel(label);
        Ok(Self {
            inner: Arc::new(Inner {
                db: Mutex::new(db),
                start_tx,
                label_tx,
                seen_version: AtomicI64::new(seen_version),
                clock,
            }),
        })
    }

    /// The clock this store synthesizes "now" from.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Current start moment, then every change. Never fails; an unset
    /// value is reported as the clock's "now" at each emission.
    pub fn observe_start_moment(&self) -> StartMomentStream {
        let clock = Arc::clone(&self.inner.clock);
        WatchStream::new(self.inner.start_tx.subscribe())
            .map(move |stored| stored.unwrap_or_else(|| StartMoment::from_datetime(&clock.now())))
            .boxed()
    }

    /// Current habit label, then every change. Unset reads as `"sober"`.
    pub fn observe_habit_label(&self) -> LabelStream {
        WatchStream::new(self.inner.label_tx.subscribe())
            .map(|stored| stored.unwrap_or_else(|| DEFAULT_HABIT_LABEL.to_string()))
            .boxed()
    }

    // ── One-shot reads ───────────────────────────────────────────────

    pub fn start_moment(&self) -> StartMoment {
        self.inner
            .start_tx
            .borrow()
            .unwrap_or_else(|| StartMoment::from_datetime(&self.inner.clock.now()))
    }

    pub fn habit_label(&self) -> String {
        self.inner
            .label_tx
            .borrow()
            .clone()
            .unwrap_or_else(|| DEFAULT_HABIT_LABEL.to_string())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let stored = *self.inner.start_tx.borrow();
        StoreSnapshot {
            start: stored.unwrap_or_else(|| StartMoment::from_datetime(&self.inner.clock.now())),
            label: self.habit_label(),
            start_persisted: stored.is_some(),
        }
    }

    /// When the start moment was last written, if ever.
    pub async fn start_changed_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.with_db(|_, db| db.kv_updated_at(START_TIME_KEY)).await
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Persist `moment`, replacing any previous start moment.
    pub async fn set_start_moment(&self, moment: StartMoment) -> Result<(), StorageError> {
        self.with_db(move |inner, db| {
            db.kv_set(
                START_TIME_KEY,
                &moment.epoch_seconds().to_string(),
                inner.clock.now(),
            )?;
            inner.start_tx.send_replace(Some(moment));
            debug!(start = moment.epoch_seconds(), "start moment stored");
            Ok(())
        })
        .await
    }

    /// Persist a new habit label.
    pub async fn set_habit_label(&self, label: impl Into<String>) -> Result<(), StorageError> {
        let label = label.into();
        self.with_db(move |inner, db| {
            db.kv_set(HABIT_NAME_KEY, &label, inner.clock.now())?;
            debug!(label = %label, "habit label stored");
            inner.label_tx.send_replace(Some(label));
            Ok(())
        })
        .await
    }

    /// Set the start moment to the clock's current time.
    pub async fn reset_to_now(&self) -> Result<StartMoment, StorageError> {
        let now = StartMoment::from_datetime(&self.inner.clock.now());
        self.set_start_moment(now).await?;
        Ok(now)
    }

    /// Pick up values committed by other connections to the same database.
    ///
    /// Observers are notified only for values that actually changed.
    /// Returns whether anything was published. Cheap when nothing was
    /// committed elsewhere since the last load: only `data_version` is read.
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] if the other writer stored a value
    /// that can't be decoded; the previous values stay published.
    pub async fn refresh(&self) -> Result<bool, StorageError> {
        self.with_db(|inner, db| {
            let version = db.data_version()?;
            if inner.seen_version.load(Ordering::Acquire) == version {
                return Ok(false);
            }
            let (start, label) = load_values(db)?;
            inner.seen_version.store(version, Ordering::Release);

            let start_changed = publish_if_changed(&inner.start_tx, start);
            let label_changed = publish_if_changed(&inner.label_tx, label);
            if start_changed || label_changed {
                debug!(start_changed, label_changed, "picked up external store write");
            }
            Ok(start_changed || label_changed)
        })
        .await
    }

    /// Run `f` against the database on the blocking pool.
    ///
    /// The database lock is held across the write and the publish, so
    /// concurrent writers publish in the same order they hit the disk.
    async fn with_db<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner, &Database) -> Result<T, StorageError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let db = inner
                .db
                .lock()
                .map_err(|_| StorageError::TaskFailed("database lock poisoned".into()))?;
            f(&inner, &db)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn memory_store(clock: &ManualClock) -> DurationStore {
        DurationStore::with_clock(Database::open_memory().unwrap(), Arc::new(clock.clone()))
            .unwrap()
    }

    #[tokio::test]
    async fn unset_start_reads_as_now_without_writing() {
        let clock = ManualClock::new(t0());
        let store = memory_store(&clock);

        let mut starts = store.observe_start_moment();
        assert_eq!(starts.next().await, Some(StartMoment::from_datetime(&t0())));

        clock.advance(chrono::Duration::seconds(30));
        let snap = store.snapshot();
        assert_eq!(snap.start, StartMoment::from_datetime(&clock.now()));
        assert!(!snap.start_persisted);

        let db = store.inner.db.lock().unwrap();
        assert!(db.kv_get(START_TIME_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let clock = ManualClock::new(t0());
        let store = memory_store(&clock);
        let t1 = StartMoment::from_epoch_seconds(1_000).unwrap();
        let t2 = StartMoment::from_epoch_seconds(2_000).unwrap();

        store.set_start_moment(t1).await.unwrap();
        store.set_start_moment(t2).await.unwrap();

        assert_eq!(store.start_moment(), t2);
        let mut fresh = store.observe_start_moment();
        assert_eq!(fresh.next().await, Some(t2));
    }

    #[tokio::test]
    async fn existing_observer_sees_change() {
        let clock = ManualClock::new(t0());
        let store = memory_store(&clock);
        let mut starts = store.observe_start_moment();
        starts.next().await;

        let t1 = StartMoment::from_epoch_seconds(1_000).unwrap();
        store.set_start_moment(t1).await.unwrap();
        assert_eq!(starts.next().await, Some(t1));
    }

    #[tokio::test]
    async fn habit_label_defaults_then_updates() {
        let clock = ManualClock::new(t0());
        let store = memory_store(&clock);
        assert_eq!(store.habit_label(), DEFAULT_HABIT_LABEL);

        store.set_habit_label("sugar").await.unwrap();
        let mut labels = store.observe_habit_label();
        assert_eq!(labels.next().await.as_deref(), Some("sugar"));
    }

    #[tokio::test]
    async fn reset_to_now_uses_clock_and_is_repeatable() {
        let clock = ManualClock::new(t0());
        let store = memory_store(&clock);

        let first = store.reset_to_now().await.unwrap();
        let second = store.reset_to_now().await.unwrap();
        assert_eq!(first, StartMoment::from_datetime(&t0()));
        assert_eq!(second, first);
        assert!(store.snapshot().start_persisted);
        assert_eq!(store.start_changed_at().await.unwrap(), Some(t0()));
    }

    #[test]
    fn corrupt_start_is_reported_on_open() {
        let db = Database::open_memory().unwrap();
        db.kv_set(START_TIME_KEY, "last tuesday", t0()).unwrap();
        let err = DurationStore::open(db).err().unwrap();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == START_TIME_KEY));
    }

    #[test]
    fn out_of_range_start_is_reported_on_open() {
        let db = Database::open_memory().unwrap();
        db.kv_set(START_TIME_KEY, &i64::MAX.to_string(), t0()).unwrap();
        assert!(matches!(
            DurationStore::open(db),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn write_time_follows_store_clock() {
        let clock = ManualClock::new(t0());
        let store = memory_store(&clock);
        clock.advance(chrono::Duration::hours(2));
        store.set_habit_label("sugar").await.unwrap();
        store
            .set_start_moment(StartMoment::from_epoch_seconds(1_000).unwrap())
            .await
            .unwrap();
        assert_eq!(
            store.start_changed_at().await.unwrap(),
            Some(t0() + chrono::Duration::hours(2))
        );
    }

    fn file_store(path: &std::path::Path, clock: &ManualClock) -> DurationStore {
        DurationStore::with_clock(Database::open_at(path).unwrap(), Arc::new(clock.clone()))
            .unwrap()
    }

    #[tokio::test]
    async fn refresh_picks_up_other_connection_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downbad.db");
        let clock = ManualClock::new(t0());
        let watcher = file_store(&path, &clock);
        let writer = file_store(&path, &clock);

        let mut starts = watcher.observe_start_moment();
        let mut labels = watcher.observe_habit_label();
        assert_eq!(starts.next().await, Some(StartMoment::from_datetime(&t0())));
        assert_eq!(labels.next().await.as_deref(), Some(DEFAULT_HABIT_LABEL));

        let t1 = StartMoment::from_epoch_seconds(1_000).unwrap();
        writer.set_start_moment(t1).await.unwrap();
        writer.set_habit_label("sugar").await.unwrap();
        assert!(!watcher.snapshot().start_persisted);

        assert!(watcher.refresh().await.unwrap());
        assert_eq!(starts.next().await, Some(t1));
        assert_eq!(labels.next().await.as_deref(), Some("sugar"));
        assert_eq!(watcher.start_moment(), t1);
        assert!(watcher.snapshot().start_persisted);

        assert!(!watcher.refresh().await.unwrap());
    }

    #[tokio::test]
    async fn refresh_without_real_change_stays_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downbad.db");
        let clock = ManualClock::new(t0());
        let watcher = file_store(&path, &clock);
        let writer = file_store(&path, &clock);

        writer.set_habit_label("sugar").await.unwrap();
        assert!(watcher.refresh().await.unwrap());

        let mut labels = watcher.observe_habit_label();
        assert_eq!(labels.next().await.as_deref(), Some("sugar"));

        // Same value rewritten: the file changed, the label did not.
        writer.set_habit_label("sugar").await.unwrap();
        assert!(!watcher.refresh().await.unwrap());
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), labels.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn own_writes_need_no_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(t0());
        let store = file_store(&dir.path().join("downbad.db"), &clock);
        store.set_habit_label("vape").await.unwrap();
        assert_eq!(store.habit_label(), "vape");
        assert!(!store.refresh().await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_external_write_keeps_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downbad.db");
        let clock = ManualClock::new(t0());
        let watcher = file_store(&path, &clock);
        let t1 = StartMoment::from_epoch_seconds(1_000).unwrap();
        watcher.set_start_moment(t1).await.unwrap();

        let raw = Database::open_at(&path).unwrap();
        raw.kv_set(START_TIME_KEY, "garbage", t0()).unwrap();

        assert!(matches!(
            watcher.refresh().await,
            Err(StorageError::Corrupt { .. })
        ));
        assert_eq!(watcher.start_moment(), t1);
    }
}
