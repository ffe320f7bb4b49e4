//! Store and ticker wired together the way the CLI wires them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use downbad_core::{Database, DurationStore, ElapsedDuration, ManualClock, StartMoment, Ticker};
use futures::StreamExt;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[tokio::test(start_paused = true)]
async fn ticker_follows_store_writes() {
    let clock = ManualClock::new(t0());
    let store =
        DurationStore::with_clock(Database::open_memory().unwrap(), Arc::new(clock.clone()))
            .unwrap();
    store
        .set_start_moment(StartMoment::from_datetime(&(t0() - chrono::Duration::days(3))))
        .await
        .unwrap();

    let mut ticks = Ticker::for_store(&store).observe_ticks(store.observe_start_moment());
    let first = ticks.next().await.unwrap();
    assert_eq!(first.elapsed.days, 3);
    assert_eq!(first.generation, 0);

    let new_start = StartMoment::from_datetime(&(t0() - chrono::Duration::seconds(42)));
    store.set_start_moment(new_start).await.unwrap();

    let switched = loop {
        let tick = ticks.next().await.unwrap();
        if tick.generation > 0 {
            break tick;
        }
    };
    assert_eq!(switched.start, new_start);
    assert_eq!(switched.elapsed, ElapsedDuration::from_seconds(42));
}

#[tokio::test(start_paused = true)]
async fn reset_restarts_count_from_zero() {
    let clock = ManualClock::new(t0());
    let store =
        DurationStore::with_clock(Database::open_memory().unwrap(), Arc::new(clock.clone()))
            .unwrap();
    store
        .set_start_moment(StartMoment::from_datetime(&(t0() - chrono::Duration::hours(5))))
        .await
        .unwrap();

    let mut elapsed = Ticker::for_store(&store)
        .with_period(Duration::from_secs(1))
        .observe_store(&store);
    assert_eq!(elapsed.next().await.unwrap().hours, 5);

    store.reset_to_now().await.unwrap();
    let mut latest = elapsed.next().await.unwrap();
    while latest.hours == 5 {
        latest = elapsed.next().await.unwrap();
    }
    assert!(latest.is_zero());
}

#[tokio::test]
async fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("downbad.db");
    let start = StartMoment::from_datetime(&t0());

    {
        let store = DurationStore::open(Database::open_at(&path).unwrap()).unwrap();
        store.set_start_moment(start).await.unwrap();
        store.set_habit_label("sugar").await.unwrap();
    }

    let store = DurationStore::open(Database::open_at(&path).unwrap()).unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.start, start);
    assert!(snapshot.start_persisted);
    assert_eq!(snapshot.label, "sugar");
}

#[tokio::test]
async fn fresh_label_subscription_replays_latest() {
    let store = DurationStore::open(Database::open_memory().unwrap()).unwrap();
    store.set_habit_label("sugar").await.unwrap();

    let mut labels = store.observe_habit_label();
    assert_eq!(labels.next().await.unwrap(), "sugar");
}

#[tokio::test]
async fn two_observers_see_the_same_start() {
    let store = DurationStore::open(Database::open_memory().unwrap()).unwrap();
    let start = StartMoment::from_datetime(&t0());
    store.set_start_moment(start).await.unwrap();

    let mut a = store.observe_start_moment();
    let mut b = store.clone().observe_start_moment();
    assert_eq!(a.next().await.unwrap(), start);
    assert_eq!(b.next().await.unwrap(), start);
}

#[tokio::test]
async fn ticker_switches_after_refresh_from_other_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("downbad.db");
    let clock = ManualClock::new(t0());
    let watcher =
        DurationStore::with_clock(Database::open_at(&path).unwrap(), Arc::new(clock.clone()))
            .unwrap();
    let writer =
        DurationStore::with_clock(Database::open_at(&path).unwrap(), Arc::new(clock.clone()))
            .unwrap();

    let mut ticks = Ticker::for_store(&watcher)
        .with_period(Duration::from_millis(20))
        .observe_ticks(watcher.observe_start_moment());
    let first = ticks.next().await.unwrap();
    assert_eq!(first.start, StartMoment::from_datetime(&t0()));

    let new_start = StartMoment::from_datetime(&(t0() - chrono::Duration::days(10)));
    writer.set_start_moment(new_start).await.unwrap();
    assert!(watcher.refresh().await.unwrap());

    let switched = ticks.next().await.unwrap();
    assert_eq!(switched.generation, 1);
    assert_eq!(switched.start, new_start);
    assert_eq!(switched.elapsed.days, 10);
}
