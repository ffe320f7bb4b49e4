//! Start moment commands: `set-start` and `reset`.

use chrono::{NaiveDate, NaiveTime};
use downbad_core::{DurationStore, Event, StartMoment};
use tracing::warn;

use super::{open_store, CmdResult};

/// Parse `YYYY-MM-DD [HH:MM]` as a local wall-clock time.
pub fn parse_local(date: &str, time: Option<&str>) -> Result<StartMoment, String> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {date:?} (expected YYYY-MM-DD): {e}"))?;
    let time_of_day = match time {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M")
            .map_err(|e| format!("invalid time {t:?} (expected HH:MM): {e}"))?,
        None => NaiveTime::MIN,
    };
    StartMoment::from_local_naive(day.and_time(time_of_day))
        .ok_or_else(|| {
            format!(
                "{date} {} does not exist in the local time zone",
                time_of_day.format("%H:%M")
            )
        })
}

/// Replace a future moment with "now". Returns the moment to store and
/// whether it was clamped.
fn clamp_to_now(store: &DurationStore, requested: StartMoment) -> (StartMoment, bool) {
    let now = store.clock().now();
    if requested.is_after(now) {
        (StartMoment::from_datetime(&now), true)
    } else {
        (requested, false)
    }
}

pub async fn set_start(date: &str, time: Option<&str>) -> CmdResult {
    let requested = parse_local(date, time)?;
    let store = open_store()?;
    let (start, clamped) = clamp_to_now(&store, requested);
    if clamped {
        warn!(requested = requested.epoch_seconds(), "start moment is in the future, using now");
        eprintln!("warning: {requested} is in the future, starting from now instead");
    }

    store.set_start_moment(start).await?;
    let event = Event::StartMomentSet {
        start,
        clamped,
        at: store.clock().now(),
    };
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

pub async fn reset() -> CmdResult {
    let store = open_store()?;
    let start = store.reset_to_now().await?;
    let event = Event::StartMomentSet {
        start,
        clamped: false,
        at: start.to_utc(),
    };
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use downbad_core::{Database, ManualClock};
    use std::sync::Arc;

    #[test]
    fn parses_date_and_optional_time() {
        let midnight = parse_local("2024-06-10", None).unwrap();
        let expected = Local
            .with_ymd_and_hms(2024, 6, 10, 0, 0, 0)
            .earliest()
            .unwrap();
        assert_eq!(midnight, StartMoment::from_datetime(&expected));

        let evening = parse_local("2024-06-10", Some("21:30")).unwrap();
        assert_eq!(evening.epoch_seconds() - midnight.epoch_seconds(), 21 * 3_600 + 30 * 60);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_local("10/03/2024", None).is_err());
        assert!(parse_local("2024-06-10", Some("9pm")).is_err());
        assert!(parse_local("2024-02-30", None).is_err());
    }

    #[test]
    fn future_requests_are_clamped() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let store = DurationStore::with_clock(
            Database::open_memory().unwrap(),
            Arc::new(ManualClock::new(now)),
        )
        .unwrap();

        let future = StartMoment::from_datetime(&(now + chrono::Duration::days(1)));
        assert_eq!(clamp_to_now(&store, future), (StartMoment::from_datetime(&now), true));

        let past = StartMoment::from_datetime(&(now - chrono::Duration::days(1)));
        assert_eq!(clamp_to_now(&store, past), (past, false));
    }
}
