//! Elapsed-time ticker.
//!
//! Turns a stream of start moments into a stream of [`ElapsedDuration`]s,
//! one per period. The loop runs inside the returned stream and only
//! advances when the consumer polls it: no task is spawned, and dropping
//! the stream drops the timer with it.
//!
//! ## Switching
//!
//! Each poll checks the upstream before the timer (`biased` select). A new
//! start moment bumps the generation, resets the interval and produces an
//! emission at once; the next one follows a full period later. Nothing
//! computed against the previous start is delivered after the switch.

mod elapsed;

pub use elapsed::ElapsedDuration;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::store::{DurationStore, StartMoment};

/// One emission of the ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Bumped every time the upstream start moment changes; 0 for the first.
    pub generation: u64,
    pub start: StartMoment,
    pub elapsed: ElapsedDuration,
    pub at: DateTime<Utc>,
}

pub type TickStream = BoxStream<'static, Tick>;
pub type ElapsedStream = BoxStream<'static, ElapsedDuration>;

/// Builds elapsed-time streams against a clock.
#[derive(Clone)]
pub struct Ticker {
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl Ticker {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            period: Self::DEFAULT_PERIOD,
        }
    }

    /// A ticker reading time from the same clock as `store`.
    pub fn for_store(store: &DurationStore) -> Self {
        Self::new(store.clock())
    }

    /// Change the emission period. A zero period is ignored.
    pub fn with_period(mut self, period: Duration) -> Self {
        if !period.is_zero() {
            self.period = period;
        }
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Elapsed durations for whatever `starts` last yielded.
    ///
    /// Nothing is emitted until `starts` yields its first value. If `starts`
    /// ends, ticking continues against the last value seen.
    pub fn observe_elapsed<S>(&self, starts: S) -> ElapsedStream
    where
        S: Stream<Item = StartMoment> + Send + Unpin + 'static,
    {
        self.observe_ticks(starts).map(|tick| tick.elapsed).boxed()
    }

    /// Like [`observe_elapsed`](Self::observe_elapsed) but keeps the start
    /// moment and generation alongside each value.
    pub fn observe_ticks<S>(&self, starts: S) -> TickStream
    where
        S: Stream<Item = StartMoment> + Send + Unpin + 'static,
    {
        let state = TickLoop {
            starts,
            upstream_open: true,
            start: None,
            generation: 0,
            interval: None,
            period: self.period,
            clock: Arc::clone(&self.clock),
        };
        stream::unfold(state, |mut state| async move {
            let tick = state.next_tick().await?;
            Some((tick, state))
        })
        .boxed()
    }

    /// Elapsed durations for the store's start moment.
    pub fn observe_store(&self, store: &DurationStore) -> ElapsedStream {
        self.observe_elapsed(store.observe_start_moment())
    }
}

struct TickLoop<S> {
    starts: S,
    upstream_open: bool,
    start: Option<StartMoment>,
    generation: u64,
    /// Created on first poll so building a stream needs no runtime.
    interval: Option<Interval>,
    period: Duration,
    clock: Arc<dyn Clock>,
}

impl<S> TickLoop<S>
where
    S: Stream<Item = StartMoment> + Unpin,
{
    async fn next_tick(&mut self) -> Option<Tick> {
        let mut start = match self.start {
            Some(start) => start,
            None => {
                let first = self.starts.next().await?;
                debug!(start = first.epoch_seconds(), "ticker started");
                self.start = Some(first);
                first
            }
        };

        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                biased;
                next = self.starts.next(), if self.upstream_open => match next {
                    Some(new_start) => {
                        self.generation += 1;
                        self.start = Some(new_start);
                        start = new_start;
                        interval.reset_immediately();
                        debug!(
                            generation = self.generation,
                            start = new_start.epoch_seconds(),
                            "start moment changed, restarting tick loop"
                        );
                    }
                    None => {
                        trace!("start stream ended, keeping last start moment");
                        self.upstream_open = false;
                    }
                },
                _ = interval.tick() => {
                    let now = self.clock.now();
                    return Some(Tick {
                        generation: self.generation,
                        start,
                        elapsed: ElapsedDuration::between(start, now),
                        at: now,
                    });
                }
            }
        }
    }
}
