//! Live counter: one line per tick until interrupted or `--count` is reached.
//!
//! `set-start`, `reset` and `rename` run as separate processes, so the store
//! is refreshed from disk once per period. The refresh branch is polled
//! first, so a write committed before a refresh deadline is shown by the
//! tick that follows it.

use downbad_core::{Config, DurationStore, Event, Ticker, DEFAULT_HABIT_LABEL};
use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{format_elapsed, open_store, CmdResult};

pub async fn run(config: &Config, count: Option<u64>, json: bool) -> CmdResult {
    let store = open_store()?;
    let period = config.ticker.period();
    let ticker = Ticker::for_store(&store).with_period(period);
    let mut ticks = ticker.observe_ticks(store.observe_start_moment());
    let mut labels = store.observe_habit_label();
    let mut label = labels
        .next()
        .await
        .unwrap_or_else(|| DEFAULT_HABIT_LABEL.to_string());

    let mut refresh = tokio::time::interval(period);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The store was just loaded; skip the immediate first tick.
    refresh.reset();

    let mut printed = 0u64;
    while count.map_or(true, |limit| printed < limit) {
        tokio::select! {
            biased;
            _ = refresh.tick() => refresh_store(&store).await,
            Some(next_label) = labels.next() => {
                debug!(label = %next_label, "habit label changed");
                label = next_label;
            }
            tick = ticks.next() => {
                let Some(tick) = tick else { break };
                if json {
                    println!("{}", serde_json::to_string(&Event::elapsed(label.as_str(), &tick))?);
                } else {
                    println!(
                        "{} free for {}",
                        label,
                        format_elapsed(&tick.elapsed, config.display.show_zero_days)
                    );
                }
                printed += 1;
            }
        }
    }
    Ok(())
}

/// A bad value written by another process is logged and skipped; the
/// counter keeps running on what it had.
async fn refresh_store(store: &DurationStore) {
    if let Err(e) = store.refresh().await {
        warn!(error = %e, "could not reload store, keeping previous values");
    }
}
