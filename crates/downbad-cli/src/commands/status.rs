use downbad_core::{Config, ElapsedDuration, Event};

use super::{format_elapsed, open_store, CmdResult};

pub async fn run(config: &Config, json: bool) -> CmdResult {
    let store = open_store()?;
    let snapshot = store.snapshot();
    let now = store.clock().now();
    let elapsed = ElapsedDuration::between(snapshot.start, now);

    if json {
        let event = Event::Elapsed {
            label: snapshot.label,
            start: snapshot.start,
            elapsed,
            generation: 0,
            at: now,
        };
        println!("{}", serde_json::to_string_pretty(&event)?);
        return Ok(());
    }

    println!(
        "{} free for {}",
        snapshot.label,
        format_elapsed(&elapsed, config.display.show_zero_days)
    );
    if snapshot.start_persisted {
        println!("since {}", snapshot.start);
    } else {
        println!("no start moment set yet, counting from now");
    }
    Ok(())
}
