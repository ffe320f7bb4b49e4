use downbad_core::Event;

use super::{open_store, CmdResult};

pub async fn rename(label: &str) -> CmdResult {
    let label = label.trim();
    if label.is_empty() {
        return Err("label must not be empty".into());
    }

    let store = open_store()?;
    store.set_habit_label(label).await?;
    let event = Event::HabitLabelSet {
        label: label.to_string(),
        at: store.clock().now(),
    };
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

pub async fn print() -> CmdResult {
    let store = open_store()?;
    println!("{}", store.habit_label());
    Ok(())
}
