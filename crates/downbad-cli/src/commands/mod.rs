pub mod config;
pub mod label;
pub mod share;
pub mod start;
pub mod status;
pub mod update;
pub mod watch;
pub mod widget;

use downbad_core::{Database, DurationStore, ElapsedDuration};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the store in the data directory.
pub fn open_store() -> Result<DurationStore, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(DurationStore::open(db)?)
}

/// `"3d 04h 00m 05s"`, or `"04h 00m 05s"` under a day unless
/// `show_zero_days` is set.
pub fn format_elapsed(elapsed: &ElapsedDuration, show_zero_days: bool) -> String {
    if elapsed.days == 0 && !show_zero_days {
        format!(
            "{:02}h {:02}m {:02}s",
            elapsed.hours, elapsed.minutes, elapsed.seconds
        )
    } else {
        elapsed.to_string()
    }
}
