mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, DisplayConfig, LogConfig, TickerConfig, UpdatesConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns the directory holding the database and config file.
///
/// `DOWNBAD_HOME` overrides the location outright. Otherwise the directory
/// is `~/.config/downbad[-dev]/`; set `DOWNBAD_ENV=dev` to use the
/// development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("DOWNBAD_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("DOWNBAD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("downbad-dev")
            } else {
                base_dir.join("downbad")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
