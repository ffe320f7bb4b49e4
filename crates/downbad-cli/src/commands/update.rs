use std::path::PathBuf;

use clap::Subcommand;
use downbad_core::{Config, UpdateChecker, UpdateStatus};

use super::CmdResult;

#[derive(Subcommand)]
pub enum UpdateAction {
    /// Compare the latest release with this build
    Check {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the latest release artifact if it is newer
    Download {
        /// Destination directory (default: current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

pub async fn run(action: UpdateAction, config: &Config) -> CmdResult {
    let checker = UpdateChecker::from_config(&config.updates, env!("CARGO_PKG_VERSION"));
    let status = checker.check_for_updates().await;

    match action {
        UpdateAction::Check { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            match status {
                UpdateStatus::UpToDate if !json => {
                    println!("downbad {} is up to date", checker.current_version());
                }
                UpdateStatus::Available { version, url } if !json => {
                    println!("downbad {version} is available: {url}");
                }
                UpdateStatus::Error { message } => return Err(message.into()),
                _ => {}
            }
        }
        UpdateAction::Download { dir } => match status {
            UpdateStatus::UpToDate => {
                println!("downbad {} is up to date", checker.current_version());
            }
            UpdateStatus::Available { version, url } => {
                let dir = match dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                let path = checker.download(&url, &dir).await?;
                println!("downloaded {version} to {}", path.display());
            }
            UpdateStatus::Error { message } => return Err(message.into()),
        },
    }
    Ok(())
}
