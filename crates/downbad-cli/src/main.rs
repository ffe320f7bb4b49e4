use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "downbad", version, about = "Down Bad: count the time since you quit")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current elapsed time once
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the elapsed time every tick until interrupted
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        count: Option<u64>,
        /// Print each tick as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Set the start moment (local time)
    SetStart {
        /// Date as YYYY-MM-DD
        date: String,
        /// Time of day as HH:MM (default 00:00)
        time: Option<String>,
    },
    /// Restart the count from now
    Reset,
    /// Change the habit label
    Rename {
        /// New label, e.g. "sugar"
        label: String,
    },
    /// Print the habit label
    Label,
    /// Print the home-screen widget card
    Widget {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a shareable progress message
    Share,
    /// Check for or download a newer release
    Update {
        #[command(subcommand)]
        action: commands::update::UpdateAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let (config, config_err) = match downbad_core::Config::load() {
        Ok(config) => (config, None),
        Err(e) => (downbad_core::Config::default(), Some(e)),
    };
    logging::init(&config.log.filter, cli.verbose);
    if let Some(e) = config_err {
        tracing::warn!(error = %e, "falling back to default configuration");
    }

    let result = match cli.command {
        Commands::Status { json } => commands::status::run(&config, json).await,
        Commands::Watch { count, json } => commands::watch::run(&config, count, json).await,
        Commands::SetStart { date, time } => {
            commands::start::set_start(&date, time.as_deref()).await
        }
        Commands::Reset => commands::start::reset().await,
        Commands::Rename { label } => commands::label::rename(&label).await,
        Commands::Label => commands::label::print().await,
        Commands::Widget { json } => commands::widget::run(json).await,
        Commands::Share => commands::share::run(&config).await,
        Commands::Update { action } => commands::update::run(action, &config).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
