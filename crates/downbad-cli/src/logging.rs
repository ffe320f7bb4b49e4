//! stderr logging setup.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "DOWNBAD_LOG";

/// Install the global subscriber.
///
/// `DOWNBAD_LOG` wins over `config_filter`. Each `-v` raises the floor one
/// level above `warn`. Output goes to stderr so stdout stays parseable.
pub fn init(config_filter: &str, verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(config_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let filter = match verbosity {
        0 => filter,
        1 => filter.add_directive(LevelFilter::INFO.into()),
        2 => filter.add_directive(LevelFilter::DEBUG.into()),
        _ => filter.add_directive(LevelFilter::TRACE.into()),
    };

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
