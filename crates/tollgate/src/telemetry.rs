//! Process-wide logging setup.
//!
//! Library code only emits `tracing` events. A host that wants them
//! printed calls [`init_logging`] once at startup. The filter comes from
//! `RUST_LOG` when set, otherwise [`DEFAULT_FILTER`].

use std::convert::Infallible;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard output, with ANSI colours.
    #[default]
    Console,
    /// Appended to a file (created if missing), without colours.
    File(PathBuf),
}

/// `""` and `"stdout"` mean the console; anything else is a file path.
impl FromStr for LogTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "stdout" => Self::Console,
            path => Self::File(PathBuf::from(path)),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The log file couldn't be opened for appending.
    #[error("cannot open log file {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A global subscriber was already installed.
    #[error("logging already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
/// [`TelemetryError::Open`] if the log file can't be opened, or
/// [`TelemetryError::Init`] if a subscriber is already installed.
pub fn init_logging(target: LogTarget) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match target {
        LogTarget::Console => registry.with(fmt::layer()).try_init()?,
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| TelemetryError::Open {
                    path: path.clone(),
                    source,
                })?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()?;
        }
    }
    Ok(())
}
