//! Tracing subscriber setup and log file retrieval

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. When a log file is
/// configured, events are appended to it (without ANSI colors) as well as
/// written to stderr.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", logging.level, e)))?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = open_append(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Return the last `max_lines` lines of a log file, oldest first
pub fn tail_lines(path: &Path, max_lines: usize) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut window = VecDeque::with_capacity(max_lines.min(1024));

    for line in BufReader::new(file).lines() {
        let line = line?;
        if max_lines == 0 {
            continue;
        }
        if window.len() == max_lines {
            window.pop_front();
        }
        window.push_back(line);
    }

    Ok(window.into_iter().collect())
}
