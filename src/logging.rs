//! File logging for programs that keep the terminal in raw mode.
//!
//! Nothing may be logged to the terminal while the editor owns it, so log records go to a
//! file. The library only emits through the `log` facade; installing a logger is left to
//! the binary.

use std::fs::File;
use std::io;
use std::path::Path;

use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use crate::config::EnvConfig;

/// Install a global logger that truncates and writes to `path`.
///
/// Fails if the file cannot be created or a global logger is already installed.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> io::Result<()> {
    let file = File::create(path)?;
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Debug)
        .build();
    WriteLogger::init(level, config, file).map_err(io::Error::other)
}

/// Install the file logger described by `RAWLINE_LOG` and `RAWLINE_DEBUG`.
///
/// Returns `Ok(false)` without installing anything when no log file is configured.
pub fn init_from_config(config: &EnvConfig) -> io::Result<bool> {
    let Some(path) = config.log_file.as_deref() else {
        return Ok(false);
    };
    init_file_logger(path, level_for(config))?;
    log::debug!("logging to {}", path.display());
    Ok(true)
}

fn level_for(config: &EnvConfig) -> LevelFilter {
    if config.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}
