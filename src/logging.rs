//! Minimal stderr backend for the `log` facade.
//!
//! Library code only ever calls `log::warn!` / `log::debug!` etc.; the `frag`
//! binary installs this logger once at startup. Verbosity maps from the
//! repeated `-v` flag:
//!
//! - none: `warn`
//! - `-v`: `info`
//! - `-vv`: `debug`
//! - `-vvv` and above: `trace`

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger. A second call only adjusts the level.
pub fn init(verbose: u8) {
    // `set_logger` fails if a logger is already installed; keep that one.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_for_verbosity(verbose));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(1), LevelFilter::Info);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
    }
}
