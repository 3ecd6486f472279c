//! Colored stderr logging. stdout is reserved for JSON output.

use std::sync::atomic::{AtomicBool, Ordering};

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::Dispatch;
use log::{debug, LevelFilter};

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global logger. Later calls are no-ops.
pub fn initialize(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    Dispatch::new()
        .level(level)
        .level_for("ureq", LevelFilter::Warn)
        .level_for("rustls", LevelFilter::Warn)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} {level}] {message}",
                date = chrono::Local::now().format("%H:%M:%S%.3f"),
                level = colors.color(record.level()),
                message = message,
            ))
        })
        .chain(std::io::stderr())
        .apply()?;

    debug!("Logger initialized with level {:?}", level);
    Ok(())
}
