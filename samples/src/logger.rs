use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs::OpenOptions;

use crate::settings::LoggingSettings;

pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

/// Diagnostics go to stderr so sample output on stdout stays readable, and
/// additionally to the configured log file.
pub fn setup_logger(settings: &LoggingSettings) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::BrightBlue)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(parse_level(settings.level()))
        .chain(std::io::stderr());

    if let Some(path) = settings.file() {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => dispatch = dispatch.chain(file),
            Err(e) => eprintln!("Warning: Failed to open log file '{path}': {e}"),
        }
    }

    dispatch.apply()?;
    log::debug!("Logger initialized with level: {}", settings.level());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_warn() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("info"), LevelFilter::Info);
        assert_eq!(parse_level("verbose"), LevelFilter::Warn);
        assert_eq!(parse_level(""), LevelFilter::Warn);
    }
}
