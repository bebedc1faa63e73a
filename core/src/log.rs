//! Logging bootstrap. Mirrors the pattern used across the workspace's
//! binaries: a single `try_init_logger` call wires up `log4rs` so that every
//! crate can log through the plain `log` facade without knowing about the
//! concrete backend.

use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

/// Initializes the global logger at the given level filter (e.g. `"info"`,
/// `"debug"`). Safe to call more than once; only the first call takes effect.
pub fn try_init_logger(level: &str) {
    let level_filter = level.parse().unwrap_or(log::LevelFilter::Info);
    let encoder = Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}"));
    let stdout = ConsoleAppender::builder().encoder(encoder).build();
    let config = match Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level_filter))
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to build logger config: {err}");
            return;
        }
    };
    let _ = log4rs::init_config(config);
}
