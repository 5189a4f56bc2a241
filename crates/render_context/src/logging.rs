//! Logging utilities

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system with a default level
///
/// `RUST_LOG` still takes precedence over `default_level`. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init(default_level: LevelFilter) {
    let result = env_logger::Builder::from_default_env()
        .filter_level(default_level)
        .parse_default_env()
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}

/// Parse a textual level ("info", "debug", ...), falling back to `Info`
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}
