//! Process-wide logger set up.

use std::sync::Once;

use env_logger::{Builder, Env};
use log::LevelFilter;

// the launcher may be driven more than once per process (tests do), but the
// logger can only be installed once
static LOGGER_INIT: Once = Once::new();

/// Installs the `env_logger` backend. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    LOGGER_INIT.call_once(|| {
        let _ = Builder::from_env(Env::default().default_filter_or(default_level))
            .filter_module("goblin", LevelFilter::Off)
            .format_timestamp_millis()
            .try_init();
    });
}
