use std::sync::Once;

/// Logger configuration.
///
/// `RUST_LOG` (in `env_logger` filter syntax, e.g. "glsl_probe=trace") wins
/// over `default_level` when it is set.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub default_level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: log::LevelFilter::Warn,
        }
    }
}

impl LoggingConfig {
    pub fn verbose(verbose: bool) -> Self {
        if verbose {
            Self {
                default_level: log::LevelFilter::Debug,
            }
        } else {
            Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.default_level);
        }

        builder.init();

        log::debug!("logging initialized");
    });
}
