use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "prism_trace=debug,wgpu_core=warn"). When unset, `RUST_LOG` is consulted and
/// then `default_filter`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_filter: String,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            // wgpu is chatty at info; keep it to warnings unless asked.
            default_filter: "info,wgpu_core=warn,wgpu_hal=warn,naga=warn".to_string(),
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        let filter = config
            .env_filter
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or(config.default_filter);
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            // Another logger was installed by the host (e.g. a test harness).
            return;
        }

        log::debug!("logging initialized with filter {filter:?}");
    });
}
