use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Install the global logger. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    LOGGER_INIT.get_or_init(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .init();
    });
}
