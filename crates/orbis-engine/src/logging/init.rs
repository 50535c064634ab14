use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` names one. The wgpu
/// stack is noisy at `info`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// `env_filter` uses `env_logger` syntax, e.g. `"orbis_engine=debug,wgpu=warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { env_filter: None, write_style: env_logger::WriteStyle::Auto }
    }
}

impl LoggingConfig {
    /// Filter in effect: explicit config, then `RUST_LOG`, then [`DEFAULT_FILTER`].
    pub fn resolve_filter(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.env_filter
            .clone()
            .or_else(|| env("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(|key| std::env::var(key).ok());
        env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .format_timestamp_millis()
            .init();
        log::debug!("logging initialized with filter '{filter}'");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let config = LoggingConfig { env_filter: Some("debug".into()), ..LoggingConfig::default() };
        assert_eq!(config.resolve_filter(|_| Some("trace".into())), "debug");
        assert_eq!(LoggingConfig::default().resolve_filter(|_| Some("trace".into())), "trace");
        assert_eq!(LoggingConfig::default().resolve_filter(|_| None), DEFAULT_FILTER);
    }
}
