use std::sync::Once;

/// GPU crates log every resource at `info`; keep them quiet unless asked.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "refocal_engine=debug,wgpu_core=warn"). It wins over `RUST_LOG`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Config for a `-v` count: 0 keeps the default, 1 enables debug for this
    /// project's crates, 2+ enables trace everywhere.
    pub fn from_verbosity(verbose: u8) -> Self {
        let env_filter = match verbose {
            0 => None,
            1 => Some(format!("{DEFAULT_FILTER},refocal_engine=debug,refocal=debug")),
            _ => Some("trace".to_owned()),
        };
        Self { env_filter, ..Self::default() }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored, as is a logger installed by someone else.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(config.env_filter, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized ({filter})");
        }
    });
}

/// Explicit filter, then `RUST_LOG`, then the default.
fn resolve_filter(explicit: Option<String>, env: Option<String>) -> String {
    explicit
        .or(env)
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
}
