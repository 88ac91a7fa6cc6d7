use crate::{LogLevel, OutputFormat};
use anyhow::Result;
use cartjo_core::telemetry::{InstrumentationConfig, LogFormat, init_tracing};

/// Initialize logging for the CLI
///
/// `RUST_LOG` still wins over `--log-level` when set.
pub fn init_logging(level: LogLevel, format: OutputFormat) -> Result<()> {
    let level = level.as_str();
    let mut config = InstrumentationConfig::from_env()
        .with_log_level(format!("cartjo={level},cartjo_core={level},cartjo_http={level}"));
    config.format = match format {
        OutputFormat::Pretty => LogFormat::Pretty,
        OutputFormat::Json => LogFormat::Json,
    };
    init_tracing(&config)
}
