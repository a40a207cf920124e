use anyhow::{anyhow, bail, Result};
use cadenza_recommend::config::LoggingConfig;

/// Install the global logger.
pub fn setup(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        twyg::LogLevel::Debug
    } else {
        parse_level(&config.level)?
    };

    let opts = twyg::OptsBuilder::new()
        .coloured(config.coloured)
        .level(level)
        .build()
        .map_err(|e| anyhow!("Invalid logging options: {:?}", e))?;

    twyg::setup(opts).map_err(|e| anyhow!("Failed to set up logging: {:?}", e))?;
    Ok(())
}

fn parse_level(level: &str) -> Result<twyg::LogLevel> {
    let level = match level.to_ascii_lowercase().as_str() {
        "trace" => twyg::LogLevel::Trace,
        "debug" => twyg::LogLevel::Debug,
        "info" => twyg::LogLevel::Info,
        "warn" | "warning" => twyg::LogLevel::Warn,
        "error" => twyg::LogLevel::Error,
        other => bail!(
            "Unknown log level: {}\n\nValid levels: trace, debug, info, warn, error",
            other
        ),
    };
    Ok(level)
}
