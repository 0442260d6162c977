use quickquote_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

/// Installs the global subscriber from the effective config. Logs go to
/// stderr so command output on stdout stays parseable. A config that fails
/// to load leaves logging off; the command reports the error itself.
pub fn init_from_env() {
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }
}

pub fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
