//! Logging infrastructure for ragchat.
//!
//! Initializes the tracing subscriber. All logs go to stderr so stdout stays
//! clean for `--json` output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Initialize the tracing subscriber with stderr output.
///
/// The filter comes from `log_level` when given, else `RUST_LOG`, else `info`.
///
/// # Example
/// ```no_run
/// use ragchat_core::logging::init_logging;
///
/// init_logging(Some("ragchat=debug,tower_http=info"), false).expect("logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// `NO_COLOR` disables ANSI output regardless of flags.
fn supports_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}
