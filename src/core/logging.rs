use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins over `log_level`; a second
/// call is a no-op so tests and the binary can both call it.
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "market_pulse={},warp=warn,sqlx=warn",
            log_level
        ))
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Logging initialized at level: {}", log_level);
    }
}
