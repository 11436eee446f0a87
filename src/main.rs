use anyhow::{anyhow, Result};
use market_pulse::core::logging::init_logging;
use market_pulse::{api, Config, TradingOrchestrator};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 Market Pulse signal engine starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match config.simulator.seed {
        Some(seed) => tracing::info!("Simulator seed: {}", seed),
        None => tracing::info!("Simulator seed: entropy"),
    }

    let mut orchestrator = TradingOrchestrator::new(config).await?;
    orchestrator.start().await?;
    let ctx = orchestrator.context();

    let (stop_api_tx, stop_api_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(api::serve(ctx.clone(), async move {
        let _ = stop_api_rx.await;
    }));

    let status = ctx.health.get_status().await;
    tracing::info!("Engine status: {}", status.status);

    // Ctrl-C or an API server exit, whichever comes first, ends the run.
    let stopped_early = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("🛑 Ctrl-C received"),
                Err(e) => tracing::error!("❌ Failed to listen for Ctrl-C: {}", e),
            }
            None
        }
        joined = &mut server => Some(joined),
    };

    let outcome = match stopped_early {
        None => {
            let _ = stop_api_tx.send(());
            match server.await {
                Ok(Err(e)) => tracing::error!("❌ API server failed: {}", e),
                Err(e) => tracing::error!("❌ API task panicked: {}", e),
                Ok(Ok(())) => {}
            }
            Ok(())
        }
        Some(Ok(Ok(()))) => Err(anyhow!("API server stopped unexpectedly")),
        Some(Ok(Err(e))) => Err(e.context("API server failed")),
        Some(Err(e)) => Err(anyhow!("API task panicked: {}", e)),
    };

    if let Err(e) = &outcome {
        tracing::error!("❌ {:#}", e);
    }
    orchestrator.shutdown().await;

    outcome
}
