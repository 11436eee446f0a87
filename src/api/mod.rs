pub mod routes;
pub mod websocket;

use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

use crate::trading::AppContext;

pub use routes::routes;

/// Serves the HTTP and websocket API until `shutdown` resolves.
pub async fn serve(ctx: AppContext, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("invalid server bind address")?;

    let (bound, server) = warp::serve(routes(ctx))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .context("failed to bind HTTP server")?;

    info!("🌐 API listening on http://{}", bound);
    server.await;
    Ok(())
}
