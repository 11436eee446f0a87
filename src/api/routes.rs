use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::error;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use super::websocket;
use crate::notifications::NotificationSettings;
use crate::storage::SignalQuery;
use crate::streaming::market_snapshot;
use crate::strategy::{MarketRegime, Timeframe};
use crate::trading::AppContext;

const DEFAULT_SIGNAL_LIMIT: usize = 50;
const DEFAULT_ALERT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct SignalParams {
    pub limit: Option<usize>,
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
    pub regime: Option<String>,
    pub since_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecutionParams {
    pub amount: Option<f64>,
    pub expiration_minutes: Option<u32>,
}

fn with_ctx(ctx: AppContext) -> impl Filter<Extract = (AppContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn json_error(status: StatusCode, message: impl std::fmt::Display) -> Response {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message.to_string() })),
        status,
    )
    .into_response()
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> Response {
    error!("❌ {}: {}", context, e);
    json_error(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// Every HTTP and websocket endpoint, CORS enabled.
pub fn routes(
    ctx: AppContext,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path!("api" / "health")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(health);

    let metrics = warp::path!("metrics")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(metrics);

    let market_data = warp::path!("api" / "market-data")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(market_data);

    let indicators = warp::path!("api" / "indicators" / String)
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(indicators);

    let signals = warp::path!("api" / "signals")
        .and(warp::get())
        .and(warp::query::<SignalParams>())
        .and(with_ctx(ctx.clone()))
        .and_then(signals);

    let alerts = warp::path!("api" / "alerts")
        .and(warp::get())
        .and(warp::query::<LimitParams>())
        .and(with_ctx(ctx.clone()))
        .and_then(alerts);

    let mark_read = warp::path!("api" / "alerts" / Uuid / "read")
        .and(warp::post())
        .and(with_ctx(ctx.clone()))
        .and_then(mark_alert_read);

    let get_settings = warp::path!("api" / "notifications" / "settings")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(get_settings);

    let update_settings = warp::path!("api" / "notifications" / "settings")
        .and(warp::post())
        .and(warp::body::json::<NotificationSettings>())
        .and(with_ctx(ctx.clone()))
        .and_then(update_settings);

    let stats = warp::path!("api" / "stats")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(stats);

    let format = warp::path!("api" / "execution" / "format" / Uuid)
        .and(warp::get())
        .and(warp::query::<ExecutionParams>())
        .and(with_ctx(ctx.clone()))
        .and_then(format_signal);

    let execute = warp::path!("api" / "trading" / "execute" / Uuid)
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_ctx(ctx.clone()))
        .and_then(execute_signal);

    let ws = warp::path!("api" / "ws")
        .and(warp::ws())
        .and(with_ctx(ctx))
        .map(|ws: warp::ws::Ws, ctx: AppContext| {
            ws.on_upgrade(move |socket| {
                websocket::client_connection(socket, ctx.broadcaster, ctx.feed)
            })
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    health
        .or(metrics)
        .or(market_data)
        .or(indicators)
        .or(signals)
        .or(alerts)
        .or(mark_read)
        .or(get_settings)
        .or(update_settings)
        .or(stats)
        .or(format)
        .or(execute)
        .or(ws)
        .with(cors)
}

async fn health(ctx: AppContext) -> Result<Response, Rejection> {
    let status = ctx.health.get_status().await;
    Ok(warp::reply::json(&status).into_response())
}

async fn metrics(ctx: AppContext) -> Result<Response, Rejection> {
    match ctx.metrics.render() {
        Ok(text) => Ok(warp::reply::with_header(
            text,
            "content-type",
            "text/plain; version=0.0.4",
        )
        .into_response()),
        Err(e) => Ok(internal_error("failed to render metrics", e)),
    }
}

async fn market_data(ctx: AppContext) -> Result<Response, Rejection> {
    let view = ctx.feed.view();
    Ok(warp::reply::json(&market_snapshot(&view)).into_response())
}

async fn indicators(symbol: String, ctx: AppContext) -> Result<Response, Rejection> {
    match ctx.indicators(&symbol) {
        Some(report) => Ok(warp::reply::json(&report).into_response()),
        None => Ok(json_error(
            StatusCode::NOT_FOUND,
            format!("unknown instrument {}", symbol),
        )),
    }
}

async fn signals(params: SignalParams, ctx: AppContext) -> Result<Response, Rejection> {
    let timeframe = match params.timeframe.as_deref().map(Timeframe::parse) {
        Some(None) => return Ok(json_error(StatusCode::BAD_REQUEST, "unknown timeframe")),
        other => other.flatten(),
    };
    let regime = match params.regime.as_deref().map(MarketRegime::parse) {
        Some(None) => return Ok(json_error(StatusCode::BAD_REQUEST, "unknown regime")),
        other => other.flatten(),
    };

    let since = match params.since_minutes {
        Some(minutes) => match since_cutoff(minutes) {
            Some(cutoff) => Some(cutoff),
            None => {
                return Ok(json_error(
                    StatusCode::BAD_REQUEST,
                    "since_minutes out of range",
                ))
            }
        },
        None => None,
    };

    let query = SignalQuery {
        symbol: params.symbol,
        timeframe,
        regime,
        since,
        limit: params.limit.unwrap_or(DEFAULT_SIGNAL_LIMIT),
        per_symbol: ctx.config.storage.max_signals_per_symbol,
    };

    match ctx.store.recent_signals(&query).await {
        Ok(signals) => Ok(warp::reply::json(&signals).into_response()),
        Err(e) => Ok(internal_error("failed to load signals", e)),
    }
}

fn since_cutoff(minutes: i64) -> Option<DateTime<Utc>> {
    if minutes < 0 {
        return None;
    }
    Utc::now().checked_sub_signed(Duration::try_minutes(minutes)?)
}

async fn alerts(params: LimitParams, ctx: AppContext) -> Result<Response, Rejection> {
    match ctx
        .store
        .recent_alerts(params.limit.unwrap_or(DEFAULT_ALERT_LIMIT))
        .await
    {
        Ok(alerts) => Ok(warp::reply::json(&alerts).into_response()),
        Err(e) => Ok(internal_error("failed to load alerts", e)),
    }
}

async fn mark_alert_read(id: Uuid, ctx: AppContext) -> Result<Response, Rejection> {
    match ctx.store.mark_alert_read(id).await {
        Ok(true) => Ok(warp::reply::json(&serde_json::json!({ "id": id, "is_read": true }))
            .into_response()),
        Ok(false) => Ok(json_error(StatusCode::NOT_FOUND, "alert not found")),
        Err(e) => Ok(internal_error("failed to update alert", e)),
    }
}

async fn get_settings(ctx: AppContext) -> Result<Response, Rejection> {
    let settings = ctx.notifications.settings().await;
    Ok(warp::reply::json(&settings).into_response())
}

async fn update_settings(
    settings: NotificationSettings,
    ctx: AppContext,
) -> Result<Response, Rejection> {
    ctx.notifications.update_settings(settings.clone()).await;
    Ok(warp::reply::json(&settings).into_response())
}

async fn stats(ctx: AppContext) -> Result<Response, Rejection> {
    match ctx.stats().await {
        Ok(stats) => Ok(warp::reply::json(&stats).into_response()),
        Err(e) => Ok(internal_error("failed to compute stats", e)),
    }
}

async fn format_signal(
    id: Uuid,
    params: ExecutionParams,
    ctx: AppContext,
) -> Result<Response, Rejection> {
    match ctx
        .format_signal(id, params.amount, params.expiration_minutes)
        .await
    {
        Ok(Some(order)) => Ok(warp::reply::json(&order).into_response()),
        Ok(None) => Ok(json_error(StatusCode::NOT_FOUND, "signal not found")),
        Err(e) => Ok(internal_error("failed to format signal", e)),
    }
}

async fn execute_signal(
    id: Uuid,
    body: warp::hyper::body::Bytes,
    ctx: AppContext,
) -> Result<Response, Rejection> {
    let params = if body.is_empty() {
        ExecutionParams::default()
    } else {
        match serde_json::from_slice::<ExecutionParams>(&body) {
            Ok(params) => params,
            Err(e) => return Ok(json_error(StatusCode::BAD_REQUEST, e)),
        }
    };

    match ctx
        .execute_signal(id, params.amount, params.expiration_minutes)
        .await
    {
        Ok(Some(outcome)) => Ok(warp::reply::json(&outcome).into_response()),
        Ok(None) => Ok(json_error(StatusCode::NOT_FOUND, "signal not found")),
        Err(e) => Ok(internal_error("failed to execute signal", e)),
    }
}
