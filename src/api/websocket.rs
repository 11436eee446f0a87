use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use warp::ws::{Message, WebSocket};

use crate::market::MarketFeed;
use crate::streaming::{market_snapshot, Broadcaster, Event, Subscription};

/// Bridges one websocket to the broadcaster until either side goes away.
pub async fn client_connection(ws: WebSocket, broadcaster: Broadcaster, feed: MarketFeed) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let Subscription { id, mut rx } = broadcaster.subscribe().await;

    // current market straight away instead of waiting for the next snapshot
    let initial = Event::MarketUpdate(market_snapshot(&feed.view()));
    match serde_json::to_string(&initial) {
        Ok(json) => {
            if let Err(e) = ws_tx.send(Message::text(json)).await {
                warn!("⚠️  Subscriber {} dropped before first message: {}", id, e);
                broadcaster.unsubscribe(id).await;
                return;
            }
        }
        Err(e) => warn!("⚠️  Failed to serialize initial snapshot: {}", e),
    }

    loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(payload) => {
                    if let Err(e) = ws_tx.send(Message::text(payload.to_string())).await {
                        debug!("Send to subscriber {} failed: {}", id, e);
                        break;
                    }
                }
                // evicted by the broadcaster
                None => break,
            },
            incoming = ws_rx.next() => match incoming {
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("⚠️  WebSocket error for subscriber {}: {}", id, e);
                    break;
                }
                None => break,
            },
        }
    }

    broadcaster.unsubscribe(id).await;
    info!("👋 WebSocket subscriber {} closed", id);
}
