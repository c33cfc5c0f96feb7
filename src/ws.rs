//! WebSocket transport for the subscription control channel.
//!
//! Each accepted socket gets a [`Session`]; inbound text frames go to the
//! session and the connection's outbound queue is drained into the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use quotefeed_data::QuoteCache;
use quotefeed_hub::SubscriptionHub;
use quotefeed_service::Session;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Accept connections until `shutdown` fires.
pub async fn accept_loop(
    listener: TcpListener,
    hub: Arc<SubscriptionHub>,
    cache: Arc<QuoteCache>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("Listener stopped");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let hub = Arc::clone(&hub);
                    let cache = Arc::clone(&cache);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, peer, hub, cache, shutdown).await {
                            debug!(%peer, error = %e, "Connection ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Failed to accept connection"),
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<SubscriptionHub>,
    cache: Arc<QuoteCache>,
    shutdown: CancellationToken,
) -> Result<()> {
    let socket = tokio_tungstenite::accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let (mut sink, mut inbound) = socket.split();

    let (session, mut handle) = Session::open(hub, cache);
    info!(connection = %session.id(), %peer, "Subscriber connected");

    let outcome: Result<()> = loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break Ok(());
            }
            // The hub dropped this connection (queue overflow or closed)
            () = handle.cancel.cancelled() => break Ok(()),
            outbound = handle.receiver.recv() => {
                let Some(message) = outbound else { break Ok(()) };
                let text = serde_json::to_string(&message)?;
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    break Err(e.into());
                }
            }
            frame = inbound.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if session.handle_text(&text).is_err() {
                        break Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
        }
    };

    let id = session.id();
    let orphaned = session.close();
    info!(connection = %id, %peer, orphaned = orphaned.len(), "Subscriber disconnected");
    outcome
}
