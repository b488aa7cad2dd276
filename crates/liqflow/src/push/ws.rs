//! Websocket implementation of [`PushChannel`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::push::channel::{ChannelError, PushChannel, EVENT_CHANNEL_CAPACITY};
use crate::push::events::{parse_event, PushEvent};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WsChannel {
    url: String,
    events: broadcast::Sender<PushEvent>,
    connected: Arc<AtomicBool>,
    /// Cancels the reader task of the current connection.
    session: Mutex<Option<CancellationToken>>,
}

impl WsChannel {
    /// * `url` - websocket endpoint, e.g. `ws://host:4000/ws`.
    pub fn new(url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            events,
            connected: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        }
    }

    fn endpoint(&self, user_id: &str) -> Result<reqwest::Url, ChannelError> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| ChannelError::InvalidUrl(format!("{}: {e}", self.url)))?;
        url.query_pairs_mut().append_pair("userId", user_id);
        Ok(url)
    }
}

#[async_trait]
impl PushChannel for WsChannel {
    async fn connect(&self, user_id: &str) -> Result<(), ChannelError> {
        self.disconnect().await;

        let url = self.endpoint(user_id)?;
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::Connection(format!("{}: {e}", self.url)))?;

        tracing::info!(url = %self.url, user_id, "Push channel connected");

        let cancel = CancellationToken::new();
        *self.session.lock().await = Some(cancel.clone());
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(PushEvent::Connected);

        tokio::spawn(read_frames(
            ws_stream,
            self.events.clone(),
            self.connected.clone(),
            cancel,
        ));

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    async fn disconnect(&self) {
        let Some(cancel) = self.session.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!(url = %self.url, "Push channel disconnected");
            let _ = self.events.send(PushEvent::Disconnected);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Forward text frames as [`PushEvent`]s until the socket ends or the
/// session is cancelled.
async fn read_frames(
    mut ws: WsStream,
    events: broadcast::Sender<PushEvent>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close(None).await;
                return;
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => match parse_event(&text) {
                    Ok(event) => {
                        tracing::debug!(?event, "Push event received");
                        let _ = events.send(event);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring unrecognised push frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Push channel closed by server");
                    break;
                }
                // Ping/pong are answered by tungstenite; binary frames carry nothing for us.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Push channel receive error");
                    break;
                }
                None => break,
            }
        }
    }

    // Dropped by the server rather than by `disconnect`.
    if !cancel.is_cancelled() && connected.swap(false, Ordering::SeqCst) {
        let _ = events.send(PushEvent::Disconnected);
    }
}
