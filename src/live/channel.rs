//! WebSocket notification channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::error::ChannelError;
use crate::remote::{Authenticator, ContextKey, Endpoints};

/// Text frame the service sends as a heartbeat.
pub const KEEPALIVE_MARKER: &str = "test message";

/// What an inbound frame means to the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Traffic that only resets the idle timer.
    Keepalive,
    /// Configuration changed; refetch.
    Changed,
    /// Server ended the session.
    Closed,
}

/// Classifies one inbound frame.
pub fn classify(message: &Message) -> FrameKind {
    match message {
        Message::Text(text) if text.as_str().trim() == KEEPALIVE_MARKER => FrameKind::Keepalive,
        Message::Text(_) | Message::Binary(_) => FrameKind::Changed,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => FrameKind::Keepalive,
        Message::Close(_) => FrameKind::Closed,
    }
}

/// Opens bearer-authenticated connections to the notification endpoint.
#[derive(Debug, Clone)]
pub struct LiveUpdateChannel {
    endpoints: Endpoints,
    authenticator: Arc<dyn Authenticator>,
    key: ContextKey,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl LiveUpdateChannel {
    pub fn new(
        endpoints: Endpoints,
        authenticator: Arc<dyn Authenticator>,
        key: ContextKey,
        connect_timeout: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            endpoints,
            authenticator,
            key,
            connect_timeout,
            idle_timeout,
        }
    }

    /// Opens one connection. A fresh token is requested on every call.
    pub async fn connect(&self) -> Result<LiveConnection, ChannelError> {
        let token = self.authenticator.token().await?;
        let url = self.endpoints.websocket_url(&self.key);

        let mut request = url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ChannelError::Request(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| ChannelError::ConnectTimeout(self.connect_timeout))??;

        let connection_id = Uuid::new_v4();
        tracing::info!(%connection_id, host = ?url.host_str(), "Live update channel connected");

        Ok(LiveConnection {
            stream,
            idle_timeout: self.idle_timeout,
            connection_id,
        })
    }
}

/// One open channel session.
pub struct LiveConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    idle_timeout: Duration,
    connection_id: Uuid,
}

impl LiveConnection {
    pub fn id(&self) -> Uuid {
        self.connection_id
    }

    /// Waits for the next change signal.
    ///
    /// Keepalive traffic is consumed silently. Returns an error on close, end of
    /// stream, protocol failure, or when nothing arrives within the idle timeout.
    pub async fn next_change(&mut self) -> Result<(), ChannelError> {
        loop {
            let frame = tokio::time::timeout(self.idle_timeout, self.stream.next())
                .await
                .map_err(|_| ChannelError::IdleTimeout(self.idle_timeout))?;

            let message = match frame {
                None => return Err(ChannelError::Closed),
                Some(result) => result?,
            };

            match classify(&message) {
                FrameKind::Keepalive => {
                    tracing::trace!(connection_id = %self.connection_id, "Keepalive");
                }
                FrameKind::Changed => {
                    tracing::debug!(connection_id = %self.connection_id, "Change signal received");
                    return Ok(());
                }
                FrameKind::Closed => return Err(ChannelError::Closed),
            }
        }
    }

    /// Sends a close frame, ignoring failures.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(connection_id = %self.connection_id, error = %e, "Close handshake failed");
        }
    }
}

impl std::fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConnection")
            .field("connection_id", &self.connection_id)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
