//! WebSocket bridge connector using `tokio-tungstenite`.
//!
//! [`WebSocketConnector`] talks to a protocol gateway that owns the real game
//! codec and relays decoded events as JSON text frames (see
//! [`ClientMessage`] and [`ServerMessage`]). Both `ws://` and `wss://` URLs
//! are supported; TLS is handled transparently via
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Join handshake
//!
//! 1. Open the WebSocket.
//! 2. Send [`ClientMessage::Login`] with the bot's identity.
//! 3. Read until [`ServerMessage::LoginSuccess`]. A `LoginRejected` or
//!    `Disconnect` fails the join with [`BotError::LoginRejected`]. Game
//!    events that arrive early are buffered and replayed by
//!    [`next_event`](GameConnection::next_event).
//!
//! The whole handshake is bounded by the connector's join timeout.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is
//! enabled (it is enabled by default).

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::connection::{GameConnection, GameConnector};
use crate::error::BotError;
use crate::protocol::{ClientMessage, GameEvent, Identity, ServerMessage};

/// Default bound on the whole join handshake.
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Type alias for the underlying WebSocket stream.
///
/// Made public so that callers can construct a [`WebSocketConnection`] from
/// an existing stream via [`WebSocketConnection::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// ── Connector ───────────────────────────────────────────────────────

/// Joins a game through a JSON-over-WebSocket protocol gateway.
///
/// The `address` passed to [`join`](GameConnector::join) is the gateway's
/// WebSocket URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    join_timeout: Duration,
}

impl WebSocketConnector {
    /// Create a connector with the default 10 second join timeout.
    pub fn new() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    /// Set the bound on the whole join handshake.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// The configured join timeout.
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameConnector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn join(
        &self,
        address: &str,
        identity: &Identity,
    ) -> Result<WebSocketConnection, BotError> {
        tokio::time::timeout(self.join_timeout, async {
            let mut connection = WebSocketConnection::connect(address).await?;
            connection.login(identity).await?;
            Ok::<_, BotError>(connection)
        })
        .await
        .map_err(|_| BotError::Timeout)?
    }
}

// ── Connection ──────────────────────────────────────────────────────

/// A [`GameConnection`] backed by a WebSocket to a protocol gateway.
///
/// # Cancel Safety
///
/// [`next_event`](GameConnection::next_event) is cancel-safe: a frame is
/// only consumed from the stream once it is complete, and buffered events
/// are popped synchronously.
#[derive(Debug)]
pub struct WebSocketConnection {
    stream: WsStream,
    closed: bool,
    /// Game events received during the join handshake.
    pending: VecDeque<GameEvent>,
}

impl WebSocketConnection {
    /// Open a WebSocket to `url` without logging in.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Io`] if the URL is invalid or the connection
    /// cannot be established. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved; all other errors are
    /// mapped to [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, BotError> {
        tracing::debug!(url = %url, "connecting to protocol gateway");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            BotError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::debug!(url = %url, "WebSocket connection established");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    ///
    /// Useful for custom TLS configuration or proxy headers.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            pending: VecDeque::new(),
        }
    }

    async fn login(&mut self, identity: &Identity) -> Result<(), BotError> {
        self.send_message(&ClientMessage::from(identity)).await?;

        loop {
            match self.recv_message().await {
                Some(Ok(ServerMessage::LoginSuccess { name, uuid })) => {
                    tracing::debug!(%name, %uuid, "login accepted");
                    return Ok(());
                }
                Some(Ok(ServerMessage::LoginRejected { reason }))
                | Some(Ok(ServerMessage::Disconnect { reason })) => {
                    return Err(BotError::LoginRejected { reason });
                }
                Some(Ok(other)) => {
                    if let Some(event) = other.into_event() {
                        tracing::debug!(
                            event = event.kind(),
                            "buffering event received before login"
                        );
                        self.pending.push_back(event);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Err(BotError::TransportClosed),
            }
        }
    }

    async fn send_message(&mut self, message: &ClientMessage) -> Result<(), BotError> {
        if self.closed {
            return Err(BotError::TransportClosed);
        }
        let json = serde_json::to_string(message)?;
        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| BotError::TransportSend(e.to_string()))
    }

    /// Read the next gateway message, skipping control and binary frames.
    async fn recv_message(&mut self) -> Option<Result<ServerMessage, BotError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(BotError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => {
                    return Some(
                        serde_json::from_str::<ServerMessage>(&text).map_err(BotError::from),
                    );
                }
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // tungstenite auto-queues the Pong reply.
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }
}

#[async_trait]
impl GameConnection for WebSocketConnection {
    async fn next_event(&mut self) -> Option<Result<GameEvent, BotError>> {
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        loop {
            match self.recv_message().await? {
                Ok(message) => match message.into_event() {
                    Some(event) => return Some(Ok(event)),
                    None => tracing::debug!("ignoring handshake message after login"),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn send_chat(&mut self, text: String) -> Result<(), BotError> {
        self.send_message(&ClientMessage::Chat { text }).await
    }

    async fn respawn(&mut self) -> Result<(), BotError> {
        self.send_message(&ClientMessage::Respawn).await
    }

    async fn close(&mut self) -> Result<(), BotError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| BotError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use uuid::Uuid;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    fn identity() -> Identity {
        Identity::new("bot_01", Uuid::from_u128(7), "secret-token")
    }

    fn text(message: &ServerMessage) -> Message {
        Message::Text(serde_json::to_string(message).unwrap().into())
    }

    /// Start a local gateway that runs `handler` on the accepted connection
    /// and returns the URL to connect to.
    async fn start_mock_gateway<F, Fut>(handler: F) -> String
    where
        F: FnOnce(ServerWs) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    /// Read the next client message from the gateway side.
    async fn read_client_message(ws: &mut ServerWs) -> ClientMessage {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    async fn accept_login(ws: &mut ServerWs) {
        let login = read_client_message(ws).await;
        assert!(matches!(login, ClientMessage::Login { .. }));
        ws.send(text(&ServerMessage::LoginSuccess {
            name: "bot_01".into(),
            uuid: Uuid::from_u128(7),
        }))
        .await
        .unwrap();
    }

    #[test]
    fn websocket_connection_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketConnection>();
    }

    #[test]
    fn connector_defaults() {
        let connector = WebSocketConnector::default();
        assert_eq!(connector.join_timeout(), Duration::from_secs(10));
        let connector = connector.with_join_timeout(Duration::from_millis(250));
        assert_eq!(connector.join_timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketConnection::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Io(_)));
    }

    #[tokio::test]
    async fn join_sends_login_with_identity() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let url = start_mock_gateway(|mut ws| async move {
            let login = read_client_message(&mut ws).await;
            seen_tx.send(login).unwrap();
            ws.send(text(&ServerMessage::LoginSuccess {
                name: "bot_01".into(),
                uuid: Uuid::from_u128(7),
            }))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let _connection = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap();

        let login = seen_rx.await.unwrap();
        assert_eq!(
            login,
            ClientMessage::Login {
                name: "bot_01".into(),
                uuid: Uuid::from_u128(7),
                access_token: "secret-token".into(),
            }
        );
    }

    #[tokio::test]
    async fn join_fails_when_login_rejected() {
        let url = start_mock_gateway(|mut ws| async move {
            let _ = read_client_message(&mut ws).await;
            ws.send(text(&ServerMessage::LoginRejected {
                reason: "whitelist".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let err = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::LoginRejected { reason } if reason == "whitelist"));
    }

    #[tokio::test]
    async fn join_times_out_when_gateway_is_silent() {
        let url =
            start_mock_gateway(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let err = WebSocketConnector::new()
            .with_join_timeout(Duration::from_millis(100))
            .join(&url, &identity())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Timeout));
    }

    #[tokio::test]
    async fn events_before_login_success_are_replayed() {
        let url = start_mock_gateway(|mut ws| async move {
            let _ = read_client_message(&mut ws).await;
            ws.send(text(&ServerMessage::GameStart)).await.unwrap();
            ws.send(text(&ServerMessage::LoginSuccess {
                name: "bot_01".into(),
                uuid: Uuid::from_u128(7),
            }))
            .await
            .unwrap();
            ws.send(text(&ServerMessage::Death)).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut connection = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap();

        assert_eq!(
            connection.next_event().await.unwrap().unwrap(),
            GameEvent::GameStart
        );
        assert_eq!(
            connection.next_event().await.unwrap().unwrap(),
            GameEvent::Death
        );
        assert!(connection.next_event().await.is_none());
    }

    #[tokio::test]
    async fn next_event_skips_binary_frames() {
        let url = start_mock_gateway(|mut ws| async move {
            accept_login(&mut ws).await;
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(text(&ServerMessage::PlayerChat {
                text: "hello".into(),
                validated: true,
            }))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut connection = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap();

        assert_eq!(
            connection.next_event().await.unwrap().unwrap(),
            GameEvent::PlayerChat {
                text: "hello".into(),
                validated: true
            }
        );
    }

    #[tokio::test]
    async fn undecodable_frame_is_a_receive_error() {
        let url = start_mock_gateway(|mut ws| async move {
            accept_login(&mut ws).await;
            ws.send(Message::Text("{not json".into())).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut connection = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap();

        let err = connection.next_event().await.unwrap().unwrap_err();
        assert!(matches!(err, BotError::Serialization(_)));
    }

    #[tokio::test]
    async fn send_chat_and_respawn_reach_the_gateway() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let url = start_mock_gateway(|mut ws| async move {
            accept_login(&mut ws).await;
            let chat = read_client_message(&mut ws).await;
            let respawn = read_client_message(&mut ws).await;
            seen_tx.send((chat, respawn)).unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut connection = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap();
        connection.send_chat("hi all".into()).await.unwrap();
        connection.respawn().await.unwrap();

        let (chat, respawn) = seen_rx.await.unwrap();
        assert_eq!(
            chat,
            ClientMessage::Chat {
                text: "hi all".into()
            }
        );
        assert_eq!(respawn, ClientMessage::Respawn);
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_mock_gateway(|mut ws| async move {
            accept_login(&mut ws).await;
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut connection = WebSocketConnector::new()
            .join(&url, &identity())
            .await
            .unwrap();
        connection.close().await.unwrap();
        // Second close is a no-op.
        connection.close().await.unwrap();

        let err = connection.send_chat("oops".into()).await.unwrap_err();
        assert!(matches!(err, BotError::TransportClosed));
    }
}
