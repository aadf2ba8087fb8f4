//! Session state shared between the bot handle and its packet loop.
//!
//! All fields live behind a single [`tokio::sync::Mutex`] scoped to one bot
//! instance. The notifier sits next to it so that handlers can store a value
//! and signal waiters while still holding the lock.

use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::notifier::{Notifier, SignalKind};

// ── Connection state ────────────────────────────────────────────────

/// Why a session stopped being connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server sent a disconnect with this reason text.
    Kicked(String),
    /// Receiving or decoding the next event failed.
    TransportError(String),
    /// The server closed the connection without a reason.
    Closed,
    /// The bot was shut down locally.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kicked(reason) => write!(f, "kicked: {reason}"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::Closed => f.write_str("connection closed"),
            Self::Shutdown => f.write_str("shut down"),
        }
    }
}

/// Lifecycle of a bot's connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    /// Join handshake in progress.
    Connecting,
    /// Joined; the packet loop is running.
    Connected,
    /// The session ended.
    Disconnected {
        /// First recorded cause.
        reason: DisconnectReason,
    },
}

impl ConnectionState {
    /// Returns `true` only in the [`Connected`](Self::Connected) state.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ── Session ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Session {
    state: ConnectionState,
    last_chat_text: String,
    last_health: f32,
}

/// Lock-protected session record plus its notifier.
#[derive(Debug, Default)]
pub struct SharedSession {
    session: Mutex<Session>,
    notifier: Notifier,
}

impl SharedSession {
    /// A session for a bot that has never connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session about to run the join handshake.
    pub fn connecting() -> Self {
        Self {
            session: Mutex::new(Session {
                state: ConnectionState::Connecting,
                ..Session::default()
            }),
            notifier: Notifier::new(),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        self.session.lock().await.state.clone()
    }

    /// Returns `true` while the session is connected.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.state.is_connected()
    }

    /// Most recent chat line, empty until the first one arrives.
    pub async fn last_message(&self) -> String {
        self.session.lock().await.last_chat_text.clone()
    }

    /// Last known health, `0.0` until the first update.
    pub async fn health(&self) -> f32 {
        self.session.lock().await.last_health
    }

    /// Wait for the next signal on `kind`; see [`Notifier::wait_for`].
    pub async fn wait_for(&self, kind: SignalKind, timeout: Duration) -> bool {
        self.notifier.wait_for(kind, timeout).await
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Store a chat line and signal [`SignalKind::MessageReceived`].
    pub async fn record_chat(&self, text: String) {
        let mut session = self.session.lock().await;
        session.last_chat_text = text;
        self.notifier.signal(SignalKind::MessageReceived);
    }

    /// Store a health value and signal [`SignalKind::HealthChanged`].
    pub async fn record_health(&self, health: f32) {
        let mut session = self.session.lock().await;
        session.last_health = health;
        self.notifier.signal(SignalKind::HealthChanged);
    }

    /// Enter the connected state.
    pub async fn mark_connected(&self) {
        self.session.lock().await.state = ConnectionState::Connected;
    }

    /// Enter the disconnected state.
    ///
    /// The first reason wins: once disconnected, later calls are ignored.
    /// Returns `true` if this call performed the transition.
    pub async fn mark_disconnected(&self, reason: DisconnectReason) -> bool {
        let mut session = self.session.lock().await;
        if let ConnectionState::Disconnected { reason: existing } = &session.state {
            debug!(%existing, ignored = %reason, "session already disconnected");
            return false;
        }
        session.state = ConnectionState::Disconnected { reason };
        true
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
    use std::sync::Arc;

    #[tokio::test]
    async fn defaults_before_any_event() {
        let session = SharedSession::new();
        assert_eq!(session.connection_state().await, ConnectionState::Idle);
        assert_eq!(session.last_message().await, "");
        assert_eq!(session.health().await, 0.0);
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn connecting_session_starts_in_connecting_state() {
        let session = SharedSession::connecting();
        assert_eq!(session.connection_state().await, ConnectionState::Connecting);
        session.mark_connected().await;
        assert!(session.is_connected().await);
    }

    #[tokio::test]
    async fn health_is_last_write_wins() {
        let session = SharedSession::new();
        session.record_health(20.0).await;
        session.record_health(7.5).await;
        assert_eq!(session.health().await, 7.5);
        assert_eq!(session.health().await, 7.5);
    }

    #[tokio::test]
    async fn record_chat_stores_text_and_signals() {
        let session = SharedSession::new();
        session.record_chat("hello".into()).await;

        assert_eq!(session.last_message().await, "hello");
        assert!(
            session
                .wait_for(SignalKind::MessageReceived, Duration::ZERO)
                .await
        );
        assert!(
            !session
                .wait_for(SignalKind::HealthChanged, Duration::ZERO)
                .await
        );
    }

    #[tokio::test]
    async fn first_disconnect_reason_wins() {
        let session = SharedSession::connecting();
        session.mark_connected().await;

        assert!(
            session
                .mark_disconnected(DisconnectReason::Kicked("bye".into()))
                .await
        );
        assert!(!session.mark_disconnected(DisconnectReason::Closed).await);

        assert_eq!(
            session.connection_state().await,
            ConnectionState::Disconnected {
                reason: DisconnectReason::Kicked("bye".into())
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_never_see_torn_chat_text() {
        let session = Arc::new(SharedSession::new());
        let old = "a".repeat(4096);
        let new = "b".repeat(4096);
        session.record_chat(old.clone()).await;

        let writer = {
            let session = Arc::clone(&session);
            let (old, new) = (old.clone(), new.clone());
            tokio::spawn(async move {
                for i in 0..200 {
                    let text = if i % 2 == 0 { new.clone() } else { old.clone() };
                    session.record_chat(text).await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let session = Arc::clone(&session);
            let (old, new) = (old.clone(), new.clone());
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let seen = session.last_message().await;
                    assert!(seen == old || seen == new, "torn read of {} bytes", seen.len());
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[test]
    fn disconnect_reason_display() {
        assert_eq!(
            DisconnectReason::Kicked("server full".into()).to_string(),
            "kicked: server full"
        );
        assert_eq!(DisconnectReason::Closed.to_string(), "connection closed");
    }
}
