#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for bot integration tests.
//!
//! Provides a channel-driven [`MockConnector`] whose connections are steered
//! from the test through a [`MockServer`] handle, plus small polling helpers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use mc_loadbot::{
    Bot, BotError, ConnectionState, GameConnection, GameConnector, GameEvent, Identity,
};
use tokio::sync::mpsc;

/// Player UUID used by most tests.
pub const TEST_UUID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

/// Address used by most tests.
pub const TEST_ADDRESS: &str = "mock://localhost:25565";

// ── Recorded outbound traffic ───────────────────────────────────────

/// A request the bot sent on a mock connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Chat(String),
    Respawn,
}

// ── MockConnection ──────────────────────────────────────────────────

/// Client half of a mock game session, owned by the packet loop.
pub struct MockConnection {
    events: mpsc::UnboundedReceiver<Result<GameEvent, BotError>>,
    sent: Arc<StdMutex<Vec<Sent>>>,
    closed: Arc<AtomicBool>,
    fail_chat: Arc<AtomicBool>,
}

#[async_trait]
impl GameConnection for MockConnection {
    async fn next_event(&mut self) -> Option<Result<GameEvent, BotError>> {
        // `recv` is cancel-safe; a dropped `MockServer` reads as a clean close.
        self.events.recv().await
    }

    async fn send_chat(&mut self, text: String) -> Result<(), BotError> {
        if self.fail_chat.load(Ordering::Relaxed) {
            return Err(BotError::TransportSend("chat rejected".into()));
        }
        self.sent.lock().unwrap().push(Sent::Chat(text));
        Ok(())
    }

    async fn respawn(&mut self) -> Result<(), BotError> {
        self.sent.lock().unwrap().push(Sent::Respawn);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BotError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// Test-side handle that feeds events into a [`MockConnection`] and
/// inspects what the bot sent.
pub struct MockServer {
    events: mpsc::UnboundedSender<Result<GameEvent, BotError>>,
    sent: Arc<StdMutex<Vec<Sent>>>,
    closed: Arc<AtomicBool>,
    fail_chat: Arc<AtomicBool>,
}

impl MockServer {
    /// Deliver an event to the bot.
    pub fn emit(&self, event: GameEvent) {
        let _ = self.events.send(Ok(event));
    }

    /// Make the next receive fail with `error`.
    pub fn fail(&self, error: BotError) {
        let _ = self.events.send(Err(error));
    }

    /// Close the stream cleanly (the bot sees end-of-stream).
    pub fn close(self) {}

    /// Make every following chat send fail.
    pub fn reject_chat(&self, reject: bool) {
        self.fail_chat.store(reject, Ordering::Relaxed);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn chats(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Chat(text) => Some(text),
                Sent::Respawn => None,
            })
            .collect()
    }

    pub fn respawns(&self) -> usize {
        self.sent()
            .iter()
            .filter(|sent| **sent == Sent::Respawn)
            .count()
    }

    /// Whether the bot closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    // Convenience event builders.

    pub fn health(&self, health: f32) {
        self.emit(GameEvent::HealthChange {
            health,
            food: 20,
            saturation: 5.0,
        });
    }

    pub fn chat(&self, text: &str) {
        self.emit(GameEvent::PlayerChat {
            text: text.into(),
            validated: true,
        });
    }

    pub fn disconnect(&self, reason: &str) {
        self.emit(GameEvent::Disconnect {
            reason: reason.into(),
        });
    }
}

/// Create a connected `(connection, server)` pair.
pub fn mock_pair() -> (MockConnection, MockServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(StdMutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    let fail_chat = Arc::new(AtomicBool::new(false));

    let connection = MockConnection {
        events: rx,
        sent: Arc::clone(&sent),
        closed: Arc::clone(&closed),
        fail_chat: Arc::clone(&fail_chat),
    };
    let server = MockServer {
        events: tx,
        sent,
        closed,
        fail_chat,
    };
    (connection, server)
}

// ── MockConnector ───────────────────────────────────────────────────

/// A connector whose join outcomes are queued by the test.
///
/// Each `join` consumes the oldest queued outcome. With nothing queued the
/// join is refused.
#[derive(Clone, Default)]
pub struct MockConnector {
    outcomes: Arc<StdMutex<VecDeque<Result<MockConnection, BotError>>>>,
    joins: Arc<StdMutex<Vec<(String, Identity)>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful join and return the server half of its session.
    pub fn accept(&self) -> MockServer {
        let (connection, server) = mock_pair();
        self.outcomes.lock().unwrap().push_back(Ok(connection));
        server
    }

    /// Queue a refused join.
    pub fn reject(&self, reason: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(BotError::LoginRejected {
                reason: reason.into(),
            }));
    }

    /// Every `(address, identity)` a join was attempted with.
    pub fn joins(&self) -> Vec<(String, Identity)> {
        self.joins.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameConnector for MockConnector {
    type Connection = MockConnection;

    async fn join(&self, address: &str, identity: &Identity) -> Result<MockConnection, BotError> {
        self.joins
            .lock()
            .unwrap()
            .push((address.to_string(), identity.clone()));
        let outcome = self.outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or_else(|| {
            Err(BotError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no join outcome queued",
            )))
        })
    }
}

// ── Polling helpers ─────────────────────────────────────────────────

/// Poll `condition` every 5ms for up to one second.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}

/// Poll the bot's connection state until `predicate` holds.
pub async fn eventually_state<C, F>(bot: &Bot<C>, predicate: F) -> ConnectionState
where
    C: GameConnector,
    F: Fn(&ConnectionState) -> bool,
{
    for _ in 0..200 {
        let state = bot.connection_state().await;
        if predicate(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "connection state still {:?} after 1s",
        bot.connection_state().await
    );
}
