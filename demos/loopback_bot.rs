//! # Loopback Bot Example
//!
//! Shows how to plug a game protocol into the bot by implementing
//! [`GameConnector`] and [`GameConnection`] over in-process channels, then
//! drives a short scripted session against it:
//!
//! 1. The fake server starts the game (the bot greets)
//! 2. Health drops and a chat line arrives (the bot's waits wake)
//! 3. The player dies (the bot respawns after the configured delay)
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_bot
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mc_loadbot::{
    Bot, BotConfig, BotError, GameConnection, GameConnector, GameEvent, Identity,
};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-backed connection
// ─────────────────────────────────────────────────────────────────────

/// What the bot asked the fake server to do.
#[derive(Debug)]
enum Outbound {
    Chat(String),
    Respawn,
}

/// Client half, owned by the bot's packet loop.
struct LoopbackConnection {
    events: mpsc::UnboundedReceiver<GameEvent>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

#[async_trait]
impl GameConnection for LoopbackConnection {
    /// `recv` is cancel-safe, which the packet loop requires.
    async fn next_event(&mut self) -> Option<Result<GameEvent, BotError>> {
        self.events.recv().await.map(Ok)
    }

    async fn send_chat(&mut self, text: String) -> Result<(), BotError> {
        self.outbound
            .send(Outbound::Chat(text))
            .map_err(|e| BotError::TransportSend(e.to_string()))
    }

    async fn respawn(&mut self) -> Result<(), BotError> {
        self.outbound
            .send(Outbound::Respawn)
            .map_err(|e| BotError::TransportSend(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BotError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A connector that hands out one prepared connection
// ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct LoopbackConnector {
    pending: Arc<Mutex<Option<LoopbackConnection>>>,
}

#[async_trait]
impl GameConnector for LoopbackConnector {
    type Connection = LoopbackConnection;

    async fn join(&self, address: &str, identity: &Identity) -> Result<LoopbackConnection, BotError> {
        tracing::info!("Server: {} joining {address}", identity.name);
        let connection = self
            .pending
            .lock()
            .map_err(|_| BotError::TransportClosed)?
            .take();
        connection.ok_or(BotError::LoginRejected {
            reason: "server full".into(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Script a session
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let connector = LoopbackConnector {
        pending: Arc::new(Mutex::new(Some(LoopbackConnection {
            events: event_rx,
            outbound: outbound_tx,
        }))),
    };

    let config = BotConfig::new().with_respawn_delay(Duration::from_millis(500));
    let mut bot = Bot::new(connector, config);
    bot.connect(
        "loopback://local",
        "demo_bot",
        "069a79f4-44e9-4726-a5be-fca90e38aaf5",
        "offline",
    )
    .await?;

    // ── Game start: expect the greeting ─────────────────────────────
    event_tx.send(GameEvent::GameStart)?;
    if let Some(Outbound::Chat(greeting)) = outbound_rx.recv().await {
        tracing::info!("Server received greeting: {greeting}");
    }

    // ── Health and chat: the waits wake ─────────────────────────────
    event_tx.send(GameEvent::HealthChange {
        health: 15.5,
        food: 20,
        saturation: 5.0,
    })?;
    if bot.wait_for_health(Duration::from_secs(1)).await {
        tracing::info!("Bot health is now {}", bot.health().await);
    }

    event_tx.send(GameEvent::PlayerChat {
        text: "<Steve> welcome!".into(),
        validated: true,
    })?;
    if bot.wait_for_message(Duration::from_secs(1)).await {
        tracing::info!("Bot saw chat: {}", bot.last_message().await);
    }
    bot.send_message("thanks!").await?;
    if let Some(reply) = outbound_rx.recv().await {
        tracing::info!("Server received: {reply:?}");
    }

    // ── Death: the respawn follows the delay ────────────────────────
    event_tx.send(GameEvent::Death)?;
    match tokio::time::timeout(Duration::from_secs(2), outbound_rx.recv()).await {
        Ok(Some(Outbound::Respawn)) => tracing::info!("Server received respawn request"),
        other => tracing::warn!("Expected a respawn, got {other:?}"),
    }

    // ── Kick ────────────────────────────────────────────────────────
    event_tx.send(GameEvent::Disconnect {
        reason: "demo over".into(),
    })?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    tracing::info!("Final state: {:?}", bot.connection_state().await);

    bot.shutdown().await;
    Ok(())
}
