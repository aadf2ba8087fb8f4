//! The bot facade consumed by a load-test orchestrator.
//!
//! A [`Bot`] joins a server through a [`GameConnector`], spawns a background
//! packet loop, and exposes snapshot reads plus bounded waits on the session
//! state that loop maintains. A [`BotFactory`] mints one independent bot per
//! virtual user; bots share nothing but the connector.
//!
//! # Example
//!
//! ```rust,ignore
//! let factory = BotFactory::new(WebSocketConnector::new(), BotConfig::new());
//! let mut bot = factory.new_bot();
//!
//! bot.connect("ws://localhost:25580/bridge", "bot_01", uuid, token).await?;
//! if bot.wait_for_health(Duration::from_secs(5)).await {
//!     println!("health: {}", bot.health().await);
//! }
//! bot.send_message("hi").await?;
//! bot.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::connection::GameConnector;
use crate::error::{BotError, Result};
use crate::handler::{SessionHandler, DEFAULT_GREETING, DEFAULT_RESPAWN_DELAY};
use crate::notifier::SignalKind;
use crate::packet_loop::{packet_loop, Command};
use crate::protocol::Identity;
use crate::session::{ConnectionState, DisconnectReason, SharedSession};

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Behavior knobs for a [`Bot`].
///
/// # Example
///
/// ```
/// use mc_loadbot::BotConfig;
/// use std::time::Duration;
///
/// let config = BotConfig::new()
///     .with_greeting("hi from vu 7")
///     .with_respawn_delay(Duration::from_secs(2));
/// assert_eq!(config.greeting.as_deref(), Some("hi from vu 7"));
/// assert_eq!(config.respawn_delay, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Chat line sent when the game starts. `None` disables the greeting.
    pub greeting: Option<String>,
    /// Delay between death and the respawn request.
    ///
    /// Defaults to **5 seconds**.
    pub respawn_delay: Duration,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`Bot::shutdown`] is called the packet loop is given this much
    /// time to close the connection. If the timeout expires the task is
    /// aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl BotConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.to_string()),
            respawn_delay: DEFAULT_RESPAWN_DELAY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the chat line sent on game start.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Do not send a chat line on game start.
    #[must_use]
    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    /// Set the delay between death and the respawn request.
    #[must_use]
    pub fn with_respawn_delay(mut self, delay: Duration) -> Self {
        self.respawn_delay = delay;
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Factory ─────────────────────────────────────────────────────────

/// Creates independent bots, one per virtual user.
///
/// Holds no mutable state: every bot gets its own session, lock, and loop.
#[derive(Debug, Clone)]
pub struct BotFactory<C> {
    connector: C,
    config: BotConfig,
}

impl<C: GameConnector + Clone> BotFactory<C> {
    /// Create a factory handing `connector` and `config` to every bot.
    pub fn new(connector: C, config: BotConfig) -> Self {
        Self { connector, config }
    }

    /// Create a fresh, unconnected bot.
    pub fn new_bot(&self) -> Bot<C> {
        Bot::new(self.connector.clone(), self.config.clone())
    }
}

// ── Bot handle ──────────────────────────────────────────────────────

/// Channel ends and task handle tying a bot to its running packet loop.
struct LoopLink {
    cmd_tx: mpsc::UnboundedSender<Command>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

/// A scripted game client with wait-for-event primitives.
pub struct Bot<C> {
    connector: C,
    config: BotConfig,
    /// Replaced wholesale by every successful `connect`.
    session: Arc<SharedSession>,
    link: Option<LoopLink>,
}

impl<C: GameConnector> Bot<C> {
    /// Create an unconnected bot.
    pub fn new(connector: C, config: BotConfig) -> Self {
        Self {
            connector,
            config,
            session: Arc::new(SharedSession::new()),
            link: None,
        }
    }

    /// Join `address` as the player described by `name`, `uuid` and `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::InvalidUuid`] if `uuid` does not parse, or the
    /// connector's error if the join fails. In both cases the bot keeps
    /// whatever state it had before the call.
    pub async fn connect(
        &mut self,
        address: &str,
        name: &str,
        uuid: &str,
        token: &str,
    ) -> Result<()> {
        let identity = Identity::parse(name, uuid, token)?;
        self.connect_as(address, identity).await
    }

    /// Join `address` with an already-built [`Identity`].
    ///
    /// On success any previous connection is shut down and replaced; the
    /// session (state, last message, health, pending signals) starts fresh.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the join fails.
    pub async fn connect_as(&mut self, address: &str, identity: Identity) -> Result<()> {
        debug!(%address, player = %identity.name, "joining server");
        let session = Arc::new(SharedSession::connecting());

        let connection = self.connector.join(address, &identity).await?;
        session.mark_connected().await;
        info!(%address, player = %identity.name, "joined server");

        if self.link.is_some() {
            self.shutdown().await;
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handler = SessionHandler::new(
            Arc::clone(&session),
            self.config.greeting.clone(),
            self.config.respawn_delay,
        );

        let task = tokio::spawn(packet_loop(
            connection,
            handler,
            cmd_rx,
            cmd_tx.downgrade(),
            Arc::clone(&session),
            shutdown_rx,
        ));

        self.session = session;
        self.link = Some(LoopLink {
            cmd_tx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        });
        Ok(())
    }

    /// Send a chat line through the connection.
    ///
    /// Not gated on the connection state: once connected, the collaborator
    /// alone decides whether the send succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::NotConnected`] if the bot never connected or its
    /// packet loop has exited, otherwise the collaborator's send error.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<()> {
        let link = self.link.as_ref().ok_or(BotError::NotConnected)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        link.cmd_tx
            .send(Command::SendChat {
                text: text.into(),
                reply: reply_tx,
            })
            .map_err(|_| BotError::NotConnected)?;
        reply_rx.await.map_err(|_| BotError::NotConnected)?
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Most recent chat line received, empty before the first one.
    pub async fn last_message(&self) -> String {
        self.session.last_message().await
    }

    /// Last known health, `0.0` before the first update.
    pub async fn health(&self) -> f32 {
        self.session.health().await
    }

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        self.session.connection_state().await
    }

    /// Returns `true` while the session is connected.
    pub async fn is_connected(&self) -> bool {
        self.session.is_connected().await
    }

    // ── Waits ───────────────────────────────────────────────────────

    /// Wait up to `timeout` for a health update.
    ///
    /// Returns `true` if at least one update arrived since the last
    /// successful wait, consuming that signal.
    pub async fn wait_for_health(&self, timeout: Duration) -> bool {
        self.session.wait_for(SignalKind::HealthChanged, timeout).await
    }

    /// Wait up to `timeout` for a chat line.
    ///
    /// Returns `true` if at least one line arrived since the last
    /// successful wait, consuming that signal.
    pub async fn wait_for_message(&self, timeout: Duration) -> bool {
        self.session.wait_for(SignalKind::MessageReceived, timeout).await
    }

    /// Shut down the packet loop, closing the connection.
    ///
    /// Waits up to the configured shutdown timeout, then aborts the task.
    /// Calling this on an unconnected bot is a no-op.
    pub async fn shutdown(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        debug!("bot: shutdown requested");

        if let Some(tx) = link.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = link.task.take() {
            match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("packet loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("packet loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("packet loop aborted: {join_err}");
                    }
                }
            }
        }

        self.session
            .mark_disconnected(DisconnectReason::Shutdown)
            .await;
    }
}

impl<C> std::fmt::Debug for Bot<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("config", &self.config)
            .field("has_loop", &self.link.is_some())
            .finish()
    }
}

impl<C> Drop for Bot<C> {
    fn drop(&mut self) {
        // No executor is available to await a graceful close here, so the
        // packet loop is aborted outright.
        if let Some(task) = self.link.as_mut().and_then(|link| link.task.take()) {
            task.abort();
        }
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

    #[test]
    fn config_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.greeting.as_deref(), Some(DEFAULT_GREETING));
        assert_eq!(config.respawn_delay, Duration::from_secs(5));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_builder_overrides() {
        let config = BotConfig::new()
            .without_greeting()
            .with_respawn_delay(Duration::from_millis(10))
            .with_shutdown_timeout(Duration::from_millis(20));
        assert!(config.greeting.is_none());
        assert_eq!(config.respawn_delay, Duration::from_millis(10));
        assert_eq!(config.shutdown_timeout, Duration::from_millis(20));

        let config = config.with_greeting("again");
        assert_eq!(config.greeting.as_deref(), Some("again"));
    }
}
