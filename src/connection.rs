//! Collaborator seam between the bot and a game protocol implementation.
//!
//! The bot never encodes or decodes protocol bytes itself. A
//! [`GameConnector`] performs the join handshake and hands back a
//! [`GameConnection`], which the packet loop owns for the rest of the
//! session: it pulls typed [`GameEvent`]s from it and issues the two
//! outbound commands the bot needs (chat and respawn).
//!
//! # Implementing a Custom Connection
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use mc_loadbot::connection::{GameConnection, GameConnector};
//! use mc_loadbot::error::BotError;
//! use mc_loadbot::protocol::{GameEvent, Identity};
//!
//! struct MyConnector;
//! struct MyConnection { /* ... */ }
//!
//! #[async_trait]
//! impl GameConnector for MyConnector {
//!     type Connection = MyConnection;
//!
//!     async fn join(&self, address: &str, identity: &Identity) -> Result<MyConnection, BotError> {
//!         // Open the transport and run the login sequence
//!         todo!()
//!     }
//! }
//!
//! #[async_trait]
//! impl GameConnection for MyConnection {
//!     async fn next_event(&mut self) -> Option<Result<GameEvent, BotError>> {
//!         // Decode packets until one maps to a GameEvent
//!         // Return None when the server closed the connection cleanly
//!         todo!()
//!     }
//!
//!     async fn send_chat(&mut self, text: String) -> Result<(), BotError> {
//!         todo!()
//!     }
//!
//!     async fn respawn(&mut self) -> Result<(), BotError> {
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), BotError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::BotError;
use crate::protocol::{GameEvent, Identity};

/// Performs the join handshake and produces a live [`GameConnection`].
///
/// Connectors are cheap to share: one is held by every bot a
/// [`BotFactory`](crate::BotFactory) creates.
#[async_trait]
pub trait GameConnector: Send + Sync + 'static {
    /// The connection type produced by a successful join.
    type Connection: GameConnection;

    /// Connect to `address` and log in as `identity`.
    ///
    /// # Errors
    ///
    /// Any handshake failure. The bot surfaces it unchanged from
    /// [`Bot::connect`](crate::Bot::connect).
    async fn join(&self, address: &str, identity: &Identity)
        -> Result<Self::Connection, BotError>;
}

/// A joined game session, driven exclusively by the packet loop.
///
/// # Cancel Safety
///
/// [`next_event`](GameConnection::next_event) **MUST** be cancel-safe: the
/// packet loop awaits it inside `tokio::select!` alongside outbound
/// commands. Cancelling it must not lose a decoded event.
#[async_trait]
pub trait GameConnection: Send + 'static {
    /// Wait for the next decoded game event.
    ///
    /// Returns:
    /// - `Some(Ok(event))`: an event to dispatch
    /// - `Some(Err(e))`: a fatal receive or decode error, the loop stops
    /// - `None`: the server closed the connection cleanly
    async fn next_event(&mut self) -> Option<Result<GameEvent, BotError>>;

    /// Send a chat line.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection can no longer carry the message.
    async fn send_chat(&mut self, text: String) -> Result<(), BotError>;

    /// Request a respawn after death.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent.
    async fn respawn(&mut self) -> Result<(), BotError>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources.
    async fn close(&mut self) -> Result<(), BotError>;
}
