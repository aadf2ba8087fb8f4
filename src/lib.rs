//! # mc-loadbot
//!
//! Scripted block-game client bot for load-test orchestrators.
//!
//! A [`Bot`] joins a server through a pluggable [`GameConnector`], then runs
//! a background packet loop that turns inbound game events into session
//! state: connection status, last health value, last chat line. The caller
//! reads that state with cheap snapshot getters or blocks on it with bounded
//! waits ([`Bot::wait_for_health`], [`Bot::wait_for_message`]).
//!
//! ## Features
//!
//! - **Protocol-agnostic**: implement [`GameConnector`] / [`GameConnection`]
//!   for any game protocol library
//! - **WebSocket bridge built-in**: default `transport-websocket` feature
//!   provides `WebSocketConnector` for a JSON protocol gateway
//! - **Coalescing waits**: each wait reports whether at least one event
//!   arrived since the previous successful wait
//! - **One bot per virtual user**: [`BotFactory`] mints fully independent
//!   bots
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mc_loadbot::{BotConfig, BotFactory, WebSocketConnector};
//!
//! let factory = BotFactory::new(WebSocketConnector::new(), BotConfig::new());
//! let mut bot = factory.new_bot();
//! bot.connect("ws://localhost:25580/bridge", "bot_01", uuid, token).await?;
//!
//! if bot.wait_for_message(Duration::from_secs(1)).await {
//!     println!("chat: {}", bot.last_message().await);
//! }
//! ```

pub mod bot;
pub mod connection;
pub mod error;
pub mod handler;
pub mod notifier;
mod packet_loop;
pub mod protocol;
pub mod session;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use bot::{Bot, BotConfig, BotFactory};
pub use connection::{GameConnection, GameConnector};
pub use error::BotError;
pub use handler::{EventHandler, Reaction};
pub use protocol::{GameEvent, Identity};
pub use session::{ConnectionState, DisconnectReason};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnection, WebSocketConnector};
