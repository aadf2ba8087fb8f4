//! Connector implementations for the [`GameConnector`](crate::GameConnector)
//! seam.
//!
//! This module provides concrete connectors behind feature gates. Enable the
//! corresponding Cargo feature to pull one in:
//!
//! | Feature                | Connector              |
//! |------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketConnector`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), mc_loadbot::BotError> {
//! use mc_loadbot::{Bot, BotConfig, WebSocketConnector};
//!
//! let mut bot = Bot::new(WebSocketConnector::new(), BotConfig::new());
//! bot.connect("ws://localhost:25580/bridge", "bot_01", "069a79f444e94726a5befca90e38aaf5", "token")
//!     .await?;
//! bot.send_message("hello").await?;
//! bot.shutdown().await;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};
