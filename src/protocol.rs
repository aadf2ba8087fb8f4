//! Protocol-facing types: the player identity, the typed events the packet
//! loop reacts to, and the JSON messages spoken by the WebSocket bridge.
//!
//! The real game protocol codec lives behind [`GameConnection`](crate::connection::GameConnection);
//! this module only fixes the *shape* of what it must produce. The bridge
//! messages use the same adjacently-tagged layout on both directions:
//! `{"type": "Variant", "data": {…}}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

// ── Identity ────────────────────────────────────────────────────────

/// Credentials handed unchanged to the join handshake.
///
/// `Debug` redacts the access token so identities can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// In-game player name.
    pub name: String,
    /// Player UUID.
    pub uuid: Uuid,
    /// Session access token (opaque).
    pub access_token: String,
}

impl Identity {
    /// Create an identity from already-typed parts.
    pub fn new(name: impl Into<String>, uuid: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid,
            access_token: access_token.into(),
        }
    }

    /// Build an identity from the string form the host passes around.
    ///
    /// Accepts both hyphenated and simple (32 hex digit) UUIDs.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::InvalidUuid`](crate::BotError::InvalidUuid) if
    /// `uuid` is not a valid UUID.
    ///
    /// # Example
    ///
    /// ```
    /// use mc_loadbot::protocol::Identity;
    ///
    /// let id = Identity::parse("bot_01", "069a79f444e94726a5befca90e38aaf5", "s3cr3t").unwrap();
    /// assert_eq!(id.name, "bot_01");
    /// assert!(!format!("{id:?}").contains("s3cr3t"));
    /// ```
    pub fn parse(name: &str, uuid: &str, access_token: &str) -> Result<Self> {
        Ok(Self::new(name, Uuid::parse_str(uuid)?, access_token))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("uuid", &self.uuid)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ── Game events ─────────────────────────────────────────────────────

/// A decoded protocol event, as delivered to the packet loop.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The player has spawned into the world for the first time.
    GameStart,
    /// The server ended the session.
    Disconnect { reason: String },
    /// Health, food and saturation update. Only `health` is tracked.
    HealthChange {
        health: f32,
        food: i32,
        saturation: f32,
    },
    /// The player died.
    Death,
    /// A chat line from another player.
    PlayerChat { text: String, validated: bool },
}

impl GameEvent {
    /// Short, stable name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameStart => "game_start",
            Self::Disconnect { .. } => "disconnect",
            Self::HealthChange { .. } => "health_change",
            Self::Death => "death",
            Self::PlayerChat { .. } => "player_chat",
        }
    }
}

// ── Bridge wire messages ────────────────────────────────────────────

/// Messages sent from the bot to a protocol gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Start the join handshake.
    Login {
        name: String,
        uuid: Uuid,
        access_token: String,
    },
    /// Send a chat line.
    Chat { text: String },
    /// Ask to respawn after death.
    Respawn,
}

impl From<&Identity> for ClientMessage {
    fn from(identity: &Identity) -> Self {
        Self::Login {
            name: identity.name.clone(),
            uuid: identity.uuid,
            access_token: identity.access_token.clone(),
        }
    }
}

/// Messages sent from a protocol gateway to the bot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// The join handshake succeeded.
    LoginSuccess { name: String, uuid: Uuid },
    /// The join handshake was refused.
    LoginRejected { reason: String },
    GameStart,
    Disconnect { reason: String },
    HealthChange {
        health: f32,
        #[serde(default)]
        food: i32,
        #[serde(default)]
        saturation: f32,
    },
    Death,
    PlayerChat {
        text: String,
        #[serde(default)]
        validated: bool,
    },
}

impl ServerMessage {
    /// Convert into the event the packet loop dispatches.
    ///
    /// Handshake messages carry no game event and yield `None`.
    pub fn into_event(self) -> Option<GameEvent> {
        match self {
            Self::LoginSuccess { .. } | Self::LoginRejected { .. } => None,
            Self::GameStart => Some(GameEvent::GameStart),
            Self::Disconnect { reason } => Some(GameEvent::Disconnect { reason }),
            Self::HealthChange {
                health,
                food,
                saturation,
            } => Some(GameEvent::HealthChange {
                health,
                food,
                saturation,
            }),
            Self::Death => Some(GameEvent::Death),
            Self::PlayerChat { text, validated } => Some(GameEvent::PlayerChat { text, validated }),
        }
    }
}

impl From<GameEvent> for ServerMessage {
    fn from(event: GameEvent) -> Self {
        match event {
            GameEvent::GameStart => Self::GameStart,
            GameEvent::Disconnect { reason } => Self::Disconnect { reason },
            GameEvent::HealthChange {
                health,
                food,
                saturation,
            } => Self::HealthChange {
                health,
                food,
                saturation,
            },
            GameEvent::Death => Self::Death,
            GameEvent::PlayerChat { text, validated } => Self::PlayerChat { text, validated },
        }
    }
}
