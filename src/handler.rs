//! Event handlers invoked by the packet loop.
//!
//! [`EventHandler`] is the capability set the loop owns and calls, one event
//! at a time, in arrival order. A handler runs on the loop itself, so it must
//! return quickly. Anything slower or fallible is expressed as a [`Reaction`]
//! that the loop carries out after the handler returns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::protocol::GameEvent;
use crate::session::{DisconnectReason, SharedSession};

/// Chat line sent once the bot has spawned.
pub const DEFAULT_GREETING: &str = "Hello from the load-test bot!";

/// Delay between death and the respawn request.
pub const DEFAULT_RESPAWN_DELAY: Duration = Duration::from_secs(5);

/// Follow-up work requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Reaction {
    /// Nothing to do.
    #[default]
    None,
    /// Send a chat line on the connection before the next event is read.
    SendChat(String),
    /// Request a respawn after the delay, off the packet loop.
    ScheduleRespawn(Duration),
}

/// Callbacks for the five game events the bot reacts to.
///
/// Every method defaults to doing nothing.
#[async_trait]
pub trait EventHandler: Send + 'static {
    /// The player has spawned into the world for the first time.
    async fn on_game_start(&mut self) -> Reaction {
        Reaction::None
    }

    /// The server ended the session with `reason`.
    async fn on_disconnect(&mut self, _reason: &str) -> Reaction {
        Reaction::None
    }

    /// Health, food and saturation changed.
    async fn on_health_change(&mut self, _health: f32, _food: i32, _saturation: f32) -> Reaction {
        Reaction::None
    }

    /// The player died.
    async fn on_death(&mut self) -> Reaction {
        Reaction::None
    }

    /// A chat line arrived; `validated` is the server's signature check.
    async fn on_chat_message(&mut self, _text: &str, _validated: bool) -> Reaction {
        Reaction::None
    }
}

/// Route `event` to the matching [`EventHandler`] method.
pub async fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, event: GameEvent) -> Reaction {
    match event {
        GameEvent::GameStart => handler.on_game_start().await,
        GameEvent::Disconnect { reason } => handler.on_disconnect(&reason).await,
        GameEvent::HealthChange {
            health,
            food,
            saturation,
        } => handler.on_health_change(health, food, saturation).await,
        GameEvent::Death => handler.on_death().await,
        GameEvent::PlayerChat { text, validated } => {
            handler.on_chat_message(&text, validated).await
        }
    }
}

/// The bot's own handler: records state, signals waiters, greets, respawns.
#[derive(Debug)]
pub struct SessionHandler {
    session: Arc<SharedSession>,
    greeting: Option<String>,
    respawn_delay: Duration,
}

impl SessionHandler {
    /// Create a handler that records into `session`. A `None` greeting
    /// skips the chat line on game start.
    pub fn new(
        session: Arc<SharedSession>,
        greeting: Option<String>,
        respawn_delay: Duration,
    ) -> Self {
        Self {
            session,
            greeting,
            respawn_delay,
        }
    }
}

#[async_trait]
impl EventHandler for SessionHandler {
    async fn on_game_start(&mut self) -> Reaction {
        info!("bot joined the game");
        match &self.greeting {
            Some(greeting) => Reaction::SendChat(greeting.clone()),
            None => Reaction::None,
        }
    }

    async fn on_disconnect(&mut self, reason: &str) -> Reaction {
        self.session
            .mark_disconnected(DisconnectReason::Kicked(reason.to_string()))
            .await;
        info!(%reason, "disconnected by server");
        Reaction::None
    }

    async fn on_health_change(&mut self, health: f32, _food: i32, _saturation: f32) -> Reaction {
        self.session.record_health(health).await;
        Reaction::None
    }

    async fn on_death(&mut self) -> Reaction {
        info!("bot died");
        Reaction::ScheduleRespawn(self.respawn_delay)
    }

    async fn on_chat_message(&mut self, text: &str, _validated: bool) -> Reaction {
        self.session.record_chat(text.to_string()).await;
        Reaction::None
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
    use crate::notifier::SignalKind;
    use crate::session::ConnectionState;

    fn handler() -> (SessionHandler, Arc<SharedSession>) {
        let session = Arc::new(SharedSession::connecting());
        let handler = SessionHandler::new(
            Arc::clone(&session),
            Some(DEFAULT_GREETING.to_string()),
            DEFAULT_RESPAWN_DELAY,
        );
        (handler, session)
    }

    #[tokio::test]
    async fn game_start_requests_greeting() {
        let (mut handler, _session) = handler();
        let reaction = dispatch(&mut handler, GameEvent::GameStart).await;
        assert_eq!(reaction, Reaction::SendChat(DEFAULT_GREETING.to_string()));
    }

    #[tokio::test]
    async fn game_start_without_greeting_does_nothing() {
        let session = Arc::new(SharedSession::connecting());
        let mut handler = SessionHandler::new(session, None, DEFAULT_RESPAWN_DELAY);
        let reaction = dispatch(&mut handler, GameEvent::GameStart).await;
        assert_eq!(reaction, Reaction::None);
    }

    #[tokio::test]
    async fn health_change_records_health_only() {
        let (mut handler, session) = handler();
        let event = GameEvent::HealthChange {
            health: 15.5,
            food: 20,
            saturation: 5.0,
        };

        assert_eq!(dispatch(&mut handler, event).await, Reaction::None);
        assert_eq!(session.health().await, 15.5);
        assert!(
            session
                .wait_for(SignalKind::HealthChanged, Duration::ZERO)
                .await
        );
    }

    #[tokio::test]
    async fn chat_message_records_text() {
        let (mut handler, session) = handler();
        let event = GameEvent::PlayerChat {
            text: "<steve> hello".into(),
            validated: false,
        };

        dispatch(&mut handler, event).await;
        assert_eq!(session.last_message().await, "<steve> hello");
        assert!(
            session
                .wait_for(SignalKind::MessageReceived, Duration::ZERO)
                .await
        );
    }

    #[tokio::test]
    async fn death_schedules_respawn_with_configured_delay() {
        let session = Arc::new(SharedSession::connecting());
        let mut handler = SessionHandler::new(session, None, Duration::from_millis(250));
        let reaction = dispatch(&mut handler, GameEvent::Death).await;
        assert_eq!(
            reaction,
            Reaction::ScheduleRespawn(Duration::from_millis(250))
        );
    }

    #[tokio::test]
    async fn disconnect_marks_session_kicked() {
        let (mut handler, session) = handler();
        session.mark_connected().await;

        let event = GameEvent::Disconnect {
            reason: "server closed".into(),
        };
        dispatch(&mut handler, event).await;

        assert_eq!(
            session.connection_state().await,
            ConnectionState::Disconnected {
                reason: DisconnectReason::Kicked("server closed".into())
            }
        );
    }

    #[tokio::test]
    async fn default_methods_ignore_every_event() {
        struct Silent;
        #[async_trait]
        impl EventHandler for Silent {}

        let mut handler = Silent;
        for event in [
            GameEvent::GameStart,
            GameEvent::Death,
            GameEvent::Disconnect { reason: "x".into() },
            GameEvent::PlayerChat {
                text: "y".into(),
                validated: true,
            },
        ] {
            assert_eq!(dispatch(&mut handler, event).await, Reaction::None);
        }
    }
}
