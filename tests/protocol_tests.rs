#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the bridge protocol.
//!
//! Pins the exact JSON the bot sends and accepts, using fixtures shaped like
//! real gateway output, and checks the conversion into [`GameEvent`].

use mc_loadbot::protocol::{ClientMessage, GameEvent, Identity, ServerMessage};
use serde_json::{json, Value};

const UUID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

fn to_value<T: serde::Serialize>(val: &T) -> Value {
    serde_json::to_value(val).expect("serialize")
}

// ════════════════════════════════════════════════════════════════════
// ClientMessage encoding
// ════════════════════════════════════════════════════════════════════

#[test]
fn login_carries_the_full_identity() {
    let identity = Identity::parse("bot_01", UUID, "secret-token").unwrap();
    let msg = ClientMessage::from(&identity);

    assert_eq!(
        to_value(&msg),
        json!({
            "type": "Login",
            "data": {
                "name": "bot_01",
                "uuid": UUID,
                "access_token": "secret-token"
            }
        })
    );
}

#[test]
fn chat_encoding() {
    let msg = ClientMessage::Chat {
        text: "Hello from the load-test bot!".into(),
    };
    assert_eq!(
        to_value(&msg),
        json!({"type": "Chat", "data": {"text": "Hello from the load-test bot!"}})
    );
}

#[test]
fn respawn_has_no_data() {
    assert_eq!(to_value(&ClientMessage::Respawn), json!({"type": "Respawn"}));
}

#[test]
fn chat_preserves_unicode_and_escapes() {
    let text = "héllo \"quoted\" \n ✓";
    let json = serde_json::to_string(&ClientMessage::Chat { text: text.into() }).unwrap();
    let back: ClientMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ClientMessage::Chat { text: text.into() });
}

// ════════════════════════════════════════════════════════════════════
// ServerMessage fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn fixture_login_success() {
    let json = format!(
        r#"{{
            "type": "LoginSuccess",
            "data": {{ "name": "bot_01", "uuid": "{UUID}" }}
        }}"#
    );
    let msg: ServerMessage = serde_json::from_str(&json).expect("deserialize");
    let ServerMessage::LoginSuccess { name, uuid } = msg else {
        panic!("expected LoginSuccess");
    };
    assert_eq!(name, "bot_01");
    assert_eq!(uuid.to_string(), UUID);
}

#[test]
fn fixture_login_rejected() {
    let json = r#"{"type": "LoginRejected", "data": {"reason": "You are not whitelisted"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
    assert_eq!(
        msg,
        ServerMessage::LoginRejected {
            reason: "You are not whitelisted".into()
        }
    );
}

#[test]
fn fixture_health_change_full() {
    let json = r#"{
        "type": "HealthChange",
        "data": { "health": 15.5, "food": 18, "saturation": 2.5 }
    }"#;
    let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
    assert_eq!(
        msg.into_event(),
        Some(GameEvent::HealthChange {
            health: 15.5,
            food: 18,
            saturation: 2.5
        })
    );
}

#[test]
fn fixture_health_change_defaults_food_and_saturation() {
    let json = r#"{"type": "HealthChange", "data": {"health": 7.0}}"#;
    let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
    assert_eq!(
        msg,
        ServerMessage::HealthChange {
            health: 7.0,
            food: 0,
            saturation: 0.0
        }
    );
}

#[test]
fn fixture_player_chat_defaults_to_unvalidated() {
    let json = r#"{"type": "PlayerChat", "data": {"text": "<Steve> hi"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
    assert_eq!(
        msg.into_event(),
        Some(GameEvent::PlayerChat {
            text: "<Steve> hi".into(),
            validated: false
        })
    );
}

#[test]
fn fixture_unit_variants() {
    let start: ServerMessage = serde_json::from_str(r#"{"type": "GameStart"}"#).unwrap();
    let death: ServerMessage = serde_json::from_str(r#"{"type": "Death"}"#).unwrap();
    assert_eq!(start.into_event(), Some(GameEvent::GameStart));
    assert_eq!(death.into_event(), Some(GameEvent::Death));
}

#[test]
fn fixture_disconnect() {
    let json = r#"{"type": "Disconnect", "data": {"reason": "Server closed"}}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    assert_eq!(
        msg.into_event(),
        Some(GameEvent::Disconnect {
            reason: "Server closed".into()
        })
    );
}

#[test]
fn unknown_type_is_rejected() {
    let err = serde_json::from_str::<ServerMessage>(r#"{"type": "Weather", "data": {}}"#);
    assert!(err.is_err());
}

#[test]
fn missing_required_field_is_rejected() {
    let err = serde_json::from_str::<ServerMessage>(r#"{"type": "HealthChange", "data": {}}"#);
    assert!(err.is_err());
}

// ════════════════════════════════════════════════════════════════════
// Event conversion
// ════════════════════════════════════════════════════════════════════

#[test]
fn handshake_messages_carry_no_event() {
    let success = ServerMessage::LoginSuccess {
        name: "bot_01".into(),
        uuid: UUID.parse().unwrap(),
    };
    let rejected = ServerMessage::LoginRejected {
        reason: "banned".into(),
    };
    assert_eq!(success.into_event(), None);
    assert_eq!(rejected.into_event(), None);
}

#[test]
fn every_event_survives_the_bridge() {
    let events = vec![
        GameEvent::GameStart,
        GameEvent::Disconnect {
            reason: "kicked".into(),
        },
        GameEvent::HealthChange {
            health: 20.0,
            food: 20,
            saturation: 5.0,
        },
        GameEvent::Death,
        GameEvent::PlayerChat {
            text: "gg".into(),
            validated: true,
        },
    ];
    for event in events {
        let wire = serde_json::to_string(&ServerMessage::from(event.clone())).unwrap();
        let back: ServerMessage = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.into_event(), Some(event));
    }
}

#[test]
fn event_kinds_are_distinct() {
    let kinds = [
        GameEvent::GameStart.kind(),
        GameEvent::Death.kind(),
        GameEvent::Disconnect { reason: "".into() }.kind(),
        GameEvent::HealthChange {
            health: 0.0,
            food: 0,
            saturation: 0.0,
        }
        .kind(),
        GameEvent::PlayerChat {
            text: "".into(),
            validated: false,
        }
        .kind(),
    ];
    let unique: std::collections::HashSet<_> = kinds.iter().collect();
    assert_eq!(unique.len(), kinds.len());
}

// ════════════════════════════════════════════════════════════════════
// Identity
// ════════════════════════════════════════════════════════════════════

#[test]
fn identity_accepts_simple_and_hyphenated_uuids() {
    let hyphenated = Identity::parse("bot", UUID, "t").unwrap();
    let simple = Identity::parse("bot", &UUID.replace('-', ""), "t").unwrap();
    assert_eq!(hyphenated, simple);
}

#[test]
fn identity_rejects_garbage_uuid() {
    let err = Identity::parse("bot", "zzzz", "t").unwrap_err();
    assert!(matches!(err, mc_loadbot::BotError::InvalidUuid(_)));
}

#[test]
fn identity_debug_redacts_token() {
    let identity = Identity::parse("bot_01", UUID, "hunter2").unwrap();
    let debug = format!("{identity:?}");
    assert!(debug.contains("bot_01"));
    assert!(!debug.contains("hunter2"));
}
