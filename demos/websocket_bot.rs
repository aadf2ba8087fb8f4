//! # WebSocket Bot Example
//!
//! Runs one bot against a JSON protocol gateway:
//!
//! 1. Join the server through the gateway
//! 2. Echo every chat line seen while health updates are logged
//! 3. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a gateway on localhost:25580, then:
//! cargo run --example websocket_bot
//!
//! # Override the gateway and identity:
//! MC_BRIDGE_URL=ws://gateway:25580/bridge BOT_NAME=bot_07 cargo run --example websocket_bot
//! ```

use std::time::Duration;

use mc_loadbot::{BotConfig, BotFactory, WebSocketConnector};

/// Default gateway URL when `MC_BRIDGE_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:25580/bridge";

/// Offline-mode UUID used when `BOT_UUID` is not set.
const DEFAULT_UUID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=mc_loadbot=debug` for packet-level output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = env_or("MC_BRIDGE_URL", DEFAULT_URL);
    let name = env_or("BOT_NAME", "bot_01");
    let uuid = env_or("BOT_UUID", DEFAULT_UUID);
    let token = env_or("BOT_TOKEN", "offline");

    let connector = WebSocketConnector::new().with_join_timeout(Duration::from_secs(15));
    let factory = BotFactory::new(connector, BotConfig::new());

    // ── Connect ─────────────────────────────────────────────────────
    let mut bot = factory.new_bot();
    tracing::info!("Connecting to {url} as {name}");
    bot.connect(&url, &name, &uuid, &token).await?;

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            woke = bot.wait_for_message(Duration::from_secs(1)) => {
                if woke {
                    let line = bot.last_message().await;
                    tracing::info!("Chat: {line}");
                    if let Err(e) = bot.send_message(format!("echo: {line}")).await {
                        tracing::warn!("Echo failed: {e}");
                    }
                }
                if bot.wait_for_health(Duration::ZERO).await {
                    tracing::info!("Health: {}", bot.health().await);
                }
                if !bot.is_connected().await {
                    tracing::warn!("Disconnected: {:?}", bot.connection_state().await);
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    bot.shutdown().await;
    tracing::info!("Bot shut down. Goodbye!");
    Ok(())
}
