//! Background packet loop: one task per connection.
//!
//! The loop owns the [`GameConnection`] and the [`EventHandler`]. Each
//! iteration waits on three sources via `tokio::select!`:
//!
//! 1. a shutdown signal from [`Bot::shutdown`](crate::Bot::shutdown),
//! 2. a command queued by the bot handle or the respawn timer,
//! 3. the next inbound [`GameEvent`](crate::protocol::GameEvent).
//!
//! Inbound events are dispatched strictly one after another. A dispatch step
//! that fails (for example the greeting send) is logged and the loop keeps
//! going; only a receive error or the end of the stream stops it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::connection::GameConnection;
use crate::error::Result;
use crate::handler::{dispatch, EventHandler, Reaction};
use crate::session::{DisconnectReason, SharedSession};

/// Requests delivered to the packet loop.
#[derive(Debug)]
pub(crate) enum Command {
    /// Send a chat line and report the collaborator's result.
    SendChat {
        text: String,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Fire-and-forget respawn request.
    Respawn,
}

/// Drive `connection` until it fails, closes, or shutdown is requested.
///
/// `respawn_tx` is a weak handle on the loop's own command channel; the
/// respawn timer upgrades it only when its delay has elapsed, so a pending
/// timer never keeps the channel open on its own.
pub(crate) async fn packet_loop<C, H>(
    mut connection: C,
    mut handler: H,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    respawn_tx: mpsc::WeakUnboundedSender<Command>,
    session: Arc<SharedSession>,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    C: GameConnection,
    H: EventHandler,
{
    debug!("packet loop started");

    loop {
        tokio::select! {
            // Branch 1: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = connection.close().await;
                session.mark_disconnected(DisconnectReason::Shutdown).await;
                break;
            }

            // Branch 2: command from the bot handle or respawn timer
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::SendChat { text, reply }) => {
                        let result = connection.send_chat(text).await;
                        if let Err(e) = &result {
                            debug!("chat send failed: {e}");
                        }
                        // The caller may have given up waiting.
                        let _ = reply.send(result);
                    }
                    // The state only changes on this task, so the check holds
                    // until the request is written.
                    Some(Command::Respawn) => {
                        if !session.is_connected().await {
                            debug!("skipping respawn: session no longer connected");
                        } else if let Err(e) = connection.respawn().await {
                            debug!("respawn request failed: {e}");
                        }
                    }
                    // Command channel closed: the bot handle is gone.
                    None => {
                        debug!("command channel closed, shutting down packet loop");
                        let _ = connection.close().await;
                        session.mark_disconnected(DisconnectReason::Shutdown).await;
                        break;
                    }
                }
            }

            // Branch 3: next inbound event
            incoming = connection.next_event() => {
                match incoming {
                    Some(Ok(event)) => {
                        let kind = event.kind();
                        debug!(event = kind, "dispatching event");
                        let reaction = dispatch(&mut handler, event).await;
                        if let Err(e) = apply_reaction(
                            &mut connection,
                            reaction,
                            &respawn_tx,
                        ).await {
                            warn!(event = kind, "dispatch step failed: {e}");
                        }
                    }
                    Some(Err(e)) => {
                        error!("packet processing error: {e}");
                        session
                            .mark_disconnected(DisconnectReason::TransportError(e.to_string()))
                            .await;
                        break;
                    }
                    // Connection closed cleanly.
                    None => {
                        debug!("connection closed by server");
                        session.mark_disconnected(DisconnectReason::Closed).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("packet loop exited");
}

/// Carry out the follow-up work a handler asked for.
async fn apply_reaction<C: GameConnection>(
    connection: &mut C,
    reaction: Reaction,
    respawn_tx: &mpsc::WeakUnboundedSender<Command>,
) -> Result<()> {
    match reaction {
        Reaction::None => Ok(()),
        Reaction::SendChat(text) => connection.send_chat(text).await,
        Reaction::ScheduleRespawn(delay) => {
            schedule_respawn(delay, respawn_tx.clone());
            Ok(())
        }
    }
}

/// Spawn a detached timer that asks the loop to respawn after `delay`.
///
/// There is no handle and no error channel. The loop drops the request if
/// the session is no longer connected when it arrives.
fn schedule_respawn(delay: Duration, respawn_tx: mpsc::WeakUnboundedSender<Command>) {
    debug!(?delay, "respawn scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match respawn_tx.upgrade() {
            Some(tx) => {
                if tx.send(Command::Respawn).is_err() {
                    debug!("skipping respawn: packet loop exited");
                }
            }
            None => debug!("skipping respawn: packet loop exited"),
        }
    });
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
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::handler::SessionHandler;
    use crate::protocol::GameEvent;
    use crate::session::ConnectionState;

    /// A connection fed by a channel that records what the loop wrote.
    struct ScriptedConnection {
        events: mpsc::UnboundedReceiver<GameEvent>,
        written: Arc<StdMutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl GameConnection for ScriptedConnection {
        async fn next_event(&mut self) -> Option<Result<GameEvent>> {
            self.events.recv().await.map(Ok)
        }

        async fn send_chat(&mut self, _text: String) -> Result<()> {
            self.written.lock().unwrap().push("chat");
            Ok(())
        }

        async fn respawn(&mut self) -> Result<()> {
            self.written.lock().unwrap().push("respawn");
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        events: mpsc::UnboundedSender<GameEvent>,
        cmd_tx: mpsc::UnboundedSender<Command>,
        session: Arc<SharedSession>,
        written: Arc<StdMutex<Vec<&'static str>>>,
        _shutdown_tx: oneshot::Sender<()>,
    }

    async fn start() -> Harness {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let written = Arc::new(StdMutex::new(Vec::new()));
        let session = Arc::new(SharedSession::connecting());
        session.mark_connected().await;

        let connection = ScriptedConnection {
            events: events_rx,
            written: Arc::clone(&written),
        };
        let handler = SessionHandler::new(Arc::clone(&session), None, Duration::from_secs(5));
        tokio::spawn(packet_loop(
            connection,
            handler,
            cmd_rx,
            cmd_tx.downgrade(),
            Arc::clone(&session),
            shutdown_rx,
        ));

        Harness {
            events: events_tx,
            cmd_tx,
            session,
            written,
            _shutdown_tx: shutdown_tx,
        }
    }

    /// Round-trip a chat command so every earlier command has been handled.
    async fn sync(harness: &Harness) {
        let (reply, done) = oneshot::channel();
        harness
            .cmd_tx
            .send(Command::SendChat {
                text: "sync".into(),
                reply,
            })
            .unwrap();
        done.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn respawn_command_is_sent_while_connected() {
        let harness = start().await;

        harness.cmd_tx.send(Command::Respawn).unwrap();
        sync(&harness).await;

        assert_eq!(*harness.written.lock().unwrap(), vec!["respawn", "chat"]);
    }

    #[tokio::test]
    async fn respawn_queued_after_kick_is_dropped() {
        let harness = start().await;

        harness
            .events
            .send(GameEvent::Disconnect {
                reason: "kicked".into(),
            })
            .unwrap();
        for _ in 0..200 {
            if !harness.session.is_connected().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            harness.session.connection_state().await,
            ConnectionState::Disconnected {
                reason: DisconnectReason::Kicked("kicked".into())
            }
        );

        // The timer already fired and queued its request.
        harness.cmd_tx.send(Command::Respawn).unwrap();
        sync(&harness).await;

        assert_eq!(*harness.written.lock().unwrap(), vec!["chat"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_request_reaches_the_loop_after_the_delay() {
        let harness = start().await;

        schedule_respawn(Duration::from_millis(300), harness.cmd_tx.downgrade());
        tokio::time::sleep(Duration::from_millis(250)).await;
        sync(&harness).await;
        assert_eq!(*harness.written.lock().unwrap(), vec!["chat"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        sync(&harness).await;
        assert_eq!(
            *harness.written.lock().unwrap(),
            vec!["chat", "respawn", "chat"]
        );
    }

    #[tokio::test]
    async fn timer_is_silent_once_the_loop_is_gone() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
        let weak = cmd_tx.downgrade();
        drop(cmd_tx);

        schedule_respawn(Duration::ZERO, weak);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cmd_rx.try_recv().is_err());
    }
}
