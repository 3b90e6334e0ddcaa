//! Per-connection handler: upgrade, event routing, and keepalive.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Upgrade to WebSocket, register the channel's outbound queue
//!   2. Loop: decode inbound frames → `Quiz::handle`; encode queued
//!      server events → text frames; ping on an interval
//!   3. On close, error, or idle timeout: disconnect from the quiz

use std::sync::Arc;

use quizline_game::Store;
use quizline_protocol::{ChannelId, ClientEvent, Codec};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::QuizlineError;
use crate::server::ServerState;
use crate::transport::{Frame, PendingConnection};

/// Drop guard that takes the channel out of the quiz when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async part.
struct ChannelGuard<S: Store, C: Codec> {
    channel: ChannelId,
    state: Arc<ServerState<S, C>>,
}

impl<S: Store, C: Codec> Drop for ChannelGuard<S, C> {
    fn drop(&mut self) {
        let channel = self.channel;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.quiz.disconnect(channel).await;
            state.quiz.hub().unregister(channel);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    pending: PendingConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), QuizlineError>
where
    S: Store,
    C: Codec,
{
    let conn = pending.upgrade().await?;
    let channel = conn.id();
    let (mut writer, mut reader) = conn.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.quiz.hub().register(channel, tx);
    let _guard = ChannelGuard {
        channel,
        state: Arc::clone(&state),
    };
    tracing::info!(%channel, "client connected");

    let idle_timeout = state.config.idle_timeout;
    let mut deadline = Instant::now() + idle_timeout;
    let mut ping = time::interval_at(
        Instant::now() + state.config.ping_interval,
        state.config.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = reader.recv() => {
                let data = match frame {
                    Ok(Some(Frame::Data(data))) => data,
                    Ok(Some(Frame::Heartbeat)) => {
                        deadline = Instant::now() + idle_timeout;
                        continue;
                    }
                    Ok(None) => {
                        tracing::info!(%channel, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%channel, error = %e, "recv error");
                        break;
                    }
                };
                deadline = Instant::now() + idle_timeout;

                let event: ClientEvent = match state.codec.decode(&data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(%channel, error = %e, "failed to decode client event");
                        continue;
                    }
                };
                state.quiz.handle(channel, event).await;
            }

            Some(event) = rx.recv() => {
                let text = match state.codec.encode_text(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(%channel, error = %e, "failed to encode server event");
                        continue;
                    }
                };
                writer.send_text(text).await?;
            }

            _ = ping.tick() => {
                writer.ping().await?;
            }

            _ = time::sleep_until(deadline) => {
                tracing::info!(%channel, "connection idle, closing");
                let _ = writer.close().await;
                break;
            }
        }
    }

    // _guard drops here → quiz disconnect fires.
    Ok(())
}
