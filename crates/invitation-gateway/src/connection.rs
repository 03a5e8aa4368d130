use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use invitation_types::events::GuestbookEvent;
use invitation_types::models::GuestbookEntry;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Close frame for a subscriber that fell behind the broadcast buffer. The
/// client reconnects and starts again from a fresh snapshot.
fn lagged_close() -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::AGAIN,
        reason: "lagged".into(),
    }))
}

/// Serve one live guestbook subscriber.
///
/// `events` must have been subscribed before `snapshot` was read. The
/// subscriber gets the snapshot first, then every new entry until either side
/// hangs up. An entry can show up in both the snapshot and the stream; clients
/// de-duplicate by id. A subscriber that misses events is closed with code
/// 1013 rather than left with a gap.
pub async fn handle_subscriber(
    socket: WebSocket,
    dispatcher: Dispatcher,
    mut events: broadcast::Receiver<GuestbookEvent>,
    snapshot: Vec<GuestbookEntry>,
) {
    let _guard = dispatcher.track();
    let (mut sender, mut receiver) = socket.split();

    info!(
        "Guestbook subscriber connected ({} live)",
        dispatcher.subscriber_count()
    );

    let snapshot = GuestbookEvent::Snapshot { entries: snapshot };
    if sender
        .send(Message::Text(snapshot.to_json().into()))
        .await
        .is_err()
    {
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = events.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Guestbook subscriber lagged by {} events, closing", n);
                            let _ = sender.send(lagged_close()).await;
                            break;
                        }
                        Err(_) => break,
                    };

                    if sender.send(Message::Text(event.to_json().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping subscriber", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // The feed is one-way; only control frames matter here.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Text(text) => {
                    debug!("Ignoring subscriber text frame ({} bytes)", text.len());
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Guestbook subscriber disconnected");
}
