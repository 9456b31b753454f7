/**
 * Real-time Subscription Handler
 *
 * Implements `GET /api/realtime?participant=user1`, the live channel as a
 * Server-Sent Events stream. `&hidden=true` joins without going online,
 * for a client whose window is not in view.
 *
 * # Wire Format
 *
 * Every event is sent with the topic as the SSE event name and the
 * JSON-encoded event as data:
 *
 * ```http
 * event: typing
 * data: {"topic":"typing","payload":{"participantId":"user2","isTyping":true}}
 * ```
 *
 * A server-initiated disconnect sends a final `close` event before the
 * stream ends. Any other end of the stream is a transport failure and
 * the client reconnects with back-off.
 *
 * # Connection Management
 *
 * - Keep-alive comments are injected by axum's `KeepAlive`
 * - Dropping the response (client went away) drops the live channel,
 *   which leaves the presence tracker
 */

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::HashMap;
use std::convert::Infallible;

use crate::backend::chat::handlers::participant_param;
use crate::backend::error::BackendError;
use crate::realtime::{ChannelItem, CloseReason, LiveChannel, SyncHub};
use crate::shared::event::CLOSE_EVENT;

/// Handle real-time subscription (GET /api/realtime)
pub async fn handle_realtime_subscription(
    State(hub): State<SyncHub>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, BackendError> {
    let participant = participant_param(&query, "participant")?;
    tracing::info!("[Realtime] Subscription request from {}", participant);

    let visible = query.get("hidden").map(String::as_str) != Some("true");
    let channel = hub.connect_as(participant, visible).await;
    let opened = stream::once(async { Ok(Event::default().comment("connected")) });
    let sse = Sse::new(opened.chain(live_events(channel))).keep_alive(KeepAlive::default());
    Ok(sse)
}

/// SSE events for a live channel, ending after a close
fn live_events(channel: LiveChannel) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some(channel), |state| async move {
        let mut channel = state?;
        loop {
            match channel.recv().await {
                Some(ChannelItem::Event(event)) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(e) => {
                            tracing::error!("[Realtime] Failed to serialize event: {:?}", e);
                            continue;
                        }
                    };
                    let sse_event = Event::default().event(event.topic().as_str()).data(data);
                    return Some((Ok(sse_event), Some(channel)));
                }
                Some(ChannelItem::Closed(CloseReason::ServerInitiated)) => {
                    tracing::info!("[Realtime] Closing live channel of {}", channel.participant());
                    let close = Event::default().event(CLOSE_EVENT).data("");
                    // Dropping the channel here releases its presence.
                    return Some((Ok(close), None));
                }
                Some(ChannelItem::Closed(CloseReason::TransportFailure)) | None => {
                    tracing::warn!("[Realtime] Live channel of {} ended", channel.participant());
                    return None;
                }
            }
        }
    })
}
