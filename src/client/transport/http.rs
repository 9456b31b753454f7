/**
 * HTTP Transport
 *
 * REST calls go through reqwest against the server's `/api` routes. The
 * live channel is `GET /api/realtime`, a server-sent event stream whose
 * event name is the topic and whose data is the JSON-encoded event. A
 * `close` event marks a server-initiated disconnect; a stream that ends
 * without one is a transport failure.
 */
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;

use crate::client::transport::{EventStream, Transport};
use crate::realtime::{ChannelItem, CloseReason};
use crate::shared::api::{
    AuthRequest, AuthResponse, ErrorBody, MarkReadRequest, MarkReadResponse, PublishResponse, StatusResponse,
    StatusUpdate,
};
use crate::shared::{Message, MessageId, NewMessage, Participant, ParticipantId, PresenceStatus, SyncError, SyncEvent};

pub use crate::shared::event::CLOSE_EVENT;

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in with the shared secret
    pub async fn authenticate(&self, participant: ParticipantId, password: &str) -> Result<Participant, SyncError> {
        let body = AuthRequest {
            password: password.to_string(),
            user_id: participant,
        };
        let response = self
            .client
            .post(self.url("/api/auth"))
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;
        let auth: AuthResponse = decode(response).await?;
        Ok(auth.user)
    }

    /// Stored status of a participant
    pub async fn status(&self, participant: ParticipantId) -> Result<StatusResponse, SyncError> {
        let response = self
            .client
            .get(self.url(&format!("/api/user-status?userId={}", participant)))
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }
}

fn request_failed(e: reqwest::Error) -> SyncError {
    SyncError::persistence(format!("request failed: {}", e))
}

/// Decode a JSON body, mapping error statuses back to error categories
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| SyncError::serialization(e.to_string()));
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
            SyncError::validation("request", message)
        }
        StatusCode::SERVICE_UNAVAILABLE => SyncError::connection(1, message),
        StatusCode::BAD_GATEWAY => SyncError::notification(message),
        _ => SyncError::persistence(message),
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, participant: ParticipantId, visible: bool) -> Result<Box<dyn EventStream>, SyncError> {
        let mut path = format!("/api/realtime?participant={}", participant);
        if !visible {
            path.push_str("&hidden=true");
        }
        let response = self
            .client
            .get(self.url(&path))
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| SyncError::connection(1, e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::connection(
                1,
                format!("live channel rejected with {}", response.status()),
            ));
        }

        tracing::debug!("[Session] Live channel open for {}", participant);
        Ok(Box::new(SseStream::new(response.bytes_stream().boxed())))
    }

    async fn fetch_history(&self) -> Result<Vec<Message>, SyncError> {
        let response = self
            .client
            .get(self.url("/api/messages"))
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }

    async fn send_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        let response = self
            .client
            .post(self.url("/api/messages"))
            .json(&draft)
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        let body = MarkReadRequest {
            message_ids: ids.to_vec(),
        };
        let response = self
            .client
            .post(self.url("/api/messages/read"))
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;
        let result: MarkReadResponse = decode(response).await?;
        Ok(result.messages)
    }

    async fn publish(&self, event: SyncEvent) -> Result<(), SyncError> {
        let request = match &event {
            SyncEvent::Typing(typing) => self.client.post(self.url("/api/typing")).json(typing),
            SyncEvent::ReadReceipt(receipt) => self.client.post(self.url("/api/read-receipts")).json(receipt),
            SyncEvent::Message(_) | SyncEvent::Presence(_) => {
                return Err(SyncError::validation(
                    "topic",
                    format!("'{}' events cannot be published by clients", event.topic()),
                ));
            }
        };
        let response = request.send().await.map_err(request_failed)?;
        let _: PublishResponse = decode(response).await?;
        Ok(())
    }

    async fn update_status(&self, participant: ParticipantId, status: PresenceStatus) -> Result<(), SyncError> {
        let body = StatusUpdate {
            user_id: participant,
            status,
        };
        let response = self
            .client
            .post(self.url("/api/user-status"))
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;
        let _: StatusResponse = decode(response).await?;
        Ok(())
    }
}

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    fn into_item(self) -> Option<ChannelItem> {
        if self.event.as_deref() == Some(CLOSE_EVENT) {
            return Some(ChannelItem::Closed(CloseReason::ServerInitiated));
        }
        if self.data.is_empty() {
            return None;
        }
        match serde_json::from_str::<SyncEvent>(&self.data) {
            Ok(event) => Some(ChannelItem::Event(event)),
            Err(e) => {
                tracing::warn!("[Session] Dropping undecodable event {:?}: {}", self.event, e);
                None
            }
        }
    }
}

/// Line-oriented server-sent event decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed one line without its terminator; a blank line dispatches
    pub fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            if self.event.is_none() && self.data.is_empty() {
                return None;
            }
            return Some(SseFrame {
                event: self.event.take(),
                data: std::mem::take(&mut self.data).join("\n"),
            });
        }

        // Comment, used as keep-alive.
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

struct SseStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
    decoder: SseDecoder,
    ready: VecDeque<ChannelItem>,
    ended: bool,
}

impl SseStream {
    fn new(body: BoxStream<'static, reqwest::Result<Bytes>>) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            decoder: SseDecoder::default(),
            ready: VecDeque::new(),
            ended: false,
        }
    }

    fn drain_lines(&mut self) {
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line[..end]);
            if let Some(item) = self.decoder.feed_line(&line).and_then(SseFrame::into_item) {
                self.ready.push_back(item);
            }
        }
    }
}

#[async_trait]
impl EventStream for SseStream {
    async fn next(&mut self) -> Option<ChannelItem> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.ended {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                    self.drain_lines();
                }
                Some(Err(e)) => {
                    tracing::warn!("[Session] Live channel broke: {}", e);
                    self.ended = true;
                }
                None => {
                    tracing::debug!("[Session] Live channel ended");
                    self.ended = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut SseDecoder, text: &str) -> Vec<SseFrame> {
        text.split('\n').filter_map(|line| decoder.feed_line(line)).collect()
    }

    #[test]
    fn test_decoder_dispatches_on_blank_line() {
        let mut decoder = SseDecoder::default();
        let frames = feed(&mut decoder, ": ping\n\nevent: typing\ndata: {\"a\":1}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("typing".to_string()),
                data: "{\"a\":1}".to_string(),
            }]
        );
    }

    #[test]
    fn test_decoder_joins_data_lines_and_strips_cr() {
        let mut decoder = SseDecoder::default();
        let frames = feed(&mut decoder, "data: one\r\ndata:two\r\n\r\n");
        assert_eq!(frames[0].data, "one\ntwo");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_close_frame_is_server_initiated() {
        let frame = SseFrame {
            event: Some(CLOSE_EVENT.to_string()),
            data: String::new(),
        };
        assert_eq!(frame.into_item(), Some(ChannelItem::Closed(CloseReason::ServerInitiated)));
    }

    #[test]
    fn test_event_frame_decodes() {
        let data = serde_json::to_string(&SyncEvent::typing(ParticipantId::B, true)).unwrap();
        let frame = SseFrame {
            event: Some("typing".to_string()),
            data,
        };
        assert_eq!(
            frame.into_item(),
            Some(ChannelItem::Event(SyncEvent::typing(ParticipantId::B, true)))
        );
    }

    #[tokio::test]
    async fn test_stream_reassembles_split_chunks() {
        let data = serde_json::to_string(&SyncEvent::typing(ParticipantId::A, false)).unwrap();
        let payload = format!("event: typing\ndata: {}\n\nevent: close\ndata: \n\n", data);
        let (left, right) = payload.as_bytes().split_at(10);
        let chunks: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::copy_from_slice(left)), Ok(Bytes::copy_from_slice(right))];
        let mut stream = SseStream::new(futures_util::stream::iter(chunks).boxed());

        assert_eq!(
            stream.next().await,
            Some(ChannelItem::Event(SyncEvent::typing(ParticipantId::A, false)))
        );
        assert_eq!(stream.next().await, Some(ChannelItem::Closed(CloseReason::ServerInitiated)));
        assert_eq!(stream.next().await, None);
    }
}
