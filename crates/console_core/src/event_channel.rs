//! Push channel consumer: decodes the backend's server-sent-events stream and
//! classifies every message as a rider cue, a car status update or noise.
//!
//! The channel is opened once per session. When it ends or fails the adapter
//! logs and stops; it does not reconnect, and no notification reaches the
//! console.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use shared::protocol::{CarStatus, PushMessage, RiderCue};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::transport::BackendApi;

#[derive(Debug, Error)]
pub enum PushDecodeError {
    #[error("push payload is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("malformed rider cue: {0}")]
    MalformedCue(#[source] serde_json::Error),
    #[error("malformed car status: {0}")]
    MalformedStatus(#[source] serde_json::Error),
}

/// Classifies one event's data. A present, non-null `serviceRequest` wins
/// over `status`.
pub fn classify(data: &str) -> Result<PushMessage, PushDecodeError> {
    let value: Value = serde_json::from_str(data).map_err(PushDecodeError::NotJson)?;

    if has_non_null(&value, "serviceRequest") {
        return serde_json::from_value::<RiderCue>(value)
            .map(PushMessage::Cue)
            .map_err(PushDecodeError::MalformedCue);
    }
    if has_non_null(&value, "status") {
        return serde_json::from_value::<CarStatus>(value)
            .map(PushMessage::Status)
            .map_err(PushDecodeError::MalformedStatus);
    }
    Ok(PushMessage::Unrecognized(value))
}

fn has_non_null(value: &Value, key: &str) -> bool {
    value.get(key).is_some_and(|field| !field.is_null())
}

/// Upper bound on one event's data, and on a single unterminated line. Anything
/// larger is dropped with a warning, like any other undecodable message.
pub const MAX_EVENT_BYTES: usize = 256 * 1024;

/// Incremental `text/event-stream` framing. Chunks may split lines (and UTF-8
/// sequences) anywhere; only complete lines are interpreted.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    /// The rest of the current line is being thrown away.
    skipping_line: bool,
    /// The current event overflowed and ends without being emitted.
    dropping_event: bool,
    data_lines: Vec<String>,
    data_bytes: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the data of every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            if self.skipping_line {
                self.skipping_line = false;
            } else {
                let raw = &self.buffer[start..end];
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                let line = String::from_utf8_lossy(raw).into_owned();
                if let Some(data) = self.accept_line(&line) {
                    events.push(data);
                }
            }
            start = end + 1;
            self.scanned = start;
        }

        self.buffer.drain(..start);
        if self.skipping_line {
            self.buffer.clear();
        } else if self.buffer.len() > MAX_EVENT_BYTES {
            warn!(
                buffered = self.buffer.len(),
                "push channel line exceeds size limit; dropping event"
            );
            self.buffer.clear();
            self.skipping_line = true;
            self.drop_event();
        }
        self.scanned = self.buffer.len();

        events
    }

    fn drop_event(&mut self) {
        self.data_lines.clear();
        self.data_bytes = 0;
        self.dropping_event = true;
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if std::mem::take(&mut self.dropping_event) || self.data_lines.is_empty() {
                return None;
            }
            let data = self.data_lines.join("\n");
            self.data_lines.clear();
            self.data_bytes = 0;
            return Some(data);
        }
        if line.starts_with(':') || self.dropping_event {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_bytes += value.len();
            if self.data_bytes > MAX_EVENT_BYTES {
                warn!(
                    size = self.data_bytes,
                    "push channel event exceeds size limit; dropping event"
                );
                self.drop_event();
                return None;
            }
            self.data_lines.push(value.to_string());
        }
        // event, id and retry carry nothing this console uses.
        None
    }
}

pub struct EventChannelAdapter {
    api: Arc<dyn BackendApi>,
}

impl EventChannelAdapter {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self { api }
    }

    /// Runs the channel on its own task, forwarding each classified message.
    pub fn spawn<T>(self, sink: mpsc::UnboundedSender<T>) -> JoinHandle<()>
    where
        T: From<PushMessage> + Send + 'static,
    {
        tokio::spawn(async move { self.run(sink).await })
    }

    async fn run<T>(self, sink: mpsc::UnboundedSender<T>)
    where
        T: From<PushMessage> + Send + 'static,
    {
        let mut stream = match self.api.open_push_stream().await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "push channel could not be opened; no live updates this session");
                return;
            }
        };
        info!("push channel connected");

        let mut decoder = SseDecoder::new();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, "push channel failed; updates stopped");
                    return;
                }
            };
            for data in decoder.feed(&chunk) {
                match classify(&data) {
                    Ok(PushMessage::Unrecognized(value)) => {
                        debug!(payload = %value, "unrecognized push message ignored");
                    }
                    Ok(message) => {
                        if sink.send(T::from(message)).is_err() {
                            debug!("console session gone; closing push channel");
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, data = %data, "dropping undecodable push message");
                    }
                }
            }
        }
        warn!("push channel closed by server; updates stopped");
    }
}

#[cfg(test)]
#[path = "tests/event_channel_tests.rs"]
mod tests;
