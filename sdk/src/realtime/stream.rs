//! Event-stream connector: server-sent events over a long-lived HTTP GET.
//!
//! The stream is push-only. Each dispatched event's `data` field is handed
//! to the transport as one text frame; `event:`, `id:` and `retry:` fields
//! are ignored because the JSON payload already names the event.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::connection::{Connection, Connector, Frame, Outbound, ABNORMAL_CLOSURE};
use super::error::RealtimeError;

/// Opens server-sent event streams.
#[derive(Debug, Clone, Default)]
pub struct StreamConnector {
    http: reqwest::Client,
}

impl StreamConnector {
    /// Creates a stream connector with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream connector reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Connector for StreamConnector {
    async fn open(&self, url: &str) -> Result<Connection, RealtimeError> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await
            .map_err(|e| RealtimeError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RealtimeError::Connection(format!(
                "event stream rejected with status {}",
                status
            )));
        }

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
        let mut body = Box::pin(response.bytes_stream());

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            loop {
                tokio::select! {
                    chunk = body.next() => match chunk {
                        Some(Ok(bytes)) => {
                            for data in decoder.push(&bytes) {
                                if frame_tx.send(Frame::Text(data)).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            debug!("event stream read error: {}", e);
                            let _ = frame_tx.send(Frame::Closed {
                                code: ABNORMAL_CLOSURE,
                                reason: e.to_string(),
                            });
                            return;
                        }
                        None => {
                            let _ = frame_tx.send(Frame::Closed {
                                code: ABNORMAL_CLOSURE,
                                reason: "event stream ended".to_string(),
                            });
                            return;
                        }
                    },
                    outbound = out_rx.recv() => match outbound {
                        Some(Outbound::Text(_)) => {
                            warn!("event stream is push-only; dropping outbound frame");
                        }
                        Some(Outbound::Close { .. }) | None => return,
                    },
                }
            }
        });

        Ok(Connection {
            frames: frame_rx,
            outbound: out_tx,
            writable: false,
        })
    }
}

/// Longest line the decoder buffers; longer lines are dropped together with
/// the event they belong to.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Incremental server-sent event decoder.
///
/// Bytes are buffered until a full line is available so that multi-byte
/// characters split across chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    oversized: bool,
}

impl SseDecoder {
    /// Feeds a chunk and returns the data of every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.oversized {
                // Tail of a line already dropped.
                self.oversized = false;
                continue;
            }
            if line.len() > MAX_LINE_BYTES {
                self.drop_event(line.len());
                continue;
            }
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                let data = self.data.join("\n");
                self.data.clear();
                if !data.is_empty() {
                    events.push(data);
                }
                continue;
            }

            if line == "data" {
                self.data.push(String::new());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            let len = self.buffer.len();
            self.buffer.clear();
            if !self.oversized {
                self.drop_event(len);
                self.oversized = true;
            }
        }

        events
    }

    fn drop_event(&mut self, len: usize) {
        warn!(
            "event stream line of {} bytes exceeds {} bytes; dropping its event",
            len, MAX_LINE_BYTES
        );
        self.data.clear();
    }
}
