//! In-process connector.
//!
//! [`MemoryConnector`] hands each accepted connection's far end to a
//! [`MemoryListener`] as a [`MemoryPeer`], which can push frames, close the
//! connection and inspect what the transport sent. Opens can be scripted to
//! fail. Used by tests and offline demos.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::connection::{Connection, Connector, Frame, Outbound};
use super::error::RealtimeError;
use super::messages::InboundEvent;

#[derive(Debug, Default)]
struct Script {
    failures: VecDeque<String>,
    opened_urls: Vec<String>,
}

/// Connector whose peers live in the same process.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    script: Arc<Mutex<Script>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Receives the far end of every connection the connector opens.
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// The server side of one in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    frames: mpsc::UnboundedSender<Frame>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl MemoryConnector {
    /// Creates a connector and the listener for its peers.
    #[must_use]
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                script: Arc::new(Mutex::new(Script::default())),
                peers: tx,
            },
            MemoryListener { peers: rx },
        )
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next open attempt fail with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.script().failures.push_back(reason.into());
    }

    /// Number of open attempts so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.script().opened_urls.len()
    }

    /// URLs of every open attempt so far.
    #[must_use]
    pub fn opened_urls(&self) -> Vec<String> {
        self.script().opened_urls.clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, url: &str) -> Result<Connection, RealtimeError> {
        let failure = {
            let mut script = self.script();
            script.opened_urls.push(url.to_string());
            script.failures.pop_front()
        };
        if let Some(reason) = failure {
            return Err(RealtimeError::Connection(reason));
        }

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            url: url.to_string(),
            frames: frame_tx,
            outbound: out_rx,
        };
        self.peers
            .send(peer)
            .map_err(|_| RealtimeError::Connection("listener dropped".to_string()))?;

        Ok(Connection {
            frames: frame_rx,
            outbound: out_tx,
            writable: true,
        })
    }
}

impl MemoryListener {
    /// Waits for the next accepted connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Returns an already accepted connection, if any.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

impl MemoryPeer {
    /// URL the transport connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pushes a raw text frame.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.frames.send(Frame::Text(text.into())).is_ok()
    }

    /// Pushes an encoded event.
    pub fn send_event(&self, event: &InboundEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send_text(json),
            Err(_) => false,
        }
    }

    /// Closes the connection with the given code.
    pub fn close(&self, code: u16) -> bool {
        self.frames
            .send(Frame::Closed {
                code,
                reason: String::new(),
            })
            .is_ok()
    }

    /// Waits for the next frame the transport sent.
    pub async fn next_outbound(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Drains every frame the transport has sent so far.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_open_and_exchange() {
        let (connector, mut listener) = MemoryConnector::new();
        let mut connection = connector.open("mem://rt?token=t").await.expect("open");
        let mut peer = listener.accept().await.expect("peer");

        assert_eq!(peer.url(), "mem://rt?token=t");
        assert!(peer.send_text("hello"));
        assert_eq!(
            connection.frames.recv().await,
            Some(Frame::Text("hello".to_string()))
        );

        connection
            .outbound
            .send(Outbound::Text("hi".to_string()))
            .expect("send");
        assert_eq!(
            peer.next_outbound().await,
            Some(Outbound::Text("hi".to_string()))
        );
    }

    #[tokio::test]
    async fn test_memory_scripted_failure() {
        let (connector, mut listener) = MemoryConnector::new();
        connector.fail_next("refused");

        assert!(connector.open("mem://rt").await.is_err());
        assert!(connector.open("mem://rt").await.is_ok());
        assert_eq!(connector.attempts(), 2);
        assert!(listener.try_accept().is_some());
        assert!(listener.try_accept().is_none());
    }
}
