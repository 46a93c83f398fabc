//! Socket connector backed by tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::connection::{Connection, Connector, Frame, Outbound, ABNORMAL_CLOSURE};
use super::error::RealtimeError;

/// Opens bidirectional socket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

impl SocketConnector {
    /// Creates a socket connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for SocketConnector {
    async fn open(&self, url: &str) -> Result<Connection, RealtimeError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| RealtimeError::Connection(e.to_string()))?;

        let (mut sink, mut source) = ws_stream.split();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();

        tokio::spawn(async move {
            while let Some(result) = source.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        if frame_tx.send(Frame::Text(text.to_string())).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                        let _ = frame_tx.send(Frame::Closed { code, reason });
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("socket read error: {}", e);
                        let _ = frame_tx.send(Frame::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(outbound) = out_rx.recv().await {
                match outbound {
                    Outbound::Text(text) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!("socket send failed: {}", e);
                            break;
                        }
                    }
                    Outbound::Close { code } => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            }
        });

        Ok(Connection {
            frames: frame_rx,
            outbound: out_tx,
            writable: true,
        })
    }
}
