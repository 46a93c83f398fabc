//! Realtime message types.
//!
//! Defines the inbound event frame and the in-band control message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::RealtimeError;
use crate::types::ChannelName;

/// A decoded push event.
///
/// Wire shape: `{ "event": <name>, "channel": <scope:id>, ...payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Event name, e.g. `UserJoined`.
    pub event: String,

    /// Channel the event pertains to.
    pub channel: String,

    /// Everything else in the frame.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl InboundEvent {
    /// Creates an event without payload.
    #[must_use]
    pub fn new(event: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            channel: channel.into(),
            payload: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Returns true if the event was published on the given channel.
    #[must_use]
    pub fn is_on(&self, channel: &ChannelName) -> bool {
        channel.matches(&self.channel)
    }
}

/// Decodes one inbound text frame.
///
/// # Errors
///
/// Returns `RealtimeError::Decode` if the frame is not JSON or lacks the
/// `event`/`channel` string fields.
pub fn decode_frame(text: &str) -> Result<InboundEvent, RealtimeError> {
    serde_json::from_str(text).map_err(|e| RealtimeError::Decode(e.to_string()))
}

/// In-band subscription action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Start receiving a channel's events.
    Subscribe,
    /// Stop receiving a channel's events.
    Unsubscribe,
}

impl std::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe => write!(f, "subscribe"),
            Self::Unsubscribe => write!(f, "unsubscribe"),
        }
    }
}

/// Client-to-server control message on the socket variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// What to do.
    pub action: ControlAction,
    /// Which channel.
    pub channel: ChannelName,
}

impl ControlMessage {
    /// Creates a subscribe message.
    #[must_use]
    pub fn subscribe(channel: ChannelName) -> Self {
        Self {
            action: ControlAction::Subscribe,
            channel,
        }
    }

    /// Creates an unsubscribe message.
    #[must_use]
    pub fn unsubscribe(channel: ChannelName) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame() {
        let event = decode_frame(r#"{"event":"UserJoined","channel":"company:c1","userID":"u7"}"#)
            .expect("decode");
        assert_eq!(event.event, "UserJoined");
        assert_eq!(event.channel, "company:c1");
        assert_eq!(event.payload.get("userID"), Some(&Value::from("u7")));
        assert!(event.is_on(&ChannelName::company("c1")));
        assert!(!event.is_on(&ChannelName::company("c2")));
    }

    #[test]
    fn test_decode_frame_rejects_garbage() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"{"channel":"company:c1"}"#).is_err());
        assert!(decode_frame(r#"{"event":3,"channel":"company:c1"}"#).is_err());
        assert!(decode_frame("[]").is_err());
    }

    #[test]
    fn test_control_message_wire_shape() {
        let json = serde_json::to_string(&ControlMessage::subscribe(ChannelName::wms("w1")))
            .expect("serialize");
        assert_eq!(json, r#"{"action":"subscribe","channel":"wms:w1"}"#);

        let json = serde_json::to_string(&ControlMessage::unsubscribe(ChannelName::user("u1")))
            .expect("serialize");
        assert_eq!(json, r#"{"action":"unsubscribe","channel":"user:u1"}"#);
    }
}
