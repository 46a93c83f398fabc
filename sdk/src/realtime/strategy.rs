//! How subscribe/unsubscribe intents reach the server.

use std::fmt;
use std::sync::Arc;

use super::config::TransportVariant;
use crate::client::ApiLayer;

/// Channel subscription strategy.
#[derive(Clone)]
pub enum ChannelStrategy {
    /// Control messages are sent over the open socket.
    InBand,
    /// Separate authenticated calls against the API layer.
    ControlPlane(Arc<dyn ApiLayer>),
}

impl ChannelStrategy {
    /// The strategy a wire variant calls for: the socket carries its own
    /// control messages, the push-only stream needs the API layer.
    #[must_use]
    pub fn for_variant(variant: TransportVariant, api: Arc<dyn ApiLayer>) -> Self {
        match variant {
            TransportVariant::Socket => Self::InBand,
            TransportVariant::Stream => Self::ControlPlane(api),
        }
    }
}

impl fmt::Debug for ChannelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InBand => write!(f, "InBand"),
            Self::ControlPlane(_) => write!(f, "ControlPlane"),
        }
    }
}
