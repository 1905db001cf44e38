//! Wire-level event envelope.
//!
//! Frames are opaque text as far as the relay is concerned. The envelope
//! exists at the edge so clients can tag payloads for future extensibility,
//! and so the server can classify inbound frames for diagnostic logging.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type for chat messages sent by a peer.
pub const EVENT_SEND_MESSAGE: &str = "send_message";

/// Classification tag for frames that do not parse as an [`Event`].
pub const TAG_OPAQUE: &str = "opaque";

/// Envelope for a wire frame: a type tag plus an arbitrary JSON payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type tag (e.g. [`EVENT_SEND_MESSAGE`]).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Arbitrary JSON payload; interpretation depends on the type tag.
    pub payload: Value,
}

/// Payload of an [`EVENT_SEND_MESSAGE`] event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    /// The chat message text.
    pub message: String,
    /// Display name of the sender.
    pub from: String,
}

/// Classify an inbound frame for diagnostic logging.
///
/// Frames that parse as an [`Event`] are tagged with their event type;
/// anything else is [`TAG_OPAQUE`]. Best-effort only — the relay rebroadcasts
/// every frame verbatim regardless of the tag.
pub fn classify(frame: &str) -> String {
    match serde_json::from_str::<Event>(frame) {
        Ok(event) => event.event_type,
        Err(_) => TAG_OPAQUE.to_string(),
    }
}
