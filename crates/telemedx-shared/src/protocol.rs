use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

/// Messages published on the room's reliable data channel.
///
/// Encoded as JSON with a `type` tag so peers running other clients can
/// share the channel; unknown tags decode to `None` in [`DataPacket::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataPacket {
    Chat(ChatPacket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPacket {
    pub message: String,
    /// Unix epoch millis at the sender.
    pub timestamp: i64,
    #[serde(default)]
    pub sender: Option<String>,
}

impl DataPacket {
    pub fn chat(sender: &str, message: &str) -> Self {
        DataPacket::Chat(ChatPacket {
            message: message.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            sender: Some(sender.to_string()),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a payload, returning `None` for anything that is not a
    /// packet this client understands.
    pub fn decode(data: &[u8]) -> Option<Self> {
        serde_json::from_slice(data).ok()
    }
}

impl ChatPacket {
    /// Convert into a chat line. `fallback_sender` names the publishing
    /// participant when the packet carries no sender.
    pub fn into_message(self, fallback_sender: &str) -> ChatMessage {
        let timestamp = Utc
            .timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_else(Utc::now);
        ChatMessage {
            sender: self.sender.unwrap_or_else(|| fallback_sender.to_string()),
            message: self.message,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_packet_wire_shape() {
        let packet = DataPacket::chat("Dr Lee", "hello");
        let json: serde_json::Value = serde_json::from_slice(&packet.to_bytes().unwrap()).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["sender"], "Dr Lee");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_unknown_packet_type_ignored() {
        assert_eq!(DataPacket::decode(br#"{"type":"cursor","x":1}"#), None);
        assert_eq!(DataPacket::decode(b"garbage"), None);
    }

    #[test]
    fn test_packet_without_sender_uses_publisher() {
        let packet = DataPacket::decode(br#"{"type":"chat","message":"hi","timestamp":1700000000000}"#)
            .unwrap();
        let DataPacket::Chat(chat) = packet;
        let msg = chat.into_message("patient-42");
        assert_eq!(msg.sender, "patient-42");
        assert_eq!(msg.timestamp.timestamp_millis(), 1_700_000_000_000);
    }
}
