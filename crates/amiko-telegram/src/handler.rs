// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing and content extraction.
//!
//! Determines whether an incoming Telegram message should be processed
//! based on chat type, then extracts the text into a channel-agnostic
//! [`InboundMessage`]. Authorization is not decided here: unknown senders
//! go through the onboarding auth gate in the agent loop.

use amiko_core::types::InboundMessage;
use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Extracts text from a Telegram message.
///
/// Plain text and media captions both count as text. Returns `None` for
/// messages with neither (stickers, locations, uncaptioned media).
pub fn extract_text(msg: &Message) -> Option<String> {
    if let Some(text) = msg.text() {
        return Some(text.to_string());
    }

    msg.caption().map(|c| c.to_string())
}

/// Converts a Telegram message and extracted text into an [`InboundMessage`].
///
/// The sender's Telegram user id keys the profile; the chat id routes
/// replies. In a DM they coincide, but downstream code never assumes so.
pub fn to_inbound_message(msg: &Message, text: String) -> InboundMessage {
    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let sender_name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .filter(|name| !name.trim().is_empty());

    let timestamp = msg.date.to_rfc3339();

    InboundMessage {
        id: msg.id.0.to_string(),
        channel: "telegram".to_string(),
        sender_id,
        chat_id: msg.chat.id.0.to_string(),
        sender_name,
        text,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock private chat message from JSON, matching Telegram Bot API structure.
    fn make_private_message(user_id: u64, first_name: &str, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": first_name,
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": first_name,
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    /// Build a mock group chat message.
    fn make_group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    /// Build a mock photo message with a caption.
    fn make_caption_message(user_id: u64, caption: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 2,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "photo": [{
                "file_id": "photo-file-id",
                "file_unique_id": "photo-unique-id",
                "width": 100,
                "height": 100,
                "file_size": 1234,
            }],
            "caption": caption,
        });

        serde_json::from_value(json).expect("failed to deserialize mock photo message")
    }

    /// Build a mock message with neither text nor caption.
    fn make_location_message(user_id: u64) -> Message {
        let json = serde_json::json!({
            "message_id": 3,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "location": {
                "longitude": 13.4,
                "latitude": 52.5,
            },
        });

        serde_json::from_value(json).expect("failed to deserialize mock location message")
    }

    /// Build a mock message without a sender.
    fn make_no_sender_message(text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": 12345i64,
                "type": "private",
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    #[test]
    fn is_dm_private_chat() {
        let msg = make_private_message(12345, "Test", "hello");
        assert!(is_dm(&msg));
    }

    #[test]
    fn is_dm_group_chat() {
        let msg = make_group_message(12345, "hello");
        assert!(!is_dm(&msg));
    }

    #[test]
    fn extract_text_from_text_message() {
        let msg = make_private_message(12345, "Test", "hello world");
        assert_eq!(extract_text(&msg).as_deref(), Some("hello world"));
    }

    #[test]
    fn extract_text_from_caption() {
        let msg = make_caption_message(12345, "look at this");
        assert_eq!(extract_text(&msg).as_deref(), Some("look at this"));
    }

    #[test]
    fn extract_text_none_without_text_or_caption() {
        let msg = make_location_message(12345);
        assert!(extract_text(&msg).is_none());
    }

    #[test]
    fn to_inbound_message_maps_fields() {
        let msg = make_private_message(12345, "Ada", "hello");
        let inbound = to_inbound_message(&msg, "hello".into());

        assert_eq!(inbound.id, "1");
        assert_eq!(inbound.channel, "telegram");
        assert_eq!(inbound.sender_id, "12345");
        assert_eq!(inbound.chat_id, "12345");
        assert_eq!(inbound.sender_name.as_deref(), Some("Ada"));
        assert_eq!(inbound.text, "hello");
        assert!(inbound.timestamp.starts_with("2023-11-14"));
    }

    #[test]
    fn to_inbound_message_without_sender() {
        let msg = make_no_sender_message("hello");
        let inbound = to_inbound_message(&msg, "hello".into());

        assert_eq!(inbound.sender_id, "unknown");
        assert!(inbound.sender_name.is_none());
        assert_eq!(inbound.chat_id, "12345");
    }
}
