// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound traffic (messages and typing signals) for assertion
//! in tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use amiko_core::traits::adapter::PluginAdapter;
use amiko_core::traits::channel::ChannelAdapter;
use amiko_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};
use amiko_core::AmikoError;

/// A mock messaging channel for testing.
///
/// Provides three queues:
/// - **inbound**: messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured for `sent_messages()`
/// - **typing**: chat ids passed to `send_typing()` are captured for `typing_signals()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    typing: Arc<Mutex<Vec<String>>>,
    notify: Arc<Notify>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            typing: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Inject an inbound message into the receive queue.
    ///
    /// The next call to `receive()` will return this message.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Build and inject a plain text message from `sender_id`, using the
    /// sender id as the chat id the way direct-message transports do.
    pub async fn inject_text(&self, sender_id: &str, text: &str) {
        self.inject_message(InboundMessage {
            id: format!("mock-in-{}", uuid::Uuid::new_v4()),
            channel: "mock".to_string(),
            sender_id: sender_id.to_string(),
            chat_id: sender_id.to_string(),
            sender_name: None,
            text: text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
        .await;
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Get the chat ids that received a typing signal, in order.
    pub async fn typing_signals(&self) -> Vec<String> {
        self.typing.lock().await.clone()
    }

    /// Clear all captured outbound traffic.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
        self.typing.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AmikoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AmikoError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_typing: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), AmikoError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, AmikoError> {
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        Ok(MessageId(id))
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), AmikoError> {
        self.typing.lock().await.push(chat_id.to_string());
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, AmikoError> {
        loop {
            // Try to pop from queue
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            // Wait for notification that a new message was injected
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_returns_injected_messages() {
        let channel = MockChannel::new();
        channel.inject_text("test-user", "hello").await;

        let received = channel.receive().await.unwrap();
        assert_eq!(received.sender_id, "test-user");
        assert_eq!(received.chat_id, "test-user");
        assert_eq!(received.text, "hello");
    }

    #[tokio::test]
    async fn send_captures_outbound_messages() {
        let channel = MockChannel::new();
        let msg = OutboundMessage {
            channel: "mock".to_string(),
            chat_id: "chat-1".to_string(),
            text: "response text".to_string(),
        };

        let msg_id = channel.send(msg).await.unwrap();
        assert!(msg_id.0.starts_with("mock-msg-"));

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "response text");
        assert_eq!(sent[0].chat_id, "chat-1");
    }

    #[tokio::test]
    async fn typing_signals_are_captured_in_order() {
        let channel = MockChannel::new();
        channel.send_typing("chat-1").await.unwrap();
        channel.send_typing("chat-2").await.unwrap();

        assert_eq!(channel.typing_signals().await, vec!["chat-1", "chat-2"]);
    }

    #[tokio::test]
    async fn multiple_messages_in_order() {
        let channel = MockChannel::new();
        channel.inject_text("u", "first").await;
        channel.inject_text("u", "second").await;

        assert_eq!(channel.receive().await.unwrap().text, "first");
        assert_eq!(channel.receive().await.unwrap().text, "second");
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = Arc::new(MockChannel::new());
        let channel_clone = channel.clone();

        // Spawn a task that will inject a message after a short delay
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            channel_clone.inject_text("u", "delayed").await;
        });

        // receive() should block until the message is injected
        let received =
            tokio::time::timeout(tokio::time::Duration::from_secs(2), channel.receive())
                .await
                .expect("receive timed out")
                .unwrap();
        assert_eq!(received.text, "delayed");
    }

    #[tokio::test]
    async fn sent_count_and_clear() {
        let channel = MockChannel::new();
        assert_eq!(channel.sent_count().await, 0);

        let msg = OutboundMessage {
            channel: "mock".to_string(),
            chat_id: "c".to_string(),
            text: "test".to_string(),
        };
        channel.send(msg.clone()).await.unwrap();
        channel.send(msg).await.unwrap();
        channel.send_typing("c").await.unwrap();
        assert_eq!(channel.sent_count().await, 2);

        channel.clear_sent().await;
        assert_eq!(channel.sent_count().await, 0);
        assert!(channel.typing_signals().await.is_empty());
    }
}
