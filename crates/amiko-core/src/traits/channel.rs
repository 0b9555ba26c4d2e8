// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The messaging-channel seam.

use async_trait::async_trait;

use crate::error::AmikoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage};

/// A bidirectional messaging transport.
///
/// The companion runs against exactly one channel at a time; the agent loop
/// pulls from [`receive`](ChannelAdapter::receive) while the delivery engine
/// and the outreach scheduler push through [`send`](ChannelAdapter::send).
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// What the transport can do, consulted before using optional features.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Connects to the platform and starts receiving updates.
    async fn connect(&mut self) -> Result<(), AmikoError>;

    /// Delivers one plain-text message to a chat.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, AmikoError>;

    /// Signals "typing" to the given chat. Channels without typing support
    /// treat this as a no-op.
    async fn send_typing(&self, chat_id: &str) -> Result<(), AmikoError>;

    /// Waits for and returns the next inbound message.
    async fn receive(&self) -> Result<InboundMessage, AmikoError>;
}
