// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Amiko companion backend.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide,
//! providing long polling over direct messages, plain-text delivery, and
//! typing indicators.

pub mod handler;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use amiko_config::TelegramConfig;
use amiko_core::types::{ChannelCapabilities, InboundMessage, OutboundMessage};
use amiko_core::{AdapterType, AmikoError, ChannelAdapter, HealthStatus, MessageId, PluginAdapter};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, Recipient};

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Connects to Telegram via long polling and accepts direct messages only.
/// Replies go out as plain text so that conversational fragments read like
/// a person typing, not rendered markup.
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Builds the adapter from config; fails without a bot token.
    pub fn new(config: &TelegramConfig) -> Result<Self, AmikoError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            AmikoError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(AmikoError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AmikoError> {
        // getMe is the cheapest call that exercises the token.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), AmikoError> {
        debug!("Telegram channel shutting down");
        // The polling handle is dropped with the channel, which aborts the
        // task. For graceful shutdown, the agent loop stops calling
        // receive() first.
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_typing: true,
            max_message_length: Some(4096),
        }
    }

    async fn connect(&mut self) -> Result<(), AmikoError> {
        if self.polling_handle.is_some() {
            return Ok(()); // connect() is idempotent
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                async move {
                    // Filter: DMs only
                    if !handler::is_dm(&msg) {
                        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                        return respond(());
                    }

                    match handler::extract_text(&msg) {
                        Some(text) => {
                            let inbound = handler::to_inbound_message(&msg, text);
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring message without text");
                        }
                    }

                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // drop non-message updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, AmikoError> {
        let chat_id = parse_chat_id(&msg.chat_id)?;

        let sent = self
            .bot
            .send_message(Recipient::Id(chat_id), &msg.text)
            .await
            .map_err(|e| AmikoError::Channel {
                message: format!("failed to send message: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), AmikoError> {
        let chat_id = parse_chat_id(chat_id)?;

        self.bot
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map_err(|e| AmikoError::Channel {
                message: format!("failed to send typing indicator: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, AmikoError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| AmikoError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}

/// Parses a textual chat id into a teloxide [`ChatId`].
fn parse_chat_id(chat_id: &str) -> Result<ChatId, AmikoError> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|e| AmikoError::Channel {
            message: format!("invalid chat_id {chat_id:?}: {e}"),
            source: None,
        })
}
