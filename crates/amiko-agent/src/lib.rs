// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent loop for the Amiko companion.
//!
//! The [`AgentLoop`] is the central coordinator:
//! - Receives messages from the channel adapter
//! - Routes them through onboarding, recall, or free chat
//! - Delivers replies as paced fragment bursts
//! - Feeds finished turns to the memory pipeline in the background
//! - Handles graceful shutdown
//!
//! Proactive contact lives in [`outreach`]; the loop's side of that
//! contract is clearing `waiting_for_reply` whenever the user speaks.

pub mod delivery;
pub mod onboarding;
pub mod outreach;
pub mod shutdown;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use amiko_config::AmikoConfig;
use amiko_core::types::{
    InboundMessage, ProfilePatch, ProviderMessage, ProviderRequest, TurnRole, UserProfile,
    HISTORY_LEDGER_CAP,
};
use amiko_core::{
    AmikoError, ChannelAdapter, OnboardingStep, ProviderAdapter, StorageAdapter,
};
use amiko_memory::{Consolidator, FactLearner, RecallEngine, NO_JOURNALS_REPLY};

use crate::delivery::DeliveryEngine;

/// Persona instruction used when the config does not supply one.
/// `{agent}` is replaced with the configured companion name.
const DEFAULT_PERSONA: &str = "You are a close, genuine friend texting on your phone. Your \
name is {agent}. Never mention being an AI, a model, or an assistant; you are just you. Keep \
a calm, low-key energy: a simple \"hey, what's up?\" is a fine reply to a greeting. Listen \
first and validate feelings before anything else; skip the advice unless they ask for it. \
Say just enough. Short, natural messages beat long helpful ones. Type like a person: \
lowercase is fine, fragments are fine, slang and emoji only when they feel earned. You have \
your own moods and opinions. You laugh at jokes, you can disagree, you can tease gently. Be \
curious about their life without interrogating; if they give a short answer, let it be.";

/// In-character reply when a chat completion fails.
const CHAT_APOLOGY: &str = "Ugh, my head went completely blank for a second. Say that again?";

/// In-character reply when a recall lookup fails.
const RECALL_APOLOGY: &str =
    "I tried to dig that memory up but it slipped away from me. Ask me again in a bit?";

const RECALL_PREFIX: &str = "/recall ";

/// The main agent loop coordinating channel, provider, storage, and the
/// memory pipeline.
pub struct AgentLoop {
    channel: Arc<dyn ChannelAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    storage: Arc<dyn StorageAdapter>,
    delivery: DeliveryEngine,
    learner: Arc<FactLearner>,
    consolidator: Arc<Consolidator>,
    recall: RecallEngine,
    config: AmikoConfig,
}

impl AgentLoop {
    /// Creates a new agent loop over connected adapters.
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        storage: Arc<dyn StorageAdapter>,
        config: AmikoConfig,
    ) -> Self {
        let delivery = DeliveryEngine::new(channel.clone(), config.delivery.clone());
        let learner = Arc::new(FactLearner::new(storage.clone(), provider.clone()));
        let consolidator = Arc::new(Consolidator::new(storage.clone(), provider.clone()));
        let recall = RecallEngine::new(
            storage.clone(),
            provider.clone(),
            config.memory.recall_history_depth as u32,
        );

        info!(agent_name = config.agent.name.as_str(), "agent loop initialized");

        Self {
            channel,
            provider,
            storage,
            delivery,
            learner,
            consolidator,
            recall,
            config,
        }
    }

    /// Runs the agent loop until the channel closes or shutdown is signaled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), AmikoError> {
        info!("agent loop running");
        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => {
                            if let Err(e) = self.handle_inbound(inbound).await {
                                error!(error = %e, "failed to handle inbound message");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            // A closed channel cannot recover; anything else
                            // is worth another receive attempt.
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        self.storage.close().await?;
        info!("agent loop stopped");
        Ok(())
    }

    async fn handle_inbound(&self, inbound: InboundMessage) -> Result<(), AmikoError> {
        let text = inbound.text.trim().to_string();
        if text.is_empty() {
            debug!(sender_id = inbound.sender_id, "dropping empty message");
            return Ok(());
        }

        let profile = self.load_profile(&inbound).await?;

        // The user spoke: whatever we were waiting on is answered.
        if profile.waiting_for_reply {
            self.storage
                .update_profile(
                    &profile.user_id,
                    ProfilePatch {
                        waiting_for_reply: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
        }

        if text.eq_ignore_ascii_case("/start") {
            return self.handle_start(&inbound, &profile).await;
        }
        if let Some(step) = profile.pending_question {
            return self.handle_onboarding_answer(&inbound, step, &text).await;
        }
        if !profile.onboarding_complete {
            return self.send_plain(&inbound.chat_id, onboarding::START_NUDGE).await;
        }
        if let Some(question) = recall_query(&text) {
            return self.handle_recall(&inbound, &text, question).await;
        }
        self.handle_chat(&inbound, &text).await
    }

    /// Fetch the sender's profile, creating it on first contact and keeping
    /// the chat route and seeded display name current.
    async fn load_profile(&self, inbound: &InboundMessage) -> Result<UserProfile, AmikoError> {
        let mut profile = match self.storage.get_profile(&inbound.sender_id).await? {
            Some(profile) => profile,
            None => {
                info!(
                    user_id = inbound.sender_id,
                    channel = inbound.channel,
                    "first contact, creating profile"
                );
                self.storage.create_profile(&inbound.sender_id).await?
            }
        };

        let mut patch = ProfilePatch::default();
        if profile.chat_id.as_deref() != Some(inbound.chat_id.as_str()) {
            patch.chat_id = Some(inbound.chat_id.clone());
        }
        if profile.display_name.is_none() {
            patch.display_name = inbound.sender_name.clone();
        }
        if !patch.is_empty() {
            self.storage.update_profile(&profile.user_id, patch.clone()).await?;
            if let Some(chat_id) = patch.chat_id {
                profile.chat_id = Some(chat_id);
            }
            if let Some(name) = patch.display_name {
                profile.display_name = Some(name);
            }
        }
        Ok(profile)
    }

    async fn handle_start(
        &self,
        inbound: &InboundMessage,
        profile: &UserProfile,
    ) -> Result<(), AmikoError> {
        if profile.onboarding_complete {
            return self.send_plain(&inbound.chat_id, onboarding::ALREADY_ONBOARDED).await;
        }

        let step = onboarding::entry_step(&self.config.onboarding, profile.authorized);
        self.storage
            .update_profile(
                &profile.user_id,
                ProfilePatch {
                    pending_question: Some(Some(step)),
                    waiting_for_reply: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        self.send_plain(&inbound.chat_id, &onboarding::intro_line(&self.config.agent.name))
            .await?;
        self.send_plain(&inbound.chat_id, onboarding::question_for(step)).await
    }

    async fn handle_onboarding_answer(
        &self,
        inbound: &InboundMessage,
        step: OnboardingStep,
        answer: &str,
    ) -> Result<(), AmikoError> {
        match onboarding::apply_answer(step, answer, &self.config.onboarding) {
            onboarding::Transition::Retry { message } => {
                debug!(user_id = inbound.sender_id, %step, "answer rejected, re-asking");
                self.send_plain(&inbound.chat_id, message).await
            }
            onboarding::Transition::Advance { patch, prompt } => {
                self.storage.update_profile(&inbound.sender_id, patch).await?;
                self.send_plain(&inbound.chat_id, prompt).await
            }
            onboarding::Transition::Complete {
                patch,
                confirmation,
            } => {
                self.storage.update_profile(&inbound.sender_id, patch).await?;
                info!(user_id = inbound.sender_id, "onboarding complete");
                self.send_plain(&inbound.chat_id, confirmation).await
            }
        }
    }

    async fn handle_recall(
        &self,
        inbound: &InboundMessage,
        raw_text: &str,
        question: &str,
    ) -> Result<(), AmikoError> {
        match self.recall.answer(&inbound.sender_id, question).await {
            Ok(Some(answer)) => {
                self.delivery.deliver(&inbound.chat_id, &answer).await;
                self.finish_turn(&inbound.sender_id, raw_text, &answer).await
            }
            Ok(None) => {
                self.delivery.deliver(&inbound.chat_id, NO_JOURNALS_REPLY).await;
                Ok(())
            }
            Err(e) => {
                warn!(user_id = inbound.sender_id, error = %e, "recall failed");
                self.delivery.deliver(&inbound.chat_id, RECALL_APOLOGY).await;
                Ok(())
            }
        }
    }

    async fn handle_chat(&self, inbound: &InboundMessage, text: &str) -> Result<(), AmikoError> {
        let turns = self
            .storage
            .recent_turns(&inbound.sender_id, HISTORY_LEDGER_CAP as u32)
            .await?;

        let mut messages: Vec<ProviderMessage> = turns
            .into_iter()
            .map(|t| ProviderMessage {
                role: t.role,
                content: t.text,
            })
            .collect();
        messages.push(ProviderMessage {
            role: TurnRole::User,
            content: text.to_string(),
        });

        let persona = self
            .config
            .agent
            .persona
            .clone()
            .unwrap_or_else(|| DEFAULT_PERSONA.replace("{agent}", &self.config.agent.name));
        let request = ProviderRequest {
            system_prompt: Some(persona),
            messages,
            max_tokens: None,
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = response.text.trim().to_string();
                self.delivery.deliver(&inbound.chat_id, &reply).await;
                self.finish_turn(&inbound.sender_id, text, &reply).await
            }
            Err(e) => {
                warn!(user_id = inbound.sender_id, error = %e, "chat completion failed");
                self.delivery.deliver(&inbound.chat_id, CHAT_APOLOGY).await;
                Ok(())
            }
        }
    }

    /// Record the finished turn pair, then hand it to the memory pipeline
    /// on a detached task so the reply path never waits on it.
    async fn finish_turn(
        &self,
        user_id: &str,
        user_text: &str,
        model_text: &str,
    ) -> Result<(), AmikoError> {
        self.storage.append_turn(user_id, TurnRole::User, user_text).await?;
        self.storage.append_turn(user_id, TurnRole::Model, model_text).await?;

        let consolidator = self.consolidator.clone();
        let learner = self.learner.clone();
        let user_id = user_id.to_string();
        let user_text = user_text.to_string();
        let model_text = model_text.to_string();
        tokio::spawn(async move {
            if let Err(e) = consolidator
                .summarize_turn(&user_id, &user_text, &model_text)
                .await
            {
                warn!(user_id, error = %e, "turn summary failed");
            }
            learner.learn_from_turn(&user_id, &user_text, &model_text).await;
        });

        Ok(())
    }

    async fn send_plain(&self, chat_id: &str, text: &str) -> Result<(), AmikoError> {
        let msg = amiko_core::types::OutboundMessage {
            channel: self.channel.name().to_string(),
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        };
        self.channel.send(msg).await?;
        Ok(())
    }
}

/// Extract the question from a `/recall` command, case-insensitively.
/// A bare `/recall` with no question is not a command.
fn recall_query(text: &str) -> Option<&str> {
    let head = text.get(..RECALL_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(RECALL_PREFIX) {
        return None;
    }
    let question = text[RECALL_PREFIX.len()..].trim();
    (!question.is_empty()).then_some(question)
}
