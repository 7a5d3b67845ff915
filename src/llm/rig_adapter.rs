//! Bridges rig-core's Anthropic agent to the `LanguageModel` trait.
//!
//! rig owns the HTTP transport. This adapter owns everything around it:
//! request pacing, the retry loop and the mapping of rig errors onto
//! `LlmError`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Chat;
use rig::message::Message;
use rig::providers::anthropic;
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, LanguageModel, Role};
use crate::llm::retry::{RetryPolicy, with_retry};

const PROVIDER: &str = "anthropic";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type AnthropicClient = rig::client::Client<anthropic::client::AnthropicExt>;

/// `LanguageModel` backed by a rig-core Anthropic client.
pub struct RigAdapter {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
    retry: RetryPolicy,
    min_request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RigAdapter {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client: AnthropicClient = anthropic::Client::new(config.api_key.expose_secret())
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            })?;

        info!("Using Anthropic (model: {})", config.model);
        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            retry: RetryPolicy::default(),
            min_request_interval: config.min_request_interval,
            last_request: Mutex::new(None),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Wait until at least `min_request_interval` has passed since the last request.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_request_interval {
                let wait = self.min_request_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limiting LLM request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<String, LlmError> {
        let (prompt, window) = split_conversation(messages)?;
        let history: Vec<Message> = window.into_iter().map(to_rig_message).collect();

        self.pace().await;

        let agent = self
            .client
            .agent(&self.model)
            .preamble(system_prompt)
            .temperature(f64::from(self.temperature))
            .max_tokens(u64::from(self.max_tokens))
            .build();
        debug!(history = history.len(), "Sending LLM request");

        let reply = tokio::time::timeout(REQUEST_TIMEOUT, agent.chat(prompt.to_string(), history))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: PROVIDER.to_string(),
            })?
            .map_err(|e| classify_error(&e.to_string()))?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "response contained no text".to_string(),
            });
        }
        Ok(reply.to_string())
    }
}

#[async_trait]
impl LanguageModel for RigAdapter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<String, LlmError> {
        let text = with_retry(&self.retry, PROVIDER, || {
            self.send_once(messages, system_prompt)
        })
        .await?;
        info!(length = text.len(), "Generated response");
        Ok(text)
    }
}

/// Split the window into the prompt (the last user turn) and the history
/// before it. The system prompt travels as the preamble, so system-role
/// entries are dropped, as are assistant turns before the first user turn.
fn split_conversation(
    messages: &[ChatMessage],
) -> Result<(&str, Vec<&ChatMessage>), LlmError> {
    let mut window: Vec<&ChatMessage> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .skip_while(|m| m.role != Role::User)
        .collect();

    let last_user = window
        .iter()
        .rposition(|m| m.role == Role::User)
        .ok_or_else(|| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: "conversation has no user message".to_string(),
        })?;

    let prompt = window[last_user].content.as_str();
    window.truncate(last_user);
    Ok((prompt, window))
}

fn to_rig_message(message: &ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content.clone()),
        Role::User | Role::System => Message::user(message.content.clone()),
    }
}

/// rig surfaces provider failures as text, so classify on what it says.
fn classify_error(detail: &str) -> LlmError {
    let lower = detail.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["rate_limit", "rate limit", "429"]) {
        LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after: None,
        }
    } else if has(&["overloaded", "529"]) {
        LlmError::Server {
            provider: PROVIDER.to_string(),
            status: 529,
        }
    } else if has(&["authentication", "permission", "401", "403", "invalid x-api-key"]) {
        LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        }
    } else if has(&["api_error", "internal server error", "500", "502", "503", "504"]) {
        LlmError::Server {
            provider: PROVIDER.to_string(),
            status: 500,
        }
    } else if has(&["timed out", "timeout"]) {
        LlmError::Timeout {
            provider: PROVIDER.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: detail.to_string(),
        }
    }
}
