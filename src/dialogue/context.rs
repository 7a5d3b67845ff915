//! Prompt assembly: system instructions + world summary + recent history.

use std::sync::Arc;

use tracing::debug;

use crate::dialogue::history::{ConversationMessage, recent};
use crate::llm::ChatMessage;
use crate::world::WorldModel;

const SUMMARY_PREAMBLE: &str = "Here is a summary of known facts and events so far:";
const SUMMARY_GUIDANCE: &str =
    "Use this information to provide coherent answers while respecting user context.";

/// Builds the message list for each model call.
///
/// Nothing is cached: the world summary is re-read on every call.
pub struct ContextAssembler {
    system_prompt: String,
    max_history: usize,
    world: Arc<WorldModel>,
}

impl ContextAssembler {
    pub fn new(system_prompt: impl Into<String>, max_history: usize, world: Arc<WorldModel>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_history,
            world,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Static instructions, the current world summary and the guidance line.
    pub async fn system_message(&self) -> String {
        let summary = self.world.get_summary().await;
        format!(
            "{}\n\n{}\n{}\n\n{}",
            self.system_prompt, SUMMARY_PREAMBLE, summary, SUMMARY_GUIDANCE
        )
    }

    /// System message first, then the last `max_history` history entries in
    /// chronological order. Message text is never truncated.
    pub async fn assemble(&self, history: &[ConversationMessage]) -> Vec<ChatMessage> {
        let window = recent(history, self.max_history);

        let mut messages = Vec::with_capacity(window.len() + 1);
        messages.push(ChatMessage::system(self.system_message().await));
        messages.extend(window.iter().map(ConversationMessage::to_chat_message));

        debug!(
            history = history.len(),
            included = window.len(),
            "Assembled prompt"
        );
        messages
    }
}
