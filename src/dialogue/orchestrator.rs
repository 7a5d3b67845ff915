//! One interaction turn: history, prompt, model call, extraction.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::DialogueConfig;
use crate::dialogue::context::ContextAssembler;
use crate::dialogue::extraction::{PatternExtractor, ReplyExtractor};
use crate::dialogue::history::ConversationMessage;
use crate::error::LlmError;
use crate::llm::LanguageModel;
use crate::world::WorldModel;

/// Drives dialogue turns against a language model.
///
/// Owns the full conversation history; only the most recent
/// `max_history` entries reach the model.
pub struct DialogueOrchestrator {
    llm: Arc<dyn LanguageModel>,
    world: Arc<WorldModel>,
    assembler: ContextAssembler,
    extractor: Box<dyn ReplyExtractor>,
    history: Mutex<Vec<ConversationMessage>>,
}

impl DialogueOrchestrator {
    pub fn new(llm: Arc<dyn LanguageModel>, world: Arc<WorldModel>, config: &DialogueConfig) -> Self {
        let assembler =
            ContextAssembler::new(config.system_prompt.clone(), config.max_history, world.clone());
        info!(
            model = llm.model_name(),
            max_history = config.max_history,
            "Dialogue orchestrator initialized"
        );
        Self {
            llm,
            world,
            assembler,
            extractor: Box::new(PatternExtractor),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Swap the reply extractor.
    pub fn with_extractor(mut self, extractor: Box<dyn ReplyExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Run one turn and return the reply text.
    ///
    /// A model failure is returned to the caller; the user utterance stays
    /// in history. Extraction failures are logged and never fail the turn.
    pub async fn respond(&self, utterance: &str) -> Result<String, LlmError> {
        info!(prompt = %utterance, "User prompt");

        let messages = {
            let mut history = self.history.lock().await;
            history.push(ConversationMessage::user(utterance));
            self.assembler.assemble(&history).await
        };
        debug!(count = messages.len(), "Full messages for LLM");

        // The assembled system message carries the world summary.
        let system_prompt = messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let reply = match self.llm.generate(&messages, &system_prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Error generating response");
                return Err(e);
            }
        };
        info!(response = %reply, "Assistant response");

        self.history
            .lock()
            .await
            .push(ConversationMessage::assistant(reply.clone()));

        match self.extractor.extract(&reply) {
            Ok(extraction) => extraction.apply(&self.world).await,
            Err(e) => error!(
                extractor = self.extractor.name(),
                error = %e,
                "Error updating world model"
            ),
        }

        Ok(reply)
    }

    /// Snapshot of the full conversation history.
    pub async fn history(&self) -> Vec<ConversationMessage> {
        self.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
        info!("Conversation history cleared");
    }

    /// Set a world-model state entry directly.
    pub async fn update_world_model(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        debug!(key, value = %value, "World model updated");
        self.world.set_state(key, value).await;
    }

    pub async fn world_summary(&self) -> String {
        self.world.get_summary().await
    }
}
