//! Dialogue pipeline.
//!
//! - `history`: timestamped conversation entries
//! - `context`: `ContextAssembler`, builds the prompt for each call
//! - `extraction`: reply parsing into world-model updates
//! - `orchestrator`: `DialogueOrchestrator`, one full turn

pub mod context;
pub mod extraction;
pub mod history;
pub mod orchestrator;

pub use context::ContextAssembler;
pub use extraction::{Extraction, PatternExtractor, ReplyExtractor};
pub use history::ConversationMessage;
pub use orchestrator::DialogueOrchestrator;
