//! LLM integration for Wunderkind.
//!
//! The dialogue layer only sees the `LanguageModel` trait. The shipped
//! backend uses rig-core for Anthropic transport, and the `RigAdapter`
//! adds retry and request pacing around it.

pub mod provider;
pub(crate) mod retry;
mod rig_adapter;

pub use provider::*;
pub use retry::RetryPolicy;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    Ok(Arc::new(RigAdapter::new(config)?))
}
