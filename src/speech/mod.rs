//! Speech collaborators.
//!
//! The dialogue loop only depends on the two traits below. `ConsoleSpeech`
//! is the development backend: typed lines stand in for recognized speech
//! and replies are printed instead of synthesized.

pub mod console;

pub use console::ConsoleSpeech;

use async_trait::async_trait;

/// Speech-to-text side.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Capture one utterance. `None` on timeout or unintelligible input.
    async fn listen(&self) -> Option<String>;

    /// Listen once and report whether `phrase` was heard.
    async fn detect_wake_word(&self, phrase: &str) -> bool;
}

/// Text-to-speech side.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`. Returns `false` if synthesis failed; never fatal.
    async fn speak(&self, text: &str) -> bool;
}
