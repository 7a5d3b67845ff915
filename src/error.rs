//! Error types for Wunderkind.

use std::time::Duration;

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Configuration-related errors. Fatal at startup only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Pin I/O errors. Logged and retried, never fatal once the monitor is running.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Failed to set up pin {pin}: {reason}")]
    Setup { pin: u8, reason: String },

    #[error("Failed to read pin {pin}: {reason}")]
    Read { pin: u8, reason: String },

    #[error("Failed to write pin {pin}: {reason}")]
    Write { pin: u8, reason: String },

    #[error("PWM failure on pin {pin}: {reason}")]
    Pwm { pin: u8, reason: String },

    #[error("Unknown hardware event type: {0}")]
    UnknownEvent(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider {provider} timed out")]
    Timeout { provider: String },

    #[error("Provider {provider} returned server error {status}")]
    Server { provider: String, status: u16 },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the failure is worth retrying (rate limits, timeouts, 5xx).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Server { .. }
        )
    }

    /// Server-suggested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Speech backend errors.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech input closed")]
    InputClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reply extraction errors. Logged and swallowed by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extractor {extractor} failed: {reason}")]
    Failed { extractor: String, reason: String },
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
