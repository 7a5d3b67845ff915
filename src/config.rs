//! Configuration types.
//!
//! Everything is read from `WUNDERKIND_*` environment variables (plus
//! `ANTHROPIC_API_KEY`). Unset variables fall back to defaults; a variable
//! that is set but unparsable is a startup error.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default system prompt used when `WUNDERKIND_SYSTEM_PROMPT` is not set.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Default Anthropic model.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Full assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub monitor: MonitorConfig,
    pub dialogue: DialogueConfig,
    pub speech: SpeechConfig,
}

impl AssistantConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            llm: LlmConfig::from_lookup(&lookup)?,
            monitor: MonitorConfig::from_lookup(&lookup)?,
            dialogue: DialogueConfig::from_lookup(&lookup)?,
            speech: SpeechConfig::from_lookup(&lookup)?,
        })
    }
}

/// Language-model client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Minimum spacing between consecutive requests.
    pub min_request_interval: Duration,
}

impl LlmConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            model: lookup("WUNDERKIND_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parse_or(lookup, "WUNDERKIND_MAX_TOKENS", 150)?,
            temperature: parse_or(lookup, "WUNDERKIND_TEMPERATURE", 0.7)?,
            min_request_interval: Duration::from_millis(parse_or(
                lookup,
                "WUNDERKIND_MIN_REQUEST_INTERVAL_MS",
                1000,
            )?),
        })
    }
}

/// Pin assignments (BCM numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub led: u8,
    pub button: u8,
    pub motion_sensor: u8,
    /// `None` when the servo is disabled.
    pub servo: Option<u8>,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            led: 18,
            button: 23,
            motion_sensor: 24,
            servo: None,
        }
    }
}

impl PinConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let servo_enabled: bool = parse_or(lookup, "WUNDERKIND_ENABLE_SERVO", false)?;
        let servo_pin: u8 = parse_or(lookup, "WUNDERKIND_SERVO_PIN", 25)?;

        Ok(Self {
            led: parse_or(lookup, "WUNDERKIND_LED_PIN", 18)?,
            button: parse_or(lookup, "WUNDERKIND_BUTTON_PIN", 23)?,
            motion_sensor: parse_or(lookup, "WUNDERKIND_MOTION_PIN", 24)?,
            servo: servo_enabled.then_some(servo_pin),
        })
    }
}

/// Hardware monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub pins: PinConfig,
    /// Sleep between polling iterations.
    pub poll_interval: Duration,
    /// Sleep after a failed read before retrying.
    pub error_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            poll_interval: Duration::from_millis(100),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl MonitorConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            pins: PinConfig::from_lookup(lookup)?,
            poll_interval: Duration::from_millis(parse_or(
                lookup,
                "WUNDERKIND_POLL_INTERVAL_MS",
                100,
            )?),
            error_backoff: Duration::from_millis(parse_or(
                lookup,
                "WUNDERKIND_ERROR_BACKOFF_MS",
                1000,
            )?),
        })
    }
}

/// Dialogue configuration.
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    pub system_prompt: String,
    /// Most recent conversation messages included in each prompt.
    pub max_history: usize,
    pub wake_word: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_history: 10,
            wake_word: "wunderkind".to_string(),
        }
    }
}

impl DialogueConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_history = parse_or(lookup, "WUNDERKIND_MAX_HISTORY", defaults.max_history)?;
        if max_history == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WUNDERKIND_MAX_HISTORY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            system_prompt: lookup("WUNDERKIND_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            max_history,
            wake_word: lookup("WUNDERKIND_WAKE_WORD")
                .map(|w| w.to_lowercase())
                .unwrap_or(defaults.wake_word),
        })
    }
}

/// Speech backend configuration.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// How long `listen()` waits for an utterance before giving up.
    pub listen_timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            listen_timeout: Duration::from_secs(5),
        }
    }
}

impl SpeechConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            listen_timeout: Duration::from_secs(parse_or(
                lookup,
                "WUNDERKIND_LISTEN_TIMEOUT_SECS",
                5,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = AssistantConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn defaults_apply() {
        let config =
            AssistantConfig::from_lookup(lookup_from(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, 150);
        assert_eq!(config.monitor.pins, PinConfig::default());
        assert_eq!(config.monitor.poll_interval, Duration::from_millis(100));
        assert_eq!(config.monitor.error_backoff, Duration::from_secs(1));
        assert_eq!(config.dialogue.max_history, 10);
        assert_eq!(config.dialogue.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.speech.listen_timeout, Duration::from_secs(5));
    }

    #[test]
    fn servo_pin_only_when_enabled() {
        let config = AssistantConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("WUNDERKIND_ENABLE_SERVO", "true"),
            ("WUNDERKIND_SERVO_PIN", "12"),
        ]))
        .unwrap();
        assert_eq!(config.monitor.pins.servo, Some(12));
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = AssistantConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("WUNDERKIND_MAX_HISTORY", "lots"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "WUNDERKIND_MAX_HISTORY")
        );
    }

    #[test]
    fn zero_history_window_is_rejected() {
        let err = AssistantConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("WUNDERKIND_MAX_HISTORY", "0"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "WUNDERKIND_MAX_HISTORY")
        );

        let config = AssistantConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("WUNDERKIND_MAX_HISTORY", "1"),
        ]))
        .unwrap();
        assert_eq!(config.dialogue.max_history, 1);
    }
}
