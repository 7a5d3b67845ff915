//! Reply extraction: pull facts, preferences and hardware mentions out of
//! model replies.
//!
//! `PatternExtractor` is plain substring matching. Anything smarter plugs in
//! through `ReplyExtractor`.

use tracing::debug;

use crate::error::ExtractionError;
use crate::world::WorldModel;

const FACT_MARKER: &str = "I learned that";
const PREFERENCE_MARKER: &str = "you prefer";

/// Preference key written by extraction.
pub const USER_PREFERENCE_KEY: &str = "user_preference";

/// Keywords that count as a hardware mention.
pub const HARDWARE_KEYWORDS: [&str; 4] = ["button", "motion", "sensor", "led"];

/// What a reply says about the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub fact: Option<String>,
    pub preference: Option<String>,
    pub hardware_mentions: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.fact.is_none() && self.preference.is_none() && self.hardware_mentions.is_empty()
    }

    /// Write the findings into the world model.
    pub async fn apply(&self, world: &WorldModel) {
        if let Some(fact) = &self.fact {
            world.add_fact(fact.clone()).await;
        }
        if let Some(preference) = &self.preference {
            world
                .update_user_preference(USER_PREFERENCE_KEY, preference.clone())
                .await;
        }
        for keyword in &self.hardware_mentions {
            world
                .update_hardware_event(format!("Hardware interaction mentioned: {keyword}"))
                .await;
        }
    }
}

/// Turns a reply into world-model updates.
pub trait ReplyExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, reply: &str) -> Result<Extraction, ExtractionError>;
}

/// Literal substring rules.
///
/// - fact: text after the last "I learned that"
/// - preference: lower-cased text after "you prefer", up to any second occurrence
/// - one hardware mention per keyword found, case-insensitive
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl ReplyExtractor for PatternExtractor {
    fn name(&self) -> &str {
        "pattern"
    }

    fn extract(&self, reply: &str) -> Result<Extraction, ExtractionError> {
        let lower = reply.to_lowercase();

        let fact = reply
            .rsplit_once(FACT_MARKER)
            .map(|(_, rest)| strip_edges(rest).to_string());

        let preference = lower
            .split(PREFERENCE_MARKER)
            .nth(1)
            .map(|rest| strip_edges(rest).to_string());

        let hardware_mentions: Vec<String> = HARDWARE_KEYWORDS
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect();

        let extraction = Extraction {
            fact,
            preference,
            hardware_mentions,
        };
        if !extraction.is_empty() {
            debug!(?extraction, "Extracted from reply");
        }
        Ok(extraction)
    }
}

fn strip_edges(text: &str) -> &str {
    text.trim_matches(|c| c == '.' || c == ' ')
}
