//! World model: the shared knowledge store.
//!
//! Holds learned facts, hardware events, arbitrary key/value state and user
//! preferences. Both the hardware monitor task and the dialogue loop write
//! here, so every collection sits behind its own lock and callers only get
//! atomic operations or owned snapshots, never the collections themselves.
//!
//! Lock order (for anything taking more than one): facts, events, state,
//! preferences.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Prefix for state keys written by [`WorldModel::update_hardware_state`].
pub const HARDWARE_STATE_PREFIX: &str = "hardware.";

/// Shared in-memory knowledge store.
pub struct WorldModel {
    facts: RwLock<Vec<String>>,
    hardware_events: RwLock<Vec<String>>,
    state: RwLock<BTreeMap<String, Value>>,
    preferences: RwLock<BTreeMap<String, Value>>,
}

impl WorldModel {
    /// Create an empty world model.
    pub fn new() -> Self {
        info!("WorldModel initialized");
        Self {
            facts: RwLock::new(Vec::new()),
            hardware_events: RwLock::new(Vec::new()),
            state: RwLock::new(BTreeMap::new()),
            preferences: RwLock::new(BTreeMap::new()),
        }
    }

    /// Append a fact. Empty text is stored like any other fact.
    pub async fn add_fact(&self, fact: impl Into<String>) {
        let fact = fact.into();
        debug!(fact = %fact, "Added fact");
        self.facts.write().await.push(fact);
    }

    /// Append a hardware event description.
    pub async fn update_hardware_event(&self, description: impl Into<String>) {
        let description = description.into();
        debug!(event = %description, "Hardware event recorded");
        self.hardware_events.write().await.push(description);
    }

    /// Overwrite the last observed state of a hardware component.
    ///
    /// Stored in the state map under `hardware.<component>`.
    pub async fn update_hardware_state(&self, component: &str, value: impl Into<Value>) {
        let key = format!("{HARDWARE_STATE_PREFIX}{component}");
        self.set_state(key, value).await;
    }

    /// Set (or overwrite) a state entry.
    pub async fn set_state(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        debug!(key = %key, value = %value, "Set internal state");
        self.state.write().await.insert(key, value);
    }

    /// Look up a state entry.
    pub async fn get_state(&self, key: &str) -> Option<Value> {
        self.state.read().await.get(key).cloned()
    }

    /// Set (or overwrite) a user preference.
    pub async fn update_user_preference(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        debug!(preference = %name, value = %value, "Updated user preference");
        self.preferences.write().await.insert(name, value);
    }

    /// Look up a user preference.
    pub async fn get_user_preference(&self, name: &str) -> Option<Value> {
        self.preferences.read().await.get(name).cloned()
    }

    /// Snapshot of all facts in append order.
    pub async fn facts(&self) -> Vec<String> {
        self.facts.read().await.clone()
    }

    /// Snapshot of all hardware events in append order.
    pub async fn hardware_events(&self) -> Vec<String> {
        self.hardware_events.read().await.clone()
    }

    /// Human-readable report of the store, one line per collection.
    ///
    /// Each line is rendered while holding that collection's read lock, so a
    /// line never reflects a half-applied write. Lines may come from
    /// different moments relative to each other.
    pub async fn get_summary(&self) -> String {
        let facts_line = {
            let facts = self.facts.read().await;
            if facts.is_empty() {
                "No known facts yet.".to_string()
            } else {
                format!("Facts: {}", facts.join("; "))
            }
        };

        let events_line = {
            let events = self.hardware_events.read().await;
            if events.is_empty() {
                "No hardware events recorded.".to_string()
            } else {
                format!("Hardware Events: {}", events.join("; "))
            }
        };

        let state_line = {
            let state = self.state.read().await;
            if state.is_empty() {
                "No internal state set yet.".to_string()
            } else {
                let keys: Vec<&str> = state.keys().map(String::as_str).collect();
                format!("State keys: [{}]", keys.join(", "))
            }
        };

        let preferences_line = {
            let preferences = self.preferences.read().await;
            if preferences.is_empty() {
                "No user preferences stored.".to_string()
            } else {
                let entries: Vec<String> = preferences
                    .iter()
                    .map(|(name, value)| format!("{name}: {}", display_value(value)))
                    .collect();
                format!("User Preferences: {{{}}}", entries.join(", "))
            }
        };

        let summary = [facts_line, events_line, state_line, preferences_line].join("\n");
        debug!(summary = %summary, "World model summary");
        summary
    }

    /// Reset all four collections.
    pub async fn clear(&self) {
        let mut facts = self.facts.write().await;
        let mut events = self.hardware_events.write().await;
        let mut state = self.state.write().await;
        let mut preferences = self.preferences.write().await;

        facts.clear();
        events.clear();
        state.clear();
        preferences.clear();

        info!("WorldModel has been cleared");
    }
}

impl Default for WorldModel {
    fn default() -> Self {
        Self::new()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn empty_summary() {
        let world = WorldModel::new();
        assert_eq!(
            world.get_summary().await,
            "No known facts yet.\n\
             No hardware events recorded.\n\
             No internal state set yet.\n\
             No user preferences stored."
        );
    }

    #[tokio::test]
    async fn summary_sections() {
        let world = WorldModel::new();
        world.add_fact("the sky is blue").await;
        world.add_fact("water is wet").await;
        world.update_hardware_event("Hardware event: button_press").await;
        world.set_state("mode", "idle").await;
        world.update_hardware_state("led", "on").await;
        world.update_user_preference("user_preference", "dark mode").await;

        let summary = world.get_summary().await;
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Facts: the sky is blue; water is wet");
        assert_eq!(lines[1], "Hardware Events: Hardware event: button_press");
        assert_eq!(lines[2], "State keys: [hardware.led, mode]");
        assert_eq!(lines[3], "User Preferences: {user_preference: dark mode}");
    }

    #[tokio::test]
    async fn summary_is_a_pure_read() {
        let world = WorldModel::new();
        world.add_fact("one").await;
        world.set_state("k", 1).await;

        let first = world.get_summary().await;
        let second = world.get_summary().await;
        assert_eq!(first, second);
        assert_eq!(world.facts().await, vec!["one".to_string()]);
    }

    #[tokio::test]
    async fn state_overwrites() {
        let world = WorldModel::new();
        world.set_state("volume", 3).await;
        world.set_state("volume", 7).await;
        assert_eq!(world.get_state("volume").await, Some(Value::from(7)));
        assert_eq!(world.get_state("missing").await, None);

        world.update_user_preference("user_preference", "tea").await;
        world.update_user_preference("user_preference", "coffee").await;
        assert_eq!(
            world.get_user_preference("user_preference").await,
            Some(Value::from("coffee"))
        );
    }

    #[tokio::test]
    async fn hardware_state_is_namespaced() {
        let world = WorldModel::new();
        world.update_hardware_state("button", "pressed").await;
        assert_eq!(
            world.get_state("hardware.button").await,
            Some(Value::from("pressed"))
        );
    }

    #[tokio::test]
    async fn empty_fact_is_accepted() {
        let world = WorldModel::new();
        world.add_fact("").await;
        assert_eq!(world.facts().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let world = WorldModel::new();
        world.add_fact("f").await;
        world.update_hardware_event("e").await;
        world.set_state("k", "v").await;
        world.update_user_preference("p", "v").await;

        world.clear().await;

        assert!(world.facts().await.is_empty());
        assert!(world.hardware_events().await.is_empty());
        assert_eq!(world.get_state("k").await, None);
        assert_eq!(world.get_user_preference("p").await, None);

        // Still usable after clearing.
        world.add_fact("again").await;
        assert_eq!(world.facts().await, vec!["again".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_lose_nothing() {
        const PER_WRITER: usize = 500;
        let world = Arc::new(WorldModel::new());

        let mut handles = Vec::new();
        for writer in 0..2 {
            let world = Arc::clone(&world);
            handles.push(tokio::spawn(async move {
                for i in 0..PER_WRITER {
                    world.add_fact(format!("w{writer}-{i}")).await;
                    world.update_hardware_event(format!("w{writer}-{i}")).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let facts = world.facts().await;
        assert_eq!(facts.len(), 2 * PER_WRITER);
        assert_eq!(world.hardware_events().await.len(), 2 * PER_WRITER);

        // Per-writer order is preserved even though writers interleave.
        for writer in 0..2 {
            let prefix = format!("w{writer}-");
            let own: Vec<&String> = facts.iter().filter(|f| f.starts_with(&prefix)).collect();
            assert_eq!(own.len(), PER_WRITER);
            for (i, fact) in own.iter().enumerate() {
                assert_eq!(**fact, format!("w{writer}-{i}"));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn summary_during_writes_is_consistent() {
        let world = Arc::new(WorldModel::new());

        let writer = {
            let world = Arc::clone(&world);
            tokio::spawn(async move {
                for _ in 0..500 {
                    world.add_fact("x").await;
                }
            })
        };

        let reader = {
            let world = Arc::clone(&world);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let summary = world.get_summary().await;
                    let first = summary.lines().next().unwrap_or_default().to_string();
                    if first != "No known facts yet." {
                        let body = first.strip_prefix("Facts: ").unwrap();
                        // Every entry is complete: no empty or torn segments.
                        assert!(body.split("; ").all(|f| f == "x"));
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(world.facts().await.len(), 500);
    }
}
