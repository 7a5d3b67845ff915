//! Wunderkind: a voice-driven assistant core.
//!
//! A hardware monitor and a dialogue loop share one [`world::WorldModel`];
//! every model call sees a fresh summary of it.

pub mod assistant;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod hardware;
pub mod llm;
pub mod speech;
pub mod world;
