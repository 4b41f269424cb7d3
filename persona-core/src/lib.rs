//! # Persona Core Library
//!
//! State & context engine for a persistent synthetic companion.
//!
//! Every [`Character`] carries a small amount of evolving state that is
//! folded into the prompt of each conversational turn:
//!
//! - **Mood**: "How awake am I?" ([`mood::MoodClock`], circadian bands)
//! - **Relationship**: "What are we to each other?" ([`relationship`], with hysteresis)
//! - **Display**: "What does my badge say?" ([`display`], one status out of many signals)
//! - **Silence**: "Who left whom on read?" ([`gap`])
//! - **Time**: "When is *tonight*?" ([`time`])
//! - **Lore**: "What do I know about dragons?" ([`world_book`])
//!
//! ## Determinism Contract
//!
//! Nothing in this crate reads the wall clock or the host time zone. Every
//! operation takes `now` (and a [`chrono_tz::Tz`] where local time matters) as
//! an argument, so the same inputs always yield the same outputs.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod character;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod gap;
pub mod mood;
pub mod persistence;
pub mod relationship;
pub mod schedule;
pub mod time;
pub mod types;
pub mod world_book;

pub use character::Character;
pub use config::PersonaConfig;
pub use error::PersonaError;
pub use types::*;
