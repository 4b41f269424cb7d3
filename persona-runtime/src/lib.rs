//! # Persona Runtime
//!
//! Async glue between the pure state engine in `persona-core` and the
//! response backends in `persona-llm`:
//!
//! - [`state::SharedCharacter`]: lock-guarded character with a single mood writer
//! - [`driver::MoodClockDriver`]: ticks the circadian clock on a tokio interval
//! - [`hooks`]: entry points for gifts, score changes and incoming messages
//! - [`turn::TurnEngine`]: builds the prompt, calls the generator, applies the result
//! - [`summary`]: folds old history into the rolling summary
//! - [`logging`]: tracing subscriber setup from configuration

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod state;
pub mod summary;
pub mod turn;

pub use driver::{DriverHandle, MoodClockDriver};
pub use error::{Result, RuntimeError};
pub use state::SharedCharacter;
pub use turn::{TurnEngine, TurnOutcome};
