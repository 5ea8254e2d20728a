//! Session lifecycle and the consumer loop.
//!
//! A `SessionController` owns one conversation and drives the pipeline:
//! capture thread -> chunk queue -> drain/segment/transcribe/translate/
//! contextualize -> result stream. It persists across start/stop cycles;
//! the conversation is only cleared explicitly.

mod controller;
mod events;
mod state;

pub use controller::{LoopOptions, RunState, SessionController, SessionDeps};
pub use events::{LineResult, SessionEvent, SessionStats};
pub use state::{CancellationToken, Language, SessionSettings};
