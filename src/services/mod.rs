//! Adapters for the three remote services the loop composes: speech
//! recognition, translation, and context generation. Each sits behind a
//! trait so sessions can be driven with mock implementations in tests.

pub mod context;
pub mod transcribe;
pub mod translate;

pub use context::{ContextGenerator, GeminiClient};
pub use transcribe::{TranscriptionEngine, WhisperApi};
pub use translate::{
    DeeplTranslate, Formality, GoogleTranslate, TranslationRequest, Translator,
};
