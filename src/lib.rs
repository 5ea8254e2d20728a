pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod scenario;
pub mod segment;
pub mod services;
pub mod session;

pub use audio::{
    list_input_devices, AudioChunk, CaptureHandle, CaptureOptions, CaptureSource, ChunkQueue,
    DeviceSelection, MicCapture, RateConverter, SAMPLE_RATE,
};
pub use config::{Config, TranslationProvider};
pub use conversation::Conversation;
pub use error::LuminoError;
pub use http::{create_router, AppState};
pub use scenario::{Scenario, ScenarioCatalog};
pub use segment::{LineBoundary, SegmentBuffer};
pub use services::{
    ContextGenerator, DeeplTranslate, Formality, GeminiClient, GoogleTranslate,
    TranscriptionEngine, TranslationRequest, Translator, WhisperApi,
};
pub use session::{
    CancellationToken, Language, LineResult, LoopOptions, RunState, SessionController,
    SessionDeps, SessionEvent, SessionSettings, SessionStats,
};
