use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::scenario::Scenario;
use crate::services::Formality;
use crate::session::LoopOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    pub asr: AsrConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub context: ContextConfig,
    /// Extra scenarios merged over the built-in catalog.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Input device index; `None` means the platform default.
    #[serde(default)]
    pub input_device: Option<usize>,
    #[serde(default = "default_chunk_duration_ms")]
    pub chunk_duration_ms: u64,
    #[serde(default = "default_calibration_duration_ms")]
    pub calibration_duration_ms: u64,
    /// Gap after which drained audio starts a new conversation line.
    #[serde(default = "default_line_timeout_ms")]
    pub line_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            chunk_duration_ms: default_chunk_duration_ms(),
            calibration_duration_ms: default_calibration_duration_ms(),
            line_timeout_ms: default_line_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsrConfig {
    /// whisper-server style transcription endpoint.
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    Google,
    Deepl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_provider")]
    pub provider: TranslationProvider,
    #[serde(default = "default_google_endpoint")]
    pub google_endpoint: String,
    #[serde(default = "default_deepl_endpoint")]
    pub deepl_endpoint: String,
    #[serde(default = "default_formality")]
    pub formality: Formality,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: default_translation_provider(),
            google_endpoint: default_google_endpoint(),
            deepl_endpoint: default_deepl_endpoint(),
            formality: default_formality(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_context_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_context_model")]
    pub model: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            endpoint: default_context_endpoint(),
            model: default_context_model(),
        }
    }
}

fn default_chunk_duration_ms() -> u64 {
    2000
}
fn default_calibration_duration_ms() -> u64 {
    1000
}
fn default_line_timeout_ms() -> u64 {
    3000
}
fn default_translation_provider() -> TranslationProvider {
    TranslationProvider::Google
}
fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}
fn default_deepl_endpoint() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}
fn default_formality() -> Formality {
    Formality::Default
}
fn default_context_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_context_model() -> String {
    "gemini-1.5-flash".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LUMINO").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            line_timeout: Duration::from_millis(self.audio.line_timeout_ms),
            chunk_duration: Duration::from_millis(self.audio.chunk_duration_ms),
            calibration_duration: Duration::from_millis(self.audio.calibration_duration_ms),
            ..LoopOptions::default()
        }
    }
}
