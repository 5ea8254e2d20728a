use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::services::Formality;

/// Supported conversation languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    /// The code handed to the translation providers.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh-CN",
        }
    }

    /// The other side of the conversation.
    pub fn counterpart(&self) -> Language {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

/// Per-session configuration read by the consumer loop.
///
/// Held behind a lock; the loop clones one snapshot per iteration so a
/// multi-field update from a configuration call can never tear a read.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub spoken_language: Language,
    pub target_language: Language,
    pub scenario: String,
    pub input_device: Option<usize>,
    pub formality: Formality,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            spoken_language: Language::En,
            target_language: Language::Zh,
            scenario: "general".to_string(),
            input_device: None,
            formality: Formality::Default,
        }
    }
}

/// Cooperative stop signal, checked once per loop iteration.
///
/// Arming is one-way: once set it stays set until an explicit `reset`,
/// which only happens as part of the transition back to Idle.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    armed: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_direction_round_trips() {
        assert_eq!(Language::En.code(), "en");
        assert_eq!(Language::Zh.code(), "zh-CN");
        assert_eq!(Language::En.counterpart(), Language::Zh);
        assert_eq!(Language::Zh.counterpart(), Language::En);
    }

    #[test]
    fn token_arms_once_and_resets_explicitly() {
        let token = CancellationToken::new();
        assert!(!token.is_armed());
        token.arm();
        token.arm();
        assert!(token.is_armed());
        token.reset();
        assert!(!token.is_armed());
    }
}
