use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LuminoError, Result};

/// Formality preference forwarded to providers that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Default,
    More,
    Less,
}

impl Formality {
    fn as_deepl(self) -> &'static str {
        match self {
            Formality::Default => "default",
            Formality::More => "more",
            Formality::Less => "less",
        }
    }
}

/// One translation call.
#[derive(Debug, Clone)]
pub struct TranslationRequest<'a> {
    pub text: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    /// Scenario description, for providers that accept surrounding context.
    pub context: Option<&'a str>,
    pub formality: Formality,
}

/// Translation strategy. The concrete provider is chosen once at
/// configuration time; per-call failures are recoverable and leave the
/// result's translation field empty while the loop continues.
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: TranslationRequest<'_>) -> Result<String>;
}

/// Keyless Google Translate web endpoint. Ignores context and formality;
/// the endpoint does not accept them.
pub struct GoogleTranslate {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslate {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl Translator for GoogleTranslate {
    async fn translate(&self, request: TranslationRequest<'_>) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", request.source_lang),
                ("tl", request.target_lang),
                ("dt", "t"),
                ("q", request.text),
            ])
            .send()
            .await?
            .error_for_status()?;

        // Response shape: [[["translated", "original", ...], ...], ...]
        let body: serde_json::Value = response.json().await?;
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| LuminoError::Network("unexpected translation response".to_string()))?;

        let mut translated = String::new();
        for segment in segments {
            if let Some(text) = segment.get(0).and_then(|v| v.as_str()) {
                translated.push_str(text);
            }
        }
        debug!(chars = translated.len(), "google translation complete");
        Ok(translated)
    }
}

/// DeepL REST API. Requires an auth key at construction; supports the
/// scenario description as `context` and the formality preference.
pub struct DeeplTranslate {
    client: reqwest::Client,
    endpoint: String,
    auth_key: String,
}

impl DeeplTranslate {
    /// `auth_key` comes from the environment at session build time; a
    /// missing key is a fatal configuration error, never a mid-stream one.
    pub fn new(endpoint: impl Into<String>, auth_key: Option<String>) -> Result<Self> {
        let auth_key = auth_key.ok_or_else(|| {
            LuminoError::Configuration("DEEPL_API_KEY is not set".to_string())
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            auth_key,
        })
    }
}

/// Map pipeline language codes to DeepL's: regioned English for the
/// target side, Simplified Han for Chinese, bare prefix otherwise.
fn deepl_lang(code: &str, is_target: bool) -> String {
    match code {
        "en" if is_target => "EN-US".to_string(),
        "zh-CN" => if is_target { "ZH-HANS".to_string() } else { "ZH".to_string() },
        other => other
            .split('-')
            .next()
            .unwrap_or(other)
            .to_ascii_uppercase(),
    }
}

#[async_trait::async_trait]
impl Translator for DeeplTranslate {
    async fn translate(&self, request: TranslationRequest<'_>) -> Result<String> {
        let mut payload = serde_json::json!({
            "text": [request.text],
            "source_lang": deepl_lang(request.source_lang, false),
            "target_lang": deepl_lang(request.target_lang, true),
            "formality": request.formality.as_deepl(),
        });
        if let Some(context) = request.context {
            payload["context"] = serde_json::Value::String(context.to_string());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.auth_key))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        #[derive(Deserialize)]
        struct DeeplResponse {
            translations: Vec<DeeplTranslation>,
        }
        #[derive(Deserialize)]
        struct DeeplTranslation {
            text: String,
        }

        let body: DeeplResponse = response.json().await?;
        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| LuminoError::Network("empty translation response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_deepl_key_is_a_configuration_error() {
        let err = DeeplTranslate::new("https://api-free.deepl.com/v2/translate", None)
            .err()
            .expect("construction must fail without a key");
        assert!(matches!(err, LuminoError::Configuration(_)));
    }

    #[test]
    fn deepl_language_codes_are_mapped() {
        assert_eq!(deepl_lang("en", false), "EN");
        assert_eq!(deepl_lang("en", true), "EN-US");
        assert_eq!(deepl_lang("zh-CN", false), "ZH");
        assert_eq!(deepl_lang("zh-CN", true), "ZH-HANS");
        assert_eq!(deepl_lang("fr", true), "FR");
    }
}
