use tracing::debug;

use crate::error::{LuminoError, Result};

/// Produces a short natural-language gloss of the current line.
///
/// Same failure policy as translation: fatal only when the credential is
/// absent at startup; per-call failures leave the result's context field
/// empty and the loop continues.
#[async_trait::async_trait]
pub trait ContextGenerator: Send + Sync {
    async fn generate(
        &self,
        line: &str,
        scenario_description: &str,
        target_language: &str,
    ) -> Result<String>;
}

/// Gemini `generateContent` REST client.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            LuminoError::Configuration("GEMINI_API_KEY is not set".to_string())
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl ContextGenerator for GeminiClient {
    async fn generate(
        &self,
        line: &str,
        scenario_description: &str,
        target_language: &str,
    ) -> Result<String> {
        let prompt = format!(
            "The following line was spoken during: {scenario_description}. \
             In one short sentence, written in the language with code \
             `{target_language}`, explain any context a listener would need \
             to follow it. Line: \"{line}\""
        );

        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LuminoError::Network("empty context response".to_string()))?;

        debug!(chars = text.len(), "context gloss generated");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_gemini_key_is_a_configuration_error() {
        let err = GeminiClient::new(
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-1.5-flash",
            None,
        )
        .err()
        .expect("construction must fail without a key");
        assert!(matches!(err, LuminoError::Configuration(_)));
    }
}
