use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TranslateError, Translator};
use crate::settings::SettingsStore;

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: String,
}

/// Gemini `generateContent` client.
///
/// API key and model are read from the settings store on every call.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    settings: Arc<dyn SettingsStore>,
}

impl GeminiClient {
    pub fn new(base_url: &str, timeout: Duration, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        }
    }

    fn endpoint(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url,
            model.trim(),
            api_key.trim()
        )
    }
}

fn build_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Please translate the following text to {} and improve/rephrase it to make it more clear, natural, and easy to understand. Return only the improved translated result without any additional explanation: \"{}\"",
        target_language, text
    )
}

/// Pull the first candidate's text out of a response body
fn parse_response(body: &str) -> Result<String, TranslateError> {
    let response: GeminiResponse = serde_json::from_str(body)?;
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.parts.first())
        .map(|part| clean_translation(&part.text))
        .ok_or(TranslateError::EmptyResponse)
}

/// Trim whitespace and one pair of surrounding double quotes
fn clean_translation(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

#[async_trait]
impl Translator for GeminiClient {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslateError> {
        let settings = self.settings.load();
        if !settings.has_api_key() {
            return Err(TranslateError::MissingApiKey);
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: build_prompt(text, target_language),
                }],
            }],
        };

        debug!(model = %settings.model, target_language, "sending translation request");

        let response = self
            .client
            .post(self.endpoint(&settings.model, &settings.gemini_api_key))
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TranslateError::Api { status, body: text });
        }

        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    struct FixedSettings(Settings);

    impl SettingsStore for FixedSettings {
        fn load(&self) -> Settings {
            self.0.clone()
        }

        fn save(&self, _settings: &Settings) -> Result<(), crate::settings::SettingsError> {
            Ok(())
        }
    }

    fn client(settings: Settings) -> GeminiClient {
        GeminiClient::new(
            "https://example.test/v1beta/models/",
            Duration::from_secs(5),
            Arc::new(FixedSettings(settings)),
        )
    }

    #[test]
    fn test_endpoint() {
        let client = client(Settings::default());
        assert_eq!(
            client.endpoint("gemini-1.5-pro", "k"),
            "https://example.test/v1beta/models/gemini-1.5-pro:generateContent?key=k"
        );
    }

    #[test]
    fn test_prompt_names_language_and_quotes_text() {
        let prompt = build_prompt("xin chào", "Japanese");
        assert!(prompt.contains("to Japanese"));
        assert!(prompt.ends_with("\"xin chào\""));
    }

    #[test]
    fn test_parse_first_candidate() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  \"Hello\"\n"}]}},{"content":{"parts":[{"text":"other"}]}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Hello");
    }

    #[test]
    fn test_parse_empty_candidates() {
        assert!(matches!(
            parse_response(r#"{"candidates":[]}"#),
            Err(TranslateError::EmptyResponse)
        ));
        assert!(matches!(
            parse_response(r#"{"candidates":[{"content":{"parts":[]}}]}"#),
            Err(TranslateError::EmptyResponse)
        ));
        assert!(matches!(parse_response("{}"), Err(TranslateError::EmptyResponse)));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_response("<html>"),
            Err(TranslateError::Malformed(_))
        ));
    }

    #[test]
    fn test_clean_translation() {
        assert_eq!(clean_translation("\"quoted\""), "quoted");
        assert_eq!(clean_translation("  spaced  "), "spaced");
        assert_eq!(clean_translation("say \"hi\" now"), "say \"hi\" now");
        assert_eq!(clean_translation("\""), "\"");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let client = client(Settings::default());
        let result = client.translate("hello", "English").await;
        assert!(matches!(result, Err(TranslateError::MissingApiKey)));
    }
}
