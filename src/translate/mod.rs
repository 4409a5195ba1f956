//! Translation service client
//!
//! The pipeline only depends on the `Translator` contract; the Gemini
//! client is the production implementation.

mod gemini;

use async_trait::async_trait;

pub use gemini::GeminiClient;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no Gemini API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no translation received")]
    EmptyResponse,
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the language called `target_language` (e.g. "English")
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslateError>;
}
