//! Transcription providers: one bounded audio payload in, plain text out.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiProvider;

/// Default timeout for one transcription request. Uploads can be ~25 MB on a
/// slow uplink, so this is generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, timeout); possibly transient.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service rejected the request (auth, quota, payload).
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The service answered with something we could not parse.
    #[error("unexpected response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One transcription request: a complete, budget-satisfying audio payload.
pub struct TranscriptionRequest {
    pub audio_data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: Option<String>,
}

/// A remote speech-to-text backend. Implementations send exactly one request
/// per call and never retry; retry policy belongs to callers.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, ProviderError>;
}

/// Shared HTTP client with the upload-sized timeout applied.
pub fn build_http_client() -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()?)
}
