//! OpenAI-compatible transcription provider.
//!
//! Works against the OpenAI Whisper API and any server speaking the same
//! format: multipart upload with `model` and `file` fields, bearer-token
//! auth, JSON response with a `text` field.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ProviderError, TranscriptionBackend, TranscriptionRequest, TranscriptionResult};

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

/// Provider speaking the OpenAI audio-transcriptions format.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn transcribe(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, ProviderError> {
        let mut form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(request.audio_data)
                    .file_name(request.filename)
                    .mime_str(&request.mime_type)
                    .map_err(ProviderError::Network)?,
            );

        if let Some(lang) = request.language {
            form = form.text("language", lang);
        }

        let response = client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::Rejected { status, message });
        }

        let body = response.text().await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)?;
        Ok(TranscriptionResult {
            text: parsed.text,
            language: parsed.language,
        })
    }
}
