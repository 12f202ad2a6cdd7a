//! Transcription orchestration: segment an asset, transcribe each chunk
//! strictly in order, and join the partial transcripts.

use thiserror::Error;
use tracing::info;

use crate::audio::AudioAsset;
use crate::provider::{ProviderError, TranscriptionBackend, TranscriptionRequest};
use crate::segment::{self, Chunk, SegmentError};
use crate::settings::UploadLimits;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    /// A mid-sequence failure; already-transcribed chunks are discarded
    /// rather than returned as a partial transcript.
    #[error("transcription failed on chunk {index}/{total}: {source}")]
    Chunk {
        index: usize,
        total: usize,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Transcribe one finalized asset, chunking it first when it exceeds the
/// upload budgets.
///
/// Intermediate artifacts live in a private temp directory that is removed
/// on success, error, and cancellation alike.
pub async fn transcribe_asset(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    language: Option<&str>,
    limits: &UploadLimits,
    asset: &AudioAsset,
) -> Result<String, TranscribeError> {
    let work_dir = tempfile::Builder::new()
        .prefix("hark_transcribe_")
        .tempdir()?;

    let chunks = segment::segment_asset(asset, limits, work_dir.path())?;
    transcribe_chunks(backend, client, api_key, language, &chunks).await
}

/// Transcribe chunks sequentially — chunk `i + 1` is not started until chunk
/// `i` completes — bounding remote load and keeping results ordered by
/// construction. No retries: a failure aborts the whole sequence with the
/// failing chunk named in the error.
async fn transcribe_chunks(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    language: Option<&str>,
    chunks: &[Chunk],
) -> Result<String, TranscribeError> {
    let total = chunks.len();
    let mut parts = Vec::with_capacity(total);

    for chunk in chunks {
        if total > 1 {
            info!("transcribing chunk {}/{}", chunk.sequence_index + 1, total);
        }
        let audio_data = std::fs::read(&chunk.asset.path)?;
        let request = TranscriptionRequest {
            audio_data,
            filename: chunk.asset.upload_name(),
            mime_type: chunk.asset.format.mime_type().to_string(),
            language: language.map(str::to_string),
        };
        let result = backend
            .transcribe(client, api_key, request)
            .await
            .map_err(|source| TranscribeError::Chunk {
                index: chunk.sequence_index + 1,
                total,
                source,
            })?;
        parts.push(result.text);
    }

    Ok(join_transcripts(parts))
}

/// Join partial transcripts in chunk order, skipping empty chunks. A single
/// part passes through unchanged.
fn join_transcripts(parts: Vec<String>) -> String {
    if parts.len() == 1 {
        return parts.into_iter().next().unwrap();
    }
    parts
        .iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}
