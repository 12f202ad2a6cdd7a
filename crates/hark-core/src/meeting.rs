//! Meeting output pipeline: optional raw-audio archive, long-audio
//! transcription, and the dated notes file.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::audio::AudioAsset;
use crate::provider::TranscriptionBackend;
use crate::segment;
use crate::settings::Settings;
use crate::transcribe::transcribe_asset;

/// Artifacts a finished meeting leaves in the notes directory.
#[derive(Debug)]
pub struct MeetingOutput {
    pub transcript_path: PathBuf,
    /// Raw audio archive, present only in keep-audio debug mode.
    pub audio_path: Option<PathBuf>,
}

/// Transcribe a finalized meeting recording and write the notes file.
///
/// The temporary asset is always deleted; in keep-audio mode a copy is
/// archived to the notes directory first, so a failed transcription still
/// leaves audio that can be reprocessed with `hark transcribe`.
pub async fn process_meeting(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    settings: &Settings,
    asset: AudioAsset,
) -> Result<MeetingOutput> {
    // Missing encoder is a fatal precondition; surface it before any
    // archive or upload work starts.
    segment::ensure_tools()?;

    let notes_dir = &settings.notes.notes_dir;
    std::fs::create_dir_all(notes_dir)
        .with_context(|| format!("failed to create {}", notes_dir.display()))?;

    let stamp = chrono::Local::now().format("%Y-%m-%d-%H%M").to_string();

    let audio_path = if settings.notes.keep_audio {
        let dest = notes_dir.join(format!("{stamp}.wav"));
        std::fs::copy(&asset.path, &dest)
            .with_context(|| format!("failed to archive audio to {}", dest.display()))?;
        info!("meeting audio archived to {}", dest.display());
        Some(dest)
    } else {
        None
    };

    info!(
        "transcribing meeting: {:.1} min, {:.1} MB",
        asset.duration_secs / 60.0,
        asset.size_bytes as f64 / (1024.0 * 1024.0)
    );

    let result = transcribe_asset(
        backend,
        client,
        api_key,
        settings.api.language.as_deref(),
        &settings.limits,
        &asset,
    )
    .await;

    asset.delete();

    match result {
        Ok(text) => {
            let transcript_path = notes_dir.join(format!("{stamp}.md"));
            std::fs::write(&transcript_path, &text)
                .with_context(|| format!("failed to write {}", transcript_path.display()))?;
            info!("meeting transcript saved to {}", transcript_path.display());
            Ok(MeetingOutput {
                transcript_path,
                audio_path,
            })
        }
        Err(err) => {
            if let Some(kept) = &audio_path {
                warn!(
                    "transcription failed; raw audio kept at {} for reprocessing",
                    kept.display()
                );
            }
            Err(err.into())
        }
    }
}
