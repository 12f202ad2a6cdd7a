//! Transforms one audio asset into one or more assets that each satisfy the
//! remote size and duration budgets.
//!
//! Two-stage policy: transcode at most once (only when chunking alone could
//! not get under the size budget), then split by time with stream copy. This
//! keeps the chunk count minimal and never re-encodes per chunk.

mod ffmpeg;
pub mod plan;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use ffmpeg::ensure_tools;

use crate::audio::{AudioAsset, AudioFormat};
use crate::settings::UploadLimits;
use plan::Budget;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("{0} is required but was not found on PATH")]
    MissingTool(&'static str),

    #[error("{tool} failed: {stderr}")]
    Tool { tool: &'static str, stderr: String },

    #[error("could not probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A finalized sub-asset. Ordering is significant: transcripts are joined by
/// ascending `sequence_index`.
#[derive(Debug)]
pub struct Chunk {
    pub sequence_index: usize,
    pub source_offset_secs: f64,
    pub asset: AudioAsset,
}

/// Build an [`AudioAsset`] from an arbitrary audio file by probing it with
/// ffprobe. Used when reprocessing saved recordings from disk.
pub fn probe_asset(path: &Path) -> Result<AudioAsset, SegmentError> {
    ensure_tools()?;
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("wav") => AudioFormat::Wav,
        _ => AudioFormat::Mp3,
    };
    let info = ffmpeg::probe(path)?;
    Ok(AudioAsset::new(
        path.to_path_buf(),
        format,
        info.duration_secs,
        info.sample_rate,
        info.channels,
    )?)
}

/// Produce budget-satisfying chunks for `asset`, writing any intermediate
/// artifacts into `work_dir` (a private temp scope owned by the caller).
///
/// The fast path returns the input unchanged as a single chunk and touches
/// neither ffmpeg nor the filesystem.
pub fn segment_asset(
    asset: &AudioAsset,
    limits: &UploadLimits,
    work_dir: &Path,
) -> Result<Vec<Chunk>, SegmentError> {
    let budget = Budget::from_limits(limits);

    if plan::fits(asset.size_bytes, asset.duration_secs, &budget) {
        return Ok(vec![Chunk {
            sequence_index: 0,
            source_offset_secs: 0.0,
            asset: asset.clone(),
        }]);
    }

    ensure_tools()?;

    let working = if plan::needs_compression(asset.size_bytes, asset.duration_secs, &budget) {
        info!(
            "compressing {:.1} MB asset before chunking",
            asset.size_bytes as f64 / (1024.0 * 1024.0)
        );
        let dest = work_dir.join("compressed.mp3");
        ffmpeg::compress_to_mp3(&asset.path, &dest, limits.compress_bitrate_kbps)?;
        let probed = ffmpeg::probe(&dest)?;
        let compressed = AudioAsset::new(
            dest,
            AudioFormat::Mp3,
            probed.duration_secs,
            probed.sample_rate,
            probed.channels,
        )?;
        info!(
            "compressed to {:.1} MB, {:.0}s",
            compressed.size_bytes as f64 / (1024.0 * 1024.0),
            compressed.duration_secs
        );
        compressed
    } else {
        asset.clone()
    };

    if plan::fits(working.size_bytes, working.duration_secs, &budget) {
        return Ok(vec![Chunk {
            sequence_index: 0,
            source_offset_secs: 0.0,
            asset: working,
        }]);
    }

    let chunk_secs = plan::chunk_duration_secs(working.size_bytes, working.duration_secs, &budget);
    let spans = plan::chunk_spans(working.duration_secs, chunk_secs);

    let covered: f64 = spans.iter().map(|s| s.len_secs).sum();
    if working.duration_secs - covered > 0.01 {
        debug!(
            "dropping {:.2}s trailing fragment below the minimum chunk length",
            working.duration_secs - covered
        );
    }

    let ext = working.format.extension();
    let mut chunks = Vec::with_capacity(spans.len());
    for (index, span) in spans.iter().enumerate() {
        let dest = work_dir.join(format!("chunk_{index:03}.{ext}"));
        ffmpeg::cut(&working.path, span.start_secs, span.len_secs, &dest)?;
        chunks.push(Chunk {
            sequence_index: index,
            source_offset_secs: span.start_secs,
            asset: AudioAsset::new(
                dest,
                working.format,
                span.len_secs,
                working.sample_rate,
                working.channels,
            )?,
        });
    }

    info!("split into {} chunks of <= {:.0}s", chunks.len(), chunk_secs);
    Ok(chunks)
}
