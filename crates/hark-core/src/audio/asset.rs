//! Finalized audio assets.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Container format of an [`AudioAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

/// A finalized, immutable audio file plus the attributes the pipeline
/// needs to budget uploads.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioAsset {
    /// Build an asset from an existing file with known stream attributes.
    pub fn new(
        path: PathBuf,
        format: AudioFormat,
        duration_secs: f64,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        let size_bytes = std::fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        Ok(Self {
            path,
            format,
            size_bytes,
            duration_secs,
            sample_rate,
            channels,
        })
    }

    /// Read a WAV file's header and build an asset from it.
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = hound::WavReader::open(&path)
            .with_context(|| format!("failed to open WAV {}", path.display()))?;
        let spec = reader.spec();
        let duration_secs = reader.duration() as f64 / spec.sample_rate as f64;
        Self::new(
            path,
            AudioFormat::Wav,
            duration_secs,
            spec.sample_rate,
            spec.channels,
        )
    }

    /// File name used when uploading this asset.
    pub fn upload_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("audio.{}", self.format.extension()))
    }

    /// Remove the backing file. Failures are logged, not fatal: assets live
    /// in temp scopes that get swept anyway.
    pub fn delete(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::debug!("could not remove {}: {err}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_from_wav_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 16_000, &vec![0i16; 16_000]);

        let asset = AudioAsset::from_wav(&path).unwrap();
        assert_eq!(asset.format, AudioFormat::Wav);
        assert_eq!(asset.sample_rate, 16_000);
        assert_eq!(asset.channels, 1);
        assert!((asset.duration_secs - 1.0).abs() < 1e-6);
        assert!(asset.size_bytes > 32_000);
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.wav");
        write_wav(&path, 8_000, &[0, 1, 2]);
        let asset = AudioAsset::from_wav(&path).unwrap();
        asset.delete();
        assert!(!path.exists());
    }
}
