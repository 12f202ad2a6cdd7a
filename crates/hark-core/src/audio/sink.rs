//! Append-only PCM sinks backing an active recording.
//!
//! Dictation uses an in-memory buffer (short recordings, peak-normalized on
//! finalize); meeting capture streams straight to a WAV file since sessions
//! can run for hours.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::asset::AudioAsset;

/// Fixed sample format of a sink. Samples are 16-bit signed little-endian
/// once they hit disk.
#[derive(Debug, Clone, Copy)]
pub struct SinkSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl SinkSpec {
    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

enum Storage {
    Memory {
        samples: Vec<f32>,
    },
    Wav {
        writer: Option<hound::WavWriter<BufWriter<File>>>,
        data_bytes: u64,
    },
}

/// A temporary, append-only raw-audio buffer or file.
pub struct PcmSink {
    spec: SinkSpec,
    path: PathBuf,
    storage: Storage,
}

impl PcmSink {
    /// In-memory sink; the WAV at `path` is written on finalize.
    pub fn memory(path: PathBuf, spec: SinkSpec) -> Self {
        Self {
            spec,
            path,
            storage: Storage::Memory {
                samples: Vec::new(),
            },
        }
    }

    /// Streaming sink writing WAV frames to `path` as they arrive.
    pub fn wav_file(path: PathBuf, spec: SinkSpec) -> Result<Self> {
        let writer = hound::WavWriter::create(&path, spec.wav_spec())
            .with_context(|| format!("failed to create WAV {}", path.display()))?;
        Ok(Self {
            spec,
            path,
            storage: Storage::Wav {
                writer: Some(writer),
                data_bytes: 0,
            },
        })
    }

    /// Append float samples in [-1.0, 1.0].
    pub fn append_samples(&mut self, samples: &[f32]) -> Result<()> {
        match &mut self.storage {
            Storage::Memory { samples: buf } => {
                buf.extend_from_slice(samples);
            }
            Storage::Wav { writer, data_bytes } => {
                if let Some(writer) = writer {
                    for &s in samples {
                        writer
                            .write_sample(f32_to_i16(s))
                            .context("failed to write sample")?;
                    }
                    *data_bytes += samples.len() as u64 * 2;
                }
            }
        }
        Ok(())
    }

    /// Append raw 16-bit little-endian PCM bytes (the capture helper's wire
    /// format). A trailing odd byte is dropped.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.storage {
            Storage::Memory { samples } => {
                samples.extend(
                    bytes
                        .chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32),
                );
            }
            Storage::Wav { writer, data_bytes } => {
                if let Some(writer) = writer {
                    for b in bytes.chunks_exact(2) {
                        writer
                            .write_sample(i16::from_le_bytes([b[0], b[1]]))
                            .context("failed to write sample")?;
                    }
                    *data_bytes += (bytes.len() as u64 / 2) * 2;
                }
            }
        }
        Ok(())
    }

    /// PCM payload bytes buffered or written so far.
    pub fn data_bytes(&self) -> u64 {
        match &self.storage {
            Storage::Memory { samples } => samples.len() as u64 * 2,
            Storage::Wav { data_bytes, .. } => *data_bytes,
        }
    }

    /// Discard everything buffered so far; the sink stays open for appends.
    pub fn clear(&mut self) -> Result<()> {
        match &mut self.storage {
            Storage::Memory { samples } => {
                samples.clear();
                Ok(())
            }
            Storage::Wav { writer, data_bytes } => {
                // Restart the file from scratch; create() truncates.
                drop(writer.take());
                *writer = Some(
                    hound::WavWriter::create(&self.path, self.spec.wav_spec())
                        .with_context(|| format!("failed to recreate {}", self.path.display()))?,
                );
                *data_bytes = 0;
                Ok(())
            }
        }
    }

    /// Close the sink and return the finalized asset.
    pub fn finalize(mut self) -> Result<AudioAsset> {
        match &mut self.storage {
            Storage::Memory { samples } => {
                let samples = std::mem::take(samples);
                write_normalized_wav(&self.path, self.spec, &samples)?;
                AudioAsset::from_wav(&self.path)
            }
            Storage::Wav { writer, .. } => {
                if let Some(writer) = writer.take() {
                    writer.finalize().context("failed to finalize WAV")?;
                }
                AudioAsset::from_wav(&self.path)
            }
        }
    }

    /// Drop the sink and remove any file it created.
    pub fn discard(mut self) {
        if let Storage::Wav { writer, .. } = &mut self.storage {
            drop(writer.take());
        }
        if self.path.exists()
            && let Err(err) = std::fs::remove_file(&self.path)
        {
            tracing::debug!("could not remove {}: {err}", self.path.display());
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Write samples as 16-bit WAV, peak-normalized to full scale so quiet
/// dictation stays intelligible to the transcription model.
fn write_normalized_wav(path: &Path, spec: SinkSpec, samples: &[f32]) -> Result<()> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    let scale = if peak > 0.0 { 1.0 / peak } else { 1.0 };

    let mut writer = hound::WavWriter::create(path, spec.wav_spec())
        .with_context(|| format!("failed to create WAV {}", path.display()))?;
    for &s in samples {
        writer
            .write_sample(f32_to_i16(s * scale))
            .context("failed to write sample")?;
    }
    writer.finalize().context("failed to finalize WAV")?;
    Ok(())
}

/// Temp-file path for a new recording, named by capture kind and timestamp.
pub fn temp_recording_path(kind: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    std::env::temp_dir().join(format!("hark_{kind}_{stamp}.wav"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: SinkSpec = SinkSpec {
        sample_rate: 48_000,
        channels: 1,
    };

    #[test]
    fn test_memory_sink_normalizes_peak() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictation.wav");
        let mut sink = PcmSink::memory(path.clone(), SPEC);
        sink.append_samples(&[0.0, 0.25, -0.5]).unwrap();
        let asset = sink.finalize().unwrap();

        let mut reader = hound::WavReader::open(&asset.path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 3);
        // Peak of 0.5 scaled to full range.
        assert_eq!(samples[2], -i16::MAX);
        assert_eq!(samples[1], i16::MAX / 2);
    }

    #[test]
    fn test_bytes_roundtrip_into_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.wav");
        let mut sink = PcmSink::wav_file(path.clone(), SPEC).unwrap();

        let frames: Vec<u8> = [100i16, -200, 300]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        sink.append_bytes(&frames).unwrap();
        assert_eq!(sink.data_bytes(), 6);

        let asset = sink.finalize().unwrap();
        let mut reader = hound::WavReader::open(&asset.path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, -200, 300]);
    }

    #[test]
    fn test_clear_restarts_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.wav");
        let mut sink = PcmSink::wav_file(path, SPEC).unwrap();

        sink.append_bytes(&[1, 0, 2, 0, 3, 0, 4, 0]).unwrap();
        sink.clear().unwrap();
        assert_eq!(sink.data_bytes(), 0);
        sink.append_bytes(&[7, 0]).unwrap();

        let asset = sink.finalize().unwrap();
        let mut reader = hound::WavReader::open(&asset.path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![7]);
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.wav");
        let sink = PcmSink::wav_file(path.clone(), SPEC).unwrap();
        sink.discard();
        assert!(!path.exists());
    }
}
