//! Microphone capture source built on cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{CaptureError, CaptureSource, SourceFeed};
use crate::audio::SinkSpec;

/// Stream errors per recording session. ALSA-style underruns are common and
/// non-fatal; only the first is logged, the rest are counted.
static STREAM_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

/// Captures from a local input device, downmixing to mono at the device's
/// native sample rate.
pub struct MicrophoneSource {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<cpal::Stream>,
}

impl MicrophoneSource {
    /// Open the named input device (or the system default). Device and
    /// format discovery happen here so a missing microphone fails the
    /// session before any state changes.
    pub fn new(device_name: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::SourceUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::SourceUnavailable(format!("input device '{name}' not found"))
                })?,
            None => host.default_input_device().ok_or_else(|| {
                CaptureError::SourceUnavailable("no default input device".to_string())
            })?,
        };

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::SourceUnavailable(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
        })
    }

    fn build_stream<T>(&self, feed: SourceFeed) -> Result<cpal::Stream, CaptureError>
    where
        T: cpal::SizedSample,
        f32: cpal::FromSample<T>,
    {
        let channels = self.config.channels as usize;

        let err_fn = |err| {
            let count = STREAM_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
            if count == 0 {
                debug!("audio stream error (non-fatal, further occurrences suppressed): {err}");
            }
        };

        self.device
            .build_input_stream(
                &self.config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = data
                        .chunks(channels)
                        .map(|frame| {
                            frame
                                .iter()
                                .map(|&s| <f32 as cpal::Sample>::from_sample(s))
                                .sum::<f32>()
                                / channels as f32
                        })
                        .collect();
                    feed.append_samples(&mono);
                },
                err_fn,
                None,
            )
            .map_err(|e| CaptureError::SourceUnavailable(e.to_string()))
    }
}

impl CaptureSource for MicrophoneSource {
    fn spec(&self) -> SinkSpec {
        SinkSpec {
            sample_rate: self.config.sample_rate,
            channels: 1,
        }
    }

    fn start(&mut self, feed: SourceFeed) -> Result<(), CaptureError> {
        STREAM_ERROR_COUNT.store(0, Ordering::Relaxed);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(feed)?,
            SampleFormat::I16 => self.build_stream::<i16>(feed)?,
            SampleFormat::U16 => self.build_stream::<u16>(feed)?,
            other => {
                return Err(CaptureError::SourceUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| CaptureError::SourceUnavailable(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the stream stops the callback thread.
        self.stream.take();
    }
}
