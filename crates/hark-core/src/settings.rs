//! Daemon settings: JSON file on disk with environment overrides.
//!
//! Every tunable the pipeline consumes (upload budgets, gesture timing,
//! output paths) lives here so behavior can be adjusted without code changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level settings, one section per concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub limits: UploadLimits,
    #[serde(default)]
    pub gesture: GestureSettings,
    #[serde(default)]
    pub notes: NotesSettings,
}

/// Remote speech-to-text API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API key; the `OPENAI_API_KEY` environment variable takes precedence.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Transcription endpoint (any OpenAI-compatible server works).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional language hint (e.g. "en", "sv").
    #[serde(default)]
    pub language: Option<String>,
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Microphone device name (None = system default).
    #[serde(default)]
    pub microphone_device: Option<String>,

    /// Path to the system-audio capture helper used for meeting recording.
    /// The helper writes raw PCM to stdout until terminated.
    #[serde(default = "default_capture_helper")]
    pub capture_helper: PathBuf,

    /// Play audible cues on recording start/stop.
    #[serde(default = "default_true")]
    pub play_cues: bool,

    /// Recordings with fewer payload bytes than this are discarded.
    #[serde(default = "default_min_recording_bytes")]
    pub min_recording_bytes: u64,

    /// Sample rate of the capture helper's PCM stream.
    #[serde(default = "default_pipe_sample_rate")]
    pub pipe_sample_rate: u32,

    /// Channel count of the capture helper's PCM stream.
    #[serde(default = "default_pipe_channels")]
    pub pipe_channels: u16,
}

/// Remote upload budgets and the compression policy derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum payload size the API accepts per request.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Maximum audio duration the API accepts per request, in seconds.
    #[serde(default = "default_max_chunk_secs")]
    pub max_chunk_secs: f64,

    /// Sub-1.0 multiplier applied to computed chunk durations, leaving
    /// headroom for encoder and container overhead.
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,

    /// Bitrate (kbps) of the mono MP3 produced when compression is needed.
    #[serde(default = "default_compress_bitrate")]
    pub compress_bitrate_kbps: u32,
}

/// Key bindings and gesture timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureSettings {
    /// The latching toggle key that starts/stops dictation.
    #[serde(default = "default_toggle_key")]
    pub toggle_key: String,

    /// Cancels an active dictation immediately, discarding audio.
    #[serde(default = "default_cancel_key")]
    pub cancel_key: String,

    /// Clears the dictation buffer without stopping capture.
    #[serde(default = "default_clear_key")]
    pub clear_key: String,

    /// Pause after a raw key event before re-querying the latched state,
    /// compensating for OS update latency.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Two toggle presses within this window count as one double-tap.
    #[serde(default = "default_double_tap_window_ms")]
    pub double_tap_window_ms: u64,

    /// Whether double-tap toggles meeting recording.
    #[serde(default = "default_true")]
    pub double_tap_enabled: bool,
}

/// Meeting transcript output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesSettings {
    /// Directory where meeting transcripts (and debug audio) are written.
    #[serde(default = "default_notes_dir")]
    pub notes_dir: PathBuf,

    /// Keep the raw meeting WAV alongside the transcript (debug mode).
    #[serde(default)]
    pub keep_audio: bool,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_model() -> String {
    "whisper-1".to_string()
}

fn default_capture_helper() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hark")
        .join("hark-audio-capture")
}

fn default_true() -> bool {
    true
}

fn default_min_recording_bytes() -> u64 {
    1000
}

fn default_pipe_sample_rate() -> u32 {
    48_000
}

fn default_pipe_channels() -> u16 {
    1
}

fn default_max_upload_bytes() -> u64 {
    25 * 1024 * 1024
}

fn default_max_chunk_secs() -> f64 {
    600.0
}

fn default_safety_margin() -> f64 {
    0.95
}

fn default_compress_bitrate() -> u32 {
    64
}

fn default_toggle_key() -> String {
    "CapsLock".to_string()
}

fn default_cancel_key() -> String {
    "Escape".to_string()
}

fn default_clear_key() -> String {
    "Backspace".to_string()
}

fn default_settle_delay_ms() -> u64 {
    10
}

fn default_double_tap_window_ms() -> u64 {
    600
}

fn default_notes_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("notes")
        .join("meetings")
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            language: None,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            microphone_device: None,
            capture_helper: default_capture_helper(),
            play_cues: true,
            min_recording_bytes: default_min_recording_bytes(),
            pipe_sample_rate: default_pipe_sample_rate(),
            pipe_channels: default_pipe_channels(),
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_chunk_secs: default_max_chunk_secs(),
            safety_margin: default_safety_margin(),
            compress_bitrate_kbps: default_compress_bitrate(),
        }
    }
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            toggle_key: default_toggle_key(),
            cancel_key: default_cancel_key(),
            clear_key: default_clear_key(),
            settle_delay_ms: default_settle_delay_ms(),
            double_tap_window_ms: default_double_tap_window_ms(),
            double_tap_enabled: true,
        }
    }
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self {
            notes_dir: default_notes_dir(),
            keep_audio: false,
        }
    }
}

impl Settings {
    /// Path of the settings file (`<config dir>/hark/settings.json`).
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hark").join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults when the file is
    /// missing. A `.env` file is honored before environment lookups.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        let Some(path) = Self::path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::warn!("ignoring malformed {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Resolve the API key: environment first, then the settings file.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
        {
            return Ok(key);
        }
        self.api
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .context("no API key configured: set OPENAI_API_KEY or api.api_key in settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_spec_values() {
        let s = Settings::default();
        assert_eq!(s.limits.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(s.limits.max_chunk_secs, 600.0);
        assert_eq!(s.limits.safety_margin, 0.95);
        assert_eq!(s.limits.compress_bitrate_kbps, 64);
        assert_eq!(s.gesture.settle_delay_ms, 10);
        assert_eq!(s.gesture.double_tap_window_ms, 600);
        assert_eq!(s.audio.min_recording_bytes, 1000);
        assert_eq!(s.audio.pipe_sample_rate, 48_000);
        assert_eq!(s.audio.pipe_channels, 1);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Settings =
            serde_json::from_str(r#"{"limits": {"max_upload_bytes": 1048576}}"#).unwrap();
        assert_eq!(parsed.limits.max_upload_bytes, 1024 * 1024);
        assert_eq!(parsed.limits.max_chunk_secs, 600.0);
        assert_eq!(parsed.gesture.toggle_key, "CapsLock");
    }
}
