//! Recording capture: session lifecycle and audio sources.

mod microphone;
mod pipe;
mod session;

use std::fmt;
use thiserror::Error;

pub use microphone::MicrophoneSource;
pub use pipe::PipeSource;
pub use session::{CaptureSession, SessionState, SourceFeed};

use crate::audio::SinkSpec;

/// The two capture kinds; at most one session of each may be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Dictation,
    Meeting,
}

impl SessionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Dictation => "dictation",
            SessionKind::Meeting => "meeting",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a {0} session is already recording")]
    AlreadyRecording(SessionKind),

    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result of stopping a session.
#[derive(Debug)]
pub enum StopOutcome {
    /// Recording finalized into an asset ready for transcription.
    Finished(crate::audio::AudioAsset),
    /// Recording was below the minimum viable size and was discarded.
    TooShort,
    /// No session was recording; the stop was a no-op.
    Idle,
}

/// A live audio source delivering frames into a [`SourceFeed`].
///
/// Sources are owned by the controller thread; frame delivery happens on the
/// source's own callback or reader thread through the feed handle.
pub trait CaptureSource {
    /// Sample format the source will deliver.
    fn spec(&self) -> SinkSpec;

    /// Begin delivering frames. A startup failure (device missing, helper
    /// binary absent) must leave no threads or processes behind.
    fn start(&mut self, feed: SourceFeed) -> Result<(), CaptureError>;

    /// Stop delivering frames, with a bounded grace period before force
    /// termination. Must be safe to call more than once.
    fn stop(&mut self);
}
