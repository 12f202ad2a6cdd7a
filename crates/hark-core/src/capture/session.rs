//! One active recording: owns the sink, gates frame delivery, finalizes
//! or discards the resulting asset.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{CaptureError, CaptureSource, SessionKind, StopOutcome};
use crate::audio::{PcmSink, cue, temp_recording_path};

/// Lifecycle state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopping,
}

struct FeedShared {
    recording: AtomicBool,
    sink: Mutex<Option<PcmSink>>,
}

/// Cloneable handle a source uses to deliver frames.
///
/// Appends are dropped once the session leaves `Recording`: the flag is
/// cleared before the sink is taken, and the sink mutex serializes any
/// in-flight append against finalization.
#[derive(Clone)]
pub struct SourceFeed {
    shared: Arc<FeedShared>,
}

impl SourceFeed {
    pub fn append_samples(&self, samples: &[f32]) {
        if !self.shared.recording.load(Ordering::Acquire) {
            return;
        }
        if let Some(sink) = self.shared.sink.lock().unwrap().as_mut()
            && let Err(err) = sink.append_samples(samples)
        {
            debug!("dropping frames: {err}");
        }
    }

    pub fn append_bytes(&self, bytes: &[u8]) {
        if !self.shared.recording.load(Ordering::Acquire) {
            return;
        }
        if let Some(sink) = self.shared.sink.lock().unwrap().as_mut()
            && let Err(err) = sink.append_bytes(bytes)
        {
            debug!("dropping frames: {err}");
        }
    }

    /// Whether the owning session is still recording.
    pub fn is_live(&self) -> bool {
        self.shared.recording.load(Ordering::Acquire)
    }
}

/// Manages the lifecycle of one recording of a given kind.
pub struct CaptureSession {
    kind: SessionKind,
    state: SessionState,
    shared: Arc<FeedShared>,
    source: Option<Box<dyn CaptureSource>>,
    started_at: Option<Instant>,
    min_recording_bytes: u64,
    play_cues: bool,
}

impl CaptureSession {
    pub fn new(kind: SessionKind, min_recording_bytes: u64, play_cues: bool) -> Self {
        Self {
            kind,
            state: SessionState::Idle,
            shared: Arc::new(FeedShared {
                recording: AtomicBool::new(false),
                sink: Mutex::new(None),
            }),
            source: None,
            started_at: None,
            min_recording_bytes,
            play_cues,
        }
    }

    /// Read-only state query for collaborators.
    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Open the source and begin recording into a fresh sink.
    ///
    /// A source startup failure aborts before any state mutation; the
    /// session stays `Idle` and nothing is left on disk.
    pub fn start(&mut self, source: Box<dyn CaptureSource>) -> Result<(), CaptureError> {
        if self.state != SessionState::Idle {
            return Err(CaptureError::AlreadyRecording(self.kind));
        }

        let spec = source.spec();
        let path = temp_recording_path(self.kind.label());
        let sink = match self.kind {
            SessionKind::Dictation => PcmSink::memory(path, spec),
            SessionKind::Meeting => PcmSink::wav_file(path, spec).map_err(CaptureError::Other)?,
        };

        *self.shared.sink.lock().unwrap() = Some(sink);
        self.shared.recording.store(true, Ordering::Release);

        let mut source = source;
        if let Err(err) = source.start(SourceFeed {
            shared: Arc::clone(&self.shared),
        }) {
            self.shared.recording.store(false, Ordering::Release);
            if let Some(sink) = self.shared.sink.lock().unwrap().take() {
                sink.discard();
            }
            return Err(err);
        }

        self.source = Some(source);
        self.state = SessionState::Recording;
        self.started_at = Some(Instant::now());
        info!("{} recording started", self.kind);

        if self.play_cues {
            cue::play(cue::Cue::RecordingStart);
        }
        Ok(())
    }

    /// Discard everything buffered so far; capture keeps running.
    pub fn clear_buffer(&mut self) {
        if self.state != SessionState::Recording {
            return;
        }
        if let Some(sink) = self.shared.sink.lock().unwrap().as_mut() {
            if let Err(err) = sink.clear() {
                warn!("failed to clear {} buffer: {err}", self.kind);
            } else {
                info!("{} buffer cleared", self.kind);
            }
        }
    }

    /// Stop recording and finalize the asset. Idempotent: a second call is a
    /// no-op reporting [`StopOutcome::Idle`].
    pub fn stop(&mut self) -> Result<StopOutcome> {
        if self.state != SessionState::Recording {
            return Ok(StopOutcome::Idle);
        }
        self.state = SessionState::Stopping;

        // Clear the gate before touching the source so frames racing the
        // shutdown are dropped, not appended to a closing sink.
        self.shared.recording.store(false, Ordering::Release);
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
        let sink = self.shared.sink.lock().unwrap().take();
        let elapsed = self.started_at.take().map(|t| t.elapsed());

        self.state = SessionState::Idle;

        if self.play_cues {
            cue::play(cue::Cue::RecordingStop);
        }

        let Some(sink) = sink else {
            return Ok(StopOutcome::Idle);
        };

        if sink.data_bytes() < self.min_recording_bytes {
            warn!(
                "{} recording too short ({} bytes), discarding",
                self.kind,
                sink.data_bytes()
            );
            sink.discard();
            return Ok(StopOutcome::TooShort);
        }

        let asset = sink.finalize()?;
        info!(
            "{} recording finalized after {:.1?}: {} ({:.1}s, {} bytes)",
            self.kind,
            elapsed.unwrap_or_default(),
            asset.path.display(),
            asset.duration_secs,
            asset.size_bytes
        );
        Ok(StopOutcome::Finished(asset))
    }

    /// Stop recording and discard all captured audio.
    pub fn cancel(&mut self) {
        if self.state != SessionState::Recording {
            return;
        }
        self.state = SessionState::Stopping;
        self.shared.recording.store(false, Ordering::Release);
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
        if let Some(sink) = self.shared.sink.lock().unwrap().take() {
            sink.discard();
        }
        self.state = SessionState::Idle;
        self.started_at = None;
        info!("{} recording cancelled, audio discarded", self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SinkSpec;

    /// Pushes a fixed byte payload through the feed when started.
    struct ScriptedSource {
        payload: Vec<u8>,
        fail_start: bool,
    }

    impl ScriptedSource {
        fn new(payload: Vec<u8>) -> Self {
            Self {
                payload,
                fail_start: false,
            }
        }
    }

    impl CaptureSource for ScriptedSource {
        fn spec(&self) -> SinkSpec {
            SinkSpec {
                sample_rate: 48_000,
                channels: 1,
            }
        }

        fn start(&mut self, feed: SourceFeed) -> Result<(), CaptureError> {
            if self.fail_start {
                return Err(CaptureError::SourceUnavailable("scripted failure".into()));
            }
            feed.append_bytes(&self.payload);
            Ok(())
        }

        fn stop(&mut self) {}
    }

    fn session() -> CaptureSession {
        CaptureSession::new(SessionKind::Meeting, 1000, false)
    }

    #[test]
    fn test_start_twice_reports_already_recording() {
        let mut s = session();
        s.start(Box::new(ScriptedSource::new(vec![0; 4096]))).unwrap();
        let err = s
            .start(Box::new(ScriptedSource::new(vec![])))
            .unwrap_err();
        assert!(matches!(err, CaptureError::AlreadyRecording(_)));
        s.cancel();
    }

    #[test]
    fn test_stop_finalizes_and_is_idempotent() {
        let mut s = session();
        s.start(Box::new(ScriptedSource::new(vec![1; 4096]))).unwrap();
        assert!(s.is_recording());

        let outcome = s.stop().unwrap();
        let StopOutcome::Finished(asset) = outcome else {
            panic!("expected finished asset");
        };
        assert!(asset.path.exists());
        assert_eq!(asset.size_bytes, 4096 + 44); // payload + WAV header

        // Second stop is a no-op.
        assert!(matches!(s.stop().unwrap(), StopOutcome::Idle));
        asset.delete();
    }

    #[test]
    fn test_short_recording_is_discarded() {
        let mut s = session();
        s.start(Box::new(ScriptedSource::new(vec![1; 100]))).unwrap();
        let outcome = s.stop().unwrap();
        assert!(matches!(outcome, StopOutcome::TooShort));
    }

    #[test]
    fn test_late_frames_are_dropped_after_stop() {
        let mut s = session();
        let mut src = ScriptedSource::new(vec![1; 4096]);
        src.fail_start = false;
        s.start(Box::new(src)).unwrap();

        // Grab a second feed handle the way a reader thread would hold one.
        let feed = SourceFeed {
            shared: Arc::clone(&s.shared),
        };
        let StopOutcome::Finished(asset) = s.stop().unwrap() else {
            panic!("expected finished asset");
        };
        let before = std::fs::metadata(&asset.path).unwrap().len();

        // Frames after stop must not land anywhere.
        feed.append_bytes(&[9; 512]);
        assert!(!feed.is_live());
        assert_eq!(std::fs::metadata(&asset.path).unwrap().len(), before);
        asset.delete();
    }

    #[test]
    fn test_failed_source_start_leaves_session_idle() {
        let mut s = session();
        let mut src = ScriptedSource::new(vec![]);
        src.fail_start = true;
        let err = s.start(Box::new(src)).unwrap_err();
        assert!(matches!(err, CaptureError::SourceUnavailable(_)));
        assert!(!s.is_recording());
        // A fresh start must succeed after the failure.
        s.start(Box::new(ScriptedSource::new(vec![0; 2048]))).unwrap();
        s.cancel();
    }

    #[test]
    fn test_clear_buffer_keeps_recording() {
        let mut s = session();
        s.start(Box::new(ScriptedSource::new(vec![1; 4096]))).unwrap();
        s.clear_buffer();
        assert!(s.is_recording());

        // Only post-clear audio survives.
        let feed = SourceFeed {
            shared: Arc::clone(&s.shared),
        };
        feed.append_bytes(&[2; 2000]);
        let outcome = s.stop().unwrap();
        let StopOutcome::Finished(asset) = outcome else {
            panic!("expected finished asset");
        };
        assert_eq!(asset.size_bytes, 2000 + 44);
        asset.delete();
    }
}
