//! The daemon: keyboard events drive the activation machine, commands drive
//! the capture sessions, finished recordings go to the transcription worker.

use anyhow::{Context, Result};
use crossbeam_channel::{RecvTimeoutError, unbounded};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{error, info};

use hark_core::audio::cue;
use hark_core::{
    ActivationConfig, ActivationMachine, AudioAsset, CaptureError, CaptureSession, Command,
    MicrophoneSource, OpenAiProvider, PipeSource, SessionKind, SessionView, Settings, SinkSpec,
    StopOutcome, copy_and_paste, process_meeting, transcribe_asset,
};

use crate::keyboard::{self, KeyBindings};

pub fn run(settings: Settings) -> Result<()> {
    // Fail fast: a daemon without credentials can never deliver a result.
    let api_key = settings.resolve_api_key()?;

    let bindings = KeyBindings::from_settings(&settings.gesture)?;
    let (tx, rx) = unbounded();
    let parity = Arc::new(AtomicBool::new(false));
    keyboard::spawn_listener(bindings, tx, Arc::clone(&parity))?;

    let probe = keyboard::latch_probe(parity);
    let initially_latched = probe.is_latched();
    info!(
        "initial {} state: {}",
        settings.gesture.toggle_key,
        if initially_latched { "on" } else { "off" }
    );

    let mut machine = ActivationMachine::new(
        ActivationConfig::from_settings(&settings.gesture),
        initially_latched,
    );
    let mut controller = Controller::new(settings, api_key)?;

    info!("hark is ready");
    info!(
        "  toggle {} on/off to dictate, double-tap to toggle meeting recording",
        controller.settings.gesture.toggle_key
    );
    info!(
        "  {} cancels, {} clears the buffer mid-dictation",
        controller.settings.gesture.cancel_key, controller.settings.gesture.clear_key
    );

    loop {
        let received = match machine.next_deadline() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(ev) => Some(ev),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(ev) => Some(ev),
                Err(_) => break,
            },
        };

        let view = controller.view();
        let commands = match received {
            Some((event, at)) => machine.handle_key(event, at, view),
            None => machine.on_deadline(Instant::now(), probe.as_ref(), view),
        };
        for command in commands {
            controller.execute(command);
        }
    }

    Ok(())
}

/// Owns the capture sessions and the transcription worker runtime. All
/// session state is mutated from the event-loop thread only.
struct Controller {
    settings: Settings,
    api_key: String,
    dictation: CaptureSession,
    meeting: CaptureSession,
    runtime: tokio::runtime::Runtime,
}

impl Controller {
    fn new(settings: Settings, api_key: String) -> Result<Self> {
        let min_bytes = settings.audio.min_recording_bytes;
        let cues = settings.audio.play_cues;
        Ok(Self {
            dictation: CaptureSession::new(SessionKind::Dictation, min_bytes, cues),
            meeting: CaptureSession::new(SessionKind::Meeting, min_bytes, cues),
            runtime: tokio::runtime::Runtime::new()
                .context("failed to start transcription runtime")?,
            settings,
            api_key,
        })
    }

    fn view(&self) -> SessionView {
        SessionView {
            dictation_active: self.dictation.is_recording(),
            meeting_active: self.meeting.is_recording(),
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::StartDictation => self.start_dictation(),
            Command::StopDictation => match self.dictation.stop() {
                Ok(StopOutcome::Finished(asset)) => self.spawn_dictation_job(asset),
                Ok(StopOutcome::TooShort) | Ok(StopOutcome::Idle) => {}
                Err(err) => error!("failed to stop dictation: {err:#}"),
            },
            Command::CancelDictation => self.dictation.cancel(),
            Command::ClearDictationBuffer => self.dictation.clear_buffer(),
            Command::ToggleMeeting => self.toggle_meeting(),
        }
    }

    fn start_dictation(&mut self) {
        let source = match MicrophoneSource::new(self.settings.audio.microphone_device.as_deref())
        {
            Ok(source) => source,
            Err(err) => {
                error!("cannot start dictation: {err}");
                cue::play(cue::Cue::Error);
                return;
            }
        };
        match self.dictation.start(Box::new(source)) {
            Ok(()) => {}
            Err(CaptureError::AlreadyRecording(kind)) => {
                info!("ignoring start: {kind} session already recording");
            }
            Err(err) => {
                error!("cannot start dictation: {err}");
                cue::play(cue::Cue::Error);
            }
        }
    }

    fn toggle_meeting(&mut self) {
        if self.meeting.is_recording() {
            match self.meeting.stop() {
                Ok(StopOutcome::Finished(asset)) => self.spawn_meeting_job(asset),
                Ok(StopOutcome::TooShort) | Ok(StopOutcome::Idle) => {}
                Err(err) => error!("failed to stop meeting recording: {err:#}"),
            }
            return;
        }

        let spec = SinkSpec {
            sample_rate: self.settings.audio.pipe_sample_rate,
            channels: self.settings.audio.pipe_channels,
        };
        let source = PipeSource::new(self.settings.audio.capture_helper.clone(), spec);
        match self.meeting.start(Box::new(source)) {
            Ok(()) => {}
            Err(CaptureError::AlreadyRecording(kind)) => {
                info!("ignoring start: {kind} session already recording");
            }
            Err(err) => {
                error!("cannot start meeting recording: {err}");
                cue::play(cue::Cue::Error);
            }
        }
    }

    /// Transcribe a dictation asset off-thread and paste the result.
    fn spawn_dictation_job(&self, asset: AudioAsset) {
        let backend = OpenAiProvider::new(
            self.settings.api.api_url.clone(),
            self.settings.api.model.clone(),
        );
        let api_key = self.api_key.clone();
        let language = self.settings.api.language.clone();
        let limits = self.settings.limits.clone();

        self.runtime.spawn(async move {
            let client = match hark_core::build_http_client() {
                Ok(client) => client,
                Err(err) => {
                    error!("dictation failed: {err}");
                    cue::play(cue::Cue::Error);
                    return;
                }
            };
            match transcribe_asset(
                &backend,
                &client,
                &api_key,
                language.as_deref(),
                &limits,
                &asset,
            )
            .await
            {
                Ok(text) => {
                    asset.delete();
                    match copy_and_paste(&text) {
                        Ok(()) => info!("dictation pasted ({} chars)", text.len()),
                        Err(err) => error!("paste failed: {err:#}"),
                    }
                }
                Err(err) => {
                    // Leave the temp WAV so the take can be reprocessed with
                    // `hark transcribe`.
                    error!(
                        "dictation failed: {err:#} (audio kept at {})",
                        asset.path.display()
                    );
                    cue::play(cue::Cue::Error);
                }
            }
        });
    }

    /// Run the meeting pipeline off-thread: archive, transcribe, write notes.
    fn spawn_meeting_job(&self, asset: AudioAsset) {
        let backend = OpenAiProvider::new(
            self.settings.api.api_url.clone(),
            self.settings.api.model.clone(),
        );
        let api_key = self.api_key.clone();
        let settings = self.settings.clone();

        self.runtime.spawn(async move {
            let client = match hark_core::build_http_client() {
                Ok(client) => client,
                Err(err) => {
                    error!("meeting transcription failed: {err}");
                    cue::play(cue::Cue::Error);
                    return;
                }
            };
            match process_meeting(&backend, &client, &api_key, &settings, asset).await {
                Ok(output) => {
                    info!(
                        "meeting transcript ready: {}",
                        output.transcript_path.display()
                    );
                }
                Err(err) => {
                    error!("meeting transcription failed: {err:#}");
                    cue::play(cue::Cue::Error);
                }
            }
        });
    }
}
