pub mod activation;
pub mod audio;
pub mod capture;
pub mod clipboard;
pub mod meeting;
pub mod provider;
pub mod segment;
pub mod settings;
pub mod transcribe;

pub use activation::{
    ActivationConfig, ActivationEvent, ActivationKind, ActivationMachine, Command, KeyEvent,
    LatchProbe, SessionView,
};
pub use audio::{AudioAsset, AudioFormat, PcmSink, SinkSpec};
pub use capture::{
    CaptureError, CaptureSession, CaptureSource, MicrophoneSource, PipeSource, SessionKind,
    StopOutcome,
};
pub use clipboard::{copy_and_paste, copy_to_clipboard};
pub use meeting::{MeetingOutput, process_meeting};
pub use provider::{
    OpenAiProvider, ProviderError, TranscriptionBackend, TranscriptionRequest, TranscriptionResult,
    build_http_client,
};
pub use segment::{Chunk, SegmentError, probe_asset, segment_asset};
pub use settings::Settings;
pub use transcribe::{TranscribeError, transcribe_asset};
