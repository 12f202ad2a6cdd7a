//! Audible recording cues.
//!
//! Playback goes through the system player (`afplay` on macOS, `paplay`
//! elsewhere) as a fire-and-forget subprocess so the event thread never
//! waits on audio output.

use std::process::{Command, Stdio};

/// Cue sounds for recording lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    RecordingStart,
    RecordingStop,
    Error,
}

impl Cue {
    #[cfg(target_os = "macos")]
    fn sound_path(&self) -> &'static str {
        match self {
            Cue::RecordingStart => "/System/Library/PrivateFrameworks/AssistantServices.framework/Versions/A/Resources/dt-begin.caf",
            Cue::RecordingStop => "/System/Library/PrivateFrameworks/AssistantServices.framework/Versions/A/Resources/dt-confirm.caf",
            Cue::Error => "/System/Library/Sounds/Basso.aiff",
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn sound_path(&self) -> &'static str {
        match self {
            Cue::RecordingStart => "/usr/share/sounds/freedesktop/stereo/audio-volume-change.oga",
            Cue::RecordingStop => "/usr/share/sounds/freedesktop/stereo/complete.oga",
            Cue::Error => "/usr/share/sounds/freedesktop/stereo/dialog-error.oga",
        }
    }
}

#[cfg(target_os = "macos")]
const PLAYER: &str = "afplay";

#[cfg(not(target_os = "macos"))]
const PLAYER: &str = "paplay";

/// Play a cue without blocking. Missing player or sound file is a debug-level
/// event only; cues are convenience, not correctness.
pub fn play(cue: Cue) {
    let path = cue.sound_path();
    if !std::path::Path::new(path).exists() {
        tracing::debug!("cue sound missing: {path}");
        return;
    }

    match Command::new(PLAYER)
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(mut child) => {
            // Reap the player off-thread so it doesn't zombie.
            std::thread::spawn(move || {
                let _ = child.wait();
            });
        }
        Err(err) => tracing::debug!("could not play cue via {PLAYER}: {err}"),
    }
}
