//! OS keyboard adapter: global key-event listener and latched-state probes.
//!
//! This is the boundary to the OS. Raw events cross into the daemon as
//! timestamped [`KeyEvent`]s over a channel; the authoritative latch query
//! is a [`LatchProbe`] the state machine consults after the settle delay.

use anyhow::{Result, anyhow};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::error;

use hark_core::{KeyEvent, LatchProbe};

/// Resolved key bindings from the settings strings.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub toggle: rdev::Key,
    pub cancel: rdev::Key,
    pub clear: rdev::Key,
}

impl KeyBindings {
    pub fn from_settings(gesture: &hark_core::settings::GestureSettings) -> Result<Self> {
        Ok(Self {
            toggle: parse_key(&gesture.toggle_key)?,
            cancel: parse_key(&gesture.cancel_key)?,
            clear: parse_key(&gesture.clear_key)?,
        })
    }
}

/// Parse a settings key name into an rdev key.
pub fn parse_key(name: &str) -> Result<rdev::Key> {
    use rdev::Key;
    let key = match name.to_lowercase().replace(['-', '_', ' '], "").as_str() {
        "capslock" => Key::CapsLock,
        "escape" | "esc" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" => Key::Delete,
        "tab" => Key::Tab,
        "numlock" => Key::NumLock,
        "scrolllock" => Key::ScrollLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        other => return Err(anyhow!("unsupported key binding: '{other}'")),
    };
    Ok(key)
}

/// Start the global key listener on its own thread.
///
/// Toggle presses flip the parity mirror *before* the event is queued so a
/// settle-delayed probe read already sees the post-press state.
pub fn spawn_listener(
    bindings: KeyBindings,
    tx: Sender<(KeyEvent, Instant)>,
    parity: Arc<AtomicBool>,
) -> Result<()> {
    std::thread::Builder::new()
        .name("hark-keys".to_string())
        .spawn(move || {
            let result = rdev::listen(move |event| {
                let rdev::EventType::KeyPress(key) = event.event_type else {
                    return;
                };
                let classified = if key == bindings.toggle {
                    parity.fetch_xor(true, Ordering::SeqCst);
                    Some(KeyEvent::TogglePressed)
                } else if key == bindings.cancel {
                    Some(KeyEvent::CancelPressed)
                } else if key == bindings.clear {
                    Some(KeyEvent::ClearPressed)
                } else {
                    None
                };
                if let Some(ev) = classified {
                    let _ = tx.send((ev, Instant::now()));
                }
            });
            if let Err(err) = result {
                // Without key events the daemon is inert; better to die
                // loudly than to sit deaf.
                error!(
                    "keyboard listener failed: {err:?} (is input monitoring permitted for this process?)"
                );
                std::process::exit(1);
            }
        })?;
    Ok(())
}

/// Latch probe reading the keyboard LED state the kernel exposes. This is
/// the authoritative source where available.
#[cfg(target_os = "linux")]
struct LedProbe {
    brightness: std::path::PathBuf,
}

#[cfg(target_os = "linux")]
impl LedProbe {
    fn discover() -> Option<Self> {
        let entries = std::fs::read_dir("/sys/class/leds").ok()?;
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().contains("capslock") {
                return Some(Self {
                    brightness: entry.path().join("brightness"),
                });
            }
        }
        None
    }
}

#[cfg(target_os = "linux")]
impl LatchProbe for LedProbe {
    fn is_latched(&self) -> bool {
        std::fs::read_to_string(&self.brightness)
            .map(|s| s.trim() != "0")
            .unwrap_or(false)
    }
}

/// Fallback probe mirroring toggle-press parity. Used where the OS exposes
/// no direct latch query to this process.
struct ParityProbe {
    state: Arc<AtomicBool>,
}

impl LatchProbe for ParityProbe {
    fn is_latched(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }
}

/// Pick the best available latch probe for this platform.
pub fn latch_probe(parity: Arc<AtomicBool>) -> Box<dyn LatchProbe> {
    #[cfg(target_os = "linux")]
    if let Some(led) = LedProbe::discover() {
        tracing::debug!("using LED latch probe at {}", led.brightness.display());
        return Box::new(led);
    }
    Box::new(ParityProbe { state: parity })
}
