//! Clipboard delivery for dictation results: copy, then synthesize the
//! platform paste chord into the focused application.

use anyhow::{Context, Result};
use arboard::Clipboard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings as EnigoSettings};

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("failed to access clipboard")?;
    clipboard
        .set_text(text)
        .context("failed to copy text to clipboard")?;
    Ok(())
}

/// Send the paste keystroke (Cmd+V on macOS, Ctrl+V elsewhere).
pub fn paste_from_clipboard() -> Result<()> {
    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    let mut enigo =
        Enigo::new(&EnigoSettings::default()).context("failed to initialize input synthesis")?;
    enigo
        .key(modifier, Direction::Press)
        .context("failed to press paste modifier")?;
    let result = enigo
        .key(Key::Unicode('v'), Direction::Click)
        .context("failed to send paste key");
    enigo
        .key(modifier, Direction::Release)
        .context("failed to release paste modifier")?;
    result?;
    Ok(())
}

/// Copy with a trailing space (so consecutive dictations flow together) and
/// paste into the active application.
pub fn copy_and_paste(text: &str) -> Result<()> {
    copy_to_clipboard(&format!("{text} "))?;
    paste_from_clipboard()
}
