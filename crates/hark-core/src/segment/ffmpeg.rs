//! FFmpeg/ffprobe subprocess plumbing for transcoding and chunk cutting.

use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::SegmentError;

/// Verify the external tools exist before any pipeline work begins.
pub fn ensure_tools() -> Result<(), SegmentError> {
    for tool in ["ffmpeg", "ffprobe"] {
        let available = Command::new(tool)
            .arg("-version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !available {
            return Err(SegmentError::MissingTool(tool));
        }
    }
    Ok(())
}

/// Stream attributes ffprobe reports for an audio file.
#[derive(Debug, Clone, Copy)]
pub struct ProbeInfo {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: String,
}

#[derive(Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    sample_rate: Option<String>,
    #[serde(default)]
    channels: Option<u16>,
}

/// Probe duration and stream attributes.
pub fn probe(path: &Path) -> Result<ProbeInfo, SegmentError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate,channels",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        return Err(SegmentError::Tool {
            tool: "ffprobe",
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let parsed: FfprobeOutput =
        serde_json::from_slice(&output.stdout).map_err(|err| SegmentError::Probe {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    let duration_secs = parsed
        .format
        .duration
        .parse::<f64>()
        .map_err(|err| SegmentError::Probe {
            path: path.to_path_buf(),
            reason: format!("bad duration: {err}"),
        })?;

    let stream = parsed.streams.first();
    Ok(ProbeInfo {
        duration_secs,
        sample_rate: stream
            .and_then(|s| s.sample_rate.as_deref())
            .and_then(|r| r.parse().ok())
            .unwrap_or(0),
        channels: stream.and_then(|s| s.channels).unwrap_or(1),
    })
}

/// Transcode to mono MP3 at the given bitrate. This runs at most once per
/// asset; chunks are cut from the result with stream copy.
pub fn compress_to_mp3(src: &Path, dest: &Path, bitrate_kbps: u32) -> Result<(), SegmentError> {
    debug!("compressing {} -> {}", src.display(), dest.display());
    run_ffmpeg(|cmd| {
        cmd.arg("-i")
            .arg(src)
            .args(["-ac", "1", "-codec:a", "libmp3lame"])
            .arg("-b:a")
            .arg(format!("{bitrate_kbps}k"))
            .arg("-y")
            .arg(dest);
    })
}

/// Cut a time window out of an asset without re-encoding.
pub fn cut(src: &Path, start_secs: f64, len_secs: f64, dest: &Path) -> Result<(), SegmentError> {
    run_ffmpeg(|cmd| {
        cmd.arg("-ss")
            .arg(format!("{start_secs:.3}"))
            .arg("-i")
            .arg(src)
            .arg("-t")
            .arg(format!("{len_secs:.3}"))
            .args(["-c", "copy", "-y"])
            .arg(dest);
    })
}

fn run_ffmpeg(configure: impl FnOnce(&mut Command)) -> Result<(), SegmentError> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error"]);
    configure(&mut cmd);

    let output = cmd.output()?;
    if !output.status.success() {
        return Err(SegmentError::Tool {
            tool: "ffmpeg",
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}
