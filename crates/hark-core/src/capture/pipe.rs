//! Subprocess capture source: an external helper streams raw PCM on stdout
//! until terminated.

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CaptureError, CaptureSource, SourceFeed};
use crate::audio::SinkSpec;

/// Grace period for the helper to flush and exit after SIGTERM, and for the
/// reader thread to drain to EOF.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 4096;

/// Spawns a capture helper binary and drains its stdout into the feed.
pub struct PipeSource {
    helper: PathBuf,
    spec: SinkSpec,
    child: Option<Child>,
    reader_done: Option<Receiver<()>>,
}

impl PipeSource {
    pub fn new(helper: PathBuf, spec: SinkSpec) -> Self {
        Self {
            helper,
            spec,
            child: None,
            reader_done: None,
        }
    }
}

impl CaptureSource for PipeSource {
    fn spec(&self) -> SinkSpec {
        self.spec
    }

    fn start(&mut self, feed: SourceFeed) -> Result<(), CaptureError> {
        if !self.helper.is_file() {
            return Err(CaptureError::SourceUnavailable(format!(
                "capture helper not found at {}",
                self.helper.display()
            )));
        }

        let mut child = Command::new(&self.helper)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CaptureError::SourceUnavailable(format!(
                    "failed to launch {}: {e}",
                    self.helper.display()
                ))
            })?;

        // The helper logs diagnostics on stderr; drain them into the log so
        // the pipe never fills.
        if let Some(stderr) = child.stderr.take() {
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!("capture helper: {line}");
                }
            });
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::SourceUnavailable("helper stdout missing".to_string()))?;

        let (done_tx, done_rx) = bounded(1);
        std::thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => feed.append_bytes(&buf[..n]),
                    Err(err) => {
                        debug!("capture pipe read failed: {err}");
                        break;
                    }
                }
            }
            let _ = done_tx.send(());
        });

        self.child = Some(child);
        self.reader_done = Some(done_rx);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            terminate_with_grace(&mut child);
        }

        // Join the reader with a bounded wait; abandon it rather than hang
        // the controller if the pipe refuses to close.
        if let Some(done) = self.reader_done.take() {
            match done.recv_timeout(SHUTDOWN_GRACE) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) => {
                    warn!("capture reader did not exit within grace period, abandoning");
                }
            }
        }
    }
}

impl Drop for PipeSource {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.stop();
        }
    }
}

/// SIGTERM, bounded wait, then SIGKILL.
fn terminate_with_grace(child: &mut Child) {
    #[cfg(unix)]
    {
        use std::time::Instant;

        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
        }
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("capture helper exited: {status}");
                    return;
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                Err(err) => {
                    debug!("capture helper wait failed: {err}");
                    break;
                }
            }
        }
        warn!("capture helper ignored SIGTERM, killing");
    }

    if let Err(err) = child.kill() {
        debug!("capture helper kill failed: {err}");
    }
    let _ = child.wait();
}
