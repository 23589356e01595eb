//! Subprocess runner shared by the snapshot and sequencer backends.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How an ffmpeg invocation ended.
#[derive(Debug)]
pub(crate) enum RunOutcome {
    Exited { status: ExitStatus, stderr: String },
    TimedOut,
}

/// Run `program args..` with stderr captured, killing it after `timeout`.
pub(crate) fn run(program: &Path, args: &[OsString], timeout: Option<Duration>) -> io::Result<RunOutcome> {
    log::debug!("Running {} {:?}", program.display(), args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain stderr on its own thread so a chatty child cannot block on a full pipe.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let deadline = timeout.map(|t| Instant::now() + t);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    Ok(match status {
        Some(status) => RunOutcome::Exited { status, stderr },
        None => RunOutcome::TimedOut,
    })
}

/// Last non-empty stderr line, which is where ffmpeg puts the actual error.
pub(crate) fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_line_skips_trailing_blanks() {
        let stderr = "Input #0, rtsp\n[rtsp @ 0x1] method DESCRIBE failed: 404 Not Found\n\n";
        assert_eq!(last_line(stderr), "[rtsp @ 0x1] method DESCRIBE failed: 404 Not Found");
        assert_eq!(last_line(""), "no error output");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run(Path::new("/nonexistent/bin/ffmpeg"), &[], None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
