//! End-to-end session runs against in-memory capture and encode fakes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::RgbImage;
use parking_lot::Mutex;

use timelapse_core::{
    read_manifest, AssemblyError, AssemblyOutcome, CancellationToken, CaptureConfiguration, CaptureError,
    ConfigError, EncodeError, ExitStatus, Frame, FrameSequencer, MismatchPolicy, SessionError, Session,
    SessionLength, SessionObserver, SessionPhase, SessionResult, SnapshotProvider, TimelapseSettings, Transport,
};

/// Writes a PNG of the configured size, or fails on the listed calls.
struct FakeCamera {
    calls: Arc<AtomicUsize>,
    failing_calls: Vec<usize>,
    odd_sized_call: Option<usize>,
    unwritable_call: Option<usize>,
}

impl FakeCamera {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            failing_calls: Vec::new(),
            odd_sized_call: None,
            unwritable_call: None,
        }
    }
}

impl SnapshotProvider for FakeCamera {
    fn capture(&self, source: &str, transport: Transport, destination: &Path) -> Result<(), CaptureError> {
        assert_eq!(source, "rtsp://camera.local/stream");
        assert_eq!(transport, Transport::Udp);
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unwritable_call == Some(call) {
            return Err(CaptureError::OutputUnwritable("disk full".into()));
        }
        if self.failing_calls.contains(&call) {
            return Err(CaptureError::Timeout(5.0));
        }
        let (w, h) = if self.odd_sized_call == Some(call) { (32, 24) } else { (16, 12) };
        // Frames carry the png format even though the name says jpg.
        RgbImage::new(w, h)
            .save_with_format(destination, image::ImageFormat::Png)
            .map_err(|e| CaptureError::Provider(e.to_string()))
    }
}

#[derive(Default)]
struct FakeMuxer {
    calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl FrameSequencer for FakeMuxer {
    fn encode(&self, frames: &[PathBuf], _fps: f64, output: &Path) -> Result<(), EncodeError> {
        self.calls.lock().push(frames.to_vec());
        fs::write(output, format!("{} frames", frames.len())).map_err(|e| EncodeError::Failed(e.to_string()))
    }
}

#[derive(Default)]
struct EventLog {
    phases: Mutex<Vec<String>>,
    frames: Mutex<Vec<u64>>,
    finished: AtomicUsize,
}

impl SessionObserver for EventLog {
    fn on_phase_changed(&self, phase: &SessionPhase) {
        self.phases.lock().push(phase.name().to_string());
    }

    fn on_frame_recorded(&self, frame: &Frame) {
        self.frames.lock().push(frame.sequence);
    }

    fn on_session_finished(&self, _result: &SessionResult) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

fn config(dir: &Path, length: SessionLength, interval: Duration) -> CaptureConfiguration {
    CaptureConfiguration {
        source_address: "rtsp://camera.local/stream".into(),
        transport: Transport::Udp,
        interval,
        length,
        output_directory: dir.join("frames"),
        timelapse: TimelapseSettings {
            fps: 24.0,
            output_path: dir.join("video").join("timelapse.mp4"),
            mismatch_policy: MismatchPolicy::Strict,
        },
        ..Default::default()
    }
}

#[test]
fn full_session_captures_and_assembles() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cfg = config(dir.path(), SessionLength::Attempts(4), Duration::from_millis(5));
    let mut session = Session::new(cfg.clone(), FakeCamera::new(Arc::clone(&calls)), FakeMuxer::default());
    let events = Arc::new(EventLog::default());
    session.set_observer(events.clone());

    let result = session.execute(&CancellationToken::new());

    assert_eq!(result.exit_status(), ExitStatus::Success);
    assert_eq!((result.planned, result.attempted, result.succeeded, result.failed), (4, 4, 4, 0));
    let video = result.assembly.video().unwrap();
    assert_eq!(video.frame_count, 4);
    assert_eq!((video.width, video.height), (16, 12));
    assert_eq!(fs::read_to_string(&cfg.timelapse.output_path).unwrap(), "4 frames");

    assert_eq!(*events.frames.lock(), vec![0, 1, 2, 3]);
    let phases = events.phases.lock().clone();
    assert_eq!(phases.first().map(String::as_str), Some("validating"));
    assert_eq!(phases.iter().filter(|p| *p == "capturing").count(), 4);
    assert!(phases.contains(&"assembling".to_string()));
    assert_eq!(phases.last().map(String::as_str), Some("completed"));
    assert_eq!(events.finished.load(Ordering::SeqCst), 1);

    let manifest = read_manifest(result.manifest_path.as_ref().unwrap()).unwrap();
    assert_eq!(manifest.id, result.session_id);
    assert_eq!(manifest.frames.len(), 4);
    assert_eq!(manifest.timelapse.unwrap().frame_count, 4);
}

#[test]
fn all_failures_skip_assembly_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut camera = FakeCamera::new(Arc::clone(&calls));
    camera.failing_calls = (0..6).collect();
    let cfg = config(dir.path(), SessionLength::Attempts(6), Duration::from_millis(2));
    let session = Session::new(cfg.clone(), camera, FakeMuxer::default());

    let result = session.execute(&CancellationToken::new());

    assert_eq!((result.attempted, result.succeeded, result.failed), (6, 0, 6));
    assert_eq!(result.assembly, AssemblyOutcome::SkippedNoFrames);
    assert!(result.fatal_error.is_none());
    assert_eq!(result.exit_status(), ExitStatus::NoFrames);
    assert_eq!(result.frame_errors.len(), 6);
    assert_eq!(result.frame_errors[0].reason, "capture timed out after 5.0s");
    assert!(!cfg.timelapse.output_path.exists());
}

#[test]
fn partial_failures_still_assemble_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut camera = FakeCamera::new(Arc::clone(&calls));
    camera.failing_calls = vec![1, 2];
    let session = Session::new(
        config(dir.path(), SessionLength::Attempts(5), Duration::from_millis(2)),
        camera,
        FakeMuxer::default(),
    );

    let result = session.execute(&CancellationToken::new());

    assert_eq!((result.attempted, result.succeeded, result.failed), (5, 3, 2));
    assert_eq!(result.exit_status(), ExitStatus::Success);
    assert_eq!(result.assembly.video().unwrap().frame_count, 3);
}

#[test]
fn mismatched_frame_fails_assembly_but_keeps_capture_counts() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut camera = FakeCamera::new(Arc::clone(&calls));
    camera.odd_sized_call = Some(2);
    let cfg = config(dir.path(), SessionLength::Attempts(4), Duration::from_millis(2));
    let session = Session::new(cfg.clone(), camera, FakeMuxer::default());

    let result = session.execute(&CancellationToken::new());

    assert_eq!((result.attempted, result.succeeded), (4, 4));
    assert!(matches!(
        result.assembly,
        AssemblyOutcome::Failed(AssemblyError::DimensionMismatch { actual_width: 32, .. })
    ));
    assert_eq!(result.exit_status(), ExitStatus::AssemblyFailed);
    assert!(!cfg.timelapse.output_path.exists());
}

#[test]
fn lenient_policy_from_config_drops_odd_frame() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut camera = FakeCamera::new(Arc::clone(&calls));
    camera.odd_sized_call = Some(1);
    let mut cfg = config(dir.path(), SessionLength::Attempts(4), Duration::from_millis(2));
    cfg.timelapse.mismatch_policy = MismatchPolicy::Lenient;
    let session = Session::new(cfg, camera, FakeMuxer::default());

    let result = session.execute(&CancellationToken::new());

    let video = result.assembly.video().unwrap();
    assert_eq!((video.frame_count, video.dropped_frames), (3, 1));
    assert_eq!(result.exit_status(), ExitStatus::Success);
}

#[test]
fn unwritable_output_mid_session_aborts_without_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut camera = FakeCamera::new(Arc::clone(&calls));
    camera.unwritable_call = Some(1);
    let cfg = config(dir.path(), SessionLength::Attempts(5), Duration::from_millis(2));
    let mut session = Session::new(cfg.clone(), camera, FakeMuxer::default());
    let events = Arc::new(EventLog::default());
    session.set_observer(events.clone());

    let result = session.execute(&CancellationToken::new());

    assert_eq!(
        result.fatal_error,
        Some(SessionError::CapabilityFatal(CaptureError::OutputUnwritable("disk full".into())))
    );
    assert_eq!(result.assembly, AssemblyOutcome::NotRun);
    assert_eq!(result.exit_status(), ExitStatus::Fatal);
    assert_eq!(result.exit_status().code(), 1);
    assert_eq!((result.planned, result.attempted, result.succeeded, result.failed), (5, 2, 1, 1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cfg.timelapse.output_path.exists());
    assert_eq!(events.phases.lock().last().map(String::as_str), Some("failed"));
    assert_eq!(events.finished.load(Ordering::SeqCst), 1);

    let manifest = read_manifest(result.manifest_path.as_ref().unwrap()).unwrap();
    assert_eq!(manifest.frames.len(), 2);
    assert!(manifest.timelapse.is_none());
    assert!(manifest.fatal_error.unwrap().contains("disk full"));
}

#[test]
fn invalid_configuration_fails_before_any_capture() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let session = Session::new(
        config(dir.path(), SessionLength::Attempts(0), Duration::from_secs(1)),
        FakeCamera::new(Arc::clone(&calls)),
        FakeMuxer::default(),
    );

    let result = session.execute(&CancellationToken::new());

    assert!(matches!(result.fatal_error, Some(SessionError::Config(ConfigError::Invalid(_)))));
    assert_eq!(result.exit_status(), ExitStatus::Fatal);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("frames").exists());
}

#[test]
fn output_directory_that_is_a_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    fs::write(dir.path().join("frames"), b"in the way").unwrap();
    let session = Session::new(
        config(dir.path(), SessionLength::Attempts(2), Duration::from_millis(1)),
        FakeCamera::new(Arc::clone(&calls)),
        FakeMuxer::default(),
    );

    let result = session.execute(&CancellationToken::new());

    assert!(matches!(
        result.fatal_error,
        Some(SessionError::Config(ConfigError::OutputDirectory { .. }))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn cancellation_during_wait_stops_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let session = Session::new(
        config(dir.path(), SessionLength::Duration(Duration::from_secs(600)), Duration::from_secs(60)),
        FakeCamera::new(Arc::clone(&calls)),
        FakeMuxer::default(),
    );
    let token = CancellationToken::new();
    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        remote.cancel();
    });

    let start = Instant::now();
    let result = session.execute(&token);
    canceller.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(result.cancelled);
    assert_eq!(result.planned, 11);
    assert_eq!(result.attempted, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Whatever was captured before the cancel is still assembled.
    assert_eq!(result.assembly.video().unwrap().frame_count, 1);
}

#[test]
fn disabled_timelapse_only_captures() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut cfg = config(dir.path(), SessionLength::Attempts(2), Duration::from_millis(1));
    cfg.timelapse_enabled = false;
    let muxer = FakeMuxer::default();
    let session = Session::new(cfg, FakeCamera::new(Arc::clone(&calls)), &muxer);

    let result = session.execute(&CancellationToken::new());

    assert_eq!(result.assembly, AssemblyOutcome::Disabled);
    assert_eq!(result.exit_status(), ExitStatus::Success);
    assert!(muxer.calls.lock().is_empty());
}
