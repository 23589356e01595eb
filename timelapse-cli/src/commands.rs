use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use timelapse_core::models::config::DEFAULT_TIMELAPSE_FPS;
use timelapse_core::{
    read_manifest, AssemblyError, CancellationToken, CaptureConfiguration, ExitStatus, FrameStore,
    MismatchPolicy, Session, SessionResult, TimelapseAssembler,
};
use timelapse_ffmpeg::{FfmpegSequencer, FfmpegSnapshot};

use crate::observer::LogObserver;

/// Build a session from a config file and run it until done or cancelled.
pub fn run_session(config_path: &Path, cancel: &CancellationToken) -> Result<SessionResult> {
    let config = CaptureConfiguration::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let snapshot = FfmpegSnapshot::new(&config.ffmpeg_path, config.capture_timeout);
    let sequencer = FfmpegSequencer::new(&config.ffmpeg_path);
    let mut session = Session::new(config, snapshot, sequencer);
    session.set_observer(Arc::new(LogObserver));

    Ok(session.execute(cancel))
}

/// Options for re-assembling a previous session from its manifest.
pub struct AssembleOptions {
    pub manifest: PathBuf,
    pub fps: Option<f64>,
    pub output: Option<PathBuf>,
    pub lenient: bool,
    pub ffmpeg: PathBuf,
}

/// Re-run assembly over the successful frames recorded in a manifest.
pub fn assemble_from_manifest(options: &AssembleOptions) -> Result<ExitStatus> {
    let manifest = read_manifest(&options.manifest)
        .with_context(|| format!("reading {}", options.manifest.display()))?;
    let base_dir = options
        .manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let store = FrameStore::from_frames(manifest.frames_in(&base_dir));
    let frames = store.list_successful();

    let fps = options
        .fps
        .or_else(|| manifest.timelapse.as_ref().map(|t| t.fps))
        .unwrap_or(DEFAULT_TIMELAPSE_FPS);
    let output = options
        .output
        .clone()
        .or_else(|| manifest.timelapse.as_ref().map(|t| PathBuf::from(&t.path)))
        .unwrap_or_else(|| base_dir.join("timelapse.mp4"));
    let policy = if options.lenient {
        MismatchPolicy::Lenient
    } else {
        MismatchPolicy::Strict
    };

    log::info!(
        "Re-assembling session {} ({} of {} frames usable)",
        manifest.id,
        frames.len(),
        store.len()
    );

    let assembler = TimelapseAssembler::new(FfmpegSequencer::new(&options.ffmpeg), policy);
    match assembler.assemble(&frames, fps, &output) {
        Ok(video) => {
            println!(
                "timelapse: {} ({} frames, {} dropped, {}x{} @ {} fps)",
                video.path.display(),
                video.frame_count,
                video.dropped_frames,
                video.width,
                video.height,
                video.fps
            );
            Ok(ExitStatus::Success)
        }
        Err(AssemblyError::NoFrames) => {
            println!("timelapse: no frames to assemble");
            Ok(ExitStatus::NoFrames)
        }
        Err(error) => {
            eprintln!("timelapse failed: {}", error);
            Ok(ExitStatus::AssemblyFailed)
        }
    }
}
