use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use image::ImageReader;
use sha2::{Digest, Sha256};

use crate::models::config::MismatchPolicy;
use crate::models::error::{AssemblyError, EncodeError};
use crate::models::frame::Frame;
use crate::models::session_result::TimelapseVideo;
use crate::traits::frame_sequencer::FrameSequencer;

/// Validated input for one sequencer call.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    pub frames: Vec<PathBuf>,
    pub fps: f64,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub dropped_frames: usize,
}

/// Validates captured frames and stitches them into one video.
///
/// The first frame fixes the reference dimensions. Under
/// `MismatchPolicy::Strict` any frame that differs (or cannot be decoded)
/// fails the whole assembly before the sequencer runs, so no output file is
/// produced. Under `MismatchPolicy::Lenient` such frames are dropped with a
/// warning and counted in `TimelapseVideo::dropped_frames`.
pub struct TimelapseAssembler<S: FrameSequencer> {
    sequencer: S,
    policy: MismatchPolicy,
}

impl<S: FrameSequencer> TimelapseAssembler<S> {
    pub fn new(sequencer: S, policy: MismatchPolicy) -> Self {
        Self { sequencer, policy }
    }

    pub fn policy(&self) -> MismatchPolicy {
        self.policy
    }

    pub fn sequencer(&self) -> &S {
        &self.sequencer
    }

    /// Build the sequencer input from `frames`, which must already be in
    /// assembly order.
    pub fn prepare(&self, frames: &[Frame], fps: f64, output: &Path) -> Result<EncodePlan, AssemblyError> {
        let (first, rest) = frames.split_first().ok_or(AssemblyError::NoFrames)?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(AssemblyError::InvalidFrameRate(fps));
        }

        let (width, height) = read_dimensions(&first.path)?;
        let mut paths = Vec::with_capacity(frames.len());
        paths.push(first.path.clone());
        let mut dropped_frames = 0;

        for frame in rest {
            let checked = read_dimensions(&frame.path).and_then(|(w, h)| {
                if (w, h) == (width, height) {
                    Ok(())
                } else {
                    Err(AssemblyError::DimensionMismatch {
                        path: frame.path.clone(),
                        expected_width: width,
                        expected_height: height,
                        actual_width: w,
                        actual_height: h,
                    })
                }
            });

            match (checked, self.policy) {
                (Ok(()), _) => paths.push(frame.path.clone()),
                (Err(error), MismatchPolicy::Strict) => return Err(error),
                (Err(error), MismatchPolicy::Lenient) => {
                    log::warn!("Dropping frame {}: {}", frame.sequence, error);
                    dropped_frames += 1;
                }
            }
        }

        Ok(EncodePlan {
            frames: paths,
            fps,
            output_path: output.to_path_buf(),
            width,
            height,
            dropped_frames,
        })
    }

    /// Validate `frames` and encode them, in order, into `output`.
    pub fn assemble(&self, frames: &[Frame], fps: f64, output: &Path) -> Result<TimelapseVideo, AssemblyError> {
        let plan = self.prepare(frames, fps, output)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AssemblyError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        log::info!(
            "Encoding {} frames ({}x{}) at {} fps into {}",
            plan.frames.len(),
            plan.width,
            plan.height,
            plan.fps,
            output.display()
        );

        let replacing = output.exists();
        let encoded = self
            .sequencer
            .encode(&plan.frames, plan.fps, output)
            .and_then(|()| match fs::metadata(output) {
                Ok(meta) if meta.len() > 0 => Ok(()),
                _ => Err(EncodeError::Failed("encoder produced no output".into())),
            });
        if let Err(error) = encoded {
            // A file that was there before the encoder ran is not ours to remove.
            if !replacing {
                discard_partial(output);
            }
            return Err(AssemblyError::EncodeFailure(error));
        }

        let checksum = sha256_file(output)?;
        log::info!("Timelapse video saved to {}", output.display());

        Ok(TimelapseVideo {
            path: plan.output_path,
            frame_count: plan.frames.len(),
            dropped_frames: plan.dropped_frames,
            width: plan.width,
            height: plan.height,
            fps: plan.fps,
            checksum,
        })
    }
}

/// Pixel dimensions from the image header.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32), AssemblyError> {
    let unreadable = |message: String| AssemblyError::UnreadableFrame {
        path: path.to_path_buf(),
        message,
    };
    ImageReader::open(path)
        .map_err(|e| unreadable(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| unreadable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| unreadable(e.to_string()))
}

fn discard_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            log::error!("Failed to remove partial output {}: {}", output.display(), e);
        }
    }
}

/// Hex SHA-256 digest of a file.
fn sha256_file(path: &Path) -> Result<String, AssemblyError> {
    let mut file = File::open(path)
        .map_err(|e| AssemblyError::Storage(format!("failed to open output for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| AssemblyError::Storage(format!("failed to read output for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
