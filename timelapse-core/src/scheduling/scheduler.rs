use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};

use crate::models::config::{CaptureConfiguration, Transport};
use crate::models::error::CaptureError;
use crate::models::frame::{frame_identifier, Frame};
use crate::models::state::SessionPhase;
use crate::scheduling::cancel::CancellationToken;
use crate::storage::frame_store::FrameStore;
use crate::traits::session_observer::SessionObserver;
use crate::traits::snapshot_provider::SnapshotProvider;

/// Everything the capture loop needs, fixed for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub source_address: String,
    pub transport: Transport,
    pub interval: Duration,
    pub attempts: u64,
    pub output_directory: PathBuf,
    pub frame_extension: String,
}

impl SessionPlan {
    pub fn from_config(config: &CaptureConfiguration) -> Self {
        Self {
            source_address: config.source_address.clone(),
            transport: config.transport,
            interval: config.interval,
            attempts: config.planned_attempts(),
            output_directory: config.output_directory.clone(),
            frame_extension: config.frame_extension.clone(),
        }
    }

    fn destination(&self, identifier: &str) -> PathBuf {
        self.output_directory
            .join(format!("{}.{}", identifier, self.frame_extension))
    }
}

/// How the capture loop ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    pub planned: u64,
    pub attempted: u64,
    pub cancelled: bool,
    /// Capability-level failure that stopped the loop early.
    pub fatal: Option<CaptureError>,
}

/// Drives capture attempts on a fixed-rate timeline.
///
/// Attempt `i` starts no earlier than `start + i * interval`. Captures are
/// strictly sequential; a slow capture eats into the following wait rather
/// than shifting every later slot. Each slot gets exactly one attempt.
pub struct CaptureScheduler<P: SnapshotProvider> {
    provider: P,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl<P: SnapshotProvider> CaptureScheduler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observer = Some(observer);
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run every planned attempt, recording each outcome into `store`.
    ///
    /// Single capture failures are recorded and never propagated. The loop
    /// stops early only when `cancel` fires (checked before every capture
    /// and during every wait) or when a capture reports a fatal error.
    pub fn run(
        &self,
        plan: &SessionPlan,
        store: &FrameStore,
        cancel: &CancellationToken,
    ) -> ScheduleOutcome {
        let mut outcome = ScheduleOutcome {
            planned: plan.attempts,
            attempted: 0,
            cancelled: false,
            fatal: None,
        };

        let start = Instant::now();
        let mut next_slot = start;

        for sequence in 0..plan.attempts {
            if cancel.is_cancelled() {
                log::info!("Capture cancelled before attempt {}", sequence + 1);
                outcome.cancelled = true;
                break;
            }

            self.notify_phase(SessionPhase::Capturing {
                attempt: sequence + 1,
                total: plan.attempts,
            });

            let (frame, error) = self.attempt(plan, sequence);
            store.record(frame.clone());
            outcome.attempted += 1;
            if let Some(ref observer) = self.observer {
                observer.on_frame_recorded(&frame);
            }

            if let Some(error) = error.filter(CaptureError::is_fatal) {
                log::error!("Aborting capture loop: {}", error);
                outcome.fatal = Some(error);
                break;
            }

            if sequence + 1 < plan.attempts {
                let cancelled = match next_slot.checked_add(plan.interval) {
                    Some(deadline) => {
                        next_slot = deadline;
                        cancel.wait_until(deadline)
                    }
                    // The next slot lies beyond the clock's range; it never arrives.
                    None => {
                        cancel.wait();
                        true
                    }
                };
                if cancelled {
                    log::info!("Capture cancelled after {} attempts", outcome.attempted);
                    outcome.cancelled = true;
                    break;
                }
            }
        }

        log::debug!(
            "Capture loop finished in {:.1}s ({} of {} attempts)",
            start.elapsed().as_secs_f64(),
            outcome.attempted,
            outcome.planned
        );
        outcome
    }

    /// One capture slot. Returns the frame to record and, on failure, the error.
    fn attempt(&self, plan: &SessionPlan, sequence: u64) -> (Frame, Option<CaptureError>) {
        let now = Local::now();
        let destination = plan.destination(&frame_identifier(sequence, now));
        let captured_at = now.with_timezone(&Utc);

        let result = ensure_directory_writable(&plan.output_directory)
            .and_then(|()| {
                self.provider
                    .capture(&plan.source_address, plan.transport, &destination)
            })
            .and_then(|()| confirm_written(&destination));

        match result {
            Ok(()) => {
                log::info!("Snapshot {} saved to {}", sequence, destination.display());
                (Frame::success(sequence, captured_at, destination), None)
            }
            Err(error) => {
                log::warn!("Snapshot {} failed: {}", sequence, error);
                // Never leave a partial file where someone might pick it up.
                if destination.exists() {
                    let _ = fs::remove_file(&destination);
                }
                let frame = Frame::failed(sequence, captured_at, destination, error.to_string());
                (frame, Some(error))
            }
        }
    }

    fn notify_phase(&self, phase: SessionPhase) {
        if let Some(ref observer) = self.observer {
            observer.on_phase_changed(&phase);
        }
    }
}

fn ensure_directory_writable(dir: &Path) -> Result<(), CaptureError> {
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => Err(CaptureError::OutputUnwritable(format!(
            "{} is not a directory",
            dir.display()
        ))),
        Ok(meta) if meta.permissions().readonly() => Err(CaptureError::OutputUnwritable(format!(
            "{} is read-only",
            dir.display()
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CaptureError::OutputUnwritable(format!("{}: {}", dir.display(), e))),
    }
}

/// A provider's `Ok` only counts once the file is on disk and non-empty.
fn confirm_written(path: &Path) -> Result<(), CaptureError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(CaptureError::MissingOutput(path.to_path_buf())),
    }
}
