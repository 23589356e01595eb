use std::fs;
use std::sync::Arc;

use chrono::Utc;

use crate::assembly::assembler::TimelapseAssembler;
use crate::models::config::CaptureConfiguration;
use crate::models::error::{ConfigError, SessionError};
use crate::models::session_result::{AssemblyOutcome, FrameError, SessionResult};
use crate::models::state::SessionPhase;
use crate::scheduling::cancel::CancellationToken;
use crate::scheduling::scheduler::{CaptureScheduler, SessionPlan};
use crate::storage::frame_store::FrameStore;
use crate::storage::manifest::{write_manifest, SessionManifest};
use crate::traits::frame_sequencer::FrameSequencer;
use crate::traits::session_observer::SessionObserver;
use crate::traits::snapshot_provider::SnapshotProvider;

/// Top-level orchestrator: capture loop, then optional assembly.
///
/// Generic over the snapshot and encoding backends:
/// ```text
/// [SnapshotProvider] → CaptureScheduler → FrameStore ─┐
///                                                      ├→ TimelapseAssembler → [FrameSequencer]
///                              CaptureConfiguration ───┘
/// ```
/// The configuration is fixed at construction; nothing is read from globals,
/// so several sessions can live in one process.
pub struct Session<P: SnapshotProvider, S: FrameSequencer> {
    config: CaptureConfiguration,
    scheduler: CaptureScheduler<P>,
    sequencer: S,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl<P: SnapshotProvider, S: FrameSequencer> Session<P, S> {
    pub fn new(config: CaptureConfiguration, provider: P, sequencer: S) -> Self {
        Self {
            config,
            scheduler: CaptureScheduler::new(provider),
            sequencer,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.scheduler.set_observer(Arc::clone(&observer));
        self.observer = Some(observer);
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    /// Run the session to completion or cancellation.
    ///
    /// Never panics on capture or assembly failures; everything ends up in
    /// the returned `SessionResult`.
    pub fn execute(&self, cancel: &CancellationToken) -> SessionResult {
        let session_id = uuid::Uuid::new_v4().to_string();
        let config = &self.config;

        self.set_phase(SessionPhase::Validating);
        if let Err(error) = self.preflight() {
            log::error!("Session {} rejected: {}", session_id, error);
            let result = SessionResult::rejected(session_id, SessionError::Config(error));
            self.finish(&result);
            return result;
        }

        let started_at = Utc::now();
        let plan = SessionPlan::from_config(config);
        log::info!(
            "Session {} capturing {} frames from {} every {:.1}s into {}",
            session_id,
            plan.attempts,
            config.source_address,
            config.interval.as_secs_f64(),
            config.output_directory.display()
        );

        let store = FrameStore::new();
        let outcome = self.scheduler.run(&plan, &store, cancel);

        let frames = store.frames();
        let succeeded = store.success_count() as u64;
        let attempted = frames.len() as u64;
        let frame_errors: Vec<FrameError> = frames
            .iter()
            .filter_map(|f| {
                f.failure_reason().map(|reason| FrameError {
                    sequence: f.sequence,
                    reason: reason.to_string(),
                })
            })
            .collect();

        let fatal_error = outcome.fatal.map(SessionError::CapabilityFatal);

        let assembly = if fatal_error.is_some() {
            AssemblyOutcome::NotRun
        } else if !config.timelapse_enabled {
            AssemblyOutcome::Disabled
        } else if succeeded == 0 {
            log::warn!("No frames captured; nothing to assemble");
            AssemblyOutcome::SkippedNoFrames
        } else {
            self.assemble(&store)
        };

        let mut result = SessionResult {
            session_id,
            started_at,
            finished_at: Utc::now(),
            planned: outcome.planned,
            attempted,
            succeeded,
            failed: attempted - succeeded,
            frame_errors,
            cancelled: outcome.cancelled,
            fatal_error,
            assembly,
            manifest_path: None,
        };

        let manifest = SessionManifest::from_session(config, &frames, &result);
        match write_manifest(&manifest, &config.output_directory) {
            Ok(path) => result.manifest_path = Some(path),
            Err(e) => log::error!("Failed to write session manifest: {}", e),
        }

        self.finish(&result);
        result
    }

    fn preflight(&self) -> Result<(), ConfigError> {
        self.config.validate()?;

        let dir = &self.config.output_directory;
        let unusable = |message: String| ConfigError::OutputDirectory {
            path: dir.clone(),
            message,
        };
        fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
        let meta = fs::metadata(dir).map_err(|e| unusable(e.to_string()))?;
        if meta.permissions().readonly() {
            return Err(unusable("directory is read-only".into()));
        }
        Ok(())
    }

    fn assemble(&self, store: &FrameStore) -> AssemblyOutcome {
        let settings = &self.config.timelapse;
        let frames = store.list_successful();
        self.set_phase(SessionPhase::Assembling {
            frames: frames.len(),
        });

        let assembler = TimelapseAssembler::new(&self.sequencer, settings.mismatch_policy);
        match assembler.assemble(&frames, settings.fps, &settings.output_path) {
            Ok(video) => AssemblyOutcome::Completed(video),
            Err(error) => {
                log::error!("Timelapse assembly failed: {}", error);
                AssemblyOutcome::Failed(error)
            }
        }
    }

    fn finish(&self, result: &SessionResult) {
        let phase = match result.fatal_error {
            Some(ref error) => SessionPhase::Failed(error.clone()),
            None => SessionPhase::Completed,
        };
        self.set_phase(phase);
        if let Some(ref observer) = self.observer {
            observer.on_session_finished(result);
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        log::debug!("Session phase: {}", phase.name());
        if let Some(ref observer) = self.observer {
            observer.on_phase_changed(&phase);
        }
    }
}
