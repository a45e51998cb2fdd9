//! Frame loop with statum lifecycle states.
//!
//! Two states: Idle (no device detected, sampling continues passively) and
//! Active (full pipeline runs). The transition happens on the first
//! successful sample. There is no transition back: a sampling gap after a
//! device has been seen is treated as transient noise, the frame is skipped
//! and the loop stays active.

use statum::{machine, state};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::PipelineError;
use crate::controller::{InputSnapshot, SnapshotSource};
use crate::encoding::EncodingPolicy;
use crate::link::{SubmitOutcome, Transmitter};

/// One display refresh worth of scheduling, produced by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTick;

#[state]
#[derive(Debug, Clone)]
pub enum PipelineState {
    Idle,
    Active,
}

/// Frame-driven pipeline over one snapshot source, one encoding policy and
/// one transmitter.
#[machine]
pub struct FramePipeline<S: PipelineState> {
    source: Box<dyn SnapshotSource>,
    policy: EncodingPolicy,
    transmitter: Transmitter,
    frames: mpsc::Receiver<FrameTick>,
    snapshot_tx: watch::Sender<Option<InputSnapshot>>,
}

impl FramePipeline<Idle> {
    /// Creates the pipeline plus the snapshot watch for the display surface.
    pub fn create(
        source: Box<dyn SnapshotSource>,
        policy: EncodingPolicy,
        transmitter: Transmitter,
        frames: mpsc::Receiver<FrameTick>,
    ) -> (Self, watch::Receiver<Option<InputSnapshot>>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        (
            Self::new(source, policy, transmitter, frames, snapshot_tx),
            snapshot_rx,
        )
    }

    /// Samples passively until a device appears, then runs the full pipeline
    /// until shutdown.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<(), PipelineError> {
        info!("Pipeline idle, waiting for an input device ({} encoding)", self.policy);

        let first = loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received while idle");
                    return Ok(());
                }
                tick = self.frames.recv() => {
                    if tick.is_none() {
                        return Err(PipelineError::FrameSourceClosed(
                            "frame channel closed while idle".to_string(),
                        ));
                    }
                    if let Some(snapshot) = self.source.sample() {
                        break snapshot;
                    }
                }
            }
        };

        info!(
            "Input device detected, pipeline active (link {})",
            if self.transmitter.is_linked() { "up" } else { "down" }
        );
        let mut active: FramePipeline<Active> = self.transition();
        active.process_frame(Some(first));
        active.run_active(shutdown_rx).await
    }
}

impl FramePipeline<Active> {
    /// Runs one frame's sample through encoding and submission.
    ///
    /// Nothing here suspends; a frame's failure never prevents the next
    /// frame from being scheduled.
    fn process_frame(&mut self, snapshot: Option<InputSnapshot>) {
        let Some(snapshot) = snapshot else {
            // Transient sampling gap; keep the last published snapshot.
            debug!("No sample this frame");
            return;
        };

        self.snapshot_tx.send_replace(Some(snapshot.clone()));

        match self.policy.encode(&snapshot) {
            Some(payload) => match self.transmitter.submit(payload) {
                SubmitOutcome::Written => {
                    debug!(
                        "Submitted {:?} (captured {})",
                        payload.as_bytes(),
                        snapshot.captured_at.format("%H:%M:%S%.3f")
                    );
                }
                SubmitOutcome::SkippedNoLink => {
                    debug!("No link established, command dropped");
                }
            },
            None => {
                debug!("Frame skipped: malformed axis data");
            }
        }
    }

    async fn run_active(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<(), PipelineError> {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                tick = self.frames.recv() => {
                    if tick.is_none() {
                        return Err(PipelineError::FrameSourceClosed(
                            "frame channel closed".to_string(),
                        ));
                    }
                    let snapshot = self.source.sample();
                    self.process_frame(snapshot);
                }
            }
        }
    }
}

/// Handle for the pipeline task.
///
/// Tearing down the owning context must go through [`shutdown`], which
/// cancels the frame callback chain so a detached context is never sampled.
///
/// [`shutdown`]: PipelineHandle::shutdown
pub struct PipelineHandle {
    task: Option<JoinHandle<Result<(), PipelineError>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    snapshot_rx: watch::Receiver<Option<InputSnapshot>>,
}

impl PipelineHandle {
    pub fn spawn(
        source: Box<dyn SnapshotSource>,
        policy: EncodingPolicy,
        transmitter: Transmitter,
        frames: mpsc::Receiver<FrameTick>,
    ) -> Self {
        let (pipeline, snapshot_rx) = FramePipeline::create(source, policy, transmitter, frames);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let result = pipeline.run_until_shutdown(shutdown_rx).await;
            if let Err(ref e) = result {
                error!("Pipeline stopped: {}", e);
            }
            result
        });

        Self {
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            snapshot_rx,
        }
    }

    /// Latest snapshot for the display surface; `None` until a device has
    /// been seen. The surface reads, it never feeds back.
    pub fn subscribe(&self) -> watch::Receiver<Option<InputSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Signals the loop and waits for the task to finish.
    pub async fn shutdown(&mut self) -> Result<(), PipelineError> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                debug!("Pipeline task already terminated");
            }
        }

        match self.task.take() {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::TaskError(format!(
                    "pipeline task panicked: {}",
                    e
                ))),
            },
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CommandPayload;
    use crate::link::{TransmitterHandle, TransmitterSettings};
    use crate::test_support::{RecordingSession, ScriptedSource};
    use std::time::Duration;

    fn snapshot(x: f32, y: f32) -> InputSnapshot {
        InputSnapshot::new(vec![x, y], [false; 4])
    }

    async fn tick(frames: &mpsc::Sender<FrameTick>) {
        frames.send(FrameTick).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn idle_frames_produce_no_writes() {
        let (session, log) = RecordingSession::new();
        let mut link = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let (frame_tx, frame_rx) = mpsc::channel(1);

        let source = ScriptedSource::new(vec![None, None]);
        let mut pipeline = PipelineHandle::spawn(
            Box::new(source),
            EncodingPolicy::Discrete,
            link.transmitter(),
            frame_rx,
        );

        tick(&frame_tx).await;
        tick(&frame_tx).await;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(*pipeline.subscribe().borrow(), None);

        pipeline.shutdown().await.unwrap();
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_sample_activates_and_transmits() {
        let (session, log) = RecordingSession::new();
        let mut link = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let (frame_tx, frame_rx) = mpsc::channel(1);

        let source = ScriptedSource::new(vec![None, Some(snapshot(0.95, 0.0))]);
        let mut pipeline = PipelineHandle::spawn(
            Box::new(source),
            EncodingPolicy::Discrete,
            link.transmitter(),
            frame_rx,
        );

        tick(&frame_tx).await;
        tick(&frame_tx).await;

        let writes = log.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, CommandPayload::single(b'B').as_bytes());
        drop(writes);

        assert!(pipeline.subscribe().borrow().is_some());

        pipeline.shutdown().await.unwrap();
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sampling_gap_keeps_pipeline_active() {
        let (session, log) = RecordingSession::new();
        let mut link = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let (frame_tx, frame_rx) = mpsc::channel(1);

        // Device appears, vanishes for a frame, then comes back.
        let source = ScriptedSource::new(vec![
            Some(snapshot(0.95, 0.0)),
            None,
            Some(snapshot(-0.95, 0.0)),
        ]);
        let mut pipeline = PipelineHandle::spawn(
            Box::new(source),
            EncodingPolicy::Discrete,
            link.transmitter(),
            frame_rx,
        );

        tick(&frame_tx).await;
        tick(&frame_tx).await;
        tick(&frame_tx).await;

        let writes = log.lock().unwrap();
        let codes: Vec<_> = writes.iter().map(|(_, bytes)| bytes[0]).collect();
        assert_eq!(codes, vec![b'B', b'D']);
        drop(writes);

        // The last good snapshot stays published across the gap.
        assert!(pipeline.subscribe().borrow().is_some());

        pipeline.shutdown().await.unwrap();
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_suppressed() {
        let (session, log) = RecordingSession::new();
        let mut link = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let (frame_tx, frame_rx) = mpsc::channel(1);

        let source = ScriptedSource::new(vec![
            Some(snapshot(0.95, 0.0)),
            Some(InputSnapshot::new(vec![], [true; 4])),
        ]);
        let mut pipeline = PipelineHandle::spawn(
            Box::new(source),
            EncodingPolicy::Discrete,
            link.transmitter(),
            frame_rx,
        );

        tick(&frame_tx).await;
        tick(&frame_tx).await;

        assert_eq!(log.lock().unwrap().len(), 1);

        pipeline.shutdown().await.unwrap();
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pipeline_runs_without_a_link() {
        let link = TransmitterHandle::detached();
        let (frame_tx, frame_rx) = mpsc::channel(1);

        let source = ScriptedSource::new(vec![Some(snapshot(0.0, -0.5))]);
        let mut pipeline = PipelineHandle::spawn(
            Box::new(source),
            EncodingPolicy::Radial,
            link.transmitter(),
            frame_rx,
        );

        tick(&frame_tx).await;

        // Snapshot still reaches the display surface; the command is dropped.
        assert!(pipeline.subscribe().borrow().is_some());

        pipeline.shutdown().await.unwrap();
    }
}
