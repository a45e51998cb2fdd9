//! Rate-limited transmitter with latest-wins semantics.
//!
//! Submissions land in a single-slot mailbox (capacity 1, overwrite on
//! arrival) drained by one writer task that owns the link session and the
//! throttle state. The slot is the whole concurrency control: there is
//! exactly one writer path per session, and stale state is never transmitted
//! after newer state exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::LinkSession;
use crate::encoding::CommandPayload;

/// Transmitter settings
#[derive(Clone, Debug)]
pub struct TransmitterSettings {
    /// Minimum spacing between consecutive writes on one session.
    ///
    /// Respects the peripheral's receive bandwidth; typical deployments sit
    /// in the 5-10 ms range.
    pub min_interval: Duration,
}

impl Default for TransmitterSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(8),
        }
    }
}

/// Outcome of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted into the live link's latest-wins slot. A deferred payload
    /// may still be superseded before it reaches the air.
    Written,

    /// No link session established (never attached, shut down, or marked
    /// dead after a write failure). The payload is dropped, not queued.
    SkippedNoLink,
}

struct Shared {
    slot: watch::Sender<Option<CommandPayload>>,
    link_up: AtomicBool,
}

/// Submission side of the transmitter. Cheap to clone; `submit` never blocks
/// or suspends the caller.
#[derive(Clone)]
pub struct Transmitter {
    shared: Arc<Shared>,
}

impl Transmitter {
    pub fn submit(&self, payload: CommandPayload) -> SubmitOutcome {
        if !self.shared.link_up.load(Ordering::Acquire) {
            return SubmitOutcome::SkippedNoLink;
        }
        self.shared.slot.send_replace(Some(payload));
        SubmitOutcome::Written
    }

    pub fn is_linked(&self) -> bool {
        self.shared.link_up.load(Ordering::Acquire)
    }
}

/// Lifecycle handle for the writer task bound to one link session.
pub struct TransmitterHandle {
    transmitter: Transmitter,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TransmitterHandle {
    /// Spawns the writer task that owns `session` and its throttle state.
    pub fn spawn(session: Box<dyn LinkSession>, settings: TransmitterSettings) -> Self {
        let (slot, slot_rx) = watch::channel(None);
        let shared = Arc::new(Shared {
            slot,
            link_up: AtomicBool::new(true),
        });
        let cancel = CancellationToken::new();

        info!(
            "Spawning transmitter for {} (min interval {:?})",
            session.peripheral(),
            settings.min_interval
        );
        let task = tokio::spawn(write_loop(
            session,
            settings.min_interval,
            slot_rx,
            shared.clone(),
            cancel.clone(),
        ));

        Self {
            transmitter: Transmitter { shared },
            cancel,
            task: Some(task),
        }
    }

    /// Handle with no session attached; every submission reports
    /// [`SubmitOutcome::SkippedNoLink`].
    pub fn detached() -> Self {
        let (slot, _slot_rx) = watch::channel(None);
        Self {
            transmitter: Transmitter {
                shared: Arc::new(Shared {
                    slot,
                    link_up: AtomicBool::new(false),
                }),
            },
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Submission side for the pipeline.
    pub fn transmitter(&self) -> Transmitter {
        self.transmitter.clone()
    }

    /// Cancels the writer, aborting an in-flight wait-then-write, and joins
    /// the task.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Transmitter task panicked during shutdown: {}", e);
            }
        }
        self.transmitter
            .shared
            .link_up
            .store(false, Ordering::Release);
    }
}

async fn write_loop(
    mut session: Box<dyn LinkSession>,
    min_interval: Duration,
    mut slot_rx: watch::Receiver<Option<CommandPayload>>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    // None = no prior write; the first submission goes out immediately.
    let mut last_write: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = slot_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        // Wait out the remainder of the interval before draining the slot,
        // so a payload submitted during the wait supersedes the one that
        // woke us.
        if let Some(issued) = last_write {
            let elapsed = issued.elapsed();
            if elapsed < min_interval {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(min_interval - elapsed) => {}
                }
            }
        }

        let payload = match *slot_rx.borrow_and_update() {
            Some(payload) => payload,
            None => continue,
        };

        // Stamped at the moment the write is issued, not when it completes.
        last_write = Some(Instant::now());

        tokio::select! {
            _ = cancel.cancelled() => break,
            result = session.write(payload.as_bytes()) => {
                match result {
                    Ok(()) => {
                        debug!("Transmitted {:?} to {}", payload.as_bytes(), session.peripheral());
                    }
                    Err(e) => {
                        // No retry, no reconnection; the remedy is a manual
                        // reconnect outside this subsystem.
                        warn!("Link write failed, marking link down: {}", e);
                        break;
                    }
                }
            }
        }
    }

    shared.link_up.store(false, Ordering::Release);
    debug!("Transmitter writer task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingSession, RecordingSession};

    fn payload(code: u8) -> CommandPayload {
        CommandPayload::single(code)
    }

    #[tokio::test(start_paused = true)]
    async fn first_submission_writes_immediately() {
        let (session, log) = RecordingSession::new();
        let mut handle = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let tx = handle.transmitter();

        assert_eq!(tx.submit(payload(b'A')), SubmitOutcome::Written);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let writes = log.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, vec![b'A']);
        drop(writes);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_writes_respect_min_interval() {
        let (session, log) = RecordingSession::new();
        let settings = TransmitterSettings {
            min_interval: Duration::from_millis(10),
        };
        let mut handle = TransmitterHandle::spawn(Box::new(session), settings);
        let tx = handle.transmitter();

        for code in [b'1', b'2', b'3', b'4'] {
            tx.submit(payload(code));
            tokio::time::sleep(Duration::from_millis(3)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let writes = log.lock().unwrap();
        assert!(writes.len() >= 2);
        for pair in writes.windows(2) {
            assert!(
                pair[1].0 - pair[0].0 >= Duration::from_millis(10),
                "writes spaced {:?} apart",
                pair[1].0 - pair[0].0
            );
        }
        drop(writes);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn window_collapses_to_latest_submission() {
        let (session, log) = RecordingSession::new();
        let settings = TransmitterSettings {
            min_interval: Duration::from_millis(10),
        };
        let mut handle = TransmitterHandle::spawn(Box::new(session), settings);
        let tx = handle.transmitter();

        // Baseline write at t=0 opens the throttle window.
        tx.submit(payload(b'0'));
        tokio::task::yield_now().await;

        // Two submissions inside the window; only the second may survive.
        tx.submit(payload(b'1'));
        tokio::time::sleep(Duration::from_millis(3)).await;
        tx.submit(payload(b'2'));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let writes = log.lock().unwrap();
        assert_eq!(writes.len(), 2, "one baseline write plus one for the window");
        assert_eq!(writes[1].1, vec![b'2']);
        assert_eq!(writes[1].0 - writes[0].0, Duration::from_millis(10));
        drop(writes);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn detached_handle_skips_without_blocking() {
        let handle = TransmitterHandle::detached();
        let tx = handle.transmitter();

        assert_eq!(tx.submit(payload(b'A')), SubmitOutcome::SkippedNoLink);
        assert!(!tx.is_linked());
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_marks_link_down() {
        let session = FailingSession;
        let mut handle = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let tx = handle.transmitter();

        assert_eq!(tx.submit(payload(b'A')), SubmitOutcome::Written);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(!tx.is_linked());
        assert_eq!(tx.submit(payload(b'B')), SubmitOutcome::SkippedNoLink);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_further_writes() {
        let (session, log) = RecordingSession::new();
        let mut handle = TransmitterHandle::spawn(Box::new(session), TransmitterSettings::default());
        let tx = handle.transmitter();

        handle.shutdown().await;

        assert_eq!(tx.submit(payload(b'A')), SubmitOutcome::SkippedNoLink);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(log.lock().unwrap().is_empty());
    }
}
