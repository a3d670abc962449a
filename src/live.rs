// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Live polling loop: feeds camera frames to the classifier at a bounded rate
//!
//! One [`LiveSession`] owns one camera stream plus one cancellation signal.
//! Classification calls are strictly sequential and the next poll never
//! starts sooner than the configured interval after the previous one started,
//! which is what keeps the loop inside the inference engine's rate limits.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::camera::{CameraConstraints, CameraStream, MediaSource};
use crate::classifier::WasteClassifier;
use crate::taxonomy::ClassificationResult;

/// States of the polling loop
#[derive(Debug, Clone, PartialEq)]
pub enum LiveState {
    /// No media stream held
    Idle,
    /// Media stream acquisition in progress
    Acquiring,
    /// Stream acquired, about to enter the poll cycle
    Streaming,
    /// A classification call is in flight
    Polling,
    /// Pending re-poll timer armed
    Waiting,
    /// Session deactivated; timer cancelled, stream released
    Stopped,
    /// Terminal failure with a user-facing message; no auto-retry
    Error(String),
}

/// Tunables for a live session
#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Floor between consecutive poll starts
    pub poll_interval: Duration,
    /// Results at or below this confidence are not forwarded
    pub confidence_threshold: f64,
    /// Requested camera parameters
    pub constraints: CameraConstraints,
    /// When set, this many consecutive frame failures ends the session in
    /// `Error`. Unset means per-frame failures never surface.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            confidence_threshold: 0.3,
            constraints: CameraConstraints::default(),
            max_consecutive_failures: None,
        }
    }
}

type SharedStream = Arc<Mutex<Option<Box<dyn CameraStream>>>>;

/// One live classification session bound to one camera stream.
///
/// Created with [`start`](Self::start); ends via [`stop`](Self::stop), drop,
/// or a terminal error. Reactivation means constructing a new session;
/// nothing carries over.
pub struct LiveSession {
    id: Uuid,
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<LiveState>,
    stream: SharedStream,
    task: Option<JoinHandle<()>>,
}

impl LiveSession {
    /// Spawn the polling loop. Results clearing the confidence threshold are
    /// forwarded to `results`; everything else is logged and swallowed.
    pub fn start(
        media: Arc<dyn MediaSource>,
        classifier: Arc<WasteClassifier>,
        options: LiveOptions,
        results: mpsc::Sender<ClassificationResult>,
    ) -> Self {
        let id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(LiveState::Idle);
        let stream: SharedStream = Arc::new(Mutex::new(None));

        info!("Live session {} starting", id);

        let task = tokio::spawn(run_loop(
            id,
            media,
            classifier,
            options,
            results,
            cancel_rx,
            state_tx,
            stream.clone(),
        ));

        Self {
            id,
            cancel_tx,
            state_rx,
            stream,
            task: Some(task),
        }
    }

    /// Session identifier (used in logs)
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current loop state
    pub fn state(&self) -> LiveState {
        self.state_rx.borrow().clone()
    }

    /// Watch channel for observing state transitions
    pub fn state_receiver(&self) -> watch::Receiver<LiveState> {
        self.state_rx.clone()
    }

    /// Deactivate the session: cancel any pending re-poll, stop the camera
    /// tracks and release the stream before returning. Idempotent and safe
    /// from any state. An in-flight classification is not aborted; its
    /// result is discarded.
    pub fn stop(&self) {
        let _ = self.cancel_tx.send(true);

        if let Ok(mut slot) = self.stream.lock() {
            if let Some(mut stream) = slot.take() {
                stream.stop();
                info!("Live session {} stopped, camera released", self.id);
            }
        }
    }

    /// Wait for the loop task to finish (after [`stop`](Self::stop) or a
    /// terminal error)
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    id: Uuid,
    media: Arc<dyn MediaSource>,
    classifier: Arc<WasteClassifier>,
    options: LiveOptions,
    results: mpsc::Sender<ClassificationResult>,
    mut cancel_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<LiveState>,
    stream: SharedStream,
) {
    let _ = state_tx.send(LiveState::Acquiring);

    // Biased: a stream that finished opening is taken even when cancellation
    // raced it, so the release path below always sees it.
    let acquired = tokio::select! {
        biased;
        acquired = media.open(&options.constraints) => acquired,
        _ = cancel_rx.changed() => {
            let _ = state_tx.send(LiveState::Stopped);
            return;
        }
    };

    let opened = match acquired {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Live session {} failed to acquire camera: {}", id, e);
            let _ = state_tx.send(LiveState::Error(e.to_string()));
            return;
        }
    };

    {
        let mut slot = stream.lock().expect("stream slot poisoned");
        if *cancel_rx.borrow() {
            // Stopped while acquiring: release the device immediately.
            let mut opened = opened;
            opened.stop();
            drop(slot);
            let _ = state_tx.send(LiveState::Stopped);
            return;
        }
        *slot = Some(opened);
    }

    let _ = state_tx.send(LiveState::Streaming);
    let mut consecutive_failures: u32 = 0;

    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let poll_start = Instant::now();
        let _ = state_tx.send(LiveState::Polling);

        // Grab the frame without holding the lock across the await below.
        let frame = {
            let mut slot = stream.lock().expect("stream slot poisoned");
            match slot.as_mut() {
                Some(stream) => stream.grab_frame(),
                // stop() already took the stream
                None => break,
            }
        };

        let outcome = match frame {
            Ok(frame) => tokio::select! {
                // Deactivated mid-call: the in-flight result is discarded.
                _ = cancel_rx.changed() => break,
                outcome = classifier.classify_image(&frame) => outcome,
            },
            Err(e) => Err(e),
        };

        // Re-check after the await: a classification that completed in the
        // same instant as stop() must not be forwarded.
        if *cancel_rx.borrow() {
            break;
        }

        match outcome {
            Ok(result) => {
                consecutive_failures = 0;
                if result.confidence > options.confidence_threshold {
                    tokio::select! {
                        _ = cancel_rx.changed() => break,
                        sent = results.send(result) => {
                            if sent.is_err() {
                                debug!("Live session {}: consumer gone", id);
                                break;
                            }
                        }
                    }
                } else {
                    debug!(
                        "Live session {}: confidence {:.2} below threshold, dropped",
                        id, result.confidence
                    );
                }
            }
            Err(e) => {
                // Per-frame failures are swallowed so the visual stream stays
                // smooth; the cycle continues at the next interval.
                debug!("Live session {}: frame classification failed: {}", id, e);
                consecutive_failures += 1;
                if let Some(limit) = options.max_consecutive_failures {
                    if consecutive_failures >= limit {
                        warn!(
                            "Live session {}: {} consecutive failures, giving up",
                            id, consecutive_failures
                        );
                        release_stream(&stream);
                        let _ = state_tx.send(LiveState::Error(format!(
                            "Classification failed {} times in a row",
                            consecutive_failures
                        )));
                        return;
                    }
                }
            }
        }

        // Single timer per session: this is the only suspension between
        // polls, measured from the start of the previous poll so the
        // interval is a floor on request spacing.
        let _ = state_tx.send(LiveState::Waiting);
        tokio::select! {
            _ = cancel_rx.changed() => break,
            _ = sleep_until(poll_start + options.poll_interval) => {}
        }
    }

    release_stream(&stream);
    let _ = state_tx.send(LiveState::Stopped);
    debug!("Live session {} loop exited", id);
}

fn release_stream(stream: &SharedStream) {
    if let Ok(mut slot) = stream.lock() {
        if let Some(mut stream) = slot.take() {
            stream.stop();
        }
    }
}
