//! Simulated upload progress.
//!
//! The storage call reports no transfer progress, so the indicator is cosmetic: a ticker adds
//! 10% every tick up to 90%, success jumps to 100% and failure hides it. The percentage says
//! nothing about bytes sent.
//!
//! Each `start` opens a new run. A run that has been superseded by a later `start` no
//! longer ticks, completes or hides, so a replaced upload cannot move the indicator.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub const PROGRESS_STEP: u8 = 10;
pub const PROGRESS_CAP: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub percent: u8,
    pub visible: bool,
}

/// Publishes progress for one widget. Cheap to clone; subscribers use `watch` receivers.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<Progress>>,
    run: Arc<AtomicU64>,
    tick: Duration,
}

impl ProgressReporter {
    pub fn new(tick: Duration) -> Self {
        let (tx, _rx) = watch::channel(Progress::default());
        Self {
            tx: Arc::new(tx),
            run: Arc::new(AtomicU64::new(0)),
            tick,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Progress {
        *self.tx.borrow()
    }

    /// Show the indicator at 0% and start ticking. Ticking stops when the ticker is dropped
    /// or another run starts.
    pub fn start(&self) -> SimulatedProgress {
        let run = self.run.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(Progress {
            percent: 0,
            visible: true,
        });

        let token = CancellationToken::new();
        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.run);
        let child = token.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        if current.load(Ordering::SeqCst) != run {
                            break;
                        }
                        tx.send_if_modified(|p| {
                            if p.visible && p.percent < PROGRESS_CAP {
                                p.percent = (p.percent + PROGRESS_STEP).min(PROGRESS_CAP);
                                true
                            } else {
                                false
                            }
                        });
                    }
                }
            }
        });

        SimulatedProgress {
            tx: Arc::clone(&self.tx),
            current: Arc::clone(&self.run),
            run,
            token,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(Duration::from_millis(
            campus_core::constants::DEFAULT_PROGRESS_TICK_MS,
        ))
    }
}

/// A running simulated progress indicator.
#[derive(Debug)]
pub struct SimulatedProgress {
    tx: Arc<watch::Sender<Progress>>,
    current: Arc<AtomicU64>,
    run: u64,
    token: CancellationToken,
}

impl SimulatedProgress {
    /// False once a later run has started on the same reporter.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.run
    }

    /// Confirmed success: stop ticking and show 100%.
    pub fn complete(self) {
        self.token.cancel();
        if self.is_current() {
            self.tx.send_replace(Progress {
                percent: 100,
                visible: true,
            });
        }
    }

    /// Failure: stop ticking and hide the indicator.
    pub fn hide(self) {
        self.token.cancel();
        if self.is_current() {
            self.tx.send_replace(Progress::default());
        }
    }
}

impl Drop for SimulatedProgress {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
