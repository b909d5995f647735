//! Background workers
//!
//! Three threads act on the engine without user input: the advance worker
//! performs autonomous advances requested through the [`AdvanceSignal`],
//! the schedule checker re-evaluates the rendering item on a fixed tick, and
//! a one-shot thread starts playback shortly after startup when auto-play is
//! enabled. All of them stop when the shutdown channel disconnects.
//!
//! [`AdvanceSignal`]: crate::player::AdvanceSignal

use crate::player::PlaybackEngine;
use crate::utils::error::{IntoSignageError, Result};
use crossbeam::channel::{after, bounded, select, tick, Receiver, Sender};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handles of the engine's background threads
pub struct PlayerWorkers {
    engine: Arc<PlaybackEngine>,
    shutdown_tx: Option<Sender<()>>,
    shutdown_rx: Receiver<()>,
    handles: Vec<JoinHandle<()>>,
}

impl PlayerWorkers {
    /// Start the advance worker and the schedule checker
    pub fn spawn(engine: &Arc<PlaybackEngine>, check_interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let mut workers = Self {
            engine: Arc::clone(engine),
            shutdown_tx: Some(shutdown_tx),
            shutdown_rx,
            handles: Vec::with_capacity(3),
        };

        let advance_engine = Arc::clone(engine);
        let handle = thread::Builder::new()
            .name("advance-worker".to_string())
            .spawn(move || advance_loop(advance_engine))
            .internal_err("Failed to start advance worker")?;
        workers.handles.push(handle);

        let check_engine = Arc::clone(engine);
        let check_rx = workers.shutdown_rx.clone();
        let handle = thread::Builder::new()
            .name("schedule-checker".to_string())
            .spawn(move || schedule_loop(check_engine, check_interval, check_rx))
            .internal_err("Failed to start schedule checker")?;
        workers.handles.push(handle);

        info!("Player workers started (schedule check every {:?})", check_interval);
        Ok(workers)
    }

    /// Call `play` once after `delay`, unless shut down first
    pub fn schedule_autoplay(&mut self, delay: Duration) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        let shutdown_rx = self.shutdown_rx.clone();
        let handle = thread::Builder::new()
            .name("autoplay".to_string())
            .spawn(move || {
                select! {
                    recv(shutdown_rx) -> _ => debug!("Auto-play cancelled by shutdown"),
                    recv(after(delay)) -> _ => {
                        info!("Auto-play starting");
                        if let Err(e) = engine.play(None) {
                            warn!("Auto-play failed: {}", e);
                        }
                    }
                }
            })
            .internal_err("Failed to start auto-play timer")?;
        self.handles.push(handle);
        Ok(())
    }

    /// Stop every worker and wait for it to exit
    pub fn shutdown(&mut self) {
        // Dropping the only sender disconnects every receiver
        if self.shutdown_tx.take().is_none() {
            return;
        }
        self.engine.signal().close();

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("A player worker panicked");
            }
        }
        info!("Player workers stopped");
    }
}

impl Drop for PlayerWorkers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn advance_loop(engine: Arc<PlaybackEngine>) {
    debug!("Advance worker running");
    let signal = Arc::clone(engine.signal());
    while signal.wait() {
        engine.advance();
    }
    debug!("Advance worker exiting");
}

fn schedule_loop(engine: Arc<PlaybackEngine>, interval: Duration, shutdown_rx: Receiver<()>) {
    debug!("Schedule checker running");
    let ticker = tick(interval);
    loop {
        select! {
            recv(shutdown_rx) -> _ => break,
            recv(ticker) -> _ => engine.check_schedule(),
        }
    }
    debug!("Schedule checker exiting");
}
