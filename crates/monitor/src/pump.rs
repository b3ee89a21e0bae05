//! Serialized event delivery.

use crate::event::CallEvent;
use crate::monitor::{CallMonitor, Transition};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often an idle pump checks for a stop request.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Called after each event with the transition it produced.
pub type TransitionCallback = Arc<dyn Fn(&CallEvent, Transition) + Send + Sync + 'static>;

/// Work run on the pump thread between call events.
pub type PumpTask = Box<dyn FnOnce() + Send + 'static>;

/// One entry in the pump queue.
///
/// Side-channel updates (screening reports, permission changes, dismissals)
/// travel as [`PumpMessage::Run`] on the same queue as call events, so they
/// take effect exactly where they arrived relative to those events.
pub enum PumpMessage {
    Event(CallEvent),
    Run(PumpTask),
}

impl PumpMessage {
    pub fn run<F>(task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::Run(Box::new(task))
    }
}

impl From<CallEvent> for PumpMessage {
    fn from(event: CallEvent) -> Self {
        Self::Event(event)
    }
}

/// Thread that feeds queued messages into a [`CallMonitor`] one at a time.
///
/// Stops on [`EventPump::stop`] or once every sender is dropped and the
/// queue is drained.
pub struct EventPump {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Default for EventPump {
    fn default() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl EventPump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, monitor: CallMonitor, events: Receiver<PumpMessage>) {
        let callback: TransitionCallback = Arc::new(|_: &CallEvent, _: Transition| {});
        self.start_with_callback(monitor, events, callback);
    }

    pub fn start_with_callback(
        &mut self,
        mut monitor: CallMonitor,
        events: Receiver<PumpMessage>,
        callback: TransitionCallback,
    ) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("EventPump already running");
            return;
        }
        // Reap a pump that stopped on its own.
        if let Some(previous) = self.handle.take() {
            let _ = previous.join();
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        let handle = std::thread::spawn(move || {
            tracing::info!("EventPump started");

            while running.load(Ordering::SeqCst) {
                match events.recv_timeout(STOP_POLL) {
                    Ok(PumpMessage::Event(event)) => {
                        let transition = monitor.handle(event.clone());
                        callback(&event, transition);
                    }
                    Ok(PumpMessage::Run(task)) => task(),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        tracing::debug!("all pump senders dropped");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            tracing::info!("EventPump stopped");
        });

        self.handle = Some(handle);
    }

    /// Stop the pump and wait for the thread. Queued events are dropped.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Block until the pump exits on its own.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.stop();
    }
}
