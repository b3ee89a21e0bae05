//! Thread that owns the overlay surface.
//!
//! Window creation and removal only happen here. Other contexts post
//! closures and never touch the surface directly.

use crate::error::{OverlayError, Result};
use crate::surface::OverlaySurface;
use crossbeam_channel::{Receiver, Sender};
use std::thread::JoinHandle;

/// Work item executed on the UI thread.
pub type UiTask = Box<dyn FnOnce(&mut dyn OverlaySurface) + Send + 'static>;

enum UiMessage {
    Run(UiTask),
    Shutdown,
}

/// Posts work onto a [`UiThread`].
#[derive(Clone)]
pub struct UiSender {
    tx: Sender<UiMessage>,
}

impl UiSender {
    /// Queue `task`. Tasks run in the order they were posted.
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut dyn OverlaySurface) + Send + 'static,
    {
        self.tx
            .send(UiMessage::Run(Box::new(task)))
            .map_err(|_| OverlayError::UiClosed)
    }
}

pub struct UiThread {
    sender: UiSender,
    handle: Option<JoinHandle<()>>,
}

impl UiThread {
    pub fn spawn<S: OverlaySurface>(surface: S) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = std::thread::spawn(move || run_loop(surface, rx));

        Self {
            sender: UiSender { tx },
            handle: Some(handle),
        }
    }

    pub fn sender(&self) -> UiSender {
        self.sender.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run everything already queued, then stop the thread.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.sender.tx.send(UiMessage::Shutdown);
        if handle.join().is_err() {
            tracing::error!("overlay UI thread panicked");
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop<S: OverlaySurface>(mut surface: S, rx: Receiver<UiMessage>) {
    tracing::debug!("overlay UI thread started");
    while let Ok(message) = rx.recv() {
        match message {
            UiMessage::Run(task) => task(&mut surface),
            UiMessage::Shutdown => break,
        }
    }
    tracing::debug!("overlay UI thread stopped");
}
