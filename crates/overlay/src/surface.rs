//! Window capability the overlay controller draws on.
//!
//! A surface only ever runs on the UI thread, so implementations may hold
//! platform objects that are not safe to touch elsewhere.

use crate::content::OverlayContent;
use crate::error::{OverlayError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opaque id of a window handed out by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Acquire/release capability for the overlay window.
pub trait OverlaySurface: Send + 'static {
    /// Create and show a window for `content`.
    fn acquire(&mut self, content: &OverlayContent) -> Result<WindowHandle>;

    /// Remove a window previously returned by `acquire`.
    fn release(&mut self, handle: WindowHandle) -> Result<()>;
}

/// Headless surface that only logs.
#[derive(Default)]
pub struct NullSurface {
    next: u64,
}

impl OverlaySurface for NullSurface {
    fn acquire(&mut self, content: &OverlayContent) -> Result<WindowHandle> {
        self.next += 1;
        let handle = WindowHandle::new(self.next);
        tracing::info!(%handle, caller = %content.caller_name, rows = ?content.rows(), "overlay shown");
        Ok(handle)
    }

    fn release(&mut self, handle: WindowHandle) -> Result<()> {
        tracing::info!(%handle, "overlay removed");
        Ok(())
    }
}

/// A call observed by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum SurfaceCall {
    Acquire {
        handle: WindowHandle,
        content: OverlayContent,
    },
    Release {
        handle: WindowHandle,
    },
}

#[derive(Default)]
struct SurfaceLog {
    calls: Vec<SurfaceCall>,
    live: BTreeSet<WindowHandle>,
    faults: usize,
}

fn lock_log(log: &Mutex<SurfaceLog>) -> MutexGuard<'_, SurfaceLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Surface that records every call for later inspection.
///
/// Releasing a handle that is not live is reported as an error and counted
/// as a fault.
#[derive(Default)]
pub struct RecordingSurface {
    next: u64,
    log: Arc<Mutex<SurfaceLog>>,
    fail_acquire: Arc<AtomicBool>,
    fail_release: Arc<AtomicBool>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer that stays valid after the surface moves to the UI thread.
    pub fn probe(&self) -> SurfaceProbe {
        SurfaceProbe {
            log: Arc::clone(&self.log),
            fail_acquire: Arc::clone(&self.fail_acquire),
            fail_release: Arc::clone(&self.fail_release),
        }
    }
}

impl OverlaySurface for RecordingSurface {
    fn acquire(&mut self, content: &OverlayContent) -> Result<WindowHandle> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(OverlayError::Acquire("acquire disabled".to_string()));
        }

        self.next += 1;
        let handle = WindowHandle::new(self.next);
        let mut log = lock_log(&self.log);
        log.live.insert(handle);
        log.calls.push(SurfaceCall::Acquire {
            handle,
            content: content.clone(),
        });
        Ok(handle)
    }

    fn release(&mut self, handle: WindowHandle) -> Result<()> {
        let mut log = lock_log(&self.log);
        log.calls.push(SurfaceCall::Release { handle });
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(OverlayError::Release("release disabled".to_string()));
        }
        if log.live.remove(&handle) {
            Ok(())
        } else {
            log.faults += 1;
            Err(OverlayError::Release(format!("{handle} is not live")))
        }
    }
}

/// Read side of a [`RecordingSurface`].
#[derive(Clone)]
pub struct SurfaceProbe {
    log: Arc<Mutex<SurfaceLog>>,
    fail_acquire: Arc<AtomicBool>,
    fail_release: Arc<AtomicBool>,
}

impl SurfaceProbe {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        lock_log(&self.log).calls.clone()
    }

    pub fn acquire_count(&self) -> usize {
        self.count(|call| matches!(call, SurfaceCall::Acquire { .. }))
    }

    pub fn release_count(&self) -> usize {
        self.count(|call| matches!(call, SurfaceCall::Release { .. }))
    }

    /// Windows acquired and not yet released.
    pub fn live_windows(&self) -> Vec<WindowHandle> {
        lock_log(&self.log).live.iter().copied().collect()
    }

    /// Releases of handles that were not live.
    pub fn faults(&self) -> usize {
        lock_log(&self.log).faults
    }

    /// Content of every acquired window, oldest first.
    pub fn shown(&self) -> Vec<OverlayContent> {
        lock_log(&self.log)
            .calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Acquire { content, .. } => Some(content.clone()),
                SurfaceCall::Release { .. } => None,
            })
            .collect()
    }

    /// Make subsequent `acquire` calls fail.
    pub fn set_fail_acquire(&self, fail: bool) {
        self.fail_acquire.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `release` calls fail. The window stays live.
    pub fn set_fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        lock_log(&self.log).calls.iter().filter(|c| pred(c)).count()
    }
}
