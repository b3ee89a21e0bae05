//! Collaborators the monitor drives.

use callmark_directory::{BlockingLookup, CallerRecord};
use callmark_overlay::OverlayController;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Directory lookup usable from the event path. Faults read as a miss.
pub trait CallerLookup: Send + Sync {
    fn lookup(&self, number: &str) -> Option<CallerRecord>;
}

impl CallerLookup for BlockingLookup {
    fn lookup(&self, number: &str) -> Option<CallerRecord> {
        self.lookup_or_none(number)
    }
}

/// Receiver of overlay commands.
pub trait OverlaySink: Send + Sync {
    fn show(&self, record: CallerRecord);
    fn hide(&self);
}

impl OverlaySink for OverlayController {
    fn show(&self, record: CallerRecord) {
        OverlayController::show(self, record);
    }

    fn hide(&self) {
        OverlayController::hide(self);
    }
}

/// Whether the process may draw over other apps.
pub trait PermissionGate: Send + Sync {
    fn has_overlay_permission(&self) -> bool;
}

/// Gate that is always open.
pub struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    fn has_overlay_permission(&self) -> bool {
        true
    }
}

/// Gate backed by a flag that can change at runtime.
#[derive(Clone)]
pub struct SharedPermission(Arc<AtomicBool>);

impl SharedPermission {
    pub fn new(granted: bool) -> Self {
        Self(Arc::new(AtomicBool::new(granted)))
    }

    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }

    /// The underlying flag, for sharing with the write API.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }

    pub fn set(&self, granted: bool) {
        tracing::info!(granted, "overlay permission changed");
        self.0.store(granted, Ordering::SeqCst);
    }
}

impl PermissionGate for SharedPermission {
    fn has_overlay_permission(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
