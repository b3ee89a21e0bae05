//! Overlay session lifecycle.
//!
//! `show` installs a session and arms a cancellable presentation timer.
//! When it fires, presentation is posted to the UI thread which re-checks
//! the session, acquires a window and arms the auto-dismiss timer.
//! `hide`, `dismiss` and auto-dismiss all take the session out of the slot
//! before tearing it down, so a window is released at most once.

use crate::content::OverlayContent;
use crate::session::{OverlaySession, SessionId, SessionInfo, SessionSlot};
use crate::surface::{OverlaySurface, WindowHandle};
use crate::ui::{UiSender, UiThread};
use callmark_directory::CallerRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PRESENT_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_AUTO_DISMISS: Duration = Duration::from_secs(5);
pub const DEFAULT_APP_NAME: &str = "Callmark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTimings {
    /// Wait between `show` and window acquisition.
    pub present_delay: Duration,
    /// Lifetime of a presented window.
    pub auto_dismiss: Duration,
}

impl Default for OverlayTimings {
    fn default() -> Self {
        Self {
            present_delay: DEFAULT_PRESENT_DELAY,
            auto_dismiss: DEFAULT_AUTO_DISMISS,
        }
    }
}

struct Shared {
    slot: SessionSlot,
    ui: UiSender,
    runtime: Handle,
    timings: OverlayTimings,
    app_name: String,
}

/// Owns at most one overlay session and the thread that draws it.
///
/// Dropping the controller hides the current session and joins the UI
/// thread after pending releases have run.
pub struct OverlayController {
    shared: Arc<Shared>,
    ui_thread: UiThread,
}

impl OverlayController {
    pub fn new<S: OverlaySurface>(surface: S, runtime: Handle) -> Self {
        Self::with_settings(surface, runtime, OverlayTimings::default(), DEFAULT_APP_NAME)
    }

    pub fn with_settings<S: OverlaySurface>(
        surface: S,
        runtime: Handle,
        timings: OverlayTimings,
        app_name: impl Into<String>,
    ) -> Self {
        let ui_thread = UiThread::spawn(surface);
        let shared = Arc::new(Shared {
            slot: SessionSlot::default(),
            ui: ui_thread.sender(),
            runtime,
            timings,
            app_name: app_name.into(),
        });

        Self { shared, ui_thread }
    }

    pub fn timings(&self) -> OverlayTimings {
        self.shared.timings
    }

    /// Replace any current session with one for `record` and schedule it.
    pub fn show(&self, record: CallerRecord) -> SessionId {
        let id = SessionId::new();
        let pending = CancellationToken::new();
        tracing::info!(session = %id, number = %record.phone_number, "overlay scheduled");

        if let Some(previous) = self
            .shared
            .slot
            .replace(OverlaySession::new(id, record, pending.clone()))
        {
            tracing::debug!(session = %previous.id, "replacing overlay session");
            self.shared.teardown(previous);
        }

        let shared = Arc::clone(&self.shared);
        let delay = shared.timings.present_delay;
        self.shared.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = pending.cancelled() => {
                    tracing::debug!(session = %id, "presentation cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    Shared::post_present(&shared, id);
                }
            }
        });

        id
    }

    /// Tear down the current session. Returns `false` if there was none.
    pub fn hide(&self) -> bool {
        match self.shared.slot.take() {
            Some(session) => {
                tracing::info!(session = %session.id, "overlay hidden");
                self.shared.teardown(session);
                true
            }
            None => false,
        }
    }

    /// Tear down the session only if it owns `handle`.
    pub fn dismiss(&self, handle: WindowHandle) -> bool {
        self.dismiss_handle().dismiss(handle)
    }

    /// Handle a surface can keep to report user dismissal.
    pub fn dismiss_handle(&self) -> DismissHandle {
        DismissHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn current(&self) -> Option<SessionInfo> {
        self.shared.slot.info()
    }

    pub fn is_live(&self) -> bool {
        self.current().is_some_and(|s| s.live)
    }
}

impl Drop for OverlayController {
    fn drop(&mut self) {
        self.hide();
        self.ui_thread.shutdown();
    }
}

/// Manual dismissal entry point, usable from any thread.
#[derive(Clone)]
pub struct DismissHandle {
    shared: Arc<Shared>,
}

impl DismissHandle {
    pub fn dismiss(&self, handle: WindowHandle) -> bool {
        match self.shared.slot.take_if_window(handle) {
            Some(session) => {
                tracing::info!(session = %session.id, %handle, "overlay dismissed");
                self.shared.teardown(session);
                true
            }
            None => {
                tracing::debug!(%handle, "dismiss for window that is not current");
                false
            }
        }
    }
}

impl Shared {
    fn post_present(shared: &Arc<Self>, id: SessionId) {
        let task_shared = Arc::clone(shared);
        let posted = shared
            .ui
            .post(move |surface| Shared::present(&task_shared, surface, id));

        if let Err(e) = posted {
            tracing::warn!(session = %id, error = %e, "cannot present overlay");
            if let Some(session) = shared.slot.take_if(id) {
                shared.teardown(session);
            }
        }
    }

    /// Runs on the UI thread.
    fn present(shared: &Arc<Self>, surface: &mut dyn OverlaySurface, id: SessionId) {
        let Some(record) = shared.slot.pending_record(id) else {
            tracing::debug!(session = %id, "session no longer current, skipping presentation");
            return;
        };

        let content = OverlayContent::from_record(&record, &shared.app_name);
        let handle = match surface.acquire(&content) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(session = %id, error = %e, "overlay window fault");
                if let Some(session) = shared.slot.take_if(id) {
                    shared.teardown(session);
                }
                return;
            }
        };

        let auto_dismiss = CancellationToken::new();
        if !shared.slot.mark_live(id, handle, auto_dismiss.clone()) {
            tracing::debug!(session = %id, %handle, "session ended during acquisition");
            release_window(surface, handle);
            return;
        }

        tracing::info!(session = %id, %handle, caller = %content.caller_name, "overlay presented");
        Shared::arm_auto_dismiss(shared, id, auto_dismiss);
    }

    fn arm_auto_dismiss(shared: &Arc<Self>, id: SessionId, token: CancellationToken) {
        let after = shared.timings.auto_dismiss;
        let runtime = shared.runtime.clone();
        let shared = Arc::clone(shared);
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    if let Some(session) = shared.slot.take_if(id) {
                        tracing::info!(session = %id, "overlay auto-dismissed");
                        shared.teardown(session);
                    }
                }
            }
        });
    }

    /// Finish a session that is already out of the slot.
    fn teardown(&self, session: OverlaySession) {
        session.cancel_timers();

        if let Some(handle) = session.window {
            if let Err(e) = self.ui.post(move |surface| release_window(surface, handle)) {
                tracing::error!(session = %session.id, %handle, error = %e, "overlay window fault");
            }
        }
        tracing::debug!(session = %session.id, live = session.live, "overlay session torn down");
    }
}

fn release_window(surface: &mut dyn OverlaySurface, handle: WindowHandle) {
    if let Err(e) = surface.release(handle) {
        tracing::error!(%handle, error = %e, "overlay window fault");
    }
}
