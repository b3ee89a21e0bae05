//! The single overlay session slot.
//!
//! Every mutation is a short swap under the slot mutex. Callers that need
//! to act on a session take it out first and work on it after the lock is
//! released.

use crate::surface::WindowHandle;
use callmark_directory::CallerRecord;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity of one overlay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub phone_number: String,
    pub caller_name: String,
    pub created_at: DateTime<Utc>,
    pub window: Option<WindowHandle>,
    pub live: bool,
}

pub(crate) struct OverlaySession {
    pub(crate) id: SessionId,
    pub(crate) record: CallerRecord,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) pending_show: CancellationToken,
    pub(crate) auto_dismiss: Option<CancellationToken>,
    pub(crate) window: Option<WindowHandle>,
    pub(crate) live: bool,
}

impl OverlaySession {
    pub(crate) fn new(id: SessionId, record: CallerRecord, pending_show: CancellationToken) -> Self {
        Self {
            id,
            record,
            created_at: Utc::now(),
            pending_show,
            auto_dismiss: None,
            window: None,
            live: false,
        }
    }

    pub(crate) fn cancel_timers(&self) {
        self.pending_show.cancel();
        if let Some(token) = &self.auto_dismiss {
            token.cancel();
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            phone_number: self.record.phone_number.clone(),
            caller_name: self.record.name.clone(),
            created_at: self.created_at,
            window: self.window,
            live: self.live,
        }
    }
}

#[derive(Default)]
pub(crate) struct SessionSlot {
    current: Mutex<Option<OverlaySession>>,
}

impl SessionSlot {
    fn lock(&self) -> MutexGuard<'_, Option<OverlaySession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `session`, handing back whatever it displaced.
    pub(crate) fn replace(&self, session: OverlaySession) -> Option<OverlaySession> {
        self.lock().replace(session)
    }

    pub(crate) fn take(&self) -> Option<OverlaySession> {
        self.lock().take()
    }

    /// Take the session only if it is still `id`.
    pub(crate) fn take_if(&self, id: SessionId) -> Option<OverlaySession> {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|s| s.id == id) {
            current.take()
        } else {
            None
        }
    }

    /// Take the session only if it owns `handle`.
    pub(crate) fn take_if_window(&self, handle: WindowHandle) -> Option<OverlaySession> {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|s| s.window == Some(handle)) {
            current.take()
        } else {
            None
        }
    }

    /// Record to present, if `id` is current and still waiting for a window.
    pub(crate) fn pending_record(&self, id: SessionId) -> Option<CallerRecord> {
        let current = self.lock();
        current
            .as_ref()
            .filter(|s| s.id == id && s.window.is_none() && !s.pending_show.is_cancelled())
            .map(|s| s.record.clone())
    }

    /// Attach `handle` to session `id`. Returns `false` if the session is gone.
    pub(crate) fn mark_live(
        &self,
        id: SessionId,
        handle: WindowHandle,
        auto_dismiss: CancellationToken,
    ) -> bool {
        let mut current = self.lock();
        match current.as_mut() {
            Some(session) if session.id == id && session.window.is_none() => {
                session.window = Some(handle);
                session.live = true;
                session.auto_dismiss = Some(auto_dismiss);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn info(&self) -> Option<SessionInfo> {
        self.lock().as_ref().map(OverlaySession::info)
    }
}
