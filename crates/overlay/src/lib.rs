//! Caller overlay windows.
//!
//! [`OverlayController`] owns zero or one overlay session at a time. A
//! session goes through a short presentation delay, is drawn on a
//! dedicated UI thread through an [`OverlaySurface`], and is torn down by
//! `hide`, a manual dismiss, or its auto-dismiss timer, whichever happens
//! first. Each window the surface hands out is released exactly once.
//!
//! ```ignore
//! let controller = OverlayController::new(NullSurface::default(), runtime.handle().clone());
//! let id = controller.show(record);
//! // ...
//! controller.hide();
//! ```

mod content;
mod controller;
mod error;
mod session;
mod surface;
mod ui;

pub use content::OverlayContent;
pub use controller::{
    DismissHandle, OverlayController, OverlayTimings, DEFAULT_APP_NAME, DEFAULT_AUTO_DISMISS,
    DEFAULT_PRESENT_DELAY,
};
pub use error::{OverlayError, Result};
pub use session::{SessionId, SessionInfo};
pub use surface::{
    NullSurface, OverlaySurface, RecordingSurface, SurfaceCall, SurfaceProbe, WindowHandle,
};
pub use ui::{UiSender, UiTask, UiThread};
