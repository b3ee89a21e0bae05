//! Error types for overlay windows.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// The surface refused to create the window.
    #[error("failed to acquire overlay window: {0}")]
    Acquire(String),

    /// The surface failed to remove a window it handed out.
    #[error("failed to release overlay window: {0}")]
    Release(String),

    /// The UI thread has shut down and no longer accepts work.
    #[error("overlay UI thread is closed")]
    UiClosed,
}

pub type Result<T> = std::result::Result<T, OverlayError>;
