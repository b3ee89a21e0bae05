//! Call state monitoring.
//!
//! ```text
//! PumpMessage ──► EventPump ──► CallMonitor ──► CallerLookup (bounded)
//!                                  │
//!                                  └────────► OverlaySink (show / hide)
//! ```
//!
//! The monitor tracks `Idle → Ringing → Idle`. A Ringing event with a
//! number in the directory shows the overlay; Active and Ended always hide
//! it. Nothing happens while overlay permission is missing.

mod event;
mod monitor;
mod ports;
mod pump;
mod screening;

pub use event::CallEvent;
pub use monitor::{CallMonitor, CallPhase, Transition};
pub use ports::{AlwaysGranted, CallerLookup, OverlaySink, PermissionGate, SharedPermission};
pub use pump::{EventPump, PumpMessage, PumpTask, TransitionCallback};
pub use screening::{ScreeningChannel, SCREENING_TTL};
