//! Permission-gated launching of URLs the application cannot route itself.
//!
//! Responsibilities:
//! - escaping a URL so it is safe to pass to an OS-level handler
//! - asking the requesting surface's permission helper, which may prompt the
//!   user and answer at any later point
//! - opening the URL externally only after an explicit grant

mod escape;
mod gate;
mod opener;
mod permission;

pub use escape::escape_external_handler_value;
pub use gate::{ExternalProtocolGate, ExternalProtocolRequest, GateOutcome, SurfaceResolver};
pub use opener::{ExternalOpener, Launcher, LoggingOpener, OpenError, SystemOpener};
pub use permission::{PermissionHelper, PermissionResponder, StaticPermission};
