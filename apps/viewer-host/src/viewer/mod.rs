//! The internal viewer: per-surface sessions, their message protocol and the
//! static files the viewer UI loads.

pub mod factory;
pub mod protocol;
pub mod resources;
pub mod session;

pub use factory::ViewerUiFactory;
pub use protocol::{
    ProtocolError, StreamInfo, ViewerCall, ViewerEvent, ViewerReply, ViewerRequest,
};
pub use resources::{BundledDataSource, ResourceBundle, ResourceError, StaticBundle};
pub use session::{EventSink, SessionDeps, SessionError, SessionPhase, ViewerSession};
