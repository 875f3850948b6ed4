//! Host side of the viewer handoff: configuration, execution contexts,
//! surfaces, the loading-path dispatcher and the internal viewer.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod host;
pub mod surface;
pub mod telemetry;
pub mod viewer;
