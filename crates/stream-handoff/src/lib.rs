//! Handoff of intercepted responses from the loading path to a viewer surface.
//!
//! The loading path asks an [`InterceptionPolicy`] whether a response should be
//! diverted, parks the response in the [`StreamRegistry`] under a freshly
//! minted [`StreamKey`], and navigates the originating surface to the viewer
//! origin with a [`ViewerNavigation`] URL. The viewer later releases the
//! stream from the registry exactly once.

mod navigation;
mod policy;
mod registry;
mod stream;

pub use navigation::{
    NavigationError, ViewerNavigation, ViewerOrigin, ORIGINAL_URL_PARAM, STREAM_URL_PARAM,
};
pub use policy::{Interception, InterceptionPolicy, PDF_MIME_TYPE};
pub use registry::{RegistryError, RegistryResult, StreamKey, StreamRegistry};
pub use stream::{
    InterceptedStream, MergedHeaders, ResponseHeaders, StreamHandle, UNKNOWN_CONTENT_SIZE,
};
