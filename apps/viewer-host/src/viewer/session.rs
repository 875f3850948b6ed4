use std::sync::Arc;

use bytes::Bytes;
use stream_handoff::{InterceptedStream, StreamKey, StreamRegistry, ViewerNavigation, ViewerOrigin};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;
use zoom_bus::{
    ZoomBroadcastHub, ZoomLevelChange, ZoomLevelSource, ZoomSubscription, zoom_level_to_factor,
};

use super::protocol::{
    ProtocolError, StreamInfo, ViewerCall, ViewerEvent, ViewerReply, ViewerRequest,
    encode_rejection, encode_reply,
};

pub type EventSink = mpsc::UnboundedSender<ViewerEvent>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no stream bound to this viewer")]
    NoStreamBound,
    #[error("viewer has not been initialized")]
    NotActive,
    #[error("viewer session was torn down")]
    TornDown,
}

/// Collaborators every session of one host shares.
#[derive(Clone)]
pub struct SessionDeps {
    pub registry: StreamRegistry,
    pub zoom_levels: Arc<dyn ZoomLevelSource>,
    pub hub: ZoomBroadcastHub,
    pub viewer_origin: ViewerOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unclaimed,
    Claimed,
    Active,
    TornDown,
}

struct ClaimedStream {
    stream: InterceptedStream,
    info: StreamInfo,
}

enum SessionState {
    Unclaimed,
    Claimed(ClaimedStream),
    Active {
        claimed: ClaimedStream,
        _subscription: ZoomSubscription,
    },
    TornDown,
}

/// Viewer-side end of one stream handoff.
///
/// A session claims its stream from the registry when it opens and then
/// serves the viewer's requests. Once initialized it forwards zoom changes
/// for the viewer origin as [`ViewerEvent`]s. All methods run on the
/// consumption context.
pub struct ViewerSession {
    navigation: Option<ViewerNavigation>,
    state: SessionState,
    deps: SessionDeps,
    events: EventSink,
}

impl ViewerSession {
    /// Claims the stream named by `navigation_url`. Failures are logged and
    /// leave the session unclaimed; its requests are rejected afterwards.
    pub fn open(navigation_url: &Url, deps: SessionDeps, events: EventSink) -> Self {
        let navigation = match ViewerNavigation::parse(navigation_url) {
            Ok(navigation) => Some(navigation),
            Err(err) => {
                warn!(url = %navigation_url, error = %err, "viewer opened without a stream");
                None
            }
        };

        let state = match &navigation {
            Some(navigation) => match deps.registry.release(&navigation.stream_key) {
                Ok(stream) => {
                    debug!(stream_key = %navigation.stream_key, "viewer claimed stream");
                    SessionState::Claimed(ClaimedStream {
                        info: stream_info(&stream),
                        stream,
                    })
                }
                Err(err) => {
                    warn!(
                        stream_key = %navigation.stream_key,
                        error = %err,
                        "stale or duplicate viewer navigation"
                    );
                    SessionState::Unclaimed
                }
            },
            None => SessionState::Unclaimed,
        };

        Self {
            navigation,
            state,
            deps,
            events,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Unclaimed => SessionPhase::Unclaimed,
            SessionState::Claimed(_) => SessionPhase::Claimed,
            SessionState::Active { .. } => SessionPhase::Active,
            SessionState::TornDown => SessionPhase::TornDown,
        }
    }

    pub fn stream_key(&self) -> Option<&StreamKey> {
        self.navigation.as_ref().map(|navigation| &navigation.stream_key)
    }

    pub fn stream(&self) -> Option<&InterceptedStream> {
        self.claimed().map(|claimed| &claimed.stream)
    }

    /// Takes the response body out of the claimed stream. Yields it once.
    pub fn take_body(&mut self) -> Option<Bytes> {
        match &mut self.state {
            SessionState::Claimed(claimed) | SessionState::Active { claimed, .. } => {
                claimed.stream.handle.take_body()
            }
            SessionState::Unclaimed | SessionState::TornDown => None,
        }
    }

    pub fn handle(&mut self, request: &ViewerRequest) -> Result<ViewerReply, SessionError> {
        trace!(call = %request.call, callback_id = %request.callback_id, "viewer request");
        match request.call {
            ViewerCall::Initialize => self.initialize().map(ViewerReply::StreamInfo),
            ViewerCall::GetInitialZoom => {
                self.require_active()?;
                let origin = &self.deps.viewer_origin;
                let level = self.deps.zoom_levels.zoom_level(origin.scheme(), origin.host());
                Ok(ViewerReply::ZoomFactor(zoom_level_to_factor(level)))
            }
            ViewerCall::GetDefaultZoom => {
                self.require_active()?;
                let level = self.deps.zoom_levels.default_zoom_level();
                Ok(ViewerReply::ZoomFactor(zoom_level_to_factor(level)))
            }
        }
    }

    /// String boundary of the protocol: one request in, one reply out.
    pub fn dispatch_json(&mut self, raw: &str) -> String {
        let request = match ViewerRequest::parse(raw) {
            Ok(request) => request,
            Err(err) => {
                if let ProtocolError::UnknownMessage { name, .. } = &err {
                    warn!(name = %name, "rejecting unknown viewer message");
                } else {
                    warn!(error = %err, "rejecting malformed viewer message");
                }
                return encode_rejection(&err.callback_id(), &err);
            }
        };
        match self.handle(&request) {
            Ok(reply) => encode_reply(&request.callback_id, &reply),
            Err(err) => {
                debug!(call = %request.call, error = %err, "viewer request rejected");
                encode_rejection(&request.callback_id, &err)
            }
        }
    }

    /// Drops the zoom subscription and the claimed stream. Terminal.
    pub fn teardown(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::TornDown);
        if !matches!(previous, SessionState::TornDown) {
            debug!(stream_key = ?self.stream_key(), "viewer session torn down");
        }
    }

    fn initialize(&mut self) -> Result<StreamInfo, SessionError> {
        let state = std::mem::replace(&mut self.state, SessionState::TornDown);
        let (state, result) = match state {
            SessionState::Claimed(claimed) => {
                let info = claimed.info.clone();
                let subscription = self.subscribe_zoom();
                debug!(stream_key = ?self.stream_key(), "viewer session active");
                (
                    SessionState::Active {
                        claimed,
                        _subscription: subscription,
                    },
                    Ok(info),
                )
            }
            SessionState::Active {
                claimed,
                _subscription,
            } => {
                let info = claimed.info.clone();
                (
                    SessionState::Active {
                        claimed,
                        _subscription,
                    },
                    Ok(info),
                )
            }
            SessionState::Unclaimed => (SessionState::Unclaimed, Err(SessionError::NoStreamBound)),
            SessionState::TornDown => (SessionState::TornDown, Err(SessionError::TornDown)),
        };
        self.state = state;
        result
    }

    fn subscribe_zoom(&self) -> ZoomSubscription {
        let origin = self.deps.viewer_origin.clone();
        let events = self.events.clone();
        self.deps.hub.subscribe(move |change: &ZoomLevelChange| {
            if !origin.matches(&change.scheme, &change.host) {
                return;
            }
            if events
                .send(ViewerEvent::ZoomLevelChanged(change.zoom_factor()))
                .is_err()
            {
                trace!("viewer event channel closed; zoom change dropped");
            }
        })
    }

    fn require_active(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active { .. } => Ok(()),
            SessionState::Claimed(_) => Err(SessionError::NotActive),
            SessionState::Unclaimed => Err(SessionError::NoStreamBound),
            SessionState::TornDown => Err(SessionError::TornDown),
        }
    }

    fn claimed(&self) -> Option<&ClaimedStream> {
        match &self.state {
            SessionState::Claimed(claimed) | SessionState::Active { claimed, .. } => Some(claimed),
            SessionState::Unclaimed | SessionState::TornDown => None,
        }
    }
}

fn stream_info(stream: &InterceptedStream) -> StreamInfo {
    StreamInfo {
        stream_url: stream.handle.url().to_string(),
        original_url: stream.original_url.to_string(),
        response_headers: stream.response_headers.merged(),
    }
}
