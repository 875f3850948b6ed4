use std::sync::Arc;

use external_open::{ExternalProtocolGate, ExternalProtocolRequest, GateOutcome};
use parking_lot::Mutex;
use stream_handoff::{
    InterceptedStream, Interception, InterceptionPolicy, NavigationError, StreamKey,
    StreamRegistry, ViewerNavigation,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::context::PosterHandle;
use crate::surface::SurfaceGetter;

/// Entry points the loading path calls on the production context.
///
/// Anything that touches a surface is posted to the consumption context and
/// never awaited here.
pub struct ResourceDispatcher {
    policy: InterceptionPolicy,
    registry: StreamRegistry,
    consumption: PosterHandle,
    gate: ExternalProtocolGate,
    external_opens: Arc<Mutex<Vec<JoinHandle<GateOutcome>>>>,
}

impl ResourceDispatcher {
    pub fn new(
        policy: InterceptionPolicy,
        registry: StreamRegistry,
        consumption: PosterHandle,
        gate: ExternalProtocolGate,
    ) -> Self {
        Self {
            policy,
            registry,
            consumption,
            gate,
            external_opens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn should_intercept_as_stream(&self, mime_type: &str) -> Interception {
        self.policy.decide(mime_type)
    }

    /// Parks `stream` and sends the originating surface to the viewer.
    ///
    /// The navigation is posted after the stream is registered. If the surface
    /// is gone by the time it runs, the entry stays in the registry unclaimed.
    pub fn on_stream_created(
        &self,
        stream: InterceptedStream,
        surface: SurfaceGetter,
    ) -> Result<StreamKey, NavigationError> {
        let original_url = stream.original_url.to_string();
        let key = self.registry.register(stream);
        let navigation = ViewerNavigation::new(key.clone(), original_url);
        let url = match navigation.to_url(self.policy.viewer_origin()) {
            Ok(url) => url,
            Err(err) => {
                error!(stream_key = %key, error = %err, "cannot build viewer navigation");
                // Nobody will ever claim it.
                let _ = self.registry.release(&key);
                return Err(err);
            }
        };

        let stream_key = key.clone();
        self.consumption.post(Box::new(move || match surface.resolve() {
            Some(target) => {
                debug!(stream_key = %stream_key, surface = %target.id(), "navigating to viewer");
                target.load_url(&url);
            }
            None => {
                warn!(
                    stream_key = %stream_key,
                    surface = %surface.id(),
                    "surface gone before viewer navigation; stream left unclaimed"
                );
            }
        }));
        Ok(key)
    }

    /// Hands an unroutable URL to the external-open gate. Always reports the
    /// request as handled; the outcome arrives later, if ever.
    pub fn handle_external_protocol(
        &self,
        url: &str,
        has_user_gesture: bool,
        surface: SurfaceGetter,
    ) -> bool {
        let request = ExternalProtocolRequest::new(url, has_user_gesture, move || {
            surface
                .resolve()
                .and_then(|target| target.permission_helper())
        });
        let gate = self.gate.clone();
        let external_opens = Arc::clone(&self.external_opens);
        self.consumption.post(Box::new(move || {
            if let Some(pending) = gate.handle(request) {
                let mut opens = external_opens.lock();
                opens.retain(|open| !open.is_finished());
                opens.push(pending);
            }
        }));
        true
    }

    /// Waits for every external open started so far and returns their
    /// outcomes. Opens whose prompt never resolves keep this pending.
    pub async fn settle_external_opens(&self) -> Vec<GateOutcome> {
        let pending = std::mem::take(&mut *self.external_opens.lock());
        let mut outcomes = Vec::with_capacity(pending.len());
        for open in pending {
            match open.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(error = %err, "external open task failed"),
            }
        }
        outcomes
    }
}
