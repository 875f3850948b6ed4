use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::escape::escape_external_handler_value;
use crate::opener::ExternalOpener;
use crate::permission::{PermissionHelper, PermissionResponder};

/// Lazily looks up the permission helper of the surface that asked for the
/// open. Returns `None` once that surface is gone.
pub type SurfaceResolver = Box<dyn FnOnce() -> Option<Arc<dyn PermissionHelper>> + Send>;

/// Snapshot taken when the loading path met a scheme it cannot route.
pub struct ExternalProtocolRequest {
    pub url: String,
    pub has_user_gesture: bool,
    resolver: SurfaceResolver,
}

impl ExternalProtocolRequest {
    pub fn new<R>(url: impl Into<String>, has_user_gesture: bool, resolver: R) -> Self
    where
        R: FnOnce() -> Option<Arc<dyn PermissionHelper>> + Send + 'static,
    {
        Self {
            url: url.into(),
            has_user_gesture,
            resolver: Box::new(resolver),
        }
    }
}

impl fmt::Debug for ExternalProtocolRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalProtocolRequest")
            .field("url", &self.url)
            .field("has_user_gesture", &self.has_user_gesture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Opened,
    Denied,
    OpenFailed,
}

/// Bridges unroutable URLs to the OS opener behind a permission check.
///
/// [`handle`](Self::handle) never blocks: the surface lookup and the
/// permission request happen inline, the decision is awaited on a spawned
/// task that holds no locks.
#[derive(Clone)]
pub struct ExternalProtocolGate {
    opener: Arc<dyn ExternalOpener>,
    runtime: Handle,
}

impl ExternalProtocolGate {
    pub fn new(opener: Arc<dyn ExternalOpener>, runtime: Handle) -> Self {
        Self { opener, runtime }
    }

    /// Returns `None` when the requesting surface is already gone; the request
    /// is dropped silently in that case. Otherwise returns the task that waits
    /// for the decision, which callers are free to detach.
    pub fn handle(&self, request: ExternalProtocolRequest) -> Option<JoinHandle<GateOutcome>> {
        let ExternalProtocolRequest {
            url,
            has_user_gesture,
            resolver,
        } = request;

        let Some(helper) = resolver() else {
            debug!(url = %url, "requesting surface gone; dropping external open");
            return None;
        };

        let escaped_url = escape_external_handler_value(&url);
        let (responder, decision) = PermissionResponder::channel();
        helper.request_open_external_permission(&escaped_url, has_user_gesture, responder);

        let opener = Arc::clone(&self.opener);
        Some(self.runtime.spawn(async move {
            // A closed channel means nobody granted the request.
            let allowed = decision.await.unwrap_or(false);
            if !allowed {
                debug!(url = %escaped_url, has_user_gesture, "external open denied");
                return GateOutcome::Denied;
            }
            match opener.open_external(&escaped_url) {
                Ok(()) => {
                    info!(url = %escaped_url, "opened externally");
                    GateOutcome::Opened
                }
                Err(err) => {
                    warn!(url = %escaped_url, error = %err, "external open failed");
                    GateOutcome::OpenFailed
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::OpenError;
    use crate::permission::StaticPermission;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingOpener {
        opened: Mutex<Vec<String>>,
    }

    impl ExternalOpener for RecordingOpener {
        fn open_external(&self, escaped_url: &str) -> Result<(), OpenError> {
            self.opened.lock().unwrap().push(escaped_url.to_string());
            Ok(())
        }
    }

    struct FailingOpener;

    impl ExternalOpener for FailingOpener {
        fn open_external(&self, _escaped_url: &str) -> Result<(), OpenError> {
            Err(OpenError::Unsupported)
        }
    }

    fn helper(permission: StaticPermission) -> Option<Arc<dyn PermissionHelper>> {
        Some(Arc::new(permission))
    }

    async fn outcome(handle: Option<JoinHandle<GateOutcome>>) -> GateOutcome {
        tokio::time::timeout(Duration::from_secs(2), handle.expect("surface alive"))
            .await
            .expect("decision timeout")
            .expect("gate task")
    }

    #[tokio::test]
    async fn denied_request_never_opens() {
        let opener = Arc::new(RecordingOpener::default());
        let gate = ExternalProtocolGate::new(opener.clone(), Handle::current());

        let handle = gate.handle(ExternalProtocolRequest::new("mailto:a@b.c", true, || {
            helper(StaticPermission::deny_all())
        }));

        assert_eq!(outcome(handle).await, GateOutcome::Denied);
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn granted_request_opens_escaped_url_once() {
        let opener = Arc::new(RecordingOpener::default());
        let gate = ExternalProtocolGate::new(opener.clone(), Handle::current());

        let handle = gate.handle(ExternalProtocolRequest::new("custom:open me", false, || {
            helper(StaticPermission::allow_all())
        }));

        assert_eq!(outcome(handle).await, GateOutcome::Opened);
        assert_eq!(*opener.opened.lock().unwrap(), vec!["custom:open%20me".to_string()]);
    }

    #[tokio::test]
    async fn helper_sees_escaped_url_and_gesture() {
        let opener = Arc::new(RecordingOpener::default());
        let gate = ExternalProtocolGate::new(opener.clone(), Handle::current());
        let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));

        let recorder = {
            let seen = Arc::clone(&seen);
            move |url: &str, gesture: bool, responder: PermissionResponder| {
                seen.lock().unwrap().push((url.to_string(), gesture));
                responder.deny();
            }
        };
        let handle = gate.handle(ExternalProtocolRequest::new("x:a b", true, move || {
            Some(Arc::new(recorder) as Arc<dyn PermissionHelper>)
        }));

        assert_eq!(outcome(handle).await, GateOutcome::Denied);
        assert_eq!(*seen.lock().unwrap(), vec![("x:a%20b".to_string(), true)]);
    }

    #[tokio::test]
    async fn unanswered_prompt_counts_as_denial() {
        let opener = Arc::new(RecordingOpener::default());
        let gate = ExternalProtocolGate::new(opener.clone(), Handle::current());
        let dropping = |_url: &str, _gesture: bool, responder: PermissionResponder| drop(responder);

        let handle = gate.handle(ExternalProtocolRequest::new("x:y", true, move || {
            Some(Arc::new(dropping) as Arc<dyn PermissionHelper>)
        }));

        assert_eq!(outcome(handle).await, GateOutcome::Denied);
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deferred_grant_opens_after_prompt_resolves() {
        let opener = Arc::new(RecordingOpener::default());
        let gate = ExternalProtocolGate::new(opener.clone(), Handle::current());
        let pending: Arc<Mutex<Option<PermissionResponder>>> = Arc::new(Mutex::new(None));

        let prompt = {
            let pending = Arc::clone(&pending);
            move |_url: &str, _gesture: bool, responder: PermissionResponder| {
                *pending.lock().unwrap() = Some(responder);
            }
        };
        let handle = gate
            .handle(ExternalProtocolRequest::new("x:later", true, move || {
                Some(Arc::new(prompt) as Arc<dyn PermissionHelper>)
            }))
            .expect("surface alive");

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        assert!(opener.opened.lock().unwrap().is_empty());

        let responder = pending.lock().unwrap().take().expect("prompt shown");
        responder.allow();

        assert_eq!(outcome(Some(handle)).await, GateOutcome::Opened);
        assert_eq!(*opener.opened.lock().unwrap(), vec!["x:later".to_string()]);
    }

    #[tokio::test]
    async fn gone_surface_aborts_silently() {
        let opener = Arc::new(RecordingOpener::default());
        let gate = ExternalProtocolGate::new(opener.clone(), Handle::current());

        let handle = gate.handle(ExternalProtocolRequest::new("x:y", true, || None));

        assert!(handle.is_none());
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn opener_failure_is_absorbed() {
        let gate = ExternalProtocolGate::new(Arc::new(FailingOpener), Handle::current());
        let handle = gate.handle(ExternalProtocolRequest::new("x:y", true, || {
            helper(StaticPermission::allow_all())
        }));
        assert_eq!(outcome(handle).await, GateOutcome::OpenFailed);
    }
}
