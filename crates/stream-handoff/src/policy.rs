use crate::navigation::ViewerOrigin;

pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Divert the response and navigate to the viewer at this origin.
    Intercept { viewer_origin: ViewerOrigin },
    PassThrough,
}

impl Interception {
    pub fn is_intercept(&self) -> bool {
        matches!(self, Interception::Intercept { .. })
    }
}

/// Decides which responses are diverted to the internal viewer.
///
/// Matching is exact string equality against the configured MIME types.
#[derive(Debug, Clone)]
pub struct InterceptionPolicy {
    mime_types: Vec<String>,
    viewer_origin: ViewerOrigin,
}

impl InterceptionPolicy {
    pub fn new<I, S>(mime_types: I, viewer_origin: ViewerOrigin) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mime_types: mime_types.into_iter().map(Into::into).collect(),
            viewer_origin,
        }
    }

    pub fn decide(&self, mime_type: &str) -> Interception {
        if self.mime_types.iter().any(|candidate| candidate == mime_type) {
            Interception::Intercept {
                viewer_origin: self.viewer_origin.clone(),
            }
        } else {
            Interception::PassThrough
        }
    }

    pub fn viewer_origin(&self) -> &ViewerOrigin {
        &self.viewer_origin
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }
}

impl Default for InterceptionPolicy {
    fn default() -> Self {
        Self::new([PDF_MIME_TYPE], ViewerOrigin::default())
    }
}
