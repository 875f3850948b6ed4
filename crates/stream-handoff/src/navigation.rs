use std::fmt;

use thiserror::Error;
use url::Url;

use crate::registry::StreamKey;

pub const STREAM_URL_PARAM: &str = "streamURL";
pub const ORIGINAL_URL_PARAM: &str = "originalURL";

const DEFAULT_VIEWER_SCHEME: &str = "chrome";
const DEFAULT_VIEWER_HOST: &str = "pdf-viewer";
const VIEWER_ENTRY_PAGE: &str = "index.html";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("viewer origin {scheme}://{host} is not a valid URL: {source}")]
    InvalidOrigin {
        scheme: String,
        host: String,
        #[source]
        source: url::ParseError,
    },
    #[error("navigation URL carries no streamURL parameter")]
    MissingStreamKey,
}

/// Scheme and host of the internal viewer surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewerOrigin {
    scheme: String,
    host: String,
}

impl ViewerOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn matches(&self, scheme: &str, host: &str) -> bool {
        self.scheme == scheme && self.host == host
    }

    pub fn is_viewer_url(&self, url: &Url) -> bool {
        url.scheme() == self.scheme && url.host_str() == Some(self.host.as_str())
    }

    /// `<scheme>://<host>/`
    pub fn url(&self) -> Result<Url, NavigationError> {
        self.parse_with_path("")
    }

    fn parse_with_path(&self, path: &str) -> Result<Url, NavigationError> {
        Url::parse(&format!("{}://{}/{}", self.scheme, self.host, path)).map_err(|source| {
            NavigationError::InvalidOrigin {
                scheme: self.scheme.clone(),
                host: self.host.clone(),
                source,
            }
        })
    }
}

impl Default for ViewerOrigin {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWER_SCHEME, DEFAULT_VIEWER_HOST)
    }
}

impl fmt::Display for ViewerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

/// Parameters carried by the navigation that opens a viewer for a parked
/// stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerNavigation {
    pub stream_key: StreamKey,
    pub original_url: String,
}

impl ViewerNavigation {
    pub fn new(stream_key: StreamKey, original_url: impl Into<String>) -> Self {
        Self {
            stream_key,
            original_url: original_url.into(),
        }
    }

    /// `<scheme>://<host>/index.html?streamURL=<key>&originalURL=<url>`
    pub fn to_url(&self, origin: &ViewerOrigin) -> Result<Url, NavigationError> {
        let mut url = origin.parse_with_path(VIEWER_ENTRY_PAGE)?;
        url.query_pairs_mut()
            .append_pair(STREAM_URL_PARAM, self.stream_key.as_str())
            .append_pair(ORIGINAL_URL_PARAM, &self.original_url);
        Ok(url)
    }

    /// Reads the parameters back from a viewer URL. Parameter order does not
    /// matter and unknown parameters are ignored; when a parameter repeats,
    /// the last occurrence wins.
    pub fn parse(url: &Url) -> Result<Self, NavigationError> {
        let mut stream_key = None;
        let mut original_url = String::new();
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                STREAM_URL_PARAM => stream_key = Some(value.into_owned()),
                ORIGINAL_URL_PARAM => original_url = value.into_owned(),
                _ => {}
            }
        }
        let stream_key = stream_key
            .filter(|key| !key.is_empty())
            .ok_or(NavigationError::MissingStreamKey)?;
        Ok(Self {
            stream_key: StreamKey::from(stream_key),
            original_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_viewer_url_with_both_parameters() {
        let navigation = ViewerNavigation::new(
            StreamKey::from("3f1c"),
            "https://example.com/files/a b.pdf?x=1&y=2",
        );
        let url = navigation.to_url(&ViewerOrigin::default()).unwrap();

        assert_eq!(url.scheme(), "chrome");
        assert_eq!(url.host_str(), Some("pdf-viewer"));
        assert_eq!(url.path(), "/index.html");
        assert_eq!(ViewerNavigation::parse(&url).unwrap(), navigation);
    }

    #[test]
    fn parse_tolerates_order_and_unknown_parameters() {
        let url = Url::parse(concat!(
            "chrome://pdf-viewer/index.html?tab=1",
            "&originalURL=https%3A%2F%2Fexample.com%2Fa.pdf&streamURL=key-9",
        ))
        .unwrap();
        let navigation = ViewerNavigation::parse(&url).unwrap();
        assert_eq!(navigation.stream_key, StreamKey::from("key-9"));
        assert_eq!(navigation.original_url, "https://example.com/a.pdf");
    }

    #[test]
    fn parse_without_stream_key_fails() {
        for raw in [
            "chrome://pdf-viewer/index.html?originalURL=https://example.com/a.pdf",
            "chrome://pdf-viewer/index.html?streamURL=&originalURL=x",
            "chrome://pdf-viewer/index.html",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(matches!(
                ViewerNavigation::parse(&url),
                Err(NavigationError::MissingStreamKey)
            ));
        }
    }

    #[test]
    fn missing_original_url_is_empty() {
        let url = Url::parse("chrome://pdf-viewer/index.html?streamURL=k").unwrap();
        assert_eq!(ViewerNavigation::parse(&url).unwrap().original_url, "");
    }

    #[test]
    fn origin_recognises_its_own_urls() {
        let origin = ViewerOrigin::default();
        assert!(origin.is_viewer_url(&Url::parse("chrome://pdf-viewer/index.html").unwrap()));
        assert!(!origin.is_viewer_url(&Url::parse("chrome://settings/").unwrap()));
        assert!(!origin.is_viewer_url(&Url::parse("https://pdf-viewer/").unwrap()));
        assert!(origin.matches("chrome", "pdf-viewer"));
        assert_eq!(origin.to_string(), "chrome://pdf-viewer");
    }

    #[test]
    fn invalid_origin_is_reported() {
        let origin = ViewerOrigin::new("not a scheme", "viewer");
        assert!(matches!(
            origin.url(),
            Err(NavigationError::InvalidOrigin { .. })
        ));
    }
}
