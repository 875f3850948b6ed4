use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, Serializer};
use url::Url;

/// Sentinel for a response whose length was not announced.
pub const UNKNOWN_CONTENT_SIZE: i64 = -1;

/// Exclusively owned body of an intercepted response.
///
/// The body can be taken once; afterwards the handle is inert but still
/// reports the URL it was addressable at.
#[derive(Debug)]
pub struct StreamHandle {
    url: Url,
    body: Option<Bytes>,
}

impl StreamHandle {
    pub fn new(url: Url, body: Bytes) -> Self {
        Self {
            url,
            body: Some(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }
}

/// Response headers in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    lines: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.lines.push((name.into(), value.into()));
    }

    pub fn lines(&self) -> &[(String, String)] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Display merge: one entry per header name (compared ignoring ASCII
    /// case), values joined with `", "`. Entries keep the spelling and order
    /// in which each name was first seen.
    pub fn merged(&self) -> MergedHeaders {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (name, value) in &self.lines {
            match entries
                .iter_mut()
                .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            {
                Some((_, merged)) => {
                    merged.push_str(", ");
                    merged.push_str(value);
                }
                None => entries.push((name.clone(), value.clone())),
            }
        }
        MergedHeaders { entries }
    }
}

impl<N, V> FromIterator<(N, V)> for ResponseHeaders
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            lines: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Header map produced by [`ResponseHeaders::merged`]. Serializes as a map in
/// first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedHeaders {
    entries: Vec<(String, String)>,
}

impl MergedHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MergedHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A response diverted away from normal rendering, waiting for its viewer.
#[derive(Debug)]
pub struct InterceptedStream {
    pub handle: StreamHandle,
    pub original_url: Url,
    pub expected_content_size: i64,
    pub response_headers: ResponseHeaders,
    pub mime_type: String,
}

impl InterceptedStream {
    pub fn new(handle: StreamHandle, original_url: Url, mime_type: impl Into<String>) -> Self {
        Self {
            handle,
            original_url,
            expected_content_size: UNKNOWN_CONTENT_SIZE,
            response_headers: ResponseHeaders::new(),
            mime_type: mime_type.into(),
        }
    }

    pub fn with_expected_content_size(mut self, size: i64) -> Self {
        self.expected_content_size = size;
        self
    }

    pub fn with_headers(mut self, headers: ResponseHeaders) -> Self {
        self.response_headers = headers;
        self
    }

    pub fn content_size(&self) -> Option<u64> {
        u64::try_from(self.expected_content_size).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_repeated_headers_in_first_seen_order() {
        let headers: ResponseHeaders = [("X", "a"), ("Y", "b"), ("X", "c")].into_iter().collect();
        let merged = headers.merged();

        let entries: Vec<(&str, &str)> = merged.iter().collect();
        assert_eq!(entries, vec![("X", "a, c"), ("Y", "b")]);
        assert_eq!(
            serde_json::to_string(&merged).unwrap(),
            r#"{"X":"a, c","Y":"b"}"#
        );
    }

    #[test]
    fn merge_ignores_name_case_and_keeps_first_spelling() {
        let headers: ResponseHeaders = [
            ("Set-Cookie", "a=1"),
            ("content-type", "application/pdf"),
            ("set-cookie", "b=2"),
            ("SET-COOKIE", "c=3"),
        ]
        .into_iter()
        .collect();
        let merged = headers.merged();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("set-cookie"), Some("a=1, b=2, c=3"));
        assert_eq!(merged.iter().next(), Some(("Set-Cookie", "a=1, b=2, c=3")));
    }

    #[test]
    fn handle_body_is_taken_once() {
        let url = Url::parse("blob:chrome://pdf-viewer/abc").unwrap();
        let mut handle = StreamHandle::new(url.clone(), Bytes::from_static(b"%PDF-1.7"));

        assert_eq!(handle.take_body(), Some(Bytes::from_static(b"%PDF-1.7")));
        assert!(handle.is_consumed());
        assert_eq!(handle.take_body(), None);
        assert_eq!(handle.url(), &url);
    }

    #[test]
    fn unknown_content_size_has_no_length() {
        let stream = InterceptedStream::new(
            StreamHandle::new(
                Url::parse("blob:chrome://pdf-viewer/abc").unwrap(),
                Bytes::new(),
            ),
            Url::parse("https://example.com/doc.pdf").unwrap(),
            "application/pdf",
        );
        assert_eq!(stream.expected_content_size, UNKNOWN_CONTENT_SIZE);
        assert_eq!(stream.content_size(), None);
        assert_eq!(stream.with_expected_content_size(42).content_size(), Some(42));
    }
}
