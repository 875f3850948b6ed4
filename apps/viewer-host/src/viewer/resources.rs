//! Static files of the viewer UI, served from the viewer origin.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, trace};

const DEFAULT_MIME_TYPE: &str = "text/html";

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
    (".png", "image/png"),
    (".gif", "image/gif"),
    (".svg", "image/svg+xml"),
    (".manifest", "text/cache-manifest"),
];

const BUILTIN: &[(&str, u32, &[u8])] = &[
    ("index.html", 1, include_bytes!("../../assets/index.html")),
    ("viewer.js", 2, include_bytes!("../../assets/viewer.js")),
    ("viewer.css", 3, include_bytes!("../../assets/viewer.css")),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource path {path:?} registered twice")]
    DuplicatePath { path: String },
}

/// Request path relative to the origin root, without query or fragment.
pub fn path_without_params(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].trim_start_matches('/')
}

pub fn mime_type_for_path(path: &str) -> &'static str {
    let filename = path_without_params(path).as_bytes();
    MIME_BY_EXTENSION
        .iter()
        .find(|(extension, _)| {
            filename.len() >= extension.len()
                && filename[filename.len() - extension.len()..]
                    .eq_ignore_ascii_case(extension.as_bytes())
        })
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Source of packaged resource bytes.
pub trait ResourceBundle: Send + Sync {
    fn load(&self, resource_id: u32) -> Option<Bytes>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticBundle {
    resources: HashMap<u32, Bytes>,
}

impl StaticBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource_id: u32, data: impl Into<Bytes>) {
        self.resources.insert(resource_id, data.into());
    }
}

impl ResourceBundle for StaticBundle {
    fn load(&self, resource_id: u32) -> Option<Bytes> {
        self.resources.get(&resource_id).cloned()
    }
}

/// Maps request paths of the viewer origin onto bundle resources.
pub struct BundledDataSource {
    paths: HashMap<String, u32>,
    bundle: Arc<dyn ResourceBundle>,
}

impl BundledDataSource {
    pub fn new<'a, I>(entries: I, bundle: Arc<dyn ResourceBundle>) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let mut paths = HashMap::new();
        for (path, resource_id) in entries {
            let path = normalize(path);
            if paths.contains_key(&path) {
                return Err(ResourceError::DuplicatePath { path });
            }
            paths.insert(path, resource_id);
        }
        debug!(resources = paths.len(), "viewer resources registered");
        Ok(Self { paths, bundle })
    }

    /// The viewer UI compiled into the binary.
    pub fn builtin() -> Result<Self, ResourceError> {
        let mut bundle = StaticBundle::new();
        for (_, resource_id, data) in BUILTIN {
            bundle.insert(*resource_id, Bytes::from_static(data));
        }
        Self::new(
            BUILTIN.iter().map(|(path, resource_id, _)| (*path, *resource_id)),
            Arc::new(bundle),
        )
    }

    pub fn mime_type(&self, path: &str) -> &'static str {
        mime_type_for_path(path)
    }

    /// Bytes for `path`, or `None` when nothing is registered under it.
    pub fn start_data_request(&self, path: &str) -> Option<Bytes> {
        let filename = normalize(path_without_params(path));
        let Some(resource_id) = self.paths.get(&filename) else {
            trace!(path, "no viewer resource");
            return None;
        };
        self.bundle.load(*resource_id)
    }

    /// Bytes and MIME type for `path`.
    pub fn serve(&self, path: &str) -> Option<(Bytes, &'static str)> {
        let data = self.start_data_request(path)?;
        Some((data, self.mime_type(path)))
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> BundledDataSource {
        let mut bundle = StaticBundle::new();
        bundle.insert(1, Bytes::from_static(b"<html></html>"));
        bundle.insert(2, Bytes::from_static(b"main();"));
        BundledDataSource::new(
            [("index.html", 1), ("elements\\main.js", 2)],
            Arc::new(bundle),
        )
        .unwrap()
    }

    #[test]
    fn strips_query_fragment_and_leading_slash() {
        assert_eq!(path_without_params("index.html?streamURL=a&x=b"), "index.html");
        assert_eq!(path_without_params("/main.js#top"), "main.js");
        assert_eq!(path_without_params(""), "");
    }

    #[test]
    fn mime_types_by_extension_ignore_case() {
        assert_eq!(mime_type_for_path("index.HTML?x=1"), "text/html");
        assert_eq!(mime_type_for_path("style.Css"), "text/css");
        assert_eq!(mime_type_for_path("main.js"), "application/javascript");
        assert_eq!(mime_type_for_path("icon.PNG"), "image/png");
        assert_eq!(mime_type_for_path("spinner.gif"), "image/gif");
        assert_eq!(mime_type_for_path("logo.svg"), "image/svg+xml");
        assert_eq!(mime_type_for_path("viewer.manifest"), "text/cache-manifest");
        assert_eq!(mime_type_for_path("README"), "text/html");
        assert_eq!(mime_type_for_path("js"), "text/html");
    }

    #[test]
    fn serves_registered_paths_only() {
        let source = source();
        assert_eq!(
            source.start_data_request("index.html?streamURL=k"),
            Some(Bytes::from_static(b"<html></html>"))
        );
        assert_eq!(
            source.start_data_request("/elements/main.js"),
            Some(Bytes::from_static(b"main();"))
        );
        assert_eq!(source.start_data_request("missing.css"), None);
    }

    #[test]
    fn builtin_ui_links_its_script_and_styles() {
        let source = BundledDataSource::builtin().unwrap();
        let (page, mime) = source.serve("/index.html?streamURL=k").unwrap();
        assert_eq!(mime, "text/html");
        let page = std::str::from_utf8(&page).unwrap();
        assert!(page.contains("viewer.js"));
        assert!(page.contains("viewer.css"));

        let (_, mime) = source.serve("viewer.js").unwrap();
        assert_eq!(mime, "application/javascript");
        let (_, mime) = source.serve("viewer.css").unwrap();
        assert_eq!(mime, "text/css");
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let err = BundledDataSource::new(
            [("a/index.html", 1), ("a\\index.html", 2)],
            Arc::new(StaticBundle::new()),
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            ResourceError::DuplicatePath {
                path: "a/index.html".into()
            }
        );
    }
}
