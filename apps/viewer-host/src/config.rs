use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stream_handoff::{InterceptionPolicy, PDF_MIME_TYPE, ViewerOrigin};

pub const DEFAULT_LOG_FILTER: &str = "info,viewer_host=debug";
pub const DEFAULT_VIEWER_SCHEME: &str = "chrome";
pub const DEFAULT_VIEWER_HOST: &str = "pdf-viewer";

#[derive(Debug, Parser)]
#[command(
    name = "viewer-host",
    author,
    version,
    about = "Diverts responses into an internal viewer and gates external opens"
)]
pub struct Cli {
    /// Tracing filter directive. Falls back to RUST_LOG, then to the built-in default.
    #[arg(long, env = "VIEWER_HOST_LOG")]
    pub log_filter: Option<String>,

    /// Scheme of the internal viewer origin.
    #[arg(long, env = "VIEWER_HOST_SCHEME", default_value = DEFAULT_VIEWER_SCHEME)]
    pub viewer_scheme: String,

    /// Host of the internal viewer origin.
    #[arg(long, env = "VIEWER_HOST_VIEWER_HOST", default_value = DEFAULT_VIEWER_HOST)]
    pub viewer_host: String,

    /// MIME types diverted to the viewer (comma separated).
    #[arg(
        long = "mime-types",
        env = "VIEWER_HOST_MIME_TYPES",
        value_delimiter = ',',
        default_value = PDF_MIME_TYPE
    )]
    pub mime_types: Vec<String>,

    /// Zoom level used for origins without an explicit level.
    #[arg(
        long,
        env = "VIEWER_HOST_DEFAULT_ZOOM_LEVEL",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub default_zoom_level: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve a local file as an intercepted response and drive a viewer session over it.
    Divert(DivertArgs),
    /// Route a URL through the permission-gated external opener.
    OpenExternal(OpenExternalArgs),
}

#[derive(Debug, Args)]
pub struct DivertArgs {
    /// File used as the response body.
    pub path: PathBuf,

    /// MIME type announced by the response.
    #[arg(long, default_value = PDF_MIME_TYPE)]
    pub mime_type: String,

    /// URL the response was loaded from. Defaults to the file URL of `path`.
    #[arg(long)]
    pub original_url: Option<String>,

    /// Change the viewer's zoom level once the session is active.
    #[arg(long, allow_negative_numbers = true)]
    pub zoom_level: Option<f64>,
}

#[derive(Debug, Args)]
pub struct OpenExternalArgs {
    pub url: String,

    /// Grant the permission request (denied otherwise).
    #[arg(long)]
    pub allow: bool,

    /// Mark the request as triggered by a user gesture.
    #[arg(long)]
    pub gesture: bool,

    /// Log the open instead of launching the system handler.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub log_filter: String,
    pub viewer_scheme: String,
    pub viewer_host: String,
    pub mime_types: Vec<String>,
    pub default_zoom_level: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.into(),
            viewer_scheme: DEFAULT_VIEWER_SCHEME.into(),
            viewer_host: DEFAULT_VIEWER_HOST.into(),
            mime_types: vec![PDF_MIME_TYPE.into()],
            default_zoom_level: 0.0,
        }
    }
}

impl HostConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let log_filter = cli
            .log_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.into());
        let mime_types = cli
            .mime_types
            .iter()
            .map(|mime| mime.trim())
            .filter(|mime| !mime.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            log_filter,
            viewer_scheme: cli.viewer_scheme.clone(),
            viewer_host: cli.viewer_host.clone(),
            mime_types,
            default_zoom_level: cli.default_zoom_level,
        }
    }

    pub fn viewer_origin(&self) -> ViewerOrigin {
        ViewerOrigin::new(&self.viewer_scheme, &self.viewer_host)
    }

    pub fn interception_policy(&self) -> InterceptionPolicy {
        InterceptionPolicy::new(self.mime_types.iter().cloned(), self.viewer_origin())
    }
}
