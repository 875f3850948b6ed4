use std::io;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("no external opener available on this platform")]
    Unsupported,
}

/// OS-level "open with the default handler" primitive.
pub trait ExternalOpener: Send + Sync {
    fn open_external(&self, escaped_url: &str) -> Result<(), OpenError>;
}

/// Desktop launcher that hands a URL to the default handler. Every launcher
/// receives the URL as a single argument and none of them runs a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    /// macOS `open`.
    Open,
    /// freedesktop `xdg-open`.
    XdgOpen,
    /// Windows `rundll32 url.dll,FileProtocolHandler`.
    FileProtocolHandler,
}

impl Launcher {
    pub fn for_current_platform() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::Open)
        } else if cfg!(target_os = "windows") {
            Some(Self::FileProtocolHandler)
        } else if cfg!(unix) {
            Some(Self::XdgOpen)
        } else {
            None
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::XdgOpen => "xdg-open",
            Self::FileProtocolHandler => "rundll32",
        }
    }

    pub fn command(self, escaped_url: &str) -> Command {
        let mut command = Command::new(self.program());
        if self == Self::FileProtocolHandler {
            command.arg("url.dll,FileProtocolHandler");
        }
        command.arg(escaped_url);
        command
    }
}

/// Hands URLs to the desktop's default handler. The launcher is spawned and
/// left running; its exit status is not awaited.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open_external(&self, escaped_url: &str) -> Result<(), OpenError> {
        let launcher = Launcher::for_current_platform().ok_or(OpenError::Unsupported)?;
        let program = launcher.program();
        launcher
            .command(escaped_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OpenError::Spawn { program, source })?;
        debug!(program, url = %escaped_url, "external handler launched");
        Ok(())
    }
}

/// Records the request in the log instead of launching anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOpener;

impl ExternalOpener for LoggingOpener {
    fn open_external(&self, escaped_url: &str) -> Result<(), OpenError> {
        info!(url = %escaped_url, "would open externally");
        Ok(())
    }
}
