use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use clap::Parser;
use external_open::{
    ExternalOpener, GateOutcome, LoggingOpener, PermissionHelper, StaticPermission, SystemOpener,
};
use serde_json::json;
use stream_handoff::{InterceptedStream, ResponseHeaders, StreamHandle, UNKNOWN_CONTENT_SIZE};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;
use url::Url;
use viewer_host::config::{Cli, Command, DivertArgs, HostConfig, OpenExternalArgs};
use viewer_host::context::{PosterHandle, SerialContext};
use viewer_host::host::ViewerHost;
use viewer_host::surface::Surface;
use viewer_host::telemetry::init_tracing;
use viewer_host::viewer::{ViewerCall, ViewerRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = HostConfig::from_cli(&cli);
    init_tracing(&cfg.log_filter);

    let runtime = Handle::current();
    let (consumption, _worker) = SerialContext::spawn("consumption", &runtime);
    info!(context = consumption.name(), "consumption context running");

    match cli.command {
        Command::Divert(args) => divert(cfg, consumption, runtime, args).await,
        Command::OpenExternal(args) => open_external(cfg, consumption, runtime, args).await,
    }
}

async fn divert(
    cfg: HostConfig,
    consumption: SerialContext,
    runtime: Handle,
    args: DivertArgs,
) -> Result<()> {
    let body = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("reading {}", args.path.display()))?;
    let original_url = match &args.original_url {
        Some(url) => Url::parse(url).with_context(|| format!("invalid original URL {url}"))?,
        None => {
            let path = std::fs::canonicalize(&args.path)
                .with_context(|| format!("resolving {}", args.path.display()))?;
            Url::from_file_path(&path)
                .map_err(|_| anyhow!("{} has no file URL", path.display()))?
        }
    };

    let poster: PosterHandle = Arc::new(consumption.clone());
    let host = ViewerHost::new(cfg, poster, Arc::new(LoggingOpener), runtime)
        .context("building viewer host")?;

    if !host
        .dispatcher()
        .should_intercept_as_stream(&args.mime_type)
        .is_intercept()
    {
        println!(
            "{}",
            json!({ "interception": "passThrough", "mimeType": args.mime_type })
        );
        return Ok(());
    }

    let content_size = i64::try_from(body.len()).unwrap_or(UNKNOWN_CONTENT_SIZE);
    let headers: ResponseHeaders = [
        ("Content-Type", args.mime_type.clone()),
        ("Content-Length", body.len().to_string()),
    ]
    .into_iter()
    .collect();
    let stream = InterceptedStream::new(
        StreamHandle::new(original_url.clone(), Bytes::from(body)),
        original_url,
        args.mime_type.clone(),
    )
    .with_expected_content_size(content_size)
    .with_headers(headers);

    let tab = host.open_surface(None);
    let key = host
        .dispatcher()
        .on_stream_created(stream, host.surfaces().getter(tab.id()))
        .context("diverting stream")?;
    consumption.flush().await;

    let navigation = tab
        .last_loaded()
        .context("viewer navigation never reached the surface")?;
    println!(
        "{}",
        json!({
            "interception": "intercept",
            "streamKey": key.as_str(),
            "navigation": navigation.as_str(),
        })
    );

    let (page, mime_type) = host
        .serve(&navigation)
        .context("viewer UI has no entry page")?;
    info!(bytes = page.len(), mime_type, "viewer entry page served");

    let (events, mut pushed) = mpsc::unbounded_channel();
    let mut session = host
        .factory()
        .create_session(&navigation, events)
        .context("navigation is outside the viewer origin")?;

    for (callback_id, call) in [
        ViewerCall::Initialize,
        ViewerCall::GetInitialZoom,
        ViewerCall::GetDefaultZoom,
    ]
    .into_iter()
    .enumerate()
    {
        let request = ViewerRequest::new(callback_id, call).to_json();
        println!("{request}");
        println!("{}", session.dispatch_json(&request));
    }

    if let Some(body) = session.take_body() {
        info!(bytes = body.len(), "viewer received stream body");
    }

    if let Some(level) = args.zoom_level {
        let origin = host.config().viewer_origin();
        host.zoom().set_zoom_level_for_scheme_and_host(origin.scheme(), origin.host(), level);
    }
    while let Ok(event) = pushed.try_recv() {
        println!("{}", event.to_json());
    }

    session.teardown();
    Ok(())
}

async fn open_external(
    cfg: HostConfig,
    consumption: SerialContext,
    runtime: Handle,
    args: OpenExternalArgs,
) -> Result<()> {
    let permission = if args.allow {
        StaticPermission::allow_all()
    } else {
        StaticPermission::deny_all()
    };
    let opener: Arc<dyn ExternalOpener> = if args.dry_run {
        Arc::new(LoggingOpener)
    } else {
        Arc::new(SystemOpener)
    };

    let poster: PosterHandle = Arc::new(consumption.clone());
    let host = ViewerHost::new(cfg, poster, opener, runtime).context("building viewer host")?;
    let helper: Arc<dyn PermissionHelper> = Arc::new(permission);
    let tab = host.open_surface(Some(helper));

    host.dispatcher()
        .handle_external_protocol(&args.url, args.gesture, host.surfaces().getter(tab.id()));
    consumption.flush().await;

    for outcome in host.dispatcher().settle_external_opens().await {
        println!(
            "{}",
            json!({
                "url": args.url,
                "gesture": args.gesture,
                "outcome": outcome_label(outcome),
            })
        );
    }
    Ok(())
}

fn outcome_label(outcome: GateOutcome) -> &'static str {
    match outcome {
        GateOutcome::Opened => "opened",
        GateOutcome::Denied => "denied",
        GateOutcome::OpenFailed => "openFailed",
    }
}
