//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use cloudfiles_engine::{
    DownloadEvent, DownloadRequest, FileSystemSaver, SavedFile, TransferOrchestrator, UploadEvent,
    UploadResult,
};
use cloudfiles_relay::{
    ConfigSession, Page, RelayState, RuntimeContext, Subscription, config_state, request_config,
    start_session, stop_session,
};
use cloudfiles_transfer::{
    ByteSource, DiskFile, FileFilter, calculate_file_checksum, file_type_label, format_file_size,
};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::config::CliConfig;
use crate::remote::DirectoryRemote;
use crate::store::DirectoryStore;

pub async fn upload(
    cfg: &CliConfig,
    path: &Path,
    caller_id: Option<String>,
    filter: &FileFilter,
) -> anyhow::Result<()> {
    let result = run_upload(cfg, path, caller_id, filter).await?;
    println!("{}", result.file_id.unwrap_or_default());
    Ok(())
}

pub async fn download(
    cfg: &CliConfig,
    id: &str,
    name: Option<String>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let saved = run_download(cfg, id, name, out).await?;
    println!("{}", saved.path.display());
    println!("sha256 {}", saved.sha256);
    Ok(())
}

pub async fn relay_put(cfg: &CliConfig, payload: &str, href: Option<&str>) -> anyhow::Result<()> {
    let (session, url) = run_relay_put(cfg, payload, href).await?;
    println!("{}", session.config_id);
    if let Some(url) = url {
        println!("{url}");
    }
    Ok(())
}

pub async fn relay_get(
    cfg: &CliConfig,
    config_id: &str,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let value = run_relay_get(cfg, config_id, timeout_ms).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn relay_drop(cfg: &CliConfig, config_id: &str) -> anyhow::Result<()> {
    let subscription = Subscription::new(relay_store(cfg), config_id);
    stop_session(Some(&subscription)).await;
    info!(config_id = %config_id, "relay record dropped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

async fn run_upload(
    cfg: &CliConfig,
    path: &Path,
    caller_id: Option<String>,
    filter: &FileFilter,
) -> anyhow::Result<UploadResult> {
    let remote = DirectoryRemote::new(&cfg.remote_dir);
    let source = DiskFile::open(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !filter.allows(source.name(), source.size()) {
        bail!(
            "{} ({}) is not an accepted file",
            source.name(),
            format_file_size(source.size())
        );
    }
    let digest = calculate_file_checksum(path)?;
    info!(file = %source.name(), size = %format_file_size(source.size()), sha256 = %digest, "uploading");
    let caller_id = caller_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut orch = TransferOrchestrator::new(cfg.policy());
    let events = orch
        .take_upload_events()
        .ok_or_else(|| anyhow!("upload events already taken"))?;
    let printer = tokio::spawn(log_upload_events(events));

    let outcome = orch.upload(&remote, &source, &caller_id).await;
    drop(orch);
    let _ = printer.await;

    outcome.map_err(|e| anyhow!("upload failed: {}", e.user_message()))
}

async fn run_download(
    cfg: &CliConfig,
    id: &str,
    name: Option<String>,
    out: Option<PathBuf>,
) -> anyhow::Result<SavedFile> {
    let remote = DirectoryRemote::new(&cfg.remote_dir);
    let meta = remote
        .metadata(id)
        .await
        .map_err(|e| anyhow!("download failed: {}", e.user_message()))?;

    let mut request = DownloadRequest::new(id, meta.size)
        .with_chunking(cfg.chunk_size, cfg.threads)
        .with_file_name(name.unwrap_or(meta.name));
    if let Some(mime) = meta.mime_type.clone() {
        request = request.with_mime_type(mime);
    }
    info!(
        id = %id,
        size = %format_file_size(meta.size),
        kind = %meta.mime_type.as_deref().and_then(file_type_label).unwrap_or_default(),
        "downloading"
    );

    let saver = FileSystemSaver::new(out.unwrap_or_else(|| cfg.download_dir.clone()));
    let mut orch = TransferOrchestrator::new(cfg.policy());
    let events = orch
        .take_download_events()
        .ok_or_else(|| anyhow!("download events already taken"))?;
    let printer = tokio::spawn(log_download_events(events));

    let outcome = orch.download(&remote, &saver, request).await;
    drop(orch);
    let _ = printer.await;

    outcome.map_err(|e| anyhow!("download failed: {}", e.user_message()))
}

async fn run_relay_put(
    cfg: &CliConfig,
    payload: &str,
    href: Option<&str>,
) -> anyhow::Result<(ConfigSession, Option<String>)> {
    let text = match payload.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?,
        None => payload.to_string(),
    };
    let value: serde_json::Value =
        serde_json::from_str(&text).context("payload is not valid JSON")?;

    let session = start_session(relay_store(cfg), &value).await?;
    let url = href.map(|href| {
        let ctx = RuntimeContext::parse(href);
        let page = Page::FileDetails.name_for(ctx.classify());
        ctx.navigation_url(page, &config_state(&session.config_id))
    });
    Ok((session, url))
}

async fn run_relay_get(
    cfg: &CliConfig,
    config_id: &str,
    timeout_ms: Option<u64>,
) -> anyhow::Result<serde_json::Value> {
    let mut config = cfg.relay_config();
    if let Some(ms) = timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }

    let (tx, rx) = oneshot::channel::<serde_json::Value>();
    let request = request_config(relay_store(cfg), config_id, config, move |value| {
        let _ = tx.send(value);
    });

    match request.finished().await {
        RelayState::Delivered => Ok(rx.await?),
        RelayState::TimedOut => bail!(
            "no config arrived for {config_id} within {} ms",
            config.timeout.as_millis()
        ),
        RelayState::Malformed => bail!("config {config_id} is not valid JSON"),
        state => bail!("relay request ended in state {state:?}"),
    }
}

fn relay_store(cfg: &CliConfig) -> Arc<DirectoryStore> {
    Arc::new(DirectoryStore::new(cfg.relay_dir()))
}

async fn log_upload_events(mut events: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Progress { percent, .. } => info!(percent, "upload progress"),
            UploadEvent::Completed { result } => {
                info!(file_id = result.file_id.as_deref().unwrap_or_default(), "upload completed")
            }
            UploadEvent::Failed { error, .. } => tracing::error!(%error, "upload failed"),
        }
    }
}

async fn log_download_events(mut events: mpsc::Receiver<DownloadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            DownloadEvent::RangeCompleted {
                completed, total, ..
            } => info!(completed, total, "range downloaded"),
            DownloadEvent::Completed { file, .. } => {
                info!(path = %file.path.display(), "download saved")
            }
            DownloadEvent::Failed { error, range, .. } => {
                tracing::error!(%error, start = range.map(|r| r.start), "download failed")
            }
        }
    }
}
