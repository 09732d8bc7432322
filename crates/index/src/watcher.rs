use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, Semaphore};

use crate::indexer::WorkspaceIndexer;

const BACKOFF_MIN: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(60);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Long-running watch daemon: initial full index, then incremental re-index
/// on filesystem change events, debounced per path. Falls back to periodic
/// rescans when the platform watcher cannot start.
pub async fn run(indexer: Arc<WorkspaceIndexer>, settings: warden_config::IndexerSettings) -> Result<()> {
    tokio::spawn(crate::health::serve(settings.health_port));

    initial_index(&indexer).await;

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    });

    match watcher {
        Ok(mut watcher) => {
            watcher.watch(indexer.root(), RecursiveMode::Recursive)?;
            tracing::info!(root = %indexer.root().display(), "Watching for changes");
            watch_loop(indexer, rx, &settings).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Filesystem watcher unavailable; using periodic rescan");
            rescan_loop(indexer, &settings).await
        }
    }
}

/// The initial index must eventually succeed before watching is useful;
/// retry with exponential backoff while the vector store is unreachable.
async fn initial_index(indexer: &WorkspaceIndexer) {
    let mut backoff = BACKOFF_MIN;
    loop {
        match indexer.build().await {
            Ok(stats) => {
                tracing::info!(
                    scanned = stats.scanned,
                    indexed = stats.indexed,
                    skipped = stats.skipped,
                    failed = stats.failed,
                    "Initial index complete"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, backoff_secs = backoff.as_secs(), "Initial index failed; retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
}

async fn watch_loop(
    indexer: Arc<WorkspaceIndexer>,
    mut rx: mpsc::UnboundedReceiver<Event>,
    settings: &warden_config::IndexerSettings,
) -> Result<()> {
    let debounce = Duration::from_millis(settings.debounce_ms);
    let workers = Arc::new(Semaphore::new(settings.workers.max(1)));
    let mut last_indexed: HashMap<PathBuf, Instant> = HashMap::new();

    loop {
        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Shutting down watcher");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    continue;
                }
                for path in event.paths {
                    if !path.is_file() {
                        continue;
                    }
                    let now = Instant::now();
                    if let Some(last) = last_indexed.get(&path) {
                        if now.duration_since(*last) < debounce {
                            continue;
                        }
                    }
                    last_indexed.insert(path.clone(), now);

                    let permit = workers.clone().acquire_owned().await?;
                    let indexer = indexer.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = indexer.update_file(&path).await {
                            tracing::warn!(file = %path.display(), error = %e, "Re-index failed");
                        }
                    });
                }
            }
        }
    }

    drain(workers, settings.workers.max(1)).await;
    Ok(())
}

async fn rescan_loop(
    indexer: Arc<WorkspaceIndexer>,
    settings: &warden_config::IndexerSettings,
) -> Result<()> {
    let interval = Duration::from_secs(settings.rescan_interval_secs.max(1));
    let mut backoff = BACKOFF_MIN;
    loop {
        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Shutting down rescanner");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {
                match indexer.build().await {
                    Ok(stats) => {
                        backoff = BACKOFF_MIN;
                        if stats.indexed > 0 {
                            tracing::info!(indexed = stats.indexed, "Rescan updated index");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Rescan failed; backing off");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(BACKOFF_MAX);
                    }
                }
            }
        }
    }
}

/// Wait for in-flight upserts by reclaiming every worker permit, bounded.
async fn drain(workers: Arc<Semaphore>, count: usize) {
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, async {
        let _ = workers.acquire_many(count as u32).await;
    })
    .await;
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
