//! Background tasks for progress reporting and database batch updates.

use crate::speedometer::Speedometer;
use crate::types::{DownloadId, Event};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Buffer size for the article status update channel
pub(crate) const ARTICLE_CHANNEL_BUFFER: usize = 500;

/// Interval between progress update emissions
const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Batch size threshold for flushing article status updates to the database
const ARTICLE_BATCH_SIZE: usize = 100;

/// Parameters for spawning a progress reporter background task
pub(crate) struct ProgressReporterParams {
    /// Download ID
    pub id: DownloadId,
    /// Total number of articles
    pub total_articles: usize,
    /// Total size in bytes
    pub total_size_bytes: u64,
    /// Download start time
    pub download_start: std::time::Instant,
    /// Atomic counter for downloaded articles
    pub downloaded_articles: Arc<AtomicU64>,
    /// Atomic counter for downloaded bytes
    pub downloaded_bytes: Arc<AtomicU64>,
    /// Atomic counter for individually-failed articles
    pub failed_articles: Arc<AtomicU64>,
    /// Event broadcast sender
    pub event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Database handle
    pub db: Arc<crate::db::Database>,
    /// Rolling-average speed meter to feed with per-tick byte deltas
    pub speedometer: Speedometer,
    /// Cancellation token
    pub cancel_token: tokio_util::sync::CancellationToken,
}

/// Spawn a background task that periodically reports download progress.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        id,
        total_articles,
        total_size_bytes,
        download_start,
        downloaded_articles,
        downloaded_bytes,
        failed_articles,
        event_tx,
        db,
        speedometer,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_reported_bytes = 0u64;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let current_bytes = downloaded_bytes.load(Ordering::Relaxed);
                    let current_articles = downloaded_articles.load(Ordering::Relaxed);
                    let current_failed = failed_articles.load(Ordering::Relaxed);

                    // Feed the delta since the last tick (zero if nothing new arrived),
                    // keeping the speedometer's bucket timeline advancing every tick.
                    let delta_bytes = current_bytes.saturating_sub(last_reported_bytes);
                    speedometer.add(delta_bytes);
                    last_reported_bytes = current_bytes;

                    let progress_percent = if total_size_bytes > 0 {
                        (current_bytes as f32 / total_size_bytes as f32) * 100.0
                    } else {
                        (current_articles as f32 / total_articles as f32) * 100.0
                    };

                    let elapsed_secs = download_start.elapsed().as_secs_f64();
                    let speed_bps = if elapsed_secs > 0.0 {
                        (current_bytes as f64 / elapsed_secs) as u64
                    } else {
                        0
                    };

                    // Compute download health
                    let attempted = current_articles + current_failed;
                    let health_percent = if attempted > 0 {
                        Some(100.0 * (1.0 - current_failed as f32 / attempted as f32))
                    } else {
                        None
                    };

                    if let Err(e) = db.update_progress(
                        id,
                        progress_percent,
                        speed_bps,
                        current_bytes,
                    ).await {
                        tracing::error!(download_id = id.0, error = %e, "Failed to update progress");
                    }

                    event_tx
                        .send(Event::Downloading {
                            id,
                            percent: progress_percent,
                            speed_bps,
                            failed_articles: if current_failed > 0 { Some(current_failed) } else { None },
                            total_articles: Some(total_articles as u64),
                            health_percent,
                        })
                        .ok();
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
    })
}

/// Spawn a background task that batches article status updates for SQLite efficiency.
pub(crate) fn spawn_batch_updater(
    id: DownloadId,
    db: Arc<crate::db::Database>,
    mut batch_rx: tokio::sync::mpsc::Receiver<(i64, i32)>,
    cancel_token: tokio_util::sync::CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buffer = Vec::with_capacity(ARTICLE_BATCH_SIZE);
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                msg = batch_rx.recv() => {
                    let Some((article_id, status)) = msg else {
                        // Channel closed — flush remaining and exit
                        break;
                    };
                    buffer.push((article_id, status));

                    if buffer.len() >= ARTICLE_BATCH_SIZE {
                        if let Err(e) = db.update_articles_status_batch(&buffer).await {
                            tracing::error!(download_id = id.0, batch_size = buffer.len(), error = %e, "Failed to batch update article statuses");
                        }
                        buffer.clear();
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        if let Err(e) = db.update_articles_status_batch(&buffer).await {
                            tracing::error!(download_id = id.0, batch_size = buffer.len(), error = %e, "Failed to batch update article statuses");
                        }
                        buffer.clear();
                    }
                }
                _ = cancel_token.cancelled() => {
                    if !buffer.is_empty() && let Err(e) = db.update_articles_status_batch(&buffer).await {
                        tracing::error!(download_id = id.0, batch_size = buffer.len(), error = %e, "Failed to batch update article statuses on cancellation");
                    }
                    break;
                }
            }
        }

        // Final flush when task ends (channel closed)
        while let Ok((article_id, status)) = batch_rx.try_recv() {
            buffer.push((article_id, status));
        }
        if !buffer.is_empty()
            && let Err(e) = db.update_articles_status_batch(&buffer).await
        {
            tracing::error!(download_id = id.0, batch_size = buffer.len(), error = %e, "Failed to flush remaining article statuses");
        }
    })
}

/// Spawn a hang-detection watcher (§4.4/§4.11): polls the download's combined
/// progress counters every `check_interval`; if the total (bytes + completed +
/// failed articles) hasn't moved since the previous poll for `terminate_timeout`,
/// the worker is considered hung, an [`Event::HangDetected`] is emitted, and the
/// download's cancellation token is triggered so the stalled worker tears down.
/// Articles still pending at that point are picked up again on the next attempt —
/// nothing here is ever marked as in-flight ("Running") in the database, so there
/// is no separate reset step.
///
/// The whole batch of in-flight pipelined fetches is watched as a unit rather than
/// any single article, so `message_id` on the emitted event names the download
/// rather than a specific stalled segment.
pub(crate) fn spawn_hang_detector(
    id: DownloadId,
    downloaded_articles: &Arc<AtomicU64>,
    downloaded_bytes: &Arc<AtomicU64>,
    failed_articles: &Arc<AtomicU64>,
    hang_config: crate::config::HangDetectionConfig,
    event_tx: tokio::sync::broadcast::Sender<Event>,
    cancel_token: tokio_util::sync::CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let downloaded_articles = Arc::clone(downloaded_articles);
    let downloaded_bytes = Arc::clone(downloaded_bytes);
    let failed_articles = Arc::clone(failed_articles);
    let child_token = cancel_token.child_token();

    tokio::spawn(async move {
        if !hang_config.enabled {
            return;
        }

        let mut interval = tokio::time::interval(hang_config.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut last_total = u64::MAX;
        let mut stalled_since: Option<std::time::Instant> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let total = downloaded_bytes.load(Ordering::Relaxed)
                        .wrapping_add(downloaded_articles.load(Ordering::Relaxed))
                        .wrapping_add(failed_articles.load(Ordering::Relaxed));

                    if total == last_total {
                        let since = *stalled_since.get_or_insert_with(std::time::Instant::now);
                        if since.elapsed() >= hang_config.terminate_timeout {
                            let idle_secs = since.elapsed().as_secs();
                            let message_id = format!("download:{}", id.0);
                            tracing::warn!(download_id = id.0, idle_secs, "Hang detected, terminating worker");
                            event_tx
                                .send(Event::HangDetected { id, message_id, idle_secs })
                                .ok();
                            child_token.cancel();
                            break;
                        }
                    } else {
                        last_total = total;
                        stalled_since = None;
                    }
                }
                _ = child_token.cancelled() => {
                    break;
                }
            }
        }
    })
}
