//! PAR2 verification stage

use crate::db::Database;
use crate::error::Result;
use crate::parity::{ArticleChecksums, ParityHandler, QuickVerifyOutcome};
use crate::types::{DownloadId, Event};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::PostProcessError;

/// Result of a verify pass: whether the set is intact, or damaged but
/// repairable (the caller decides whether to act on it — [`PostProcess::Verify`]
/// mode never repairs even when this comes back [`RepairNeeded`](VerifyOutcome::RepairNeeded)).
/// Damaged-and-unrepairable is not a variant here; it surfaces as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerifyOutcome {
    Complete,
    RepairNeeded,
}

/// Execute the verify stage
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_verify_stage(
    download_id: DownloadId,
    download_path: &Path,
    event_tx: &broadcast::Sender<Event>,
    parity_handler: &Arc<dyn ParityHandler>,
    db: &Arc<Database>,
    quick_verify_enabled: bool,
) -> Result<VerifyOutcome> {
    debug!(
        download_id = download_id.0,
        ?download_path,
        "running verify stage"
    );

    // Emit Verifying event
    event_tx.send(Event::Verifying { id: download_id }).ok();

    // Find PAR2 files in download directory
    let par2_files = find_par2_files(download_path).await?;

    if par2_files.is_empty() {
        debug!(
            download_id = download_id.0,
            "no PAR2 files found, skipping verification"
        );

        // Emit VerifyComplete event (no damage detected, but also no verification)
        event_tx
            .send(Event::VerifyComplete {
                id: download_id,
                damaged: false,
            })
            .ok();

        return Ok(VerifyOutcome::Complete);
    }

    // Use the first PAR2 file found (typically the .par2 file, not .vol files)
    let par2_file = &par2_files[0];
    debug!(
        download_id = download_id.0,
        ?par2_file,
        "verifying with PAR2 file"
    );

    if quick_verify_enabled
        && try_quick_verify(download_id, par2_file, db).await
    {
        info!(
            download_id = download_id.0,
            ?par2_file,
            "quick-verify confirmed all files intact, skipping full PAR2 verification"
        );

        event_tx
            .send(Event::VerifyComplete {
                id: download_id,
                damaged: false,
            })
            .ok();

        return Ok(VerifyOutcome::Complete);
    }

    // Call parity handler to verify
    let verify_result = match parity_handler.verify(par2_file).await {
        Ok(result) => result,
        Err(crate::Error::NotSupported(ref msg)) => {
            warn!(
                download_id = download_id.0,
                ?par2_file,
                "PAR2 verification not supported: {}",
                msg
            );

            // Emit VerifyComplete event (skipped, assume no damage)
            event_tx
                .send(Event::VerifyComplete {
                    id: download_id,
                    damaged: false,
                })
                .ok();

            return Ok(VerifyOutcome::Complete);
        }
        Err(e) => return Err(e),
    };

    info!(
        download_id = download_id.0,
        is_complete = verify_result.is_complete,
        damaged_blocks = verify_result.damaged_blocks,
        recovery_blocks = verify_result.recovery_blocks_available,
        repairable = verify_result.repairable,
        "PAR2 verification complete"
    );

    // Emit VerifyComplete event
    event_tx
        .send(Event::VerifyComplete {
            id: download_id,
            damaged: !verify_result.is_complete,
        })
        .ok();

    // If files are damaged and not repairable, fail immediately
    if !verify_result.is_complete && !verify_result.repairable {
        return Err(PostProcessError::VerificationFailed {
            id: download_id.into(),
            reason: format!(
                "files are damaged ({} blocks) but cannot be repaired (need {} more recovery blocks)",
                verify_result.damaged_blocks,
                verify_result.damaged_blocks.saturating_sub(verify_result.recovery_blocks_available)
            ),
        }
        .into());
    }

    if verify_result.is_complete {
        Ok(VerifyOutcome::Complete)
    } else {
        Ok(VerifyOutcome::RepairNeeded)
    }
}

/// Attempt the CRC-combine quick-verify shortcut for a download.
///
/// Builds the per-file article checksum lists from the database and delegates
/// to [`crate::parity::quick_verify`]. Returns `true` only when every file in
/// the download was positively confirmed intact; any parse error, missing
/// checksum, or mismatch falls back to full verification rather than ever
/// claiming success on ambiguous input.
async fn try_quick_verify(download_id: DownloadId, par2_file: &Path, db: &Arc<Database>) -> bool {
    let files = match db.get_download_files(download_id).await {
        Ok(files) => files,
        Err(e) => {
            debug!(download_id = download_id.0, error = %e, "quick-verify: failed to load download files");
            return false;
        }
    };
    if files.is_empty() {
        return false;
    }

    let articles = match db.get_articles(download_id).await {
        Ok(articles) => articles,
        Err(e) => {
            debug!(download_id = download_id.0, error = %e, "quick-verify: failed to load articles");
            return false;
        }
    };

    let mut checksums = Vec::with_capacity(files.len());
    for file in &files {
        if file.deleted {
            continue;
        }
        let mut file_articles: Vec<_> = articles
            .iter()
            .filter(|a| a.file_index == file.file_index)
            .collect();
        file_articles.sort_by_key(|a| a.segment_number);

        if file_articles.len() as i32 != file.total_segments {
            return false;
        }

        let mut per_article = Vec::with_capacity(file_articles.len());
        for article in &file_articles {
            if article.status != crate::db::article_status::DOWNLOADED {
                return false;
            }
            let Some(crc32) = article.crc32 else {
                return false;
            };
            per_article.push((crc32 as u32, article.size_bytes as u64));
        }

        checksums.push(ArticleChecksums {
            filename: file.filename.clone(),
            articles: per_article,
        });
    }

    match crate::parity::quick_verify::quick_verify(par2_file, &checksums) {
        Ok(QuickVerifyOutcome::AllIntact) => true,
        Ok(QuickVerifyOutcome::Inconclusive) => false,
        Err(e) => {
            debug!(download_id = download_id.0, error = %e, "quick-verify: failed to parse PAR2 set");
            false
        }
    }
}

/// Find all PAR2 files in the download directory
async fn find_par2_files(download_path: &Path) -> Result<Vec<PathBuf>> {
    let mut par2_files = Vec::new();

    let mut entries = tokio::fs::read_dir(download_path)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to read directory: {}", e)))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let metadata = entry.metadata().await?;
        if metadata.is_file()
            && let Some(ext) = path.extension()
            && ext.eq_ignore_ascii_case("par2")
        {
            par2_files.push(path);
        }
    }

    // Sort to prioritize base .par2 files over .vol files
    // Base files typically end in just .par2, while vol files have .vol##-##.par2
    par2_files.sort_by(|a, b| {
        let a_is_vol = a
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.contains(".vol"))
            .unwrap_or(false);
        let b_is_vol = b
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.contains(".vol"))
            .unwrap_or(false);

        match (a_is_vol, b_is_vol) {
            (false, true) => std::cmp::Ordering::Less, // a is base file, prefer it
            (true, false) => std::cmp::Ordering::Greater, // b is base file, prefer it
            _ => a.cmp(b),                             // both same type, alphabetical
        }
    });

    Ok(par2_files)
}
