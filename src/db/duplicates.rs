//! Duplicate detection queries.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, Download};

impl Database {
    /// Find a download by NZB hash
    ///
    /// This is the most reliable duplicate detection method as it compares
    /// the actual NZB file content (via SHA-256 hash).
    pub async fn find_by_nzb_hash(&self, nzb_hash: &str) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                error_message, created_at, started_at, completed_at,
                post_stage, stage_progress, queue_position, post_paused, dupe_key, dupe_score,
                direct_unpack_state, direct_unpack_extracted_count
            FROM downloads
            WHERE nzb_hash = ?
            LIMIT 1
            "#,
        )
        .bind(nzb_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find download by nzb_hash: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Find a download by exact name match
    ///
    /// This is useful for detecting duplicates when the NZB filename is used
    /// as the download name. Case-sensitive match.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                error_message, created_at, started_at, completed_at,
                post_stage, stage_progress, queue_position, post_paused, dupe_key, dupe_score,
                direct_unpack_state, direct_unpack_extracted_count
            FROM downloads
            WHERE name = ?
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find download by name: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Find a download by job name
    ///
    /// This detects duplicates using the deobfuscated job name, which catches
    /// cases where the same content is uploaded with different NZB filenames.
    pub async fn find_by_job_name(&self, job_name: &str) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(
            r#"
            SELECT
                id, name, nzb_path, nzb_meta_name, nzb_hash, job_name,
                category, destination, post_process, priority, status,
                progress, speed_bps, size_bytes, downloaded_bytes,
                error_message, created_at, started_at, completed_at,
                post_stage, stage_progress, queue_position, post_paused, dupe_key, dupe_score,
                direct_unpack_state, direct_unpack_extracted_count
            FROM downloads
            WHERE job_name = ?
            LIMIT 1
            "#,
        )
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find download by job_name: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Find an already-confirmed file within the same collection whose filename
    /// collides with `filename`, excluding `file_index` itself.
    ///
    /// This is the intra-collection counterpart to the other duplicate checks above
    /// (which compare across destination collections): two NZB file entries in the
    /// *same* download can decode to the same on-disk filename once their yEnc
    /// headers are read, which the NZB subject lines alone don't reveal up front.
    pub async fn find_confirmed_filename_collision(
        &self,
        download_id: crate::types::DownloadId,
        file_index: i32,
        filename: &str,
    ) -> Result<Option<super::DownloadFile>> {
        let row = sqlx::query_as::<_, super::DownloadFile>(
            r#"
            SELECT id, download_id, file_index, filename, subject, total_segments,
                   completed, original_filename, filename_confirmed, deleted
            FROM download_files
            WHERE download_id = ? AND file_index != ? AND filename = ?
              AND filename_confirmed = 1 AND deleted = 0
            LIMIT 1
            "#,
        )
        .bind(download_id)
        .bind(file_index)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check filename collision: {}",
                e
            )))
        })?;

        Ok(row)
    }
}
