//! Database layer for usenet-dl
//!
//! Handles SQLite persistence for downloads, articles, passwords, and history.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`downloads`] — Download queue CRUD
//! - [`articles`] — Article-level tracking for resume support
//! - [`passwords`] — Password cache for archive extraction
//! - [`duplicates`] — Duplicate detection queries
//! - [`history`] — History management
//! - [`state`] — Runtime state (unclean-shutdown tracking)

use crate::types::{HistoryEntry, Status};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

mod articles;
mod downloads;
mod duplicates;
mod history;
mod migrations;
mod passwords;
mod state;

/// New download to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewDownload {
    /// Display name for this download
    pub name: String,
    /// Path to the NZB file
    pub nzb_path: String,
    /// Original name from NZB metadata
    pub nzb_meta_name: Option<String>,
    /// SHA-256 hash of the NZB file for duplicate detection
    pub nzb_hash: Option<String>,
    /// Job name for post-processing scripts
    pub job_name: Option<String>,
    /// Category for organizing downloads
    pub category: Option<String>,
    /// Destination directory for extracted files
    pub destination: String,
    /// Post-processing flags (bitfield: 1=unpack, 2=verify, 4=repair, 8=delete)
    pub post_process: i32,
    /// Download priority (higher values download first)
    pub priority: i32,
    /// Current status (0=queued, 1=downloading, 2=completed, etc.)
    pub status: i32,
    /// Total size in bytes
    pub size_bytes: i64,
}

/// Download record from database
#[derive(Debug, Clone, FromRow)]
pub struct Download {
    /// Unique database ID
    pub id: i64,
    /// Display name for this download
    pub name: String,
    /// Path to the NZB file
    pub nzb_path: String,
    /// Original name from NZB metadata
    pub nzb_meta_name: Option<String>,
    /// SHA-256 hash of the NZB file for duplicate detection
    pub nzb_hash: Option<String>,
    /// Job name for post-processing scripts
    pub job_name: Option<String>,
    /// Category for organizing downloads
    pub category: Option<String>,
    /// Destination directory for extracted files
    pub destination: String,
    /// Post-processing flags (bitfield: 1=unpack, 2=verify, 4=repair, 8=delete)
    pub post_process: i32,
    /// Download priority (higher values download first)
    pub priority: i32,
    /// Current status (0=queued, 1=downloading, 2=completed, etc.)
    pub status: i32,
    /// Download progress as a fraction (0.0-1.0)
    pub progress: f32,
    /// Current download speed in bytes per second
    pub speed_bps: i64,
    /// Total size in bytes
    pub size_bytes: i64,
    /// Number of bytes downloaded so far
    pub downloaded_bytes: i64,
    /// Error message if download failed
    pub error_message: Option<String>,
    /// Unix timestamp when download was created
    pub created_at: i64,
    /// Unix timestamp when download started
    pub started_at: Option<i64>,
    /// Unix timestamp when download completed
    pub completed_at: Option<i64>,
    /// Post-job pipeline stage (see [`crate::types::PostStage`])
    pub post_stage: i32,
    /// Post-job stage progress, 0-1000
    pub stage_progress: i32,
    /// Explicit manual queue position (`NULL` = ordered by priority/created_at)
    pub queue_position: Option<i64>,
    /// Post-job paused bit, independent of `status`
    pub post_paused: bool,
    /// Dupe-key attribute (SetDupeKey queue-editor verb)
    pub dupe_key: Option<String>,
    /// Dupe-score attribute
    pub dupe_score: i32,
    /// DirectUnpack state machine counter
    pub direct_unpack_state: i32,
    /// Number of files DirectUnpack has extracted so far
    pub direct_unpack_extracted_count: i32,
}

/// New article to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewArticle {
    /// Download this article belongs to
    pub download_id: crate::types::DownloadId,
    /// Usenet message-ID
    pub message_id: String,
    /// Segment number within the file
    pub segment_number: i32,
    /// Index of the NZB file this article belongs to (0-based)
    pub file_index: i32,
    /// Size of this segment in bytes
    pub size_bytes: i64,
}

/// Article record from database
#[derive(Debug, Clone, FromRow)]
pub struct Article {
    /// Unique database ID
    pub id: i64,
    /// Download this article belongs to
    pub download_id: i64,
    /// Usenet message-ID
    pub message_id: String,
    /// Segment number within the file
    pub segment_number: i32,
    /// Index of the NZB file this article belongs to (0-based)
    pub file_index: i32,
    /// Size of this segment in bytes
    pub size_bytes: i64,
    /// Article status (see [`article_status`])
    pub status: i32,
    /// Unix timestamp when article was downloaded
    pub downloaded_at: Option<i64>,
    /// CRC32 of the decoded payload, set once downloaded (used by quick-verify)
    pub crc32: Option<i64>,
}

/// New download file to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewDownloadFile {
    /// Download this file belongs to
    pub download_id: crate::types::DownloadId,
    /// Index of this file within the NZB (0-based)
    pub file_index: i32,
    /// Parsed filename (from NZB subject)
    pub filename: String,
    /// Original NZB subject line
    pub subject: Option<String>,
    /// Total number of segments in this file
    pub total_segments: i32,
}

/// Download file record from database
#[derive(Debug, Clone, FromRow)]
pub struct DownloadFile {
    /// Unique database ID
    pub id: i64,
    /// Download this file belongs to
    pub download_id: i64,
    /// Index of this file within the NZB (0-based)
    pub file_index: i32,
    /// Parsed filename (from NZB subject)
    pub filename: String,
    /// Original NZB subject line
    pub subject: Option<String>,
    /// Total number of segments in this file
    pub total_segments: i32,
    /// Whether all segments have been downloaded (used by DirectUnpack)
    pub completed: bool,
    /// Original filename before a DirectRename, if any
    pub original_filename: Option<String>,
    /// Whether `filename` has been confirmed from a downloaded article's header.
    /// Monotonic: once true, never reset to false.
    pub filename_confirmed: bool,
    /// Marked deleted (e.g. duplicate filename within the same collection, S4);
    /// a deleted file never advances article status once its last active worker exits.
    pub deleted: bool,
}

/// Article status constants
///
/// Matches the data-model domain `{Pending, Running, Finished, Failed}`: `DOWNLOADED`
/// is kept as the historical name for "finished" (the article completed, successfully).
pub mod article_status {
    /// Article is queued and not yet bound to a worker
    pub const PENDING: i32 = 0;
    /// Article has been successfully downloaded (finished)
    pub const DOWNLOADED: i32 = 1;
    /// Article download failed
    pub const FAILED: i32 = 2;
    /// Article is currently bound to an active worker
    pub const RUNNING: i32 = 3;
}

/// New history entry to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    /// Download name
    pub name: String,
    /// Category label
    pub category: Option<String>,
    /// Destination directory on disk
    pub destination: Option<PathBuf>,
    /// Completion status code
    pub status: i32,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Total download duration in seconds
    pub download_time_secs: i64,
    /// Unix timestamp when download completed
    pub completed_at: i64,
}

/// History record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    /// Unique database ID
    pub id: i64,
    /// Download name
    pub name: String,
    /// Category label
    pub category: Option<String>,
    /// Destination directory on disk
    pub destination: Option<String>,
    /// Completion status code
    pub status: i32,
    /// Total size in bytes
    pub size_bytes: i64,
    /// Total download duration in seconds
    pub download_time_secs: i64,
    /// Unix timestamp when download completed
    pub completed_at: i64,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        use chrono::{TimeZone, Utc};
        use std::time::Duration;

        HistoryEntry {
            id: row.id,
            name: row.name,
            category: row.category,
            destination: row.destination.map(PathBuf::from),
            status: Status::from_i32(row.status),
            size_bytes: row.size_bytes as u64,
            download_time: Duration::from_secs(row.download_time_secs as u64),
            completed_at: Utc
                .timestamp_opt(row.completed_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for usenet-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
