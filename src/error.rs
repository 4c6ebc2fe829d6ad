//! Error types for usenet-dl
//!
//! This module provides comprehensive error handling for the library, including:
//! - Domain-specific error types (Download, PostProcess, Config, etc.)
//! - Context information (stage, file path, download ID, etc.)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for usenet-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for usenet-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// NNTP protocol or connection error
    #[error("NNTP error: {0}")]
    Nntp(String),

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Post-processing error (verify, repair, extract, etc.)
    #[error("post-processing error: {0}")]
    PostProcess(#[from] PostProcessError),

    /// Invalid NZB file
    #[error("invalid NZB: {0}")]
    InvalidNzb(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Download not found
    #[error("download not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary RPC server error (bind failure, etc. — not a per-request protocol violation)
    #[error("RPC server error: {0}")]
    RpcServerError(String),

    /// Binary RPC request rejected for violating the wire protocol
    #[error("RPC protocol error: {0}")]
    Rpc(#[from] RpcError),

    /// Duplicate download detected
    #[error("duplicate download: {0}")]
    Duplicate(String),

    /// Insufficient disk space
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the operation
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },

    /// Failed to check disk space
    #[error("failed to check disk space: {0}")]
    DiskSpaceCheckFailed(String),

    /// External tool execution failed (par2, unrar, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Download not found in queue or database
    #[error("download {id} not found")]
    NotFound {
        /// The download ID that was not found
        id: i64,
    },

    /// Download files not found on disk
    #[error("download {id} files not found at {path}")]
    FilesNotFound {
        /// The download ID whose files were not found
        id: i64,
        /// The path where the files were expected to be
        path: PathBuf,
    },

    /// Download already in requested state
    #[error("download {id} is already {state}")]
    AlreadyInState {
        /// The download ID that is already in the requested state
        id: i64,
        /// The current state (e.g., "paused", "completed")
        state: String,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} download {id} in state {current_state}")]
    InvalidState {
        /// The download ID that is in an invalid state for the operation
        id: i64,
        /// The operation that was attempted (e.g., "pause", "resume", "retry")
        operation: String,
        /// The current state that prevents the operation (e.g., "downloading", "completed")
        current_state: String,
    },

    /// Insufficient disk space to start download
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the download
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },
}

/// Errors rejecting a single binary RPC request (§6/§7: logged with the client's
/// address and the connection closed, never recovered from).
#[derive(Debug, Error)]
pub enum RpcError {
    /// Header signature didn't match the protocol's magic constant
    #[error("bad signature")]
    BadSignature,

    /// Password in the request header didn't match the configured secret
    #[error("bad password")]
    BadPassword,

    /// Request type discriminant isn't one of the known request kinds
    #[error("unknown request type: {0}")]
    UnknownType(u32),

    /// Declared struct_size didn't match what the request type expects
    #[error("struct size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Expected fixed struct size in bytes for this request type
        expected: u32,
        /// struct_size actually declared in the header
        actual: u32,
    },
}

/// Post-processing errors (PAR2 verify, repair, extraction, etc.)
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// PAR2 verification failed
    #[error("PAR2 verification failed for download {id}: {reason}")]
    VerificationFailed {
        /// The download ID for which verification failed
        id: i64,
        /// The reason verification failed
        reason: String,
    },

    /// PAR2 repair failed
    #[error("PAR2 repair failed for download {id}: {reason}")]
    RepairFailed {
        /// The download ID for which repair failed
        id: i64,
        /// The reason repair failed
        reason: String,
    },

    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Wrong password for encrypted archive
    #[error("wrong password for encrypted archive {archive}")]
    WrongPassword {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
    },

    /// All passwords failed for archive extraction
    #[error("all {count} passwords failed for archive {archive}")]
    AllPasswordsFailed {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
        /// The number of passwords that were tried
        count: usize,
    },

    /// No passwords available for encrypted archive
    #[error("no passwords available for encrypted archive {archive}")]
    NoPasswordsAvailable {
        /// The encrypted archive that requires a password
        archive: PathBuf,
    },

    /// File move/rename failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should be moved
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },

    /// File collision at destination
    #[error("file collision at {path}: {reason}")]
    FileCollision {
        /// The path where the collision occurred
        path: PathBuf,
        /// The reason for the collision (e.g., "file already exists")
        reason: String,
    },

    /// Cleanup failed (non-fatal, usually logged as warning)
    #[error("cleanup failed for download {id}: {reason}")]
    CleanupFailed {
        /// The download ID for which cleanup failed
        id: i64,
        /// The reason cleanup failed
        reason: String,
    },

    /// Invalid path encountered during post-processing
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The invalid path that was encountered
        path: PathBuf,
        /// The reason the path is invalid
        reason: String,
    },

    /// DirectUnpack failed during download
    #[error("DirectUnpack failed for download {id}: {reason}")]
    DirectUnpackFailed {
        /// The download ID for which DirectUnpack failed
        id: i64,
        /// The reason DirectUnpack failed
        reason: String,
    },

    /// DirectRename failed during download
    #[error("DirectRename failed for download {id}: {reason}")]
    DirectRenameFailed {
        /// The download ID for which DirectRename failed
        id: i64,
        /// The reason DirectRename failed
        reason: String,
    },
}

