//! Configuration types for usenet-dl

use crate::types::Priority;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, time::Duration};

/// Download behavior configuration (directories, concurrency, post-processing)
///
/// Groups settings related to how downloads are fetched, stored, and processed.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Temporary directory (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Maximum concurrent downloads (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Speed limit in bytes per second (None = unlimited)
    #[serde(default)]
    pub speed_limit_bps: Option<u64>,

    /// Default post-processing mode
    #[serde(default)]
    pub default_post_process: PostProcess,

    /// Delete sample files/folders
    #[serde(default = "default_true")]
    pub delete_samples: bool,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Maximum article failure ratio before considering a download failed (default: 0.5 = 50%)
    ///
    /// When the ratio of failed articles to total articles exceeds this threshold,
    /// the download is marked as failed. Otherwise, post-processing (PAR2 repair)
    /// is attempted.
    #[serde(default = "default_max_failure_ratio")]
    pub max_failure_ratio: f64,

    /// Fast-fail threshold — abort early if this fraction of a sample is missing (default: 0.8 = 80%)
    ///
    /// After `fast_fail_sample_size` articles have been attempted, if the failure ratio
    /// meets or exceeds this threshold, the download is cancelled immediately to avoid
    /// wasting bandwidth on mostly-expired NZBs.
    #[serde(default = "default_fast_fail_threshold")]
    pub fast_fail_threshold: f64,

    /// Number of articles to sample before evaluating the fast-fail heuristic (default: 10)
    #[serde(default = "default_fast_fail_sample_size")]
    pub fast_fail_sample_size: usize,

    /// Maximum number of simultaneously active article workers across all downloads
    /// (default: 0 = unbounded, i.e. bounded only by total configured server connections)
    ///
    /// This is the crate-wide article-worker thread-limit named in the coordinator's
    /// scheduling contract: at any instant the number of active workers must not exceed
    /// `min(thread_limit, total configured connections)`.
    #[serde(default)]
    pub thread_limit: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            temp_dir: default_temp_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            speed_limit_bps: None,
            default_post_process: PostProcess::default(),
            delete_samples: true,
            file_collision: FileCollisionAction::default(),
            max_failure_ratio: default_max_failure_ratio(),
            fast_fail_threshold: default_fast_fail_threshold(),
            fast_fail_sample_size: default_fast_fail_sample_size(),
            thread_limit: 0,
        }
    }
}

/// External tool paths (unrar, 7z, par2) and password configuration
///
/// Groups settings for external binaries and password handling.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to global password file (one password per line)
    #[serde(default)]
    pub password_file: Option<PathBuf>,

    /// Try empty password as fallback
    #[serde(default = "default_true")]
    pub try_empty_password: bool,

    /// Path to unrar executable (auto-detected if None)
    #[serde(default)]
    pub unrar_path: Option<PathBuf>,

    /// Path to 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Path to par2 executable (auto-detected if None)
    #[serde(default)]
    pub par2_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            password_file: None,
            try_empty_password: true,
            unrar_path: None,
            sevenzip_path: None,
            par2_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for UsenetDownloader
///
/// Fields are organized into logical sub-configs for maintainability:
/// - [`download`](DownloadConfig) — directories, concurrency, post-processing
/// - [`tools`](ToolsConfig) — external binary paths, password handling
///
/// All sub-config fields are flattened for backward-compatible serialization,
/// meaning the JSON/TOML format remains unchanged (no nesting).
/// Individual fields are also accessible directly on `Config` via `Deref`-style
/// accessor methods for convenience.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// NNTP server configurations (at least one required)
    pub servers: Vec<ServerConfig>,

    /// Download behavior settings (directories, concurrency, post-processing)
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths and password handling
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Content pipeline processing (extraction, cleanup, validation)
    #[serde(flatten)]
    pub processing: ProcessingConfig,

    /// Data storage and state management
    pub persistence: PersistenceConfig,

    /// RPC server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

// Convenience accessors — allow existing code to use `config.download_dir` etc.
// without changing call sites. These delegate to the sub-config structs.
impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Temporary directory
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }
}

/// NNTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    pub host: String,

    /// Server port (typically 119 for unencrypted, 563 for TLS)
    pub port: u16,

    /// Use TLS (implicit TLS, not STARTTLS)
    pub tls: bool,

    /// Username for authentication
    pub username: Option<String>,

    /// Password for authentication
    pub password: Option<String>,

    /// Number of connections to maintain
    #[serde(default = "default_connections")]
    pub connections: usize,

    /// Server priority (lower = tried first, for backup servers)
    #[serde(default)]
    pub priority: i32,

    /// Number of ARTICLE commands to pipeline per connection (default: 10)
    ///
    /// Pipelining sends multiple ARTICLE commands before reading responses,
    /// reducing round-trip latency. Higher values can improve throughput but
    /// may increase memory usage. Set to 1 to disable pipelining (sequential mode).
    ///
    /// Recommended values: 5-20 depending on network latency and server capabilities.
    #[serde(default = "default_pipeline_depth")]
    pub pipeline_depth: usize,
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Post-processing mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcess {
    /// Just download, no post-processing
    None,
    /// Download + PAR2 verify
    Verify,
    /// Download + PAR2 verify/repair
    Repair,
    /// Above + extract archives
    Unpack,
    /// Above + remove intermediate files (default)
    #[default]
    UnpackAndCleanup,
}

impl PostProcess {
    /// Convert PostProcess enum to integer for database storage
    pub fn to_i32(&self) -> i32 {
        match self {
            PostProcess::None => 0,
            PostProcess::Verify => 1,
            PostProcess::Repair => 2,
            PostProcess::Unpack => 3,
            PostProcess::UnpackAndCleanup => 4,
        }
    }

    /// Convert integer from database to PostProcess enum
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => PostProcess::None,
            1 => PostProcess::Verify,
            2 => PostProcess::Repair,
            3 => PostProcess::Unpack,
            4 => PostProcess::UnpackAndCleanup,
            _ => PostProcess::UnpackAndCleanup, // Default
        }
    }
}

/// Archive extraction configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum depth for nested archive extraction (default: 2)
    #[serde(default = "default_max_recursion")]
    pub max_recursion_depth: u32,

    /// File extensions to treat as archives
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 2,
            archive_extensions: default_archive_extensions(),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

/// Duplicate detection configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Enable duplicate detection (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// What to do when duplicate detected
    #[serde(default)]
    pub action: DuplicateAction,

    /// Check methods (in order)
    #[serde(default = "default_duplicate_methods")]
    pub methods: Vec<DuplicateMethod>,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            action: DuplicateAction::default(),
            methods: default_duplicate_methods(),
        }
    }
}

/// Action to take when duplicate detected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    /// Block the download entirely
    Block,
    /// Allow but emit warning event (default)
    #[default]
    Warn,
    /// Allow silently
    Allow,
}

/// Duplicate detection method
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMethod {
    /// NZB content hash (most reliable)
    NzbHash,
    /// NZB filename
    NzbName,
    /// Extracted job name (deobfuscated)
    JobName,
}

/// Disk space checking configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiskSpaceConfig {
    /// Enable disk space checking (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum free space to maintain (default: 1 GB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space: u64,

    /// Multiplier for estimated size (default: 2.5)
    #[serde(default = "default_size_multiplier")]
    pub size_multiplier: f64,
}

impl Default for DiskSpaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_free_space: 1024 * 1024 * 1024, // 1 GB
            size_multiplier: 2.5,
        }
    }
}

/// Cleanup configuration for intermediate files
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Enable cleanup of intermediate files (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File extensions to remove (.par2, .nzb, .sfv, .srr, etc.)
    #[serde(default = "default_cleanup_extensions")]
    pub target_extensions: Vec<String>,

    /// Archive extensions to remove after extraction
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// Delete sample folders (default: true from Config.delete_samples)
    #[serde(default = "default_true")]
    pub delete_samples: bool,

    /// Sample folder names to detect (case-insensitive)
    #[serde(default = "default_sample_folder_names")]
    pub sample_folder_names: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_extensions: default_cleanup_extensions(),
            archive_extensions: default_archive_extensions(),
            delete_samples: true,
            sample_folder_names: default_sample_folder_names(),
        }
    }
}

/// DirectUnpack configuration — extract archives while download is in progress
///
/// When enabled, completed RAR files are extracted as soon as all their segments
/// finish downloading, overlapping extraction with the remaining download.
/// Combined with DirectRename, which uses PAR2 metadata to fix obfuscated
/// filenames before extraction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectUnpackConfig {
    /// Enable DirectUnpack — extract archives during download (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Enable DirectRename — use PAR2 metadata to fix obfuscated filenames (default: false)
    ///
    /// Requires PAR2 files to be downloaded early. When enabled, PAR2 file articles
    /// are prioritized in the download queue.
    #[serde(default)]
    pub direct_rename: bool,

    /// How often to poll for newly completed files, in milliseconds (default: 200)
    #[serde(default = "default_direct_unpack_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Hang detection configuration — forcibly reclaims stalled article workers
///
/// The coordinator runs a periodic sweep (once per second) over in-flight article
/// workers; any worker whose last-activity timestamp is older than `terminate_timeout`
/// is torn down, its article is reset to Pending, and the worker is leaked (its
/// final state is unknown, per the documented trade-off).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HangDetectionConfig {
    /// Enable hang detection (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long a worker may go without progress before being forcibly terminated
    /// (default: 180 seconds)
    #[serde(default = "default_terminate_timeout", with = "duration_serde")]
    pub terminate_timeout: Duration,

    /// How often to run the hang-detection sweep (default: 1 second)
    #[serde(default = "default_hang_check_interval", with = "duration_serde")]
    pub check_interval: Duration,
}

impl Default for HangDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            terminate_timeout: default_terminate_timeout(),
            check_interval: default_hang_check_interval(),
        }
    }
}

/// Quick-verify configuration — CRC-based shortcut ahead of full PAR2 verification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuickVerifyConfig {
    /// Enable quick verify (default: true)
    ///
    /// When enabled, the verify stage first attempts to combine per-article CRC32s
    /// recorded during download with PAR2 IFSC block CRCs into a whole-file CRC,
    /// skipping the full external-verifier pass when every file passes.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for QuickVerifyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for DirectUnpackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            direct_rename: false,
            poll_interval_ms: default_direct_unpack_poll_interval(),
        }
    }
}

/// Content pipeline processing configuration
///
/// Groups settings related to post-download file processing, validation,
/// and cleanup. All settings in this config are used together during the
/// post-processing pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Archive extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Duplicate detection configuration (pre-download validation)
    #[serde(default)]
    pub duplicate: DuplicateConfig,

    /// Disk space checking configuration (pre-download validation)
    #[serde(default)]
    pub disk_space: DiskSpaceConfig,

    /// Retry configuration for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cleanup configuration for intermediate files
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// DirectUnpack — extract archives while download is still in progress
    #[serde(default)]
    pub direct_unpack: DirectUnpackConfig,

    /// Hang detection for stalled article workers
    #[serde(default)]
    pub hang_detection: HangDetectionConfig,

    /// Quick-verify shortcut ahead of full PAR2 verification
    #[serde(default)]
    pub quick_verify: QuickVerifyConfig,
}

/// Data storage and state management configuration
///
/// Groups settings related to persistence, state, and runtime-mutable
/// configurations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./usenet-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Category configurations
    #[serde(default)]
    pub categories: HashMap<String, CategoryConfig>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            categories: HashMap::new(),
        }
    }
}

/// External server integration configuration
///
/// Groups settings for external access and control interfaces.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// Binary RPC server configuration
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// Binary RPC server configuration
///
/// Controls the length-prefixed, big-endian binary protocol server, a remote
/// control surface distinct from (and additional to) the REST API above.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Enable the binary RPC server (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_rpc_bind_address")]
    pub bind_address: SocketAddr,

    /// Shared-secret password clients must present in every request header
    /// (null-padded to 32 bytes on the wire; empty string means no password required)
    #[serde(default)]
    pub password: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_rpc_bind_address(),
            password: String::new(),
        }
    }
}

/// Category configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Destination directory for this category
    pub destination: PathBuf,

    /// Override default post-processing
    #[serde(default)]
    pub post_process: Option<PostProcess>,
}

// Default value functions
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_database_path() -> PathBuf {
    PathBuf::from("usenet-dl.db")
}

fn default_connections() -> usize {
    10
}

fn default_pipeline_depth() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_failure_ratio() -> f64 {
    0.5
}

fn default_fast_fail_threshold() -> f64 {
    0.8
}

fn default_fast_fail_sample_size() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_recursion() -> u32 {
    2
}

fn default_archive_extensions() -> Vec<String> {
    vec![
        "rar".into(),
        "zip".into(),
        "7z".into(),
        "tar".into(),
        "gz".into(),
        "bz2".into(),
    ]
}

fn default_duplicate_methods() -> Vec<DuplicateMethod> {
    vec![DuplicateMethod::NzbHash, DuplicateMethod::JobName]
}

fn default_min_free_space() -> u64 {
    1024 * 1024 * 1024 // 1 GB
}

fn default_size_multiplier() -> f64 {
    2.5
}

fn default_rpc_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_terminate_timeout() -> Duration {
    Duration::from_secs(180)
}

fn default_hang_check_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_cleanup_extensions() -> Vec<String> {
    vec![
        "par2".into(),
        "PAR2".into(),
        "nzb".into(),
        "NZB".into(),
        "sfv".into(),
        "SFV".into(),
        "srr".into(),
        "SRR".into(),
        "nfo".into(),
        "NFO".into(),
    ]
}

fn default_sample_folder_names() -> Vec<String> {
    vec![
        "sample".into(),
        "Sample".into(),
        "SAMPLE".into(),
        "samples".into(),
        "Samples".into(),
        "SAMPLES".into(),
    ]
}

fn default_direct_unpack_poll_interval() -> u64 {
    200
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}


// Conversion from our ServerConfig to nntp-rs's ServerConfig
impl From<ServerConfig> for nntp_rs::ServerConfig {
    fn from(config: ServerConfig) -> Self {
        nntp_rs::ServerConfig {
            host: config.host,
            port: config.port,
            tls: config.tls,
            allow_insecure_tls: false,
            username: config.username.unwrap_or_default(),
            password: config.password.unwrap_or_default(),
        }
    }
}

/// Configuration update for runtime-changeable settings
///
/// This struct contains only fields that can be safely updated while the downloader is running.
/// Fields requiring restart (like database_path, download_dir, servers) are not included.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Speed limit in bytes per second (None = unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_limit_bps: Option<Option<u64>>,
}
