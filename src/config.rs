use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub app_env: String,

    // Storage
    pub data_dir: PathBuf,
    pub recordings_dir: PathBuf,

    // Capture
    pub user_agent: String,
    pub stream_connect_timeout_ms: u64,
    pub default_duration_minutes: u32,
    pub progress_persist_interval_ms: u64,

    // Scheduling
    pub stale_grace_secs: i64,

    // Notifications
    pub notify_webhook_url: Option<String>,

    // Cleanup
    pub recording_retention_days: Option<i64>,
    pub cleanup_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),

            // Storage
            data_dir: PathBuf::from(
                env::var("DATA_DIR").unwrap_or_else(|_| ".zeus-data".to_string()),
            ),
            recordings_dir: PathBuf::from(
                env::var("RECORDINGS_DIR").unwrap_or_else(|_| "recordings".to_string()),
            ),

            // Capture - VLC user agent, IPTV servers tend to block unknown clients
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),
            stream_connect_timeout_ms: env::var("STREAM_CONNECT_TIMEOUT_MS")
                .unwrap_or_else(|_| "15000".to_string())
                .parse()
                .unwrap_or(15_000),
            default_duration_minutes: env::var("DEFAULT_DURATION_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            progress_persist_interval_ms: env::var("PROGRESS_PERSIST_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5_000),

            // Scheduling
            stale_grace_secs: env::var("STALE_GRACE_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300), // 5 minutes

            // Notifications
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.is_empty()),

            // Cleanup
            recording_retention_days: env::var("RECORDING_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok()),
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
