//! Local recording store
//!
//! Persists the recording list and the scheduled recording list as two
//! independent JSON documents, each under a fixed storage key. Every
//! read-modify-write goes through a single async mutex so concurrent
//! mutations inside one process never lose updates.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Recording, ScheduledRecording};

/// Storage key for the recording list
pub const RECORDINGS_KEY: &str = "zeus_glass_recordings";
/// Storage key for the scheduled recording list
pub const SCHEDULED_KEY: &str = "zeus_glass_scheduled_recordings";

#[derive(Clone)]
pub struct RecordingStore {
    data_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl RecordingStore {
    /// Open (and create if needed) a store rooted at `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).await?;

        Ok(Self {
            data_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ============ Recordings ============

    pub async fn load_recordings(&self) -> Vec<Recording> {
        self.load_list(RECORDINGS_KEY).await
    }

    pub async fn find_recording(&self, id: &str) -> Option<Recording> {
        self.load_recordings().await.into_iter().find(|r| r.id == id)
    }

    /// Apply `f` to the recording list and persist the result
    pub async fn update_recordings<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Recording>) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load_list(RECORDINGS_KEY).await;
        let out = f(&mut list);
        self.save_list(RECORDINGS_KEY, &list).await?;
        Ok(out)
    }

    // ============ Scheduled recordings ============

    pub async fn load_schedules(&self) -> Vec<ScheduledRecording> {
        self.load_list(SCHEDULED_KEY).await
    }

    pub async fn find_schedule(&self, id: &str) -> Option<ScheduledRecording> {
        self.load_schedules().await.into_iter().find(|s| s.id == id)
    }

    /// Apply `f` to the schedule list and persist the result
    pub async fn update_schedules<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<ScheduledRecording>) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load_list(SCHEDULED_KEY).await;
        let out = f(&mut list);
        self.save_list(SCHEDULED_KEY, &list).await?;
        Ok(out)
    }

    // ============ Persistence ============

    /// Missing or unreadable documents load as an empty list
    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&content) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Atomic replace: write temp file, fsync, rename
    async fn save_list<T: Serialize>(&self, key: &str, list: &[T]) -> Result<()> {
        let path = self.path_for(key);
        let tmp_path = self.tmp_path_for(key);
        let content = serde_json::to_vec(list)?;

        let mut file = File::create(&tmp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    fn tmp_path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json.tmp", key))
    }
}
