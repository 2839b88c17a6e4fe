use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RecordingError, Result};

/// Category a recording is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordingCategory {
    Sports,
    Drama,
    News,
    Movies,
    Documentary,
    Entertainment,
    Kids,
    Music,
    Other,
}

impl Default for RecordingCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl RecordingCategory {
    pub const ALL: [RecordingCategory; 9] = [
        RecordingCategory::Sports,
        RecordingCategory::Drama,
        RecordingCategory::News,
        RecordingCategory::Movies,
        RecordingCategory::Documentary,
        RecordingCategory::Entertainment,
        RecordingCategory::Kids,
        RecordingCategory::Music,
        RecordingCategory::Other,
    ];

    /// Case-insensitive lookup by name (used by query filters)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for RecordingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordingCategory::Sports => "Sports",
            RecordingCategory::Drama => "Drama",
            RecordingCategory::News => "News",
            RecordingCategory::Movies => "Movies",
            RecordingCategory::Documentary => "Documentary",
            RecordingCategory::Entertainment => "Entertainment",
            RecordingCategory::Kids => "Kids",
            RecordingCategory::Music => "Music",
            RecordingCategory::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Recording lifecycle status.
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Scheduled,
    Recording,
    Completed,
    Failed,
}

impl RecordingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordingStatus::Completed | RecordingStatus::Failed)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "recording" => Some(Self::Recording),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingStatus::Scheduled => write!(f, "scheduled"),
            RecordingStatus::Recording => write!(f, "recording"),
            RecordingStatus::Completed => write!(f, "completed"),
            RecordingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Optional metadata attached to a capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epg_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Explicit category, wins over keyword detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecordingCategory>,
}

/// A capture attempt, completed or in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_logo: Option<String>,
    pub category: RecordingCategory,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Planned duration in minutes
    pub duration: u32,
    pub file_path: String,
    pub file_size: u64,
    pub status: RecordingStatus,
    pub stream_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epg_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    /// Generate a fresh recording id
    pub fn new_id() -> String {
        format!("rec_{}", Uuid::new_v4().simple())
    }

    /// Build a recording that is already capturing
    pub fn started(
        channel_name: &str,
        stream_url: &str,
        duration_minutes: u32,
        file_path: String,
        category: RecordingCategory,
        options: RecordingOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::new_id(),
            title: options
                .epg_title
                .clone()
                .unwrap_or_else(|| channel_name.to_string()),
            channel_name: channel_name.to_string(),
            channel_logo: options.channel_logo,
            category,
            start_time: now,
            end_time: None,
            duration: duration_minutes,
            file_path,
            file_size: 0,
            status: RecordingStatus::Recording,
            stream_url: stream_url.to_string(),
            description: options.description,
            epg_title: options.epg_title,
            thumbnail: None,
            created_at: now,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(RecordingError::TerminalState {
                id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Transition to `completed`; a known size replaces the tracked one
    pub fn complete(&mut self, end_time: DateTime<Utc>, file_size: Option<u64>) -> Result<()> {
        self.ensure_active()?;
        self.status = RecordingStatus::Completed;
        self.end_time = Some(end_time);
        if let Some(size) = file_size {
            self.file_size = size;
        }
        Ok(())
    }

    /// Transition to `failed`, leaving the tracked size untouched
    pub fn fail(&mut self, end_time: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        self.status = RecordingStatus::Failed;
        self.end_time = Some(end_time);
        Ok(())
    }

    /// Whole minutes between start and end, rounded to nearest
    pub fn elapsed_minutes(&self) -> Option<i64> {
        let end = self.end_time?;
        let secs = (end - self.start_time).num_seconds();
        Some((secs as f64 / 60.0).round() as i64)
    }
}

/// Number of completed recordings in a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: RecordingCategory,
    pub count: usize,
}
