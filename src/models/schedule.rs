use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recording::{RecordingCategory, RecordingOptions};

/// How a schedule repeats after firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    Once,
    Daily,
    Weekly,
}

impl Default for RepeatType {
    fn default() -> Self {
        Self::Once
    }
}

impl RepeatType {
    /// Offset to the next occurrence, `None` for one-shot schedules
    pub fn interval(&self) -> Option<Duration> {
        match self {
            RepeatType::Once => None,
            RepeatType::Daily => Some(Duration::days(1)),
            RepeatType::Weekly => Some(Duration::days(7)),
        }
    }
}

/// Optional metadata for a scheduled capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptions {
    #[serde(default)]
    pub repeat_type: RepeatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epg_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecordingCategory>,
}

/// A future or repeating intent to record a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRecording {
    pub id: String,
    pub channel_name: String,
    pub channel_id: String,
    pub stream_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_logo: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    /// Duration in minutes
    pub duration: u32,
    pub repeat_type: RepeatType,
    pub category: RecordingCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epg_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
}

impl ScheduledRecording {
    pub fn new_id() -> String {
        format!("sched_{}", Uuid::new_v4().simple())
    }

    /// Options handed to the engine when this schedule fires
    pub fn recording_options(&self) -> RecordingOptions {
        RecordingOptions {
            channel_logo: self.channel_logo.clone(),
            epg_title: self.epg_title.clone(),
            description: self.description.clone(),
            category: Some(self.category),
        }
    }

    /// Next fire time for repeating schedules
    pub fn next_occurrence(&self) -> Option<DateTime<Utc>> {
        self.repeat_type
            .interval()
            .map(|step| self.scheduled_time + step)
    }
}

/// A single program from the channel's EPG
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpgProgram {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EpgProgram {
    /// Program length in whole minutes, rounded up. `None` if it ends before it starts.
    pub fn duration_minutes(&self) -> Option<u32> {
        let secs = (self.end - self.start).num_seconds();
        if secs <= 0 {
            return None;
        }
        u32::try_from((secs + 59) / 60).ok()
    }
}
