pub mod api;
pub mod recording;
pub mod schedule;

pub use api::{ApiResponse, CreatedResponse};
pub use recording::{CategoryCount, Recording, RecordingCategory, RecordingOptions, RecordingStatus};
pub use schedule::{EpgProgram, RepeatType, ScheduleOptions, ScheduledRecording};
