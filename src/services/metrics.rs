use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

lazy_static! {
    pub static ref RECORDINGS_STARTED: IntCounter = register_int_counter!(
        "zeus_recordings_started_total",
        "Captures started (immediate or scheduled)"
    )
    .unwrap();
    pub static ref RECORDINGS_COMPLETED: IntCounter = register_int_counter!(
        "zeus_recordings_completed_total",
        "Captures that reached the completed state"
    )
    .unwrap();
    pub static ref RECORDINGS_FAILED: IntCounter = register_int_counter!(
        "zeus_recordings_failed_total",
        "Captures that reached the failed state"
    )
    .unwrap();
    pub static ref ACTIVE_CAPTURES: IntGauge = register_int_gauge!(
        "zeus_active_captures",
        "Captures currently writing to disk"
    )
    .unwrap();
    pub static ref SCHEDULE_FIRES: IntCounter = register_int_counter!(
        "zeus_schedule_fires_total",
        "Scheduled recordings that fired"
    )
    .unwrap();
    pub static ref STALE_SCHEDULES_DROPPED: IntCounter = register_int_counter!(
        "zeus_stale_schedules_dropped_total",
        "Schedules skipped because their time had long passed"
    )
    .unwrap();
}
