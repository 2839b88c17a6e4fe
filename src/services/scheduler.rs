//! Recording scheduler
//!
//! Keeps one in-memory timer per enabled schedule and starts a capture on
//! the engine when a timer fires. Timers are not persisted; they are rebuilt
//! from the store by [`Scheduler::init_scheduled_recordings`] at startup.
//!
//! Every timer carries a generation number. A firing timer only proceeds if
//! its generation is still the registered one, so a timer that was replaced
//! or cancelled while it was waking up does nothing.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{RecordingError, Result};
use crate::models::{EpgProgram, ScheduleOptions, ScheduledRecording};

use super::classifier::CategoryClassifier;
use super::engine::{validate_stream_url, RecordingEngine};
use super::metrics::{SCHEDULE_FIRES, STALE_SCHEDULES_DROPPED};
use super::store::RecordingStore;

/// What arming a schedule did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A timer is waiting for the scheduled time
    Armed,
    /// The time had just passed, the schedule fired right away
    FiredImmediately,
    /// The time passed too long ago, nothing was started
    DroppedStale,
}

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
    next_generation: u64,
    entries: HashMap<String, TimerEntry>,
}

#[derive(Clone, Default)]
struct ScheduleTimers {
    inner: Arc<Mutex<TimerTable>>,
}

impl ScheduleTimers {
    fn lock(&self) -> MutexGuard<'_, TimerTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop and abort the timer for `id`, if any
    fn cancel(&self, id: &str) -> bool {
        match self.lock().entries.remove(id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Remove the entry only if it still belongs to `generation`
    fn claim(&self, id: &str, generation: u64) -> bool {
        let mut table = self.lock();
        match table.entries.get(id) {
            Some(entry) if entry.generation == generation => {
                table.entries.remove(id);
                true
            }
            _ => false,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

#[derive(Clone)]
pub struct Scheduler {
    engine: RecordingEngine,
    store: RecordingStore,
    timers: ScheduleTimers,
    stale_grace: chrono::Duration,
}

impl Scheduler {
    /// `stale_grace` is how far in the past a schedule may be and still fire
    pub fn new(engine: RecordingEngine, stale_grace: chrono::Duration) -> Self {
        let store = engine.store().clone();
        Self {
            engine,
            store,
            timers: ScheduleTimers::default(),
            stale_grace,
        }
    }

    pub fn engine(&self) -> &RecordingEngine {
        &self.engine
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Persist a new enabled schedule and arm its timer
    pub async fn schedule_recording(
        &self,
        channel_name: &str,
        channel_id: &str,
        stream_url: &str,
        scheduled_time: DateTime<Utc>,
        duration_minutes: u32,
        options: ScheduleOptions,
    ) -> Result<String> {
        validate_stream_url(stream_url)?;
        if duration_minutes == 0 {
            return Err(RecordingError::InvalidDuration);
        }

        let category = CategoryClassifier::resolve(
            options.category,
            channel_name,
            options.epg_title.as_deref(),
        );
        let schedule = ScheduledRecording {
            id: ScheduledRecording::new_id(),
            channel_name: channel_name.to_string(),
            channel_id: channel_id.to_string(),
            stream_url: stream_url.to_string(),
            channel_logo: options.channel_logo,
            scheduled_time,
            duration: duration_minutes,
            repeat_type: options.repeat_type,
            category,
            epg_title: options.epg_title,
            description: options.description,
            enabled: true,
        };
        let id = schedule.id.clone();

        self.store
            .update_schedules(|list| list.push(schedule.clone()))
            .await?;

        info!(
            schedule_id = %id,
            channel = channel_name,
            at = %scheduled_time,
            repeat = ?schedule.repeat_type,
            "Recording scheduled"
        );

        self.arm(&schedule).await?;
        Ok(id)
    }

    /// Schedule the capture of a single EPG program
    pub async fn schedule_program(
        &self,
        channel_name: &str,
        channel_id: &str,
        stream_url: &str,
        program: &EpgProgram,
        options: ScheduleOptions,
    ) -> Result<String> {
        let duration = program
            .duration_minutes()
            .ok_or(RecordingError::InvalidProgramWindow)?;

        let options = ScheduleOptions {
            epg_title: options.epg_title.or_else(|| Some(program.title.clone())),
            description: options.description.or_else(|| program.description.clone()),
            ..options
        };

        self.schedule_recording(
            channel_name,
            channel_id,
            stream_url,
            program.start,
            duration,
            options,
        )
        .await
    }

    /// Flip `enabled`; enabling re-arms, disabling cancels the timer
    pub async fn toggle_scheduled_recording(&self, schedule_id: &str) -> Result<ScheduledRecording> {
        let toggled = self
            .store
            .update_schedules(|list| {
                list.iter_mut().find(|s| s.id == schedule_id).map(|s| {
                    s.enabled = !s.enabled;
                    s.clone()
                })
            })
            .await?
            .ok_or_else(|| RecordingError::ScheduleNotFound(schedule_id.to_string()))?;

        if toggled.enabled {
            self.arm(&toggled).await?;
        } else {
            self.timers.cancel(schedule_id);
        }

        info!(schedule_id, enabled = toggled.enabled, "Schedule toggled");
        Ok(toggled)
    }

    /// Cancel the timer and delete the schedule. Unknown ids are a no-op.
    pub async fn cancel_scheduled_recording(&self, schedule_id: &str) -> Result<()> {
        self.timers.cancel(schedule_id);

        let removed = self
            .store
            .update_schedules(|list| {
                let before = list.len();
                list.retain(|s| s.id != schedule_id);
                before != list.len()
            })
            .await?;

        if removed {
            info!(schedule_id, "Schedule cancelled");
        }
        Ok(())
    }

    /// Arm every enabled schedule from the store; returns how many were armed
    pub async fn init_scheduled_recordings(&self) -> Result<usize> {
        let schedules = self.store.load_schedules().await;
        let mut armed = 0;

        for schedule in schedules.iter().filter(|s| s.enabled) {
            match self.arm(schedule).await {
                Ok(ArmOutcome::Armed) => armed += 1,
                Ok(_) => {}
                Err(e) => warn!("Failed to arm schedule {}: {}", schedule.id, e),
            }
        }

        info!(
            "Initialized {} scheduled recordings ({} armed)",
            schedules.len(),
            armed
        );
        Ok(armed)
    }

    pub async fn get_scheduled_recordings(&self) -> Vec<ScheduledRecording> {
        self.store.load_schedules().await
    }

    pub fn is_armed(&self, schedule_id: &str) -> bool {
        self.timers.contains(schedule_id)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Replace any timer for this schedule according to its time
    pub async fn arm(&self, schedule: &ScheduledRecording) -> Result<ArmOutcome> {
        self.timers.cancel(&schedule.id);

        let delay = schedule.scheduled_time - Utc::now();

        if delay > chrono::Duration::zero() {
            self.spawn_timer(&schedule.id, delay);
            return Ok(ArmOutcome::Armed);
        }

        if delay > -self.stale_grace {
            debug!("Schedule {} is due, firing now", schedule.id);
            self.fire(&schedule.id).await?;
            return Ok(ArmOutcome::FiredImmediately);
        }

        STALE_SCHEDULES_DROPPED.inc();
        debug!(
            "Dropping stale schedule {} ({}s past its time)",
            schedule.id,
            -delay.num_seconds()
        );
        Ok(ArmOutcome::DroppedStale)
    }

    fn spawn_timer(&self, schedule_id: &str, delay: chrono::Duration) {
        let wait = delay.to_std().unwrap_or_default();
        let mut table = self.timers.lock();
        table.next_generation += 1;
        let generation = table.next_generation;

        let scheduler = self.clone();
        let id = schedule_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if !scheduler.timers.claim(&id, generation) {
                return;
            }
            if let Err(e) = scheduler.fire(&id).await {
                error!("Scheduled recording {} failed to fire: {}", id, e);
            }
        });

        if let Some(old) = table
            .entries
            .insert(schedule_id.to_string(), TimerEntry { generation, handle })
        {
            old.handle.abort();
        }
    }

    /// Start the capture for a due schedule, then delete or advance it.
    /// One-shot schedules are only deleted once their capture has started.
    pub(crate) async fn fire(&self, schedule_id: &str) -> Result<()> {
        let Some(schedule) = self.store.find_schedule(schedule_id).await else {
            debug!("Schedule {} vanished before firing", schedule_id);
            return Ok(());
        };
        if !schedule.enabled {
            return Ok(());
        }

        SCHEDULE_FIRES.inc();
        info!(schedule_id, channel = %schedule.channel_name, "Schedule fired");

        let started = match self
            .engine
            .start_recording(
                &schedule.channel_name,
                &schedule.channel_id,
                &schedule.stream_url,
                schedule.duration,
                schedule.recording_options(),
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!("Scheduled capture of {} did not start: {}", schedule.channel_name, e);
                false
            }
        };

        match schedule.next_occurrence() {
            // A one-shot schedule that failed to start stays listed, disarmed
            None if !started => {
                warn!("Keeping schedule {} after failed start", schedule_id);
            }
            None => {
                self.store
                    .update_schedules(|list| list.retain(|s| s.id != schedule_id))
                    .await?;
            }
            Some(next) => {
                let still_enabled = self
                    .store
                    .update_schedules(|list| {
                        list.iter_mut()
                            .find(|s| s.id == schedule_id)
                            .map(|s| {
                                s.scheduled_time = next;
                                s.enabled
                            })
                            .unwrap_or(false)
                    })
                    .await?;

                if still_enabled {
                    debug!("Schedule {} next fires at {}", schedule_id, next);
                    self.spawn_timer(schedule_id, next - Utc::now());
                }
            }
        }
        Ok(())
    }
}
