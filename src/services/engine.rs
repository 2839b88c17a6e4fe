//! Recording engine
//!
//! Starts and stops live-stream captures, tracks their byte progress and
//! drives every `Recording` from `recording` to `completed` or `failed`.
//!
//! Each capture runs in its own task which races three things: an explicit
//! stop (cancellation token), the duration timeout, and the transfer itself.
//! The party that releases the capture handle from [`ActiveRecordings`]
//! finalizes the recording, so the transition happens exactly once.

use chrono::Utc;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{RecordingError, Result};
use crate::models::{
    CategoryCount, Recording, RecordingCategory, RecordingOptions, RecordingStatus,
};

use super::capture::{pump, CaptureProgress, StreamSource};
use super::classifier::CategoryClassifier;
use super::format::{format_duration, format_file_size};
use super::metrics::{ACTIVE_CAPTURES, RECORDINGS_COMPLETED, RECORDINGS_FAILED, RECORDINGS_STARTED};
use super::notifications::{Notification, Notifier};
use super::registry::{ActiveCapture, ActiveRecordings};
use super::store::RecordingStore;

/// Write buffer for capture files
const CAPTURE_BUFFER_BYTES: usize = 256 * 1024;

/// Lower bound for the progress persistence interval
const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// How a capture task ended
#[derive(Debug)]
enum CaptureOutcome {
    /// Cancelled by stop/delete, which then own finalization
    Stopped,
    /// Duration elapsed
    TimedOut,
    /// Stream ended on its own
    Ended,
    Failed(String),
}

/// Everything a capture task needs, moved into the task
struct CaptureJob {
    id: String,
    stream_url: String,
    file_path: PathBuf,
    file: File,
    duration: Duration,
    cancel: CancellationToken,
    progress: CaptureProgress,
}

#[derive(Clone)]
pub struct RecordingEngine {
    store: RecordingStore,
    source: Arc<dyn StreamSource>,
    notifier: Arc<dyn Notifier>,
    active: ActiveRecordings,
    recordings_dir: PathBuf,
    progress_interval: Duration,
}

impl RecordingEngine {
    pub fn new(
        store: RecordingStore,
        source: Arc<dyn StreamSource>,
        notifier: Arc<dyn Notifier>,
        recordings_dir: impl Into<PathBuf>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            active: ActiveRecordings::new(),
            recordings_dir: recordings_dir.into(),
            progress_interval: progress_interval.max(MIN_PROGRESS_INTERVAL),
        }
    }

    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    pub fn active(&self) -> &ActiveRecordings {
        &self.active
    }

    // ========================================================================
    // Capture lifecycle
    // ========================================================================

    /// Start capturing `stream_url` for `duration_minutes`.
    ///
    /// Returns the new recording id as soon as the entry is persisted; the
    /// capture itself runs in the background.
    pub async fn start_recording(
        &self,
        channel_name: &str,
        channel_id: &str,
        stream_url: &str,
        duration_minutes: u32,
        options: RecordingOptions,
    ) -> Result<String> {
        validate_stream_url(stream_url)?;
        if duration_minutes == 0 {
            return Err(RecordingError::InvalidDuration);
        }

        let duration = Duration::from_secs(u64::from(duration_minutes) * 60);
        self.launch(
            channel_name,
            channel_id,
            stream_url,
            duration_minutes,
            duration,
            options,
        )
        .await
    }

    async fn launch(
        &self,
        channel_name: &str,
        channel_id: &str,
        stream_url: &str,
        duration_minutes: u32,
        duration: Duration,
        options: RecordingOptions,
    ) -> Result<String> {
        fs::create_dir_all(&self.recordings_dir).await?;
        let (file_path, file) = self.reserve_file(channel_name).await?;

        let category = CategoryClassifier::resolve(
            options.category,
            channel_name,
            options.epg_title.as_deref(),
        );
        let recording = Recording::started(
            channel_name,
            stream_url,
            duration_minutes,
            file_path.to_string_lossy().into_owned(),
            category,
            options,
        );
        let id = recording.id.clone();

        if let Err(e) = self.store.update_recordings(|list| list.push(recording)).await {
            drop(file);
            let _ = fs::remove_file(&file_path).await;
            return Err(e);
        }

        if self.active.is_channel_active(channel_id) {
            warn!(
                "Channel {} ({}) is already being recorded, starting another capture",
                channel_name, channel_id
            );
        }

        let cancel = CancellationToken::new();
        let progress = CaptureProgress::default();
        let (finished_tx, finished_rx) = oneshot::channel();

        self.active.register(
            &id,
            ActiveCapture {
                channel_id: channel_id.to_string(),
                channel_name: channel_name.to_string(),
                cancel: cancel.clone(),
                progress: progress.clone(),
                finished: finished_rx,
            },
        );
        ACTIVE_CAPTURES.inc();
        RECORDINGS_STARTED.inc();

        self.notifier.notify(Notification::RecordingStarted {
            channel_name: channel_name.to_string(),
        });

        info!(
            recording_id = %id,
            channel = channel_name,
            category = %category,
            duration_minutes,
            "Recording started"
        );

        let job = CaptureJob {
            id: id.clone(),
            stream_url: stream_url.to_string(),
            file_path,
            file,
            duration,
            cancel,
            progress,
        };

        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_capture(job).await;
            let _ = finished_tx.send(());
        });

        Ok(id)
    }

    /// Stop an active capture and mark it completed.
    ///
    /// The partial file is flushed and kept. Stopping a recording that is not
    /// capturing (already finished, failed or unknown) is a no-op.
    pub async fn stop_recording(&self, recording_id: &str) -> Result<()> {
        let Some(capture) = self.release(recording_id) else {
            debug!("Stop requested for inactive recording {}", recording_id);
            return Ok(());
        };

        capture.cancel.cancel();
        let _ = capture.finished.await;

        let size = match self.store.find_recording(recording_id).await {
            Some(recording) => file_size_or(&recording.file_path, &capture.progress).await,
            None => capture.progress.bytes_written(),
        };

        info!(recording_id, "Recording stopped");
        self.complete(recording_id, size).await.map(|_| ())
    }

    /// Delete a recording and its file.
    ///
    /// A missing file is fine; the entry is removed even if the file cannot
    /// be deleted. An active capture is cancelled first.
    pub async fn delete_recording(&self, recording_id: &str) -> Result<()> {
        if let Some(capture) = self.release(recording_id) {
            capture.cancel.cancel();
            let _ = capture.finished.await;
            debug!("Cancelled active capture {} before delete", recording_id);
        }

        let Some(recording) = self.store.find_recording(recording_id).await else {
            debug!("Delete requested for unknown recording {}", recording_id);
            return Ok(());
        };

        match fs::remove_file(&recording.file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to delete recording file {}: {}", recording.file_path, e);
            }
        }

        self.store
            .update_recordings(|list| list.retain(|r| r.id != recording_id))
            .await?;

        info!(recording_id, "Recording deleted");
        Ok(())
    }

    /// Fail every persisted `recording` entry that has no live capture.
    ///
    /// Captures never survive a restart, so at startup these are leftovers.
    pub async fn fail_interrupted(&self) -> Result<usize> {
        let now = Utc::now();
        let active = self.active.clone();

        let failed = self
            .store
            .update_recordings(|list| {
                list.iter_mut()
                    .filter(|r| r.status == RecordingStatus::Recording && !active.is_active(&r.id))
                    .filter_map(|r| r.fail(now).ok())
                    .count()
            })
            .await?;

        if failed > 0 {
            RECORDINGS_FAILED.inc_by(failed as u64);
            warn!("Marked {} interrupted recordings as failed", failed);
        }
        Ok(failed)
    }

    // ========================================================================
    // Capture task
    // ========================================================================

    async fn run_capture(&self, job: CaptureJob) {
        let CaptureJob {
            id,
            stream_url,
            file_path,
            file,
            duration,
            cancel,
            progress,
        } = job;

        let reporter_stop = CancellationToken::new();
        self.spawn_progress_reporter(id.clone(), progress.clone(), reporter_stop.clone());

        let mut writer = BufWriter::with_capacity(CAPTURE_BUFFER_BYTES, file);

        let mut outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => CaptureOutcome::Stopped,
            _ = tokio::time::sleep(duration) => CaptureOutcome::TimedOut,
            result = self.transfer(&stream_url, &mut writer, &progress) => match result {
                Ok(_) => CaptureOutcome::Ended,
                Err(e) => CaptureOutcome::Failed(e.to_string()),
            },
        };
        reporter_stop.cancel();

        if let Err(e) = finish_file(writer).await {
            warn!("Failed to flush capture file {}: {}", file_path.display(), e);
            if matches!(outcome, CaptureOutcome::TimedOut | CaptureOutcome::Ended) {
                outcome = CaptureOutcome::Failed(e.to_string());
            }
        }

        debug!(recording_id = %id, outcome = ?outcome, "Capture task finished");

        match outcome {
            CaptureOutcome::Stopped => {}
            CaptureOutcome::TimedOut | CaptureOutcome::Ended => {
                if self.release(&id).is_some() {
                    let size = file_size_or(&file_path, &progress).await;
                    if let Err(e) = self.complete(&id, size).await {
                        warn!("Could not complete recording {}: {}", id, e);
                    }
                }
            }
            CaptureOutcome::Failed(reason) => {
                if self.release(&id).is_some() {
                    if let Err(e) = self.fail(&id, &reason).await {
                        warn!("Could not mark recording {} failed: {}", id, e);
                    }
                }
            }
        }
    }

    async fn transfer(
        &self,
        stream_url: &str,
        writer: &mut BufWriter<File>,
        progress: &CaptureProgress,
    ) -> Result<u64> {
        let stream = self.source.open(stream_url).await?;
        pump(stream, writer, progress).await
    }

    /// Periodically copy the byte counter into the persisted entry
    fn spawn_progress_reporter(&self, id: String, progress: CaptureProgress, stop: CancellationToken) {
        let store = self.store.clone();
        let every = self.progress_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            let mut last_reported = 0u64;

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let bytes = progress.bytes_written();
                        if bytes == last_reported {
                            continue;
                        }
                        last_reported = bytes;

                        let result = store
                            .update_recordings(|list| {
                                if let Some(r) = list
                                    .iter_mut()
                                    .find(|r| r.id == id && r.status == RecordingStatus::Recording)
                                {
                                    r.file_size = bytes;
                                }
                            })
                            .await;
                        if let Err(e) = result {
                            warn!("Failed to persist progress for {}: {}", id, e);
                        }
                    }
                }
            }
        });
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn release(&self, recording_id: &str) -> Option<ActiveCapture> {
        let capture = self.active.release(recording_id)?;
        ACTIVE_CAPTURES.dec();
        Some(capture)
    }

    async fn complete(&self, recording_id: &str, file_size: u64) -> Result<Recording> {
        let end = Utc::now();
        let recording = self
            .store
            .update_recordings(|list| {
                let rec = list
                    .iter_mut()
                    .find(|r| r.id == recording_id)
                    .ok_or_else(|| RecordingError::RecordingNotFound(recording_id.to_string()))?;
                rec.complete(end, Some(file_size))?;
                Ok::<_, RecordingError>(rec.clone())
            })
            .await??;

        RECORDINGS_COMPLETED.inc();
        let minutes = recording.elapsed_minutes().unwrap_or(0);
        info!(
            recording_id,
            size = %format_file_size(file_size),
            duration = %format_duration(minutes),
            "Recording completed"
        );

        self.notifier.notify(Notification::recording_complete(
            &recording.channel_name,
            minutes,
        ));
        Ok(recording)
    }

    async fn fail(&self, recording_id: &str, reason: &str) -> Result<Recording> {
        let end = Utc::now();
        let recording = self
            .store
            .update_recordings(|list| {
                let rec = list
                    .iter_mut()
                    .find(|r| r.id == recording_id)
                    .ok_or_else(|| RecordingError::RecordingNotFound(recording_id.to_string()))?;
                rec.fail(end)?;
                Ok::<_, RecordingError>(rec.clone())
            })
            .await??;

        RECORDINGS_FAILED.inc();
        error!(recording_id, "Recording failed: {}", reason);

        self.notifier.notify(Notification::RecordingFailed {
            channel_name: recording.channel_name.clone(),
            error: reason.to_string(),
        });
        Ok(recording)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All recordings; active ones report their live byte count
    pub async fn get_recordings(&self) -> Vec<Recording> {
        let mut recordings = self.store.load_recordings().await;
        for recording in recordings.iter_mut() {
            self.overlay_progress(recording);
        }
        recordings
    }

    pub async fn get_recording(&self, recording_id: &str) -> Result<Recording> {
        let mut recording = self
            .store
            .find_recording(recording_id)
            .await
            .ok_or_else(|| RecordingError::RecordingNotFound(recording_id.to_string()))?;
        self.overlay_progress(&mut recording);
        Ok(recording)
    }

    /// Persisted sizes lag behind by up to one progress interval
    fn overlay_progress(&self, recording: &mut Recording) {
        if recording.status != RecordingStatus::Recording {
            return;
        }
        if let Some(live) = self.active.bytes_written(&recording.id) {
            recording.file_size = recording.file_size.max(live);
        }
    }

    /// Completed recordings in a category
    pub async fn get_recordings_by_category(&self, category: RecordingCategory) -> Vec<Recording> {
        self.store
            .load_recordings()
            .await
            .into_iter()
            .filter(|r| r.category == category && r.status == RecordingStatus::Completed)
            .collect()
    }

    /// Completed recordings per category, most populated first
    pub async fn get_categories_with_recordings(&self) -> Vec<CategoryCount> {
        let mut counts: HashMap<RecordingCategory, usize> = HashMap::new();
        for recording in self.store.load_recordings().await {
            if recording.status == RecordingStatus::Completed {
                *counts.entry(recording.category).or_insert(0) += 1;
            }
        }

        let mut result: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        // Ties keep the canonical category order so output is stable
        result.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| {
                category_rank(a.category).cmp(&category_rank(b.category))
            })
        });
        result
    }

    /// The capture currently running for a channel, if any
    pub async fn find_active_by_channel(&self, channel_name: &str) -> Option<Recording> {
        self.store
            .load_recordings()
            .await
            .into_iter()
            .find(|r| {
                r.status == RecordingStatus::Recording
                    && r.channel_name == channel_name
                    && self.active.is_active(&r.id)
            })
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Create a fresh `<channel>_<timestamp>.ts` file, suffixing on collision
    async fn reserve_file(&self, channel_name: &str) -> Result<(PathBuf, File)> {
        let stem = format!(
            "{}_{}",
            CategoryClassifier::sanitize_file_stem(channel_name),
            Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ")
        );

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.ts", stem)
            } else {
                format!("{}_{}.ts", stem, attempt)
            };
            let path = self.recordings_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn category_rank(category: RecordingCategory) -> usize {
    RecordingCategory::ALL
        .iter()
        .position(|c| *c == category)
        .unwrap_or(usize::MAX)
}

/// Only http(s) URLs can be captured
pub fn validate_stream_url(stream_url: &str) -> Result<()> {
    match url::Url::parse(stream_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(RecordingError::InvalidStreamUrl(stream_url.to_string())),
    }
}

async fn finish_file(mut writer: BufWriter<File>) -> io::Result<()> {
    writer.flush().await?;
    writer.get_ref().sync_all().await?;
    Ok(())
}

/// Size on disk, falling back to the bytes counted during capture
async fn file_size_or(path: impl AsRef<Path>, progress: &CaptureProgress) -> u64 {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) => meta.len(),
        Err(_) => progress.bytes_written(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        engine_in, wait_for_status, FailingSource, FiniteSource, PendingSource,
    };
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_then_stop_completes() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(PendingSource::new(&[&b"0123456789"[..]]));
        let (engine, notifier) = engine_in(dir.path(), source).await;

        let id = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 60, RecordingOptions::default())
            .await
            .unwrap();
        assert!(engine.active().is_active(&id));

        engine.stop_recording(&id).await.unwrap();

        let rec = engine.get_recording(&id).await.unwrap();
        assert_eq!(rec.status, RecordingStatus::Completed);
        assert!(rec.end_time.is_some());
        assert!(rec.file_size <= 10);
        assert!(Path::new(&rec.file_path).exists());
        assert!(!engine.active().is_active(&id));

        let events = notifier.events();
        assert!(matches!(events[0], Notification::RecordingStarted { .. }));
        assert!(matches!(
            events.last(),
            Some(Notification::RecordingComplete { .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_end_completes_with_file_size() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(
            dir.path(),
            Arc::new(FiniteSource::new(&[&b"abcd"[..], &b"efgh"[..], &b"ij"[..]])),
        )
        .await;

        let id = engine
            .start_recording("ESPN", "ch2", "http://stream/2", 30, RecordingOptions::default())
            .await
            .unwrap();

        let rec = wait_for_status(&engine, &id, RecordingStatus::Completed).await;
        assert_eq!(rec.file_size, 10);
        assert_eq!(rec.category, RecordingCategory::Sports);
        let on_disk = tokio::fs::read(&rec.file_path).await.unwrap();
        assert_eq!(on_disk, b"abcdefghij");
        assert!(engine.active().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_error_fails_without_retry() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(FailingSource::default());
        let (engine, notifier) = engine_in(dir.path(), source.clone()).await;

        let id = engine
            .start_recording("CNN", "ch3", "http://stream/3", 30, RecordingOptions::default())
            .await
            .unwrap();

        let rec = wait_for_status(&engine, &id, RecordingStatus::Failed).await;
        assert!(rec.end_time.is_some());
        assert_eq!(rec.file_size, 0);
        assert_eq!(source.attempts(), 1);
        assert!(matches!(
            notifier.events().last(),
            Some(Notification::RecordingFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(FailingSource::default())).await;

        let id = engine
            .start_recording("CNN", "ch3", "http://stream/3", 30, RecordingOptions::default())
            .await
            .unwrap();
        wait_for_status(&engine, &id, RecordingStatus::Failed).await;

        // Stop after failure does nothing
        engine.stop_recording(&id).await.unwrap();
        let rec = engine.get_recording(&id).await.unwrap();
        assert_eq!(rec.status, RecordingStatus::Failed);

        // A direct completion attempt is refused
        assert!(matches!(
            engine.complete(&id, 42).await,
            Err(RecordingError::TerminalState { .. })
        ));
        assert_eq!(engine.get_recording(&id).await.unwrap().file_size, 0);
    }

    #[tokio::test]
    async fn test_duration_timeout_stops_capture() {
        let dir = TempDir::new().unwrap();
        let (engine, notifier) = engine_in(dir.path(), Arc::new(PendingSource::new(&[&b"live"[..]]))).await;

        let id = engine
            .launch(
                "MTV",
                "ch4",
                "http://stream/4",
                1,
                Duration::from_millis(200),
                RecordingOptions::default(),
            )
            .await
            .unwrap();

        let rec = wait_for_status(&engine, &id, RecordingStatus::Completed).await;
        assert_eq!(rec.file_size, 4);
        assert!(!engine.active().is_active(&id));
        assert_eq!(
            notifier.events().last(),
            Some(&Notification::recording_complete("MTV", 0))
        );
    }

    #[tokio::test]
    async fn test_progress_is_persisted_during_capture() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(PendingSource::new(&[&b"0123456789"[..]]));
        let (engine, _) = engine_in(dir.path(), source).await;

        let id = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 60, RecordingOptions::default())
            .await
            .unwrap();

        let mut persisted = None;
        for _ in 0..250 {
            let rec = engine.store().find_recording(&id).await.unwrap();
            if rec.file_size > 0 {
                persisted = Some(rec);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let rec = persisted.expect("file size never persisted");
        assert_eq!(rec.status, RecordingStatus::Recording);
        assert_eq!(rec.file_size, 10);
        assert!(engine.active().is_active(&id));

        engine.stop_recording(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_progress_never_lands_on_terminal_record() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(PendingSource::new(&[&b"0123456789"[..]]));
        let (engine, _) = engine_in(dir.path(), source).await;

        let id = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 60, RecordingOptions::default())
            .await
            .unwrap();

        // Finalize the persisted entry behind the live capture's back
        engine
            .store()
            .update_recordings(|list| {
                let rec = list.iter_mut().find(|r| r.id == id).unwrap();
                rec.file_size = 0;
                rec.fail(Utc::now()).unwrap();
            })
            .await
            .unwrap();

        // Several reporter ticks while bytes are pending
        tokio::time::sleep(Duration::from_millis(450)).await;

        let rec = engine.store().find_recording(&id).await.unwrap();
        assert_eq!(rec.status, RecordingStatus::Failed);
        assert_eq!(rec.file_size, 0);

        let _ = engine.stop_recording(&id).await;
    }

    #[tokio::test]
    async fn test_no_size_write_after_completion() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(PendingSource::new(&[&b"0123456789"[..]]));
        let (engine, _) = engine_in(dir.path(), source).await;

        let id = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 60, RecordingOptions::default())
            .await
            .unwrap();
        engine.stop_recording(&id).await.unwrap();
        let completed = engine.store().find_recording(&id).await.unwrap();
        assert_eq!(completed.status, RecordingStatus::Completed);

        tokio::time::sleep(Duration::from_millis(450)).await;

        let later = engine.store().find_recording(&id).await.unwrap();
        assert_eq!(later, completed);
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(PendingSource::new(&[]))).await;

        let bad_url = engine
            .start_recording("BBC", "ch1", "not a url", 30, RecordingOptions::default())
            .await;
        assert!(matches!(bad_url, Err(RecordingError::InvalidStreamUrl(_))));

        let ftp = engine
            .start_recording("BBC", "ch1", "ftp://host/stream", 30, RecordingOptions::default())
            .await;
        assert!(matches!(ftp, Err(RecordingError::InvalidStreamUrl(_))));

        let zero = engine
            .start_recording("BBC", "ch1", "http://stream/1", 0, RecordingOptions::default())
            .await;
        assert!(matches!(zero, Err(RecordingError::InvalidDuration)));

        assert!(engine.get_recordings().await.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_category_overrides_detection() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(PendingSource::new(&[]))).await;

        let id = engine
            .start_recording(
                "ESPN",
                "ch2",
                "http://stream/2",
                30,
                RecordingOptions {
                    category: Some(RecordingCategory::Documentary),
                    epg_title: Some("30 for 30".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let rec = engine.get_recording(&id).await.unwrap();
        assert_eq!(rec.category, RecordingCategory::Documentary);
        assert_eq!(rec.title, "30 for 30");
        assert!(rec.file_path.contains("espn_"));
        assert!(rec.file_path.ends_with(".ts"));
        engine.stop_recording(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_channel_can_record_twice() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(PendingSource::new(&[]))).await;

        let a = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 30, RecordingOptions::default())
            .await
            .unwrap();
        let b = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 30, RecordingOptions::default())
            .await
            .unwrap();

        assert_ne!(a, b);
        let first = engine.get_recording(&a).await.unwrap();
        let second = engine.get_recording(&b).await.unwrap();
        assert_ne!(first.file_path, second.file_path);
        assert_eq!(engine.active().len(), 2);

        let active = engine.find_active_by_channel("BBC One").await.unwrap();
        assert!(active.id == a || active.id == b);

        engine.stop_recording(&a).await.unwrap();
        engine.stop_recording(&b).await.unwrap();
        assert!(engine.find_active_by_channel("BBC One").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_entry() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(FiniteSource::new(&[&b"data"[..]]))).await;

        let id = engine
            .start_recording("ITV", "ch5", "http://stream/5", 30, RecordingOptions::default())
            .await
            .unwrap();
        let rec = wait_for_status(&engine, &id, RecordingStatus::Completed).await;
        assert!(Path::new(&rec.file_path).exists());

        engine.delete_recording(&id).await.unwrap();
        assert!(!Path::new(&rec.file_path).exists());
        assert!(engine.get_recordings().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_ghost_recording() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(FiniteSource::new(&[&b"data"[..]]))).await;

        // Unknown id
        engine.delete_recording("rec_missing").await.unwrap();

        // Known id whose file is already gone
        let id = engine
            .start_recording("ITV", "ch5", "http://stream/5", 30, RecordingOptions::default())
            .await
            .unwrap();
        let rec = wait_for_status(&engine, &id, RecordingStatus::Completed).await;
        tokio::fs::remove_file(&rec.file_path).await.unwrap();

        engine.delete_recording(&id).await.unwrap();
        assert!(engine.get_recordings().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_active_capture_cancels_it() {
        let dir = TempDir::new().unwrap();
        let (engine, notifier) = engine_in(dir.path(), Arc::new(PendingSource::new(&[&b"x"[..]]))).await;

        let id = engine
            .start_recording("ITV", "ch5", "http://stream/5", 30, RecordingOptions::default())
            .await
            .unwrap();
        engine.delete_recording(&id).await.unwrap();

        assert!(!engine.active().is_active(&id));
        assert!(engine.get_recordings().await.is_empty());
        assert!(!notifier
            .events()
            .iter()
            .any(|e| matches!(e, Notification::RecordingComplete { .. })));
    }

    #[tokio::test]
    async fn test_category_queries() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(FiniteSource::new(&[&b"ts"[..]]))).await;

        for (name, channel_id) in [("ESPN", "a"), ("Sky Sports", "b"), ("CNN", "c")] {
            let id = engine
                .start_recording(name, channel_id, "http://stream/x", 30, RecordingOptions::default())
                .await
                .unwrap();
            wait_for_status(&engine, &id, RecordingStatus::Completed).await;
        }

        let counts = engine.get_categories_with_recordings().await;
        assert_eq!(
            counts,
            vec![
                CategoryCount { category: RecordingCategory::Sports, count: 2 },
                CategoryCount { category: RecordingCategory::News, count: 1 },
            ]
        );

        let sports = engine.get_recordings_by_category(RecordingCategory::Sports).await;
        assert_eq!(sports.len(), 2);
        assert!(engine
            .get_recordings_by_category(RecordingCategory::Kids)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_fail_interrupted_marks_orphans() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = engine_in(dir.path(), Arc::new(PendingSource::new(&[]))).await;

        let orphan = Recording::started(
            "Old Channel",
            "http://stream/old",
            30,
            "old.ts".to_string(),
            RecordingCategory::Other,
            RecordingOptions::default(),
        );
        let orphan_id = orphan.id.clone();
        engine
            .store()
            .update_recordings(|list| list.push(orphan))
            .await
            .unwrap();

        let live = engine
            .start_recording("BBC One", "ch1", "http://stream/1", 30, RecordingOptions::default())
            .await
            .unwrap();

        assert_eq!(engine.fail_interrupted().await.unwrap(), 1);
        assert_eq!(
            engine.get_recording(&orphan_id).await.unwrap().status,
            RecordingStatus::Failed
        );
        assert_eq!(
            engine.get_recording(&live).await.unwrap().status,
            RecordingStatus::Recording
        );
        engine.stop_recording(&live).await.unwrap();
    }

    #[tokio::test]
    async fn test_engines_do_not_share_captures() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let (a, _) = engine_in(dir_a.path(), Arc::new(PendingSource::new(&[]))).await;
        let (b, _) = engine_in(dir_b.path(), Arc::new(PendingSource::new(&[]))).await;

        let id = a
            .start_recording("BBC One", "ch1", "http://stream/1", 30, RecordingOptions::default())
            .await
            .unwrap();
        assert!(a.active().is_active(&id));
        assert!(!b.active().is_active(&id));

        // Stopping on the wrong engine is a no-op
        b.stop_recording(&id).await.unwrap();
        assert!(a.active().is_active(&id));
        a.stop_recording(&id).await.unwrap();
    }
}
