//! Recording services
//!
//! - **store**: JSON persistence for recordings and schedules
//! - **engine**: capture lifecycle (start, stop, timeout, failure)
//! - **scheduler**: timers that start captures at a future time
//! - **cleanup**: startup recovery and retention purging

pub mod capture;
pub mod classifier;
pub mod cleanup;
pub mod engine;
pub mod format;
pub mod metrics;
pub mod notifications;
pub mod registry;
pub mod scheduler;
pub mod store;

pub use capture::{HttpStreamSource, StreamSource};
pub use engine::RecordingEngine;
pub use notifications::{LogNotifier, Notifier, WebhookNotifier};
pub use scheduler::{ArmOutcome, Scheduler};
pub use store::RecordingStore;
