//! presence-sentry
//!
//! Watches a stream of object-presence observations sampled from a frame
//! source and raises exactly one webhook notification per continuous
//! presence episode once the condition has held longer than a configured
//! duration. The triggering frame is made retrievable through a short-lived
//! per-trigger HTTP endpoint, and the most recent sampled frame is kept on
//! disk for external polling.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (HTTP MJPEG/JPEG cameras, stub source)
//! - `detect`: detector backend boundary (presence + confidence per frame)
//! - `debounce`: the presence hold-duration state machine
//! - `artifact`: latest-frame overwrite, per-trigger snapshots, ephemeral
//!   HTTP serving of a snapshot to the notification recipient
//! - `notify`: outbound webhook delivery with bounded timeout
//! - `sentry`: the run loop tying sampling, decimation, debouncing,
//!   persistence, and notification together
//!
//! Detection inference itself is a collaborator behind `DetectorBackend`;
//! this crate owns the temporal logic around it, not the model.

pub mod artifact;
pub mod config;
pub mod debounce;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod notify;
pub mod sentry;

pub use artifact::{ArtifactStore, ServeHandle};
pub use config::SentryConfig;
pub use debounce::{Observation, PresenceDebouncer, Trigger};
pub use detect::{Detection, DetectionResult, DetectorBackend, StubBackend};
pub use frame::Frame;
pub use ingest::{FrameSource, HttpSource, SourceStats, StubSource};
pub use notify::{DeliveryError, NotificationMessage, Notifier};
pub use sentry::{RunStats, Sentry};
