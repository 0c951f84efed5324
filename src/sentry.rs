//! The run loop.
//!
//! A single sequential sampling loop drives source -> decimation ->
//! detection -> debouncing, and on a trigger fans out to snapshot
//! persistence, ephemeral serving, and webhook notification. The only
//! concurrency lives in the per-trigger artifact listeners, which run on
//! their own threads so a slow remote fetch never blocks sampling.
//!
//! Per-iteration failures degrade to safe defaults: a detector error
//! counts as absent, a persistence failure drops the image URL, a delivery
//! failure is logged. Only configuration errors (before the loop) and
//! source exhaustion end the run.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

use crate::artifact::{ArtifactStore, ServeHandle};
use crate::config::SentryConfig;
use crate::debounce::{Observation, PresenceDebouncer, Trigger};
use crate::detect::DetectorBackend;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::notify::{NotificationMessage, Notifier};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Counters reported when the loop exits.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunStats {
    pub frames_seen: u64,
    pub frames_sampled: u64,
    pub triggers: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}

pub struct Sentry {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    debouncer: PresenceDebouncer,
    store: ArtifactStore,
    notifier: Notifier,
    frame_skip: u64,
    sample_interval: Duration,
    serve_ttl: Duration,
    serve_max_requests: usize,
    message: String,
    active_serves: Vec<ServeHandle>,
}

impl Sentry {
    pub fn new(
        cfg: &SentryConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
    ) -> Result<Self> {
        let store = ArtifactStore::open(&cfg.save_dir, cfg.public_host.clone())?;
        let notifier = Notifier::new(cfg.webhook_url.clone(), cfg.notify_timeout);
        Ok(Self {
            source,
            detector,
            debouncer: PresenceDebouncer::new(cfg.hold),
            store,
            notifier,
            frame_skip: cfg.frame_skip,
            sample_interval: cfg.sample_interval,
            serve_ttl: cfg.serve_ttl,
            serve_max_requests: cfg.serve_max_requests,
            message: cfg.message.clone(),
            active_serves: Vec::new(),
        })
    }

    /// Run until the source is exhausted or `shutdown` is set.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<RunStats> {
        self.source.connect()?;
        self.detector.warm_up()?;
        log::info!(
            "sentry running: detector={} skip={} hold={:?} interval={:?}",
            self.detector.name(),
            self.frame_skip,
            self.debouncer.hold(),
            self.sample_interval
        );

        let mut stats = RunStats::default();
        let mut last_health_log = Instant::now();

        while !shutdown.load(Ordering::SeqCst) {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("frame source exhausted, stopping");
                    break;
                }
                Err(e) => {
                    log::warn!("frame capture failed: {:#}", e);
                    self.pause(shutdown);
                    continue;
                }
            };
            stats.frames_seen += 1;

            // Decimation: only every Nth acquired frame reaches the detector.
            if (stats.frames_seen - 1) % self.frame_skip == 0 {
                stats.frames_sampled += 1;
                self.store.save_latest(&frame);

                let present = match self.detector.detect(&frame) {
                    Ok(result) => result.present,
                    Err(e) => {
                        // fail-safe: a broken sample counts as absent
                        log::warn!("detection failed, treating sample as absent: {:#}", e);
                        false
                    }
                };

                let obs = Observation {
                    at: Instant::now(),
                    present,
                };
                if let Some(trigger) = self.debouncer.observe(obs) {
                    stats.triggers += 1;
                    self.handle_trigger(&frame, trigger, &mut stats);
                }
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let source_stats = self.source.stats();
                log::info!(
                    "source health={} frames={} sampled={} triggers={} src={}",
                    self.source.is_healthy(),
                    source_stats.frames_captured,
                    stats.frames_sampled,
                    stats.triggers,
                    source_stats.source
                );
                last_health_log = Instant::now();
            }

            self.pause(shutdown);
        }

        // Listener teardown on every exit path; in-flight webhook calls are
        // bounded by the notifier timeout and have already returned.
        for handle in &mut self.active_serves {
            handle.stop();
        }
        self.active_serves.clear();

        log::info!(
            "sentry stopped: seen={} sampled={} triggers={} sent={} failed={}",
            stats.frames_seen,
            stats.frames_sampled,
            stats.triggers,
            stats.notifications_sent,
            stats.notifications_failed
        );
        Ok(stats)
    }

    /// Snapshot, serve, notify. The three steps are independently
    /// best-effort: a failed snapshot or listener drops the image URL but
    /// the notification still goes out.
    fn handle_trigger(&mut self, frame: &Frame, trigger: Trigger, stats: &mut RunStats) {
        log::info!(
            "presence held for {:?}, notifying",
            trigger
                .fired_at
                .saturating_duration_since(trigger.episode_started_at)
        );

        // Reap listeners that already hit their TTL or request budget.
        self.active_serves.retain(|handle| !handle.is_done());

        let image_url = match self.store.save_snapshot(frame, SystemTime::now()) {
            Ok(path) => {
                match self
                    .store
                    .serve(&path, self.serve_ttl, self.serve_max_requests)
                {
                    Ok(handle) => {
                        let url = handle.url.clone();
                        self.active_serves.push(handle);
                        Some(url)
                    }
                    Err(e) => {
                        log::warn!("artifact serving failed, notifying without image: {:#}", e);
                        None
                    }
                }
            }
            Err(e) => {
                log::warn!("snapshot failed, notifying without image: {:#}", e);
                None
            }
        };

        let message = NotificationMessage {
            text: self.message.clone(),
            image_url,
        };
        match self.notifier.send(&message) {
            Ok(()) => {
                stats.notifications_sent += 1;
                log::info!("notification delivered");
            }
            Err(e) => {
                // no retry: this episode's notification is dropped
                stats.notifications_failed += 1;
                log::warn!("notification failed: {}", e);
            }
        }
    }

    /// Fixed inter-iteration delay, cut short by shutdown so the loop exits
    /// promptly.
    fn pause(&self, shutdown: &AtomicBool) {
        let deadline = Instant::now() + self.sample_interval;
        while Instant::now() < deadline {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(remaining.min(Duration::from_millis(50)));
        }
    }
}
