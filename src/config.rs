use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

const DEFAULT_DEVICE: &str = "stub://camera0";
const DEFAULT_DETECTOR: &str = "stub";
const DEFAULT_TARGET_LABEL: &str = "cup";
const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
const DEFAULT_FRAME_SKIP: u64 = 10;
const DEFAULT_HOLD_SECS: u64 = 300;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;
const DEFAULT_SAVE_DIR: &str = "captures";
const DEFAULT_MESSAGE: &str =
    "Coffee cup left unattended! Please remove it from the coffee machine :)";
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SERVE_TTL_SECS: u64 = 300;
const DEFAULT_SERVE_MAX_REQUESTS: usize = 1;
const DEFAULT_PUBLIC_HOST: &str = "127.0.0.1";

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    device: Option<String>,
    detector: Option<DetectorConfigFile>,
    sampling: Option<SamplingConfigFile>,
    debounce: Option<DebounceConfigFile>,
    artifacts: Option<ArtifactConfigFile>,
    webhook: Option<WebhookConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    target_label: Option<String>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    frame_skip: Option<u64>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DebounceConfigFile {
    hold_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ArtifactConfigFile {
    save_dir: Option<String>,
    public_host: Option<String>,
    serve_ttl_secs: Option<u64>,
    serve_max_requests: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct WebhookConfigFile {
    url: Option<String>,
    message: Option<String>,
    timeout_secs: Option<u64>,
}

/// Runtime configuration for the sentry loop.
///
/// Load order: defaults, then the JSON config file named by `SENTRY_CONFIG`
/// (or an explicit path), then `SENTRY_*` environment overrides, then
/// validation. A missing webhook URL is a fatal startup error.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Capture device identifier (stub:// or http(s)://).
    pub device: String,
    /// Detector backend name.
    pub detector: String,
    /// Object label the detector watches for.
    pub target_label: String,
    /// Minimum detection confidence.
    pub min_confidence: f32,
    /// Only every Nth acquired frame is sampled for detection.
    pub frame_skip: u64,
    /// Continuous presence required before a notification fires.
    pub hold: Duration,
    /// Fixed delay between loop iterations.
    pub sample_interval: Duration,
    /// Base directory for latest/snapshot artifacts.
    pub save_dir: String,
    /// Outbound webhook endpoint (required).
    pub webhook_url: String,
    /// Notification text.
    pub message: String,
    /// Webhook delivery timeout.
    pub notify_timeout: Duration,
    /// Lifetime of a per-trigger artifact listener.
    pub serve_ttl: Duration,
    /// Request budget of a per-trigger artifact listener.
    pub serve_max_requests: usize,
    /// Host advertised in served artifact URLs.
    pub public_host: String,
}

impl SentryConfig {
    /// Load configuration, reading the file named by `SENTRY_CONFIG` when
    /// set.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load configuration from an explicit file path (or defaults when
    /// `None`), with env overrides applied on top.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SentryConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let sampling = file.sampling.unwrap_or_default();
        let debounce = file.debounce.unwrap_or_default();
        let artifacts = file.artifacts.unwrap_or_default();
        let webhook = file.webhook.unwrap_or_default();
        Self {
            device: file.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            detector: detector
                .backend
                .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
            target_label: detector
                .target_label
                .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
            min_confidence: detector.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
            frame_skip: sampling.frame_skip.unwrap_or(DEFAULT_FRAME_SKIP),
            hold: Duration::from_secs(debounce.hold_secs.unwrap_or(DEFAULT_HOLD_SECS)),
            sample_interval: Duration::from_millis(
                sampling.interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS),
            ),
            save_dir: artifacts
                .save_dir
                .unwrap_or_else(|| DEFAULT_SAVE_DIR.to_string()),
            webhook_url: webhook.url.unwrap_or_default(),
            message: webhook
                .message
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            notify_timeout: Duration::from_secs(
                webhook.timeout_secs.unwrap_or(DEFAULT_NOTIFY_TIMEOUT_SECS),
            ),
            serve_ttl: Duration::from_secs(
                artifacts.serve_ttl_secs.unwrap_or(DEFAULT_SERVE_TTL_SECS),
            ),
            serve_max_requests: artifacts
                .serve_max_requests
                .unwrap_or(DEFAULT_SERVE_MAX_REQUESTS),
            public_host: artifacts
                .public_host
                .unwrap_or_else(|| DEFAULT_PUBLIC_HOST.to_string()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("SENTRY_DEVICE") {
            if !device.trim().is_empty() {
                self.device = device;
            }
        }
        if let Ok(label) = std::env::var("SENTRY_TARGET_LABEL") {
            if !label.trim().is_empty() {
                self.target_label = label;
            }
        }
        if let Ok(confidence) = std::env::var("SENTRY_MIN_CONFIDENCE") {
            self.min_confidence = confidence
                .parse()
                .map_err(|_| anyhow!("SENTRY_MIN_CONFIDENCE must be a number in 0..=1"))?;
        }
        if let Ok(skip) = std::env::var("SENTRY_FRAME_SKIP") {
            self.frame_skip = skip
                .parse()
                .map_err(|_| anyhow!("SENTRY_FRAME_SKIP must be an integer"))?;
        }
        if let Ok(hold) = std::env::var("SENTRY_HOLD_SECS") {
            let secs: u64 = hold
                .parse()
                .map_err(|_| anyhow!("SENTRY_HOLD_SECS must be an integer number of seconds"))?;
            self.hold = Duration::from_secs(secs);
        }
        if let Ok(interval) = std::env::var("SENTRY_SAMPLE_INTERVAL_MS") {
            let ms: u64 = interval.parse().map_err(|_| {
                anyhow!("SENTRY_SAMPLE_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.sample_interval = Duration::from_millis(ms);
        }
        if let Ok(dir) = std::env::var("SENTRY_SAVE_DIR") {
            if !dir.trim().is_empty() {
                self.save_dir = dir;
            }
        }
        if let Ok(url) = std::env::var("SENTRY_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                self.webhook_url = url;
            }
        }
        if let Ok(message) = std::env::var("SENTRY_MESSAGE") {
            if !message.trim().is_empty() {
                self.message = message;
            }
        }
        if let Ok(host) = std::env::var("SENTRY_PUBLIC_HOST") {
            if !host.trim().is_empty() {
                self.public_host = host;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(anyhow!(
                "webhook url is required (webhook.url or SENTRY_WEBHOOK_URL)"
            ));
        }
        let url = Url::parse(&self.webhook_url).context("invalid webhook url")?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("webhook url scheme '{}' not supported", other)),
        }
        if self.frame_skip == 0 {
            return Err(anyhow!("frame_skip must be >= 1"));
        }
        if self.hold.is_zero() {
            return Err(anyhow!("hold duration must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(anyhow!("min_confidence must be within 0..=1"));
        }
        if self.save_dir.trim().is_empty() {
            return Err(anyhow!("save_dir must not be empty"));
        }
        if self.serve_max_requests == 0 {
            return Err(anyhow!("serve_max_requests must be >= 1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
