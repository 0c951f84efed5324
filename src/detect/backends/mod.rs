mod stub;

use anyhow::{anyhow, Result};

use crate::config::SentryConfig;
use crate::detect::backend::DetectorBackend;

pub use stub::StubBackend;

/// Build the configured detector backend.
///
/// Only the stub backend is built in; real inference backends plug in
/// behind the same trait.
pub fn from_config(cfg: &SentryConfig) -> Result<Box<dyn DetectorBackend>> {
    match cfg.detector.as_str() {
        "stub" => Ok(Box::new(StubBackend::new(
            &cfg.target_label,
            cfg.min_confidence,
        ))),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}
